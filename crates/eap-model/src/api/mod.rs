mod create_request;
pub use create_request::CreateAgentRequest;
