mod api;
pub use api::CreateAgentRequest;

mod config;
pub use config::CapacityConfig;

mod domain;
pub use domain::LABEL_JOB_ID;
pub use domain::{InstanceId, Labels, TimeoutMs};

mod error;
pub use error::{ModelError, ModelResult};

mod instance;
pub use instance::{Instance, InstancePhase};

mod strategy;
pub use strategy::{BackoffStrategy, JitterStrategy};
