//! Interface to the container-orchestration platform.
//!
//! The real client (pod create/list/delete) lives outside this crate; the core
//! only needs these three calls.
use async_trait::async_trait;
use thiserror::Error;

use eap_model::{CreateAgentRequest, Instance};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlatformError {
    #[error("platform unavailable: {0}")]
    Unavailable(String),

    #[error("platform rejected request: {0}")]
    Rejected(String),

    #[error("instance not found: {0}")]
    NotFound(String),
}

#[async_trait]
pub trait Platform: Send + Sync {
    /// Request a new agent pod; the returned instance is normally still pending.
    async fn create_instance(&self, request: &CreateAgentRequest) -> Result<Instance, PlatformError>;

    /// List every agent pod this orchestrator owns.
    async fn list_instances(&self) -> Result<Vec<Instance>, PlatformError>;

    /// Delete an agent pod.
    async fn delete_instance(&self, id: &str) -> Result<(), PlatformError>;
}
