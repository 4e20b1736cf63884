use thiserror::Error;

use eap_model::ModelError;

use crate::{permit::PermitError, platform::PlatformError};

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("supervisor error: {0}")]
    Supervisor(String),

    #[error("capacity permit error: {0}")]
    Permit(#[from] PermitError),

    #[error("platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("invalid configuration: {0}")]
    Config(#[from] ModelError),

    #[error("not found: {0}")]
    NotFound(String),
}
