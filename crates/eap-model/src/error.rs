use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("unknown instance phase: {0}")]
    UnknownPhase(String),

    #[error("unknown jitter strategy: {0}")]
    UnknownJitter(String),

    #[error("max pending instances must be greater than zero")]
    InvalidCeiling,

    #[error("invalid interval for {field}: must be greater than zero")]
    InvalidInterval { field: &'static str },

    #[error("invalid model: {0}")]
    Invalid(String),
}

pub type ModelResult<T> = Result<T, ModelError>;
