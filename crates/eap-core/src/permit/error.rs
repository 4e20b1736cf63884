use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PermitError {
    #[error("permit set is closed")]
    Closed,

    #[error("timed out after {waited:?} waiting for {requested} permit(s)")]
    Timeout { requested: usize, waited: Duration },

    #[error("requested {requested} permit(s) but the ceiling is {ceiling}")]
    ExceedsCeiling { requested: usize, ceiling: usize },
}
