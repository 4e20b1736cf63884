use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// Delay schedule applied when a supervised capacity task has to be restarted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffStrategy {
    pub jitter: super::JitterStrategy,
    pub first_ms: u64,
    pub max_ms: u64,
    pub factor: f64,
}

impl Default for BackoffStrategy {
    fn default() -> Self {
        Self {
            jitter: super::JitterStrategy::Equal,
            first_ms: 500,
            max_ms: 30_000,
            factor: 2.0,
        }
    }
}

impl BackoffStrategy {
    /// Checks that the delays are ordered and the growth factor is usable.
    pub fn validate(&self) -> ModelResult<()> {
        if self.first_ms > self.max_ms {
            return Err(ModelError::Invalid(format!(
                "backoff first_ms ({}) exceeds max_ms ({})",
                self.first_ms, self.max_ms
            )));
        }
        if !self.factor.is_finite() || self.factor < 1.0 {
            return Err(ModelError::Invalid(format!(
                "backoff factor must be a finite value >= 1.0, got {}",
                self.factor
            )));
        }
        Ok(())
    }
}
