use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    BackoffStrategy, TimeoutMs,
    error::{ModelError, ModelResult},
};

/// Pending-capacity settings, fixed for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapacityConfig {
    /// Ceiling on pods that may be pending at the same time.
    pub max_pending_instances: usize,
    /// Period of the capacity reconciliation pass.
    pub reconcile_interval_ms: u64,
    /// How long a worker waits for a permit before abandoning creation.
    ///
    /// `None` waits until a permit shows up or the service stops.
    pub acquire_timeout_ms: Option<TimeoutMs>,
    /// Period of the instance refresh from the platform.
    pub refresh_interval_ms: u64,
    /// Restart backoff for the supervised reconcile loop.
    pub restart_backoff: BackoffStrategy,
}

impl Default for CapacityConfig {
    fn default() -> Self {
        Self {
            max_pending_instances: 10,
            reconcile_interval_ms: 5_000,
            acquire_timeout_ms: Some(30_000),
            refresh_interval_ms: 10_000,
            restart_backoff: BackoffStrategy::default(),
        }
    }
}

impl CapacityConfig {
    pub fn validate(&self) -> ModelResult<()> {
        if self.max_pending_instances == 0 {
            return Err(ModelError::InvalidCeiling);
        }
        if self.reconcile_interval_ms == 0 {
            return Err(ModelError::InvalidInterval {
                field: "reconcile_interval_ms",
            });
        }
        if self.refresh_interval_ms == 0 {
            return Err(ModelError::InvalidInterval {
                field: "refresh_interval_ms",
            });
        }
        if self.acquire_timeout_ms == Some(0) {
            return Err(ModelError::Invalid(
                "acquire_timeout_ms must be greater than zero when set".into(),
            ));
        }
        self.restart_backoff.validate()
    }

    #[inline]
    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_millis(self.reconcile_interval_ms)
    }

    #[inline]
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    #[inline]
    pub fn acquire_timeout(&self) -> Option<Duration> {
        self.acquire_timeout_ms.map(Duration::from_millis)
    }
}
