use std::sync::Arc;

use crate::permit::PermitError;

/// How a worker's permit request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// Permit granted; the worker may create an instance.
    Granted,
    /// The wait exceeded the configured acquire timeout.
    TimedOut,
    /// The permit set was closed or the request can never be served.
    Rejected,
}

impl AcquireOutcome {
    /// Return label value for metrics.
    #[inline]
    pub fn as_label(&self) -> &'static str {
        match self {
            AcquireOutcome::Granted => "granted",
            AcquireOutcome::TimedOut => "timed_out",
            AcquireOutcome::Rejected => "rejected",
        }
    }

    pub fn from_result(res: &Result<(), PermitError>) -> Self {
        match res {
            Ok(()) => AcquireOutcome::Granted,
            Err(PermitError::Timeout { .. }) => AcquireOutcome::TimedOut,
            Err(_) => AcquireOutcome::Rejected,
        }
    }
}

/// Metrics sink for the capacity subsystem.
pub trait MetricsBackend: Send + Sync + 'static {
    /// Record one reconciliation pass.
    ///
    /// # Arguments
    /// - `action`: `drained`, `grown`, `shrunk` or `unchanged`
    /// - `pending`: pending instances observed by the pass
    /// - `available`: permits available right after the pass
    fn record_reconcile(&self, action: &str, pending: usize, available: usize);
    /// Record the outcome of a worker permit request.
    fn record_acquire(&self, outcome: AcquireOutcome);
    /// Record a failed platform call made while provisioning.
    ///
    /// `error_kind` is a bounded label (`create_failed`, `delete_failed`, `list_failed`).
    fn record_provision_error(&self, error_kind: &str);
}

/// Shared handle to metrics backend.
pub type MetricsHandle = Arc<dyn MetricsBackend>;

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn outcome_from_result() {
        assert_eq!(AcquireOutcome::from_result(&Ok(())), AcquireOutcome::Granted);
        assert_eq!(
            AcquireOutcome::from_result(&Err(PermitError::Timeout {
                requested: 1,
                waited: Duration::from_secs(1)
            })),
            AcquireOutcome::TimedOut
        );
        assert_eq!(
            AcquireOutcome::from_result(&Err(PermitError::Closed)),
            AcquireOutcome::Rejected
        );
    }

    #[test]
    fn labels_are_stable() {
        assert_eq!(AcquireOutcome::Granted.as_label(), "granted");
        assert_eq!(AcquireOutcome::TimedOut.as_label(), "timed_out");
        assert_eq!(AcquireOutcome::Rejected.as_label(), "rejected");
    }
}
