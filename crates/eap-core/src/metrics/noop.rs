use crate::metrics::backend::{AcquireOutcome, MetricsBackend};

/// Metrics backend that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpMetrics;

impl MetricsBackend for NoOpMetrics {
    #[inline(always)]
    fn record_reconcile(&self, _: &str, _: usize, _: usize) {}

    #[inline(always)]
    fn record_acquire(&self, _: AcquireOutcome) {}

    #[inline(always)]
    fn record_provision_error(&self, _: &str) {}
}
