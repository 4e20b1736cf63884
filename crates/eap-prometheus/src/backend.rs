use std::sync::Arc;

use prometheus::{
    Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder, proto::MetricFamily,
};

use eap_core::{AcquireOutcome, MetricsBackend};

const NAMESPACE: &str = "eap";

/// Prometheus backend for capacity control.
///
/// ## Metrics
/// - `eap_reconcile_total{action}` - reconciliation passes by outcome
/// - `eap_pending_instances` - pending instances seen by the last pass
/// - `eap_available_permits` - permits available after the last pass
/// - `eap_permit_acquire_total{outcome}` - worker acquisitions
/// - `eap_provision_errors_total{error_kind}` - platform call failures
///
/// All label values come from fixed sets (`drained|grown|shrunk|unchanged`,
/// `granted|timed_out|rejected`, `create_failed|delete_failed|list_failed`).
#[derive(Clone)]
pub struct PrometheusMetrics {
    reconcile_total: IntCounterVec,
    pending_instances: IntGauge,
    available_permits: IntGauge,
    acquire_total: IntCounterVec,
    provision_errors: IntCounterVec,
    registry: Arc<Registry>,
}

impl PrometheusMetrics {
    /// Register every metric in `registry`.
    pub fn new_with_registry(registry: Arc<Registry>) -> Result<Self, prometheus::Error> {
        let reconcile_total = IntCounterVec::new(
            Opts::new("reconcile_total", "Capacity reconciliation passes").namespace(NAMESPACE),
            &["action"],
        )?;
        registry.register(Box::new(reconcile_total.clone()))?;

        let pending_instances = IntGauge::with_opts(
            Opts::new("pending_instances", "Pending agent instances").namespace(NAMESPACE),
        )?;
        registry.register(Box::new(pending_instances.clone()))?;

        let available_permits = IntGauge::with_opts(
            Opts::new("available_permits", "Capacity permits available to workers")
                .namespace(NAMESPACE),
        )?;
        registry.register(Box::new(available_permits.clone()))?;

        let acquire_total = IntCounterVec::new(
            Opts::new("permit_acquire_total", "Worker permit acquisitions").namespace(NAMESPACE),
            &["outcome"],
        )?;
        registry.register(Box::new(acquire_total.clone()))?;

        let provision_errors = IntCounterVec::new(
            Opts::new("provision_errors_total", "Failed platform calls").namespace(NAMESPACE),
            &["error_kind"],
        )?;
        registry.register(Box::new(provision_errors.clone()))?;

        Ok(Self {
            reconcile_total,
            pending_instances,
            available_permits,
            acquire_total,
            provision_errors,
            registry,
        })
    }

    /// Backend with a private registry.
    pub fn new() -> Result<Self, prometheus::Error> {
        Self::new_with_registry(Arc::new(Registry::new()))
    }

    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    /// Text exposition format, ready to serve on `/metrics`.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }
}

impl MetricsBackend for PrometheusMetrics {
    fn record_reconcile(&self, action: &str, pending: usize, available: usize) {
        self.reconcile_total.with_label_values(&[action]).inc();
        self.pending_instances.set(clamp(pending));
        self.available_permits.set(clamp(available));
    }

    fn record_acquire(&self, outcome: AcquireOutcome) {
        self.acquire_total
            .with_label_values(&[outcome.as_label()])
            .inc();
    }

    fn record_provision_error(&self, error_kind: &str) {
        self.provision_errors.with_label_values(&[error_kind]).inc();
    }
}

#[inline]
fn clamp(v: usize) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn family<'a>(families: &'a [MetricFamily], name: &str) -> &'a MetricFamily {
        families
            .iter()
            .find(|f| f.name() == name)
            .unwrap_or_else(|| panic!("metric {name} not found"))
    }

    #[test]
    fn reconcile_updates_counter_and_gauges() {
        let metrics = PrometheusMetrics::new().unwrap();

        metrics.record_reconcile("grown", 0, 5);
        metrics.record_reconcile("shrunk", 3, 2);
        metrics.record_reconcile("shrunk", 3, 2);

        let families = metrics.gather();
        assert_eq!(family(&families, "eap_reconcile_total").get_metric().len(), 2);
        assert_eq!(metrics.pending_instances.get(), 3);
        assert_eq!(metrics.available_permits.get(), 2);
        assert_eq!(metrics.reconcile_total.with_label_values(&["shrunk"]).get(), 2);
    }

    #[test]
    fn acquire_outcomes_are_labelled() {
        let metrics = PrometheusMetrics::new().unwrap();

        metrics.record_acquire(AcquireOutcome::Granted);
        metrics.record_acquire(AcquireOutcome::Granted);
        metrics.record_acquire(AcquireOutcome::TimedOut);

        let families = metrics.gather();
        assert_eq!(family(&families, "eap_permit_acquire_total").get_metric().len(), 2);
        assert_eq!(metrics.acquire_total.with_label_values(&["granted"]).get(), 2);
    }

    #[test]
    fn provision_errors_by_kind() {
        let metrics = PrometheusMetrics::new().unwrap();
        metrics.record_provision_error("create_failed");
        metrics.record_provision_error("list_failed");

        let families = metrics.gather();
        assert_eq!(family(&families, "eap_provision_errors_total").get_metric().len(), 2);
    }

    #[test]
    fn render_emits_text_format() {
        let metrics = PrometheusMetrics::new().unwrap();
        metrics.record_reconcile("drained", 7, 0);

        let text = metrics.render().unwrap();
        assert!(text.contains("eap_reconcile_total{action=\"drained\"} 1"));
        assert!(text.contains("eap_pending_instances 7"));
    }

    #[test]
    fn shared_registry_rejects_double_registration() {
        let registry = Arc::new(Registry::new());
        let _first = PrometheusMetrics::new_with_registry(registry.clone()).unwrap();
        assert!(PrometheusMetrics::new_with_registry(registry).is_err());
    }
}
