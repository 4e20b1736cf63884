//! Capacity reconciliation.
//!
//! Keeps the permit set's available count close to `ceiling - pending` by
//! applying only the difference between desired and observed state. Workers
//! keep acquiring and releasing while a pass runs; any drift is corrected on
//! the next pass.
mod task;
pub use task::{RECONCILE_TASK_NAME, reconcile_controller};

use std::{fmt, sync::Arc};

use tracing::{debug, trace};

use crate::{
    metrics::{MetricsHandle, noop_metrics},
    permit::PermitSet,
    registry::InstanceView,
};

/// What a single reconciliation pass did to the permit set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// Pending pods reached the ceiling; every available permit was revoked.
    Drained { pending: usize, drained: usize },
    /// Headroom grew; permits were released.
    Grown { pending: usize, released: usize },
    /// Headroom shrank; permits were taken back on a best-effort basis.
    Shrunk {
        pending: usize,
        requested: usize,
        acquired: usize,
    },
    /// Available count already matched the headroom.
    Unchanged { pending: usize },
}

impl Reconciliation {
    /// Pending instance count observed by the pass.
    pub fn pending(&self) -> usize {
        match *self {
            Reconciliation::Drained { pending, .. }
            | Reconciliation::Grown { pending, .. }
            | Reconciliation::Shrunk { pending, .. }
            | Reconciliation::Unchanged { pending } => pending,
        }
    }

    /// Label value for metrics.
    #[inline]
    pub fn as_label(&self) -> &'static str {
        match self {
            Reconciliation::Drained { .. } => "drained",
            Reconciliation::Grown { .. } => "grown",
            Reconciliation::Shrunk { .. } => "shrunk",
            Reconciliation::Unchanged { .. } => "unchanged",
        }
    }
}

impl fmt::Display for Reconciliation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Reconciliation::Drained { pending, drained } => {
                write!(f, "drained {drained} permit(s), pending={pending}")
            }
            Reconciliation::Grown { pending, released } => {
                write!(f, "released {released} permit(s), pending={pending}")
            }
            Reconciliation::Shrunk {
                pending,
                requested,
                acquired,
            } => write!(
                f,
                "took back {acquired}/{requested} permit(s), pending={pending}"
            ),
            Reconciliation::Unchanged { pending } => write!(f, "unchanged, pending={pending}"),
        }
    }
}

/// Bring `permits` in line with `ceiling` minus the pending instances in `instances`.
///
/// Never blocks and never fails. With no concurrent callers the available
/// count equals `max(ceiling - pending, 0)` afterwards.
pub fn reconcile<V>(ceiling: usize, instances: &V, permits: &PermitSet) -> Reconciliation
where
    V: InstanceView + ?Sized,
{
    let pending = instances.pending_count();

    if pending >= ceiling {
        // Hard cutoff: permits already handed out are not clawed back.
        let drained = permits.drain();
        return Reconciliation::Drained { pending, drained };
    }

    let headroom = ceiling - pending;
    let current = permits.available();

    if headroom > current {
        let released = permits.release(headroom - current);
        Reconciliation::Grown { pending, released }
    } else if headroom < current {
        let requested = current - headroom;
        let acquired = permits.try_acquire(requested);
        Reconciliation::Shrunk {
            pending,
            requested,
            acquired,
        }
    } else {
        Reconciliation::Unchanged { pending }
    }
}

/// Reconciler bound to one permit set and one instance view.
pub struct CapacityReconciler {
    ceiling: usize,
    instances: Arc<dyn InstanceView>,
    permits: Arc<PermitSet>,
    metrics: MetricsHandle,
}

impl CapacityReconciler {
    /// Reconciler targeting the permit set's own ceiling.
    pub fn new(instances: Arc<dyn InstanceView>, permits: Arc<PermitSet>) -> Self {
        Self {
            ceiling: permits.ceiling(),
            instances,
            permits,
            metrics: noop_metrics(),
        }
    }

    pub fn with_metrics(mut self, metrics: MetricsHandle) -> Self {
        self.metrics = metrics;
        self
    }

    #[inline]
    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    pub fn permits(&self) -> &Arc<PermitSet> {
        &self.permits
    }

    /// Run one reconciliation pass.
    pub fn run_once(&self) -> Reconciliation {
        let outcome = reconcile(self.ceiling, self.instances.as_ref(), &self.permits);
        let available = self.permits.available();

        match outcome {
            Reconciliation::Unchanged { .. } => {
                trace!(ceiling = self.ceiling, available, "capacity {outcome}")
            }
            _ => debug!(ceiling = self.ceiling, available, "capacity {outcome}"),
        }
        self.metrics
            .record_reconcile(outcome.as_label(), outcome.pending(), available);
        outcome
    }
}

impl fmt::Debug for CapacityReconciler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapacityReconciler")
            .field("ceiling", &self.ceiling)
            .field("permits", &self.permits)
            .field("metrics", &"<handle>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use eap_model::{Instance, InstancePhase};

    use super::*;
    use crate::{metrics::MetricsBackend, registry::InstanceRegistry};

    fn instances(pending: usize, running: usize) -> Vec<Instance> {
        let mut out = Vec::new();
        for i in 0..pending {
            out.push(Instance::pending(format!("pending-{i}")));
        }
        for i in 0..running {
            out.push(Instance::pending(format!("running-{i}")).with_phase(InstancePhase::Running));
        }
        out
    }

    #[test]
    fn empty_snapshot_grows_to_full_ceiling() {
        let permits = PermitSet::new(5);
        let outcome = reconcile(5, &instances(0, 0), &permits);

        assert_eq!(outcome, Reconciliation::Grown { pending: 0, released: 5 });
        assert_eq!(permits.available(), 5);
    }

    #[test]
    fn headroom_shrink_takes_back_permits() {
        let permits = PermitSet::with_available(5, 5);
        let outcome = reconcile(5, &instances(3, 4), &permits);

        assert_eq!(
            outcome,
            Reconciliation::Shrunk {
                pending: 3,
                requested: 3,
                acquired: 3
            }
        );
        assert_eq!(permits.available(), 2);
    }

    #[test]
    fn over_capacity_drains_everything() {
        let permits = PermitSet::with_available(5, 3);
        let outcome = reconcile(5, &instances(6, 0), &permits);

        assert_eq!(outcome, Reconciliation::Drained { pending: 6, drained: 3 });
        assert_eq!(permits.available(), 0);
    }

    #[test]
    fn partial_headroom_releases_difference() {
        let permits = PermitSet::with_available(5, 2);
        let outcome = reconcile(5, &instances(2, 1), &permits);

        assert_eq!(outcome, Reconciliation::Grown { pending: 2, released: 1 });
        assert_eq!(permits.available(), 3);
    }

    #[test]
    fn consumed_permits_are_replenished_up_to_headroom() {
        let permits = PermitSet::with_available(5, 0);
        let outcome = reconcile(5, &instances(4, 0), &permits);

        assert_eq!(outcome, Reconciliation::Grown { pending: 4, released: 1 });
        assert_eq!(permits.available(), 1);
    }

    #[test]
    fn ceiling_reached_exactly_drains() {
        for initial in 0..=5 {
            let permits = PermitSet::with_available(5, initial);
            let outcome = reconcile(5, &instances(5, 2), &permits);
            assert!(matches!(outcome, Reconciliation::Drained { pending: 5, .. }));
            assert_eq!(permits.available(), 0, "initial={initial}");
        }
    }

    #[test]
    fn single_threaded_result_matches_headroom() {
        for pending in 0..8 {
            for initial in 0..=5 {
                let permits = PermitSet::with_available(5, initial);
                reconcile(5, &instances(pending, 1), &permits);
                assert_eq!(
                    permits.available(),
                    5usize.saturating_sub(pending),
                    "pending={pending} initial={initial}"
                );
            }
        }
    }

    #[test]
    fn second_pass_is_a_no_op() {
        for pending in 0..8 {
            let permits = PermitSet::with_available(5, 4);
            let snapshot = instances(pending, 0);

            reconcile(5, &snapshot, &permits);
            let after_first = permits.available();
            let second = reconcile(5, &snapshot, &permits);

            assert_eq!(permits.available(), after_first);
            assert!(matches!(
                second,
                Reconciliation::Unchanged { .. } | Reconciliation::Drained { drained: 0, .. }
            ));
        }
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<(String, usize, usize)>>);

    impl MetricsBackend for Recorder {
        fn record_reconcile(&self, action: &str, pending: usize, available: usize) {
            self.0
                .lock()
                .unwrap()
                .push((action.to_string(), pending, available));
        }
        fn record_acquire(&self, _: crate::metrics::AcquireOutcome) {}
        fn record_provision_error(&self, _: &str) {}
    }

    #[test]
    fn reconciler_uses_live_registry_and_reports_metrics() {
        let registry = InstanceRegistry::new();
        let permits = Arc::new(PermitSet::new(3));
        let recorder = Arc::new(Recorder::default());
        let reconciler = CapacityReconciler::new(Arc::new(registry.clone()), Arc::clone(&permits))
            .with_metrics(recorder.clone());

        assert_eq!(reconciler.ceiling(), 3);
        assert_eq!(reconciler.run_once(), Reconciliation::Grown { pending: 0, released: 3 });

        registry.upsert(Instance::pending("a"));
        registry.upsert(Instance::pending("b"));
        assert!(matches!(reconciler.run_once(), Reconciliation::Shrunk { pending: 2, .. }));
        assert_eq!(permits.available(), 1);

        registry.set_phase("a", InstancePhase::Running);
        reconciler.run_once();
        assert_eq!(permits.available(), 2);

        let seen = recorder.0.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![
                ("grown".to_string(), 0, 3),
                ("shrunk".to_string(), 2, 1),
                ("grown".to_string(), 1, 2),
            ]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_workers_never_push_available_over_ceiling() {
        use std::{
            sync::atomic::{AtomicBool, AtomicUsize, Ordering},
            time::Duration,
        };

        const CEILING: usize = 5;
        const WORKERS: usize = 8;
        const CYCLES: usize = 100;

        let registry = InstanceRegistry::new();
        registry.upsert(Instance::pending("warm-0"));
        registry.upsert(Instance::pending("warm-1"));
        let permits = Arc::new(PermitSet::new(CEILING));
        let reconciler = Arc::new(CapacityReconciler::new(
            Arc::new(registry.clone()),
            Arc::clone(&permits),
        ));
        reconciler.run_once();

        let max_seen = Arc::new(AtomicUsize::new(permits.available()));
        let done = Arc::new(AtomicBool::new(false));

        let looper = {
            let reconciler = Arc::clone(&reconciler);
            let max_seen = Arc::clone(&max_seen);
            let done = Arc::clone(&done);
            tokio::spawn(async move {
                while !done.load(Ordering::SeqCst) {
                    reconciler.run_once();
                    max_seen.fetch_max(reconciler.permits().available(), Ordering::SeqCst);
                    tokio::task::yield_now().await;
                }
            })
        };

        let mut workers = tokio::task::JoinSet::new();
        for w in 0..WORKERS {
            let registry = registry.clone();
            let permits = Arc::clone(&permits);
            let max_seen = Arc::clone(&max_seen);
            workers.spawn(async move {
                for c in 0..CYCLES {
                    if permits.acquire_timeout(1, Duration::from_millis(500)).await.is_err() {
                        continue;
                    }
                    let id = format!("w{w}-{c}");
                    registry.upsert(Instance::pending(id.clone()));
                    max_seen.fetch_max(permits.available(), Ordering::SeqCst);
                    tokio::task::yield_now().await;

                    registry.remove(&id);
                    permits.release(1);
                    max_seen.fetch_max(permits.available(), Ordering::SeqCst);
                }
            });
        }
        while let Some(res) = workers.join_next().await {
            res.unwrap();
        }
        done.store(true, Ordering::SeqCst);
        looper.await.unwrap();

        assert!(max_seen.load(Ordering::SeqCst) <= CEILING);
        assert_eq!(registry.pending_count(), 2);

        reconciler.run_once();
        assert_eq!(permits.available(), CEILING - 2, "quiet pass converges to the headroom");
    }
}
