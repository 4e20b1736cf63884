//! Capacity service over a taskvisor `Supervisor`.
//! - Owns the supervisor, its run loop, the permit set and the stop token
//!   shared by the reconcile loop and every loop built from [`CapacityService::stop_token`].
//! - Runs one reconciliation pass before the loop is submitted, so workers see
//!   real capacity as soon as `start` returns.
use std::sync::{Arc, Mutex, PoisonError};

use taskvisor::{ControllerConfig, ControllerSpec, Subscribe, Supervisor, SupervisorConfig};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

use eap_model::CapacityConfig;

use crate::{
    error::CoreError,
    metrics::MetricsHandle,
    permit::PermitSet,
    reconcile::{CapacityReconciler, reconcile_controller},
    registry::InstanceRegistry,
    status::CapacityStatus,
};

/// Running capacity control for one agent pool.
pub struct CapacityService {
    sup: Arc<Supervisor>,
    run_loop: Mutex<Option<JoinHandle<()>>>,
    permits: Arc<PermitSet>,
    registry: InstanceRegistry,
    stop: CancellationToken,
}

impl CapacityService {
    /// Validate `cfg`, start the supervisor and submit the reconcile loop.
    ///
    /// The permit set starts empty and is filled by the first pass.
    #[instrument(level = "debug", skip_all, fields(ceiling = cfg.max_pending_instances))]
    pub async fn start(
        cfg: &CapacityConfig,
        registry: InstanceRegistry,
        sup_cfg: SupervisorConfig,
        ctrl_cfg: ControllerConfig,
        subscribers: Vec<Arc<dyn Subscribe>>,
        metrics: MetricsHandle,
    ) -> Result<Self, CoreError> {
        cfg.validate()?;

        let permits = Arc::new(PermitSet::new(cfg.max_pending_instances));
        let reconciler = Arc::new(
            CapacityReconciler::new(Arc::new(registry.clone()), Arc::clone(&permits))
                .with_metrics(metrics),
        );
        let initial = reconciler.run_once();
        debug!(%initial, "initial capacity pass done");

        let sup = Supervisor::builder(sup_cfg)
            .with_subscribers(subscribers)
            .with_controller(ctrl_cfg)
            .build();

        let runner = Arc::clone(&sup);
        let run_loop = tokio::spawn(async move {
            if let Err(e) = runner.run(Vec::new()).await {
                error!(reason = %e, "supervisor run loop exited with error");
            }
        });
        sup.wait_ready().await;

        let stop = CancellationToken::new();
        let spec = reconcile_controller(
            reconciler,
            cfg.reconcile_interval(),
            Some(registry.change_signal()),
            stop.clone(),
            &cfg.restart_backoff,
        );
        sup.submit(spec)
            .await
            .map_err(|e| CoreError::Supervisor(e.to_string()))?;

        info!(
            ceiling = permits.ceiling(),
            available = permits.available(),
            interval_ms = cfg.reconcile_interval_ms,
            "capacity service started"
        );
        Ok(Self {
            sup,
            run_loop: Mutex::new(Some(run_loop)),
            permits,
            registry,
            stop,
        })
    }

    /// Shared permit set workers acquire from.
    pub fn permits(&self) -> Arc<PermitSet> {
        Arc::clone(&self.permits)
    }

    pub fn registry(&self) -> &InstanceRegistry {
        &self.registry
    }

    /// Token cancelled by [`CapacityService::stop`].
    ///
    /// Long-running tasks submitted through [`CapacityService::submit`] must
    /// end with `Ok(())` once it fires, e.g. [`crate::refresh_controller`].
    pub fn stop_token(&self) -> CancellationToken {
        self.stop.clone()
    }

    pub fn status(&self) -> CapacityStatus {
        CapacityStatus::collect(&self.registry, &self.permits)
    }

    /// Submit an extra controller (e.g. the instance refresh) to the same supervisor.
    ///
    /// Fails once the service is stopped.
    pub async fn submit(&self, spec: ControllerSpec) -> Result<(), CoreError> {
        if self.is_stopped() {
            return Err(CoreError::Supervisor("capacity service is stopped".into()));
        }
        self.sup
            .submit(spec)
            .await
            .map_err(|e| CoreError::Supervisor(e.to_string()))
    }

    /// Stop every loop bound to the stop token, fail current and future
    /// acquires with `Closed` and shut the supervisor run loop down.
    pub async fn stop(&self) {
        let run_loop = self
            .run_loop
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(run_loop) = run_loop else {
            return;
        };

        self.stop.cancel();
        self.permits.close();

        run_loop.abort();
        if let Err(e) = run_loop.await {
            if !e.is_cancelled() {
                error!(reason = %e, "supervisor run loop failed");
            }
        }
        info!("capacity service stopped");
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.is_cancelled()
    }
}
