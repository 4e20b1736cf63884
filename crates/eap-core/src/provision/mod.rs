//! Agent-creation workflow.
//!
//! Every pod creation is gated by one capacity permit. The permit is handed
//! back when the pod is confirmed running, when creation fails, or when a
//! still-pending pod is terminated.
mod task;
pub use task::{REFRESH_TASK_NAME, refresh_controller};

use std::{sync::Arc, time::Duration};

use tracing::{debug, error, info, instrument, warn};

use eap_model::{CreateAgentRequest, Instance, InstancePhase};

use crate::{
    error::CoreError,
    metrics::{AcquireOutcome, MetricsHandle, noop_metrics},
    permit::PermitSet,
    platform::{Platform, PlatformError},
    registry::InstanceRegistry,
};

pub struct Provisioner {
    platform: Arc<dyn Platform>,
    registry: InstanceRegistry,
    permits: Arc<PermitSet>,
    acquire_timeout: Option<Duration>,
    metrics: MetricsHandle,
}

impl Provisioner {
    /// Provisioner that waits for permits without a time limit.
    pub fn new(platform: Arc<dyn Platform>, registry: InstanceRegistry, permits: Arc<PermitSet>) -> Self {
        Self {
            platform,
            registry,
            permits,
            acquire_timeout: None,
            metrics: noop_metrics(),
        }
    }

    pub fn with_acquire_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    pub fn with_metrics(mut self, metrics: MetricsHandle) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn registry(&self) -> &InstanceRegistry {
        &self.registry
    }

    /// Wait for capacity, then ask the platform for a new agent pod.
    ///
    /// A permit timeout abandons the creation with [`crate::PermitError::Timeout`].
    #[instrument(level = "debug", skip(self, request), fields(job_id = request.job_id))]
    pub async fn create_agent(&self, request: &CreateAgentRequest) -> Result<Instance, CoreError> {
        let granted = match self.acquire_timeout {
            Some(timeout) => self.permits.acquire_timeout(1, timeout).await,
            None => self.permits.acquire(1).await,
        };
        self.metrics.record_acquire(AcquireOutcome::from_result(&granted));
        if let Err(e) = granted {
            warn!(reason = %e, "abandoning agent creation");
            return Err(e.into());
        }

        match self.platform.create_instance(request).await {
            Ok(instance) => {
                info!(instance = %instance.id, phase = %instance.phase, "agent instance requested");
                if !instance.is_pending() {
                    self.permits.release(1);
                }
                self.registry.upsert(instance.clone());
                Ok(instance)
            }
            Err(e) => {
                self.permits.release(1);
                self.metrics.record_provision_error("create_failed");
                error!(reason = %e, "failed to create agent instance");
                Err(e.into())
            }
        }
    }

    /// Mark an instance as running.
    ///
    /// Returns `true` if it was pending, in which case its permit is released.
    pub fn confirm_started(&self, id: &str) -> bool {
        match self.registry.set_phase(id, InstancePhase::Running) {
            Some(InstancePhase::Pending) => {
                self.permits.release(1);
                debug!(instance = id, "agent instance started");
                true
            }
            Some(_) => false,
            None => {
                debug!(instance = id, "start confirmation for unknown instance");
                false
            }
        }
    }

    /// Delete an instance on the platform and forget it.
    ///
    /// An instance the platform no longer knows about counts as deleted.
    #[instrument(level = "debug", skip(self))]
    pub async fn terminate(&self, id: &str) -> Result<(), CoreError> {
        match self.platform.delete_instance(id).await {
            Ok(()) => {}
            Err(PlatformError::NotFound(_)) => debug!("instance already gone on the platform"),
            Err(e) => {
                self.metrics.record_provision_error("delete_failed");
                error!(reason = %e, "failed to delete agent instance");
                return Err(e.into());
            }
        }

        if let Some(removed) = self.registry.remove(id) {
            if removed.is_pending() {
                self.permits.release(1);
            }
            info!(phase = %removed.phase, "agent instance terminated");
        }
        Ok(())
    }

    /// Reload the registry from the platform; returns the number of instances seen.
    ///
    /// Instances the listing shows as started for the first time release their
    /// permit, the same as [`Provisioner::confirm_started`].
    pub async fn refresh(&self) -> Result<usize, CoreError> {
        let instances = self.platform.list_instances().await.map_err(|e| {
            self.metrics.record_provision_error("list_failed");
            e
        })?;
        let count = instances.len();
        let started = self.registry.replace_all(instances);
        if started > 0 {
            self.permits.release(started);
            debug!(started, "agent instances started");
        }
        Ok(count)
    }
}
