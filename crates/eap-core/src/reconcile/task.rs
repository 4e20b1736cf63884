//! Supervised reconcile loop.
//!
//! The loop runs one pass per interval tick and one pass whenever the instance
//! registry signals a change. It ends with `Ok(())` when the capacity service
//! stops it, so `OnFailure` never restarts a deliberate shutdown.
use std::{sync::Arc, time::Duration};

use taskvisor::{
    AdmissionPolicy, ControllerSpec, RestartPolicy, TaskError, TaskFn, TaskRef, TaskSpec,
};
use tokio::{sync::Notify, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use eap_model::BackoffStrategy;

use super::CapacityReconciler;
use crate::map::to_backoff_policy;

/// Name (and controller slot) of the reconcile task.
pub const RECONCILE_TASK_NAME: &str = "eap-capacity-reconcile";

/// Build the `ControllerSpec` running the reconcile loop under taskvisor.
///
/// `trigger` is usually [`crate::InstanceRegistry::change_signal`]; `stop` is
/// owned by the capacity service.
pub fn reconcile_controller(
    reconciler: Arc<CapacityReconciler>,
    interval: Duration,
    trigger: Option<Arc<Notify>>,
    stop: CancellationToken,
    backoff: &BackoffStrategy,
) -> ControllerSpec {
    let task: TaskRef = TaskFn::arc(RECONCILE_TASK_NAME, move |ctx: CancellationToken| {
        let reconciler = Arc::clone(&reconciler);
        let trigger = trigger.clone();
        let stop = stop.clone();

        async move {
            debug!(interval_ms = interval.as_millis() as u64, "capacity reconcile loop started");
            reconcile_loop(&reconciler, interval, trigger.as_deref(), &ctx, &stop).await
        }
    });

    ControllerSpec {
        admission: AdmissionPolicy::Replace,
        task_spec: TaskSpec::new(
            task,
            RestartPolicy::OnFailure,
            to_backoff_policy(backoff, None),
            None,
        ),
    }
}

pub(crate) async fn reconcile_loop(
    reconciler: &CapacityReconciler,
    interval: Duration,
    trigger: Option<&Notify>,
    cancel: &CancellationToken,
    stop: &CancellationToken,
) -> Result<(), TaskError> {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(TaskError::Canceled),
            _ = stop.cancelled() => {
                debug!("capacity reconcile loop stopped");
                return Ok(());
            }
            _ = ticker.tick() => {}
            _ = changed(trigger) => trace!("instance change triggered reconcile"),
        }
        reconciler.run_once();
    }
}

async fn changed(trigger: Option<&Notify>) {
    match trigger {
        Some(notify) => notify.notified().await,
        None => std::future::pending().await,
    }
}
