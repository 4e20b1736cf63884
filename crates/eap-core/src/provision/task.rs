//! Supervised platform refresh loop.
//!
//! One refresh per interval. A failed refresh ends the run with `Fail` so the
//! supervisor restarts it with backoff; the service stop token ends it with `Ok(())`.
use std::{sync::Arc, time::Duration};

use taskvisor::{
    AdmissionPolicy, ControllerSpec, RestartPolicy, TaskError, TaskFn, TaskRef, TaskSpec,
};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use eap_model::BackoffStrategy;

use super::Provisioner;
use crate::map::to_backoff_policy;

/// Name (and controller slot) of the periodic instance refresh.
pub const REFRESH_TASK_NAME: &str = "eap-instance-refresh";

/// Build the `ControllerSpec` running the refresh loop under taskvisor.
///
/// `stop` is usually [`crate::CapacityService::stop_token`].
pub fn refresh_controller(
    provisioner: Arc<Provisioner>,
    interval: Duration,
    stop: CancellationToken,
    backoff: &BackoffStrategy,
) -> ControllerSpec {
    let task: TaskRef = TaskFn::arc(REFRESH_TASK_NAME, move |ctx: CancellationToken| {
        let provisioner = Arc::clone(&provisioner);
        let stop = stop.clone();

        async move { refresh_loop(&provisioner, interval, &ctx, &stop).await }
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

pub(crate) async fn refresh_loop(
    provisioner: &Provisioner,
    interval: Duration,
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
                debug!("instance refresh loop stopped");
                return Ok(());
            }
            _ = ticker.tick() => {}
        }
        match provisioner.refresh().await {
            Ok(count) => trace!(instances = count, "instance registry refreshed"),
            Err(e) => {
                return Err(TaskError::Fail {
                    reason: format!("instance refresh failed: {e}"),
                });
            }
        }
    }
}
