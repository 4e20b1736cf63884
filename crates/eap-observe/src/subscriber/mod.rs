//! Taskvisor event logging.
//!
//! Supervisor events for the capacity tasks are turned into structured
//! tracing records. Failures of capacity tasks are logged at error level.
use async_trait::async_trait;
use taskvisor::{Event, EventKind, Subscribe};
use tracing::{Level, debug, error, info, trace, warn};

/// Task name prefix shared by every capacity-control task.
const CAPACITY_TASK_PREFIX: &str = "eap-capacity-";

const QUEUE_CAPACITY: usize = 1024;

macro_rules! emit {
    ($level:expr, $($rest:tt)+) => {{
        let level: Level = $level;
        if level == Level::ERROR {
            error!($($rest)+)
        } else if level == Level::WARN {
            warn!($($rest)+)
        } else if level == Level::INFO {
            info!($($rest)+)
        } else if level == Level::DEBUG {
            debug!($($rest)+)
        } else {
            trace!($($rest)+)
        }
    }};
}

/// Subscriber writing taskvisor events to the tracing pipeline.
#[derive(Debug, Default, Clone, Copy)]
pub struct EventLogger;

#[async_trait]
impl Subscribe for EventLogger {
    async fn on_event(&self, event: &Event) {
        let task = event.task.as_deref().unwrap_or("-");
        let reason = event.reason.as_deref().unwrap_or("");
        let attempt = event.attempt.unwrap_or(0);
        let level = severity(event.kind, task);
        let msg = describe(event.kind, event.reason.is_some());

        match event.kind {
            EventKind::BackoffScheduled => emit!(
                level,
                task,
                attempt,
                delay_ms = event.delay_ms.unwrap_or(0),
                reason,
                "{msg}"
            ),
            EventKind::TimeoutHit => emit!(
                level,
                task,
                timeout_ms = event.timeout_ms.unwrap_or(0),
                "{msg}"
            ),
            _ => emit!(level, task, attempt, reason, "{msg}"),
        }
    }

    fn name(&self) -> &'static str {
        "eap-event-logger"
    }

    fn queue_capacity(&self) -> usize {
        QUEUE_CAPACITY
    }
}

fn is_capacity_task(task: &str) -> bool {
    task.starts_with(CAPACITY_TASK_PREFIX)
}

fn severity(kind: EventKind, task: &str) -> Level {
    match kind {
        EventKind::TaskFailed | EventKind::ActorExhausted if is_capacity_task(task) => Level::ERROR,
        EventKind::TaskFailed | EventKind::TimeoutHit | EventKind::ControllerRejected => Level::WARN,
        EventKind::ActorDead | EventKind::SubscriberPanicked | EventKind::SubscriberOverflow => {
            Level::ERROR
        }
        EventKind::GraceExceeded => Level::WARN,
        EventKind::ShutdownRequested | EventKind::AllStoppedWithinGrace => Level::INFO,
        EventKind::TaskStarting if is_capacity_task(task) => Level::INFO,
        EventKind::TaskStarting | EventKind::TaskAdded | EventKind::ActorExhausted => Level::DEBUG,
        EventKind::BackoffScheduled | EventKind::ControllerSlotTransition => Level::DEBUG,
        _ => Level::TRACE,
    }
}

fn describe(kind: EventKind, has_reason: bool) -> &'static str {
    match kind {
        EventKind::TaskStarting => "task starting",
        EventKind::TaskStopped => "task stopped",
        EventKind::TaskFailed => "task failed",
        EventKind::TimeoutHit => "task timed out",
        EventKind::BackoffScheduled if has_reason => "retry scheduled after failure",
        EventKind::BackoffScheduled => "next run scheduled",
        EventKind::ActorExhausted => "task will not be restarted",
        EventKind::ActorDead => "task died (fatal)",
        EventKind::ControllerRejected => "controller rejected submission",
        EventKind::ControllerSubmitted => "controller accepted submission",
        EventKind::ControllerSlotTransition => "controller slot transition",
        EventKind::ShutdownRequested => "shutdown requested",
        EventKind::AllStoppedWithinGrace => "all tasks stopped within grace period",
        EventKind::GraceExceeded => "tasks still running after grace period",
        EventKind::SubscriberOverflow => "event dropped for a slow subscriber",
        EventKind::SubscriberPanicked => "subscriber panicked",
        _ => "task registry changed",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_task_failures_are_errors() {
        assert_eq!(severity(EventKind::TaskFailed, "eap-capacity-reconcile"), Level::ERROR);
        assert_eq!(severity(EventKind::ActorExhausted, "eap-capacity-reconcile"), Level::ERROR);
        assert_eq!(severity(EventKind::TaskFailed, "eap-instance-refresh"), Level::WARN);
        assert_eq!(severity(EventKind::ActorExhausted, "eap-instance-refresh"), Level::DEBUG);
    }

    #[test]
    fn routine_events_stay_quiet() {
        assert_eq!(severity(EventKind::TaskStopped, "x"), Level::TRACE);
        assert_eq!(severity(EventKind::TaskRemoved, "x"), Level::TRACE);
        assert_eq!(severity(EventKind::TaskStarting, "x"), Level::DEBUG);
        assert_eq!(severity(EventKind::TaskStarting, "eap-capacity-reconcile"), Level::INFO);
    }

    #[test]
    fn backoff_message_depends_on_reason() {
        assert_eq!(describe(EventKind::BackoffScheduled, true), "retry scheduled after failure");
        assert_eq!(describe(EventKind::BackoffScheduled, false), "next run scheduled");
    }
}
