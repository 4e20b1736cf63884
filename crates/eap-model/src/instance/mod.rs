mod phase;
pub use phase::InstancePhase;

use serde::{Deserialize, Serialize};

use crate::{InstanceId, LABEL_JOB_ID, Labels};

/// Snapshot of one worker pod as last reported by the platform.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    /// Platform-assigned name of the pod.
    pub id: InstanceId,
    /// Lifecycle phase; the capacity logic only looks at this field.
    pub phase: InstancePhase,
    /// Pod labels, including [`LABEL_JOB_ID`] for agents created for a job.
    #[serde(default, skip_serializing_if = "Labels::is_empty")]
    pub labels: Labels,
}

impl Instance {
    /// New instance in the [`InstancePhase::Pending`] phase with no labels.
    pub fn pending(id: impl Into<InstanceId>) -> Self {
        Self {
            id: id.into(),
            phase: InstancePhase::Pending,
            labels: Labels::new(),
        }
    }

    pub fn with_phase(mut self, phase: InstancePhase) -> Self {
        self.phase = phase;
        self
    }

    pub fn with_labels(mut self, labels: Labels) -> Self {
        self.labels = labels;
        self
    }

    /// Returns `true` while the pod was requested but is not yet running.
    #[inline]
    pub fn is_pending(&self) -> bool {
        self.phase.is_pending()
    }

    /// Job id label, if the agent was created for a job.
    pub fn job_id(&self) -> Option<&str> {
        self.labels.get(LABEL_JOB_ID)
    }
}
