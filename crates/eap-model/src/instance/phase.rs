use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// Lifecycle phase of a worker pod.
///
/// Platform phases are folded into four buckets:
/// - `Pending`: requested, not yet confirmed running (counts against the ceiling).
/// - `Running`: the agent container is up.
/// - `Terminating`: finished (`succeeded`/`failed`) or being deleted.
/// - `Unknown`: the platform lost track of the pod.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InstancePhase {
    #[default]
    Pending,
    Running,
    Terminating,
    Unknown,
}

impl InstancePhase {
    #[inline]
    pub fn is_pending(self) -> bool {
        matches!(self, InstancePhase::Pending)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            InstancePhase::Pending => "pending",
            InstancePhase::Running => "running",
            InstancePhase::Terminating => "terminating",
            InstancePhase::Unknown => "unknown",
        }
    }
}

impl fmt::Display for InstancePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InstancePhase {
    type Err = ModelError;
    fn from_str(s: &str) -> ModelResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(InstancePhase::Pending),
            "running" => Ok(InstancePhase::Running),
            "terminating" | "succeeded" | "failed" => Ok(InstancePhase::Terminating),
            "unknown" => Ok(InstancePhase::Unknown),
            other => Err(ModelError::UnknownPhase(other.to_string())),
        }
    }
}
