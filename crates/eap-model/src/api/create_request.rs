use serde::{Deserialize, Serialize};

use crate::{LABEL_JOB_ID, Labels};

/// Request to bring up one elastic agent pod for a job.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAgentRequest {
    /// Id of the job waiting for an agent.
    pub job_id: u64,
    /// Extra labels copied onto the pod.
    #[serde(default, skip_serializing_if = "Labels::is_empty")]
    pub labels: Labels,
}

impl CreateAgentRequest {
    pub fn new(job_id: u64) -> Self {
        Self {
            job_id,
            labels: Labels::new(),
        }
    }

    /// Labels to put on the pod: the request labels plus [`LABEL_JOB_ID`].
    pub fn to_labels(&self) -> Labels {
        self.labels.clone().with(LABEL_JOB_ID, self.job_id.to_string())
    }
}
