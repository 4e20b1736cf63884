//! Well-known label keys attached to worker instances.

/// Label key carrying the id of the job an agent instance was created for.
///
/// Set by [`crate::CreateAgentRequest::to_labels`] and read back when a status
/// lookup only knows the job, not the agent id.
pub const LABEL_JOB_ID: &str = "Elastic-Agent-Job-Id";
