mod labels;
pub use labels::Labels;

mod constants;
pub use constants::LABEL_JOB_ID;

/// Platform-assigned identifier of a worker instance (the pod name).
pub type InstanceId = String;

/// Timeout value in milliseconds.
pub type TimeoutMs = u64;
