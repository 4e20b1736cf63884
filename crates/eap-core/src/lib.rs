pub mod error;
pub mod map;
pub mod metrics;
pub mod permit;
pub mod platform;
pub mod provision;
pub mod reconcile;
pub mod registry;
pub mod status;
pub mod supervisor;

pub use error::CoreError;
pub use metrics::{AcquireOutcome, MetricsBackend, MetricsHandle, NoOpMetrics, noop_metrics};
pub use permit::{PermitError, PermitSet};
pub use platform::{Platform, PlatformError};
pub use provision::{Provisioner, REFRESH_TASK_NAME, refresh_controller};
pub use reconcile::{
    CapacityReconciler, RECONCILE_TASK_NAME, Reconciliation, reconcile, reconcile_controller,
};
pub use registry::{InstanceRegistry, InstanceView};
pub use status::CapacityStatus;
pub use supervisor::CapacityService;

pub mod prelude {
    pub use crate::error::CoreError;
    pub use crate::permit::{PermitError, PermitSet};
    pub use crate::platform::{Platform, PlatformError};
    pub use crate::provision::Provisioner;
    pub use crate::registry::{InstanceRegistry, InstanceView};
    pub use crate::supervisor::CapacityService;
}
