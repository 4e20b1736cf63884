//! Prometheus metrics for agent capacity control.
//!
//! [`PrometheusMetrics`] implements [`eap_core::MetricsBackend`]; hand it to the
//! capacity service and the provisioner as a `MetricsHandle`.
//!
//! ```rust
//! use std::sync::Arc;
//! use eap_core::MetricsHandle;
//! use eap_prometheus::PrometheusMetrics;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let metrics = PrometheusMetrics::new()?;
//! let handle: MetricsHandle = Arc::new(metrics.clone());
//! # let _ = handle;
//! let text = metrics.render()?;
//! # let _ = text;
//! # Ok(())
//! # }
//! ```
//!
//! No HTTP server is included; serve [`PrometheusMetrics::render`] from
//! whatever endpoint the host process already runs.

mod backend;
pub use backend::PrometheusMetrics;

pub use prometheus::{Encoder, Registry, TextEncoder};
