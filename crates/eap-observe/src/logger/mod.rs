mod config;
mod error;
mod format;
mod level;
mod timer;

pub use config::LoggerConfig;
pub use error::{LoggerError, LoggerResult};
pub use format::LoggerFormat;
pub use level::LoggerLevel;
pub use timer::UtcRfc3339;

use tracing::Subscriber;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber described by `cfg`.
///
/// Fails with [`LoggerError::AlreadyInitialized`] on a second call.
///
/// ```rust
/// use eap_observe::{LoggerConfig, init_logger};
///
/// init_logger(&LoggerConfig::default()).expect("logger");
/// tracing::info!("logger initialized");
/// ```
pub fn init_logger(cfg: &LoggerConfig) -> LoggerResult<()> {
    let filter = cfg.level.to_env_filter();
    let base = fmt::layer()
        .with_target(cfg.with_targets)
        .with_timer(UtcRfc3339);

    match cfg.format {
        LoggerFormat::Text => install(
            tracing_subscriber::registry()
                .with(filter)
                .with(base.with_ansi(cfg.should_use_color())),
        ),
        LoggerFormat::Json => install(
            tracing_subscriber::registry()
                .with(filter)
                .with(base.json().with_ansi(false)),
        ),
    }
}

fn install<S>(subscriber: S) -> LoggerResult<()>
where
    S: Subscriber + Send + Sync + 'static,
{
    subscriber
        .try_init()
        .map_err(|_| LoggerError::AlreadyInitialized)
}
