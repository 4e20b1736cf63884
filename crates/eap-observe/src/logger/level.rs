use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::logger::error::LoggerError;

const DEFAULT_DIRECTIVE: &str = "info";

/// Validated `EnvFilter` directive string, e.g. `"eap_core=debug,info"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LoggerLevel(String);

impl LoggerLevel {
    pub fn new(s: impl Into<String>) -> Result<Self, LoggerError> {
        Self::try_from(s.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Build the filter; falls back to `info` if the directive stops parsing.
    pub fn to_env_filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.0).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
    }
}

impl Default for LoggerLevel {
    fn default() -> Self {
        Self(DEFAULT_DIRECTIVE.to_string())
    }
}

impl FromStr for LoggerLevel {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s.to_owned())
    }
}

impl TryFrom<String> for LoggerLevel {
    type Error = LoggerError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(LoggerError::InvalidLevel("empty filter".into()));
        }
        EnvFilter::try_new(trimmed)
            .map(|_| Self(trimmed.to_string()))
            .map_err(|e| LoggerError::InvalidLevel(format!("{trimmed}: {e}")))
    }
}

impl From<LoggerLevel> for String {
    fn from(l: LoggerLevel) -> Self {
        l.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_and_per_target_levels() {
        for lvl in ["info", "warn", "trace", "eap_core=debug,taskvisor=warn,info"] {
            assert!(lvl.parse::<LoggerLevel>().is_ok(), "{lvl} must parse");
        }
    }

    #[test]
    fn rejects_bad_directives() {
        for lvl in ["", "   ", "eap_core=loud", "a=trace,b=wat"] {
            assert!(
                matches!(LoggerLevel::from_str(lvl), Err(LoggerError::InvalidLevel(_))),
                "{lvl:?} must be rejected"
            );
        }
    }

    #[test]
    fn trims_input() {
        assert_eq!(LoggerLevel::new("  debug ").unwrap().as_str(), "debug");
    }

    #[test]
    fn default_is_info() {
        let lvl = LoggerLevel::default();
        assert_eq!(lvl.as_str(), "info");
        let _ = lvl.to_env_filter();
    }

    #[test]
    fn deserializes_from_plain_string() {
        let lvl: LoggerLevel = serde_json::from_str(r#""eap_core=trace""#).unwrap();
        assert_eq!(lvl.as_str(), "eap_core=trace");
        assert!(serde_json::from_str::<LoggerLevel>(r#""x=nope""#).is_err());
    }
}
