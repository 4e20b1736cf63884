use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Yaml},
};
use serde::{Deserialize, Serialize};

use eap_model::CapacityConfig;
use eap_observe::LoggerConfig;

/// Environment variable naming an optional YAML config file.
pub const CONFIG_PATH_ENV: &str = "EAP_CONFIG";
const ENV_PREFIX: &str = "EAP_";

/// Daemon configuration.
///
/// Precedence (lowest to highest): defaults, the YAML file named by
/// `EAP_CONFIG`, `EAP_*` environment variables (`__` separates nesting,
/// e.g. `EAP_CAPACITY__MAX_PENDING_INSTANCES=20`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentdConfig {
    pub logger: LoggerConfig,
    pub capacity: CapacityConfig,
    pub demo: DemoConfig,
}

/// Workload driven against the simulated platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Jobs to request agents for.
    pub jobs: u64,
    /// Concurrent provisioning workers.
    pub workers: usize,
    /// Time a simulated pod spends pending before it reports running.
    pub start_delay_ms: u64,
    /// Time an agent runs its job before it is terminated.
    pub job_duration_ms: u64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            jobs: 25,
            workers: 8,
            start_delay_ms: 1_500,
            job_duration_ms: 4_000,
        }
    }
}

impl DemoConfig {
    pub fn start_delay(&self) -> Duration {
        Duration::from_millis(self.start_delay_ms)
    }

    pub fn job_duration(&self) -> Duration {
        Duration::from_millis(self.job_duration_ms)
    }
}

impl AgentdConfig {
    /// Load from defaults, `EAP_CONFIG` and the environment.
    pub fn load() -> Result<Self> {
        let path = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);

        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));
        if let Some(path) = &path {
            anyhow::ensure!(path.is_file(), "config file {} does not exist", path.display());
            figment = figment.merge(Yaml::file(path));
        }
        let figment = figment.merge(Env::prefixed(ENV_PREFIX).ignore(&["config"]).split("__"));

        Self::from_figment(&figment).with_context(|| match &path {
            Some(p) => format!("failed to load config (file: {})", p.display()),
            None => "failed to load config".to_string(),
        })
    }

    fn from_figment(figment: &Figment) -> Result<Self> {
        let cfg: Self = figment.extract()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        self.capacity.validate()?;
        anyhow::ensure!(self.demo.workers > 0, "demo.workers must be greater than zero");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use eap_model::JitterStrategy;

    use super::*;

    fn with_yaml(yaml: &str) -> Result<AgentdConfig> {
        let figment = Figment::new()
            .merge(Serialized::defaults(AgentdConfig::default()))
            .merge(Yaml::string(yaml));
        AgentdConfig::from_figment(&figment)
    }

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = with_yaml("").unwrap();
        assert_eq!(cfg, AgentdConfig::default());
        assert_eq!(cfg.capacity.max_pending_instances, 10);
    }

    #[test]
    fn yaml_overrides_nested_sections() {
        let cfg = with_yaml(
            r#"
logger:
  format: json
  level: "eap_core=debug,info"
capacity:
  max_pending_instances: 3
  acquire_timeout_ms: null
  restart_backoff:
    jitter: full
    first_ms: 100
demo:
  workers: 2
"#,
        )
        .unwrap();

        assert_eq!(cfg.logger.level.as_str(), "eap_core=debug,info");
        assert_eq!(cfg.capacity.max_pending_instances, 3);
        assert_eq!(cfg.capacity.acquire_timeout(), None);
        assert_eq!(cfg.capacity.restart_backoff.jitter, JitterStrategy::Full);
        assert_eq!(cfg.capacity.restart_backoff.first_ms, 100);
        assert_eq!(cfg.capacity.reconcile_interval_ms, 5_000);
        assert_eq!(cfg.demo.workers, 2);
        assert_eq!(cfg.demo.jobs, 25);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(with_yaml("capacity:\n  max_pending_instances: 0\n").is_err());
        assert!(with_yaml("demo:\n  workers: 0\n").is_err());
        assert!(with_yaml("logger:\n  level: \"x=nope\"\n").is_err());
    }
}
