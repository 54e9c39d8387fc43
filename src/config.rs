use anyhow::Result;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::constants::{
    DEFAULT_PROBER_PORT, DEFAULT_PROBE_MODULE, DEFAULT_PROBE_TIMEOUT_MS,
    DEFAULT_RESYNC_INTERVAL_SECS, DEFAULT_SCHEDULER_NAME, PROBE_MODULE_ANNOTATION,
    PROBE_TARGET_ANNOTATION,
};
use crate::pod::LabelSelector;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Only pods requesting this scheduler are placed.
    #[serde(default = "default_scheduler_name")]
    pub scheduler_name: String,
    /// How often pending pods are listed again so failed decisions are retried.
    #[serde(default = "default_resync_interval_secs")]
    pub resync_interval_secs: u64,
    pub strategy: StrategyConfig,
    /// Seed for the random source. Entropy is used when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Which placement strategy runs, together with its parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StrategyConfig {
    ImageLocality,
    UniformRandom,
    NetworkLatency(NetworkLatencyConfig),
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkLatencyConfig {
    pub prober: ProberConfig,
    #[serde(default)]
    pub annotations: AnnotationKeys,
    /// Maximum number of pods this strategy may place. 0 or absent means unlimited.
    #[serde(default)]
    pub quota: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProberConfig {
    /// Labels identifying prober pods.
    pub selector: LabelSelector,
    /// Namespace the prober pods run in.
    pub namespace: String,
    #[serde(default = "default_prober_port")]
    pub port: u16,
    #[serde(default = "default_probe_timeout_ms")]
    pub timeout_ms: u64,
    /// Module used when the pod does not ask for one.
    #[serde(default = "default_probe_module")]
    pub module: String,
}

impl ProberConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Pod annotation keys carrying per-pod probe overrides.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct AnnotationKeys {
    #[serde(default = "default_target_annotation")]
    pub target: String,
    #[serde(default = "default_module_annotation")]
    pub module: String,
}

impl Default for AnnotationKeys {
    fn default() -> Self {
        Self {
            target: default_target_annotation(),
            module: default_module_annotation(),
        }
    }
}

fn default_scheduler_name() -> String {
    DEFAULT_SCHEDULER_NAME.to_owned()
}

fn default_resync_interval_secs() -> u64 {
    DEFAULT_RESYNC_INTERVAL_SECS
}

fn default_prober_port() -> u16 {
    DEFAULT_PROBER_PORT
}

fn default_probe_timeout_ms() -> u64 {
    DEFAULT_PROBE_TIMEOUT_MS
}

fn default_probe_module() -> String {
    DEFAULT_PROBE_MODULE.to_owned()
}

fn default_target_annotation() -> String {
    PROBE_TARGET_ANNOTATION.to_owned()
}

fn default_module_annotation() -> String {
    PROBE_MODULE_ANNOTATION.to_owned()
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("scheduler_name must not be empty")]
    MissingSchedulerName,
    #[error("prober selector is empty")]
    MissingSelector,
    #[error("prober namespace is empty")]
    MissingNamespace,
    #[error("invalid prober port: {0}")]
    InvalidPort(u16),
    #[error("probe timeout must be greater than zero")]
    InvalidTimeout,
    #[error("resync interval must be greater than zero")]
    InvalidResyncInterval,
}

impl Config {
    #[tracing::instrument(name = "config::Config::from_file", skip_all, fields(
        file_path = ?file_path.as_ref()
    ))]
    pub async fn from_file(file_path: impl AsRef<Path>) -> Result<Self> {
        let file_contents = tokio::fs::read_to_string(file_path.as_ref()).await?;

        let config: Config = serde_yaml::from_str(&file_contents)?;

        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scheduler_name.is_empty() {
            return Err(ConfigError::MissingSchedulerName);
        }

        if self.resync_interval_secs == 0 {
            return Err(ConfigError::InvalidResyncInterval);
        }

        if let StrategyConfig::NetworkLatency(network) = &self.strategy {
            let prober = &network.prober;

            if prober.selector.is_empty() {
                return Err(ConfigError::MissingSelector);
            }
            if prober.namespace.is_empty() {
                return Err(ConfigError::MissingNamespace);
            }
            if prober.port == 0 {
                return Err(ConfigError::InvalidPort(prober.port));
            }
            if prober.timeout_ms == 0 {
                return Err(ConfigError::InvalidTimeout);
            }
        }

        Ok(())
    }

    pub fn resync_interval(&self) -> Duration {
        Duration::from_secs(self.resync_interval_secs)
    }
}
