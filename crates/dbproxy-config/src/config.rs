use crate::merge::load_layered_yaml;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

fn default_interval() -> u64 {
    5
}

fn default_probe_timeout() -> u64 {
    2000
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("command_logs/")
}

fn default_strategy() -> String {
    "round_robin".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSpec {
    pub name: String,
    pub url: String,
    #[serde(default = "one")]
    pub weight: u32,
}

fn one() -> u32 {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthConfig {
    #[serde(default = "default_interval", rename = "intervalSeconds")]
    pub interval_seconds: u64,
    #[serde(default = "default_probe_timeout", rename = "probeTimeoutMillis")]
    pub probe_timeout_millis: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_interval(),
            probe_timeout_millis: default_probe_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProxyConfig {
    pub databases: Vec<DatabaseSpec>,
    #[serde(default)]
    pub health: HealthConfig,
    #[serde(default = "default_log_dir", rename = "commandLogDir")]
    pub command_log_dir: PathBuf,
    #[serde(default = "default_strategy")]
    pub strategy: String,
    /// Hash of the canonicalised, merged config document. Not part of the
    /// YAML schema — filled in by [`ProxyConfig::load`] after deserializing,
    /// for the daemon to log at startup so two runs can be diffed by hash
    /// instead of diffing YAML layers by hand.
    #[serde(skip, default)]
    pub config_hash: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read or parse config: {0}")]
    Load(#[from] anyhow::Error),
    #[error("databases list is empty")]
    NoDatabases,
    #[error("duplicate database name: {0}")]
    DuplicateName(String),
    #[error("unknown strategy: {0}")]
    UnknownStrategy(String),
}

const KNOWN_STRATEGIES: &[&str] = &["round_robin", "weighted_round_robin", "least_time"];

impl ProxyConfig {
    /// Loads and deep-merges one or more layered YAML files, then validates
    /// the merged document against the schema in the configuration
    /// reference (unique database names, non-empty `databases[]`, known
    /// `strategy`).
    pub fn load(paths: &[&Path]) -> Result<Self, ConfigError> {
        let loaded = load_layered_yaml(paths)?;
        let mut config: ProxyConfig =
            serde_json::from_value(loaded.config_json).map_err(|e| ConfigError::Load(e.into()))?;
        config.config_hash = loaded.config_hash;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.databases.is_empty() {
            return Err(ConfigError::NoDatabases);
        }
        let mut seen = HashSet::new();
        for db in &self.databases {
            if !seen.insert(&db.name) {
                return Err(ConfigError::DuplicateName(db.name.clone()));
            }
        }
        if !KNOWN_STRATEGIES.contains(&self.strategy.as_str()) {
            return Err(ConfigError::UnknownStrategy(self.strategy.clone()));
        }
        Ok(())
    }
}
