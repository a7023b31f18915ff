use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use super::cluster::ClusterConfig;
use super::errors::ConfigError;
use super::logging::LoggingConfig;
use super::server::ServerConfig;
use super::workers::WorkerConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub workers: WorkerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub clusters: Vec<ClusterConfig>,
}

/// Values passed on the command line that take precedence over the file
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub admin_port: Option<u16>,
    pub bind_address: Option<String>,
    pub worker_threads: Option<usize>,
    pub log_level: Option<String>,
}

impl Config {
    /// Load configuration from `config_path` (or defaults when absent) and
    /// apply the CLI overrides on top.
    pub fn load(config_path: Option<&str>, cli_overrides: CliOverrides) -> Result<Self, ConfigError> {
        let mut config = match config_path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(cli_overrides);
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn apply_overrides(&mut self, overrides: CliOverrides) {
        if let Some(port) = overrides.admin_port {
            self.server.admin_port = port;
        }
        if let Some(bind) = overrides.bind_address {
            self.server.bind_address = bind;
        }
        if let Some(threads) = overrides.worker_threads {
            self.workers.threads = threads;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
    }

    /// Validate the whole configuration, including every cluster definition.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers.threads == 0 {
            return Err(ConfigError::Validation(
                "workers.threads must be at least 1".into(),
            ));
        }

        let mut names = HashSet::new();
        for cluster in &self.clusters {
            if cluster.name.trim().is_empty() {
                return Err(ConfigError::Validation("cluster name cannot be empty".into()));
            }
            if !names.insert(cluster.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate cluster name '{}'",
                    cluster.name
                )));
            }
            cluster
                .logical_dns_settings()
                .map_err(|e| ConfigError::InvalidCluster {
                    cluster: cluster.name.clone(),
                    source: Box::new(e),
                })?;
        }

        Ok(())
    }
}
