//! ---
//! opsync_section: "01-common"
//! opsync_subsection: "module"
//! opsync_type: "source"
//! opsync_scope: "code"
//! opsync_description: "Process configuration for the agent daemon."
//! opsync_version: "v0.1.0"
//! opsync_owner: "tbd"
//! ---
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use tracing::debug;
use url::Url;

use crate::logging::LogFormat;

fn default_service_url() -> Url {
    Url::parse("http://localhost:8080").expect("valid default service url")
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_config_interval() -> Duration {
    Duration::from_secs(15)
}

fn default_trigger_interval() -> Duration {
    Duration::from_secs(10)
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

fn default_metrics_listen() -> SocketAddr {
    "127.0.0.1:9899"
        .parse()
        .expect("valid default metrics address")
}

/// Primary configuration object for the agent process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Metadata describing where an [`AgentConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAgentConfig {
    pub config: AgentConfig,
    pub source: PathBuf,
}

/// Values supplied on the command line or through the environment that take
/// precedence over the configuration file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub url: Option<Url>,
    pub cluster: Option<String>,
    pub config_interval_secs: Option<u64>,
    pub trigger_interval_secs: Option<u64>,
    pub bootstrap_file: Option<PathBuf>,
}

impl AgentConfig {
    pub const ENV_CONFIG_PATH: &'static str = "OPSYNC_CONFIG";

    /// Load configuration from disk together with the effective source path.
    ///
    /// The `OPSYNC_CONFIG` environment variable wins over the candidate list.
    /// The result is parsed but not validated; call [`AgentConfig::validate`]
    /// once overrides have been applied.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAgentConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(LoadedAgentConfig {
                    config,
                    source: path,
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(&path)?;
                return Ok(LoadedAgentConfig {
                    config,
                    source: path,
                });
            }
        }

        Err(anyhow!(
            "no configuration files found. inspected: {}",
            candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }

    /// Parse a single configuration file, ignoring `OPSYNC_CONFIG`.
    pub fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        toml::from_str::<AgentConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Apply command line and environment overrides on top of file values.
    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(url) = overrides.url {
            self.service.url = url;
        }
        if let Some(cluster) = overrides.cluster {
            self.service.cluster = cluster;
        }
        if let Some(secs) = overrides.config_interval_secs {
            self.polling.config_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = overrides.trigger_interval_secs {
            self.polling.trigger_interval = Duration::from_secs(secs);
        }
        if let Some(path) = overrides.bootstrap_file {
            self.bootstrap.file = Some(path);
        }
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.service.validate()?;
        self.polling.validate()?;
        Ok(())
    }
}

impl std::str::FromStr for AgentConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        toml::from_str(content).with_context(|| "failed to parse configuration")
    }
}

/// Location of the control service and the identity this agent polls for.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_service_url")]
    pub url: Url,
    #[serde(default)]
    pub cluster: String,
    /// Upper bound for a single remote call, enforced by the polling loops.
    #[serde(default = "default_request_timeout")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub request_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            url: default_service_url(),
            cluster: String::new(),
            request_timeout: default_request_timeout(),
        }
    }
}

impl ServiceConfig {
    pub fn validate(&self) -> Result<()> {
        if !matches!(self.url.scheme(), "http" | "https") {
            return Err(anyhow!(
                "service.url must use http or https, got '{}'",
                self.url
            ));
        }
        if self.url.cannot_be_a_base() {
            return Err(anyhow!("service.url '{}' cannot be used as a base", self.url));
        }
        if self.cluster.trim().is_empty() {
            return Err(anyhow!("service.cluster must not be empty"));
        }
        if self.request_timeout < Duration::from_secs(1) {
            return Err(anyhow!("service.request_timeout must be at least one second"));
        }
        Ok(())
    }
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_config_interval")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub config_interval: Duration,
    #[serde(default = "default_trigger_interval")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub trigger_interval: Duration,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            config_interval: default_config_interval(),
            trigger_interval: default_trigger_interval(),
        }
    }
}

impl PollingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.config_interval < Duration::from_secs(1) {
            return Err(anyhow!("polling.config_interval must be at least one second"));
        }
        if self.trigger_interval < Duration::from_secs(1) {
            return Err(anyhow!("polling.trigger_interval must be at least one second"));
        }
        Ok(())
    }
}

/// Optional JSON document seeding the local configuration store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BootstrapConfig {
    #[serde(default)]
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_metrics_listen")]
    pub listen: SocketAddr,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen: default_metrics_listen(),
        }
    }
}
