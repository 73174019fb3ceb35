//! ---
//! opsync_section: "01-common"
//! opsync_subsection: "module"
//! opsync_type: "source"
//! opsync_scope: "code"
//! opsync_description: "Shared primitives for the agent workspace."
//! opsync_version: "v0.1.0"
//! opsync_owner: "tbd"
//! ---
//! Shared primitives for the opsync workspace: process configuration,
//! tracing bootstrap, and version metadata.

pub mod config;
pub mod logging;
pub mod version;

pub use config::{
    AgentConfig, BootstrapConfig, ConfigOverrides, LoadedAgentConfig, LoggingConfig,
    MetricsConfig, PollingConfig, ServiceConfig,
};
pub use logging::{init_tracing, LogFormat};
pub use version::VersionInfo;
