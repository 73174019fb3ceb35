//! ---
//! opsync_section: "05-agent-runtime"
//! opsync_subsection: "module"
//! opsync_type: "source"
//! opsync_scope: "code"
//! opsync_description: "Runtime settings shared by both polling loops."
//! opsync_version: "v0.1.0"
//! opsync_owner: "tbd"
//! ---
use std::time::Duration;

use opsync_common::AgentConfig;
use opsync_remote::{EndpointError, ServiceEndpoint};

/// Everything the loops need to reach the service and pace themselves.
#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub endpoint: ServiceEndpoint,
    pub cluster: String,
    pub config_interval: Duration,
    pub trigger_interval: Duration,
    /// Upper bound applied by the loops to each remote call.
    pub request_timeout: Duration,
}

impl LoopSettings {
    pub fn from_config(config: &AgentConfig) -> Result<Self, EndpointError> {
        Ok(Self {
            endpoint: ServiceEndpoint::new(config.service.url.clone())?,
            cluster: config.service.cluster.clone(),
            config_interval: config.polling.config_interval,
            trigger_interval: config.polling.trigger_interval,
            request_timeout: config.service.request_timeout,
        })
    }
}
