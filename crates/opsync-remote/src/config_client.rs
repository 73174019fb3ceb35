//! ---
//! opsync_section: "03-remote-service"
//! opsync_subsection: "module"
//! opsync_type: "source"
//! opsync_scope: "code"
//! opsync_description: "Client for the configuration endpoint."
//! opsync_version: "v0.1.0"
//! opsync_owner: "tbd"
//! ---
use opsync_store::ConfigurationDelta;
use tracing::debug;

use crate::error::{FetchError, Resource};
use crate::http::ServiceEndpoint;

/// Fetches configuration deltas from `GET /api/v1/operator/configuration/{cluster}`.
#[derive(Debug, Clone)]
pub struct RemoteConfigClient {
    endpoint: ServiceEndpoint,
}

impl RemoteConfigClient {
    pub fn new(endpoint: ServiceEndpoint) -> Self {
        Self { endpoint }
    }

    pub fn endpoint(&self) -> &ServiceEndpoint {
        &self.endpoint
    }

    pub async fn fetch(&self, cluster: &str) -> Result<ConfigurationDelta, FetchError> {
        let url = self
            .endpoint
            .url(["api", "v1", "operator", "configuration", cluster]);
        let delta: ConfigurationDelta = self
            .endpoint
            .get_json(Resource::Configuration, cluster, url)
            .await?;
        debug!(cluster, keys = delta.len(), "configuration delta received");
        Ok(delta)
    }
}
