//! ---
//! opsync_section: "03-remote-service"
//! opsync_subsection: "module"
//! opsync_type: "source"
//! opsync_scope: "code"
//! opsync_description: "Client for the trigger and acknowledgment endpoints."
//! opsync_version: "v0.1.0"
//! opsync_owner: "tbd"
//! ---
use reqwest::StatusCode;
use tracing::debug;

use crate::error::{AckError, FetchError, Resource};
use crate::http::ServiceEndpoint;
use crate::trigger::Trigger;

/// Statuses the service uses to accept an acknowledgment.
pub const ACK_SUCCESS: [StatusCode; 3] = [StatusCode::OK, StatusCode::CREATED, StatusCode::ACCEPTED];

/// Fetches pending triggers and acknowledges executed ones.
#[derive(Debug, Clone)]
pub struct RemoteTriggerClient {
    endpoint: ServiceEndpoint,
}

impl RemoteTriggerClient {
    pub fn new(endpoint: ServiceEndpoint) -> Self {
        Self { endpoint }
    }

    pub fn endpoint(&self) -> &ServiceEndpoint {
        &self.endpoint
    }

    /// `GET /api/v1/operator/triggers/{cluster}`. Order is preserved.
    pub async fn fetch_triggers(&self, cluster: &str) -> Result<Vec<Trigger>, FetchError> {
        let url = self
            .endpoint
            .url(["api", "v1", "operator", "triggers", cluster]);
        let triggers: Vec<Trigger> = self
            .endpoint
            .get_json(Resource::Triggers, cluster, url)
            .await?;
        debug!(cluster, count = triggers.len(), "triggers received");
        Ok(triggers)
    }

    /// `PUT /api/v1/operator/trigger/{cluster}/ack/{id}` with an empty body.
    pub async fn acknowledge(&self, cluster: &str, trigger_id: i64) -> Result<(), AckError> {
        let id = trigger_id.to_string();
        let url = self
            .endpoint
            .url(["api", "v1", "operator", "trigger", cluster, "ack", id.as_str()]);
        debug!(cluster, trigger_id, %url, "PUT");

        let response = self
            .endpoint
            .client()
            .put(url.clone())
            .send()
            .await
            .map_err(|source| AckError::Transport {
                cluster: cluster.to_string(),
                trigger_id,
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if ACK_SUCCESS.contains(&status) {
            Ok(())
        } else {
            Err(AckError::UnexpectedStatus {
                cluster: cluster.to_string(),
                trigger_id,
                url,
                status,
            })
        }
    }
}
