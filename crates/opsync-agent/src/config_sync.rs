//! ---
//! opsync_section: "05-agent-runtime"
//! opsync_subsection: "module"
//! opsync_type: "source"
//! opsync_scope: "code"
//! opsync_description: "Periodic configuration fetch-and-merge loop."
//! opsync_version: "v0.1.0"
//! opsync_owner: "tbd"
//! ---
use std::sync::Arc;
use std::time::Duration;

use opsync_metrics::AgentMetrics;
use opsync_remote::RemoteConfigClient;
use opsync_store::{ConfigStore, MergeOutcome};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::error::{error_chain, RemoteFailure};
use crate::render::log_configuration;
use crate::schedule::{bounded, shutdown_requested, sleep_or_shutdown};
use crate::settings::LoopSettings;

/// Result of one configuration tick.
#[derive(Debug)]
pub enum ConfigTickOutcome {
    Merged(MergeOutcome),
    Failed(RemoteFailure),
}

impl ConfigTickOutcome {
    pub fn is_merged(&self) -> bool {
        matches!(self, ConfigTickOutcome::Merged(_))
    }

    pub fn merge(&self) -> Option<&MergeOutcome> {
        match self {
            ConfigTickOutcome::Merged(outcome) => Some(outcome),
            ConfigTickOutcome::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&RemoteFailure> {
        match self {
            ConfigTickOutcome::Failed(failure) => Some(failure),
            ConfigTickOutcome::Merged(_) => None,
        }
    }
}

/// Pulls configuration deltas on a fixed delay and merges them into the store.
pub struct ConfigSyncLoop {
    client: RemoteConfigClient,
    store: Arc<ConfigStore>,
    cluster: String,
    interval: Duration,
    request_timeout: Duration,
    metrics: AgentMetrics,
}

impl ConfigSyncLoop {
    pub fn new(settings: &LoopSettings, store: Arc<ConfigStore>, metrics: AgentMetrics) -> Self {
        Self {
            client: RemoteConfigClient::new(settings.endpoint.clone()),
            store,
            cluster: settings.cluster.clone(),
            interval: settings.config_interval,
            request_timeout: settings.request_timeout,
            metrics,
        }
    }

    pub fn store(&self) -> &Arc<ConfigStore> {
        &self.store
    }

    /// Fetch once and merge on success. A failed fetch leaves the store untouched.
    pub async fn tick(&self) -> ConfigTickOutcome {
        info!(
            cluster = %self.cluster,
            url = %self.client.endpoint().base(),
            "gathering configuration from service"
        );

        let delta = match bounded(
            "fetch_configuration",
            self.request_timeout,
            self.client.fetch(&self.cluster),
        )
        .await
        {
            Ok(delta) => delta,
            Err(failure) => {
                error!(
                    operation = "fetch_configuration",
                    cluster = %self.cluster,
                    kind = failure.kind(),
                    error = %error_chain(&failure),
                    "unable to retrieve configuration from the service"
                );
                self.metrics.record_config_fetch(failure.kind());
                return ConfigTickOutcome::Failed(failure);
            }
        };
        self.metrics.record_config_fetch("success");
        log_configuration("Retrieved configuration", &self.cluster, delta.iter());

        let outcome = self.store.merge(delta);
        let snapshot = self.store.snapshot();
        self.metrics
            .record_merge(outcome.mode.as_str(), outcome.dropped.len(), snapshot.len());

        if !outcome.dropped.is_empty() {
            warn!(
                cluster = %self.cluster,
                revision = outcome.revision,
                dropped = ?outcome.dropped,
                "ignored keys unknown to the local configuration; add them to the bootstrap file and restart to track them"
            );
        }
        debug!(
            cluster = %self.cluster,
            mode = outcome.mode.as_str(),
            applied = outcome.applied.len(),
            revision = outcome.revision,
            "configuration merged"
        );
        log_configuration("Updated configuration", &self.cluster, snapshot.iter());

        ConfigTickOutcome::Merged(outcome)
    }

    /// Run ticks until shutdown is signalled. The signal is checked between ticks only.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let original = self.store.snapshot();
        self.metrics.set_store_keys(original.len());
        log_configuration("Original configuration", &self.cluster, original.iter());
        info!(
            cluster = %self.cluster,
            interval_secs = self.interval.as_secs(),
            "gathering configuration each {} second(s)",
            self.interval.as_secs()
        );

        loop {
            if shutdown_requested(&shutdown) {
                break;
            }
            self.tick().await;
            if sleep_or_shutdown(self.interval, &mut shutdown).await {
                break;
            }
        }
        info!(cluster = %self.cluster, "configuration loop stopped");
    }
}
