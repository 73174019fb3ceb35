//! ---
//! opsync_section: "05-agent-runtime"
//! opsync_subsection: "module"
//! opsync_type: "source"
//! opsync_scope: "code"
//! opsync_description: "Periodic trigger fetch, execute and acknowledge loop."
//! opsync_version: "v0.1.0"
//! opsync_owner: "tbd"
//! ---
use std::sync::Arc;
use std::time::Duration;

use opsync_metrics::AgentMetrics;
use opsync_remote::{RemoteTriggerClient, Trigger};
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::error::{error_chain, RemoteFailure};
use crate::executor::{ExecutionError, TriggerExecutor};
use crate::render::log_trigger;
use crate::schedule::{bounded, shutdown_requested, sleep_or_shutdown};
use crate::settings::LoopSettings;

/// What happened to a single trigger within a batch.
#[derive(Debug)]
pub struct TriggerReport {
    pub trigger: Trigger,
    pub execution: Result<(), ExecutionError>,
    pub ack: Result<(), RemoteFailure>,
}

impl TriggerReport {
    pub fn id(&self) -> i64 {
        self.trigger.id
    }

    pub fn acknowledged(&self) -> bool {
        self.ack.is_ok()
    }
}

/// Result of one trigger tick.
#[derive(Debug)]
pub enum TriggerBatchReport {
    FetchFailed(RemoteFailure),
    /// One report per retrieved trigger, in retrieval order.
    Processed(Vec<TriggerReport>),
}

impl TriggerBatchReport {
    pub fn reports(&self) -> &[TriggerReport] {
        match self {
            TriggerBatchReport::Processed(reports) => reports,
            TriggerBatchReport::FetchFailed(_) => &[],
        }
    }

    /// Ids whose acknowledgment was attempted, in attempt order.
    pub fn attempted_ids(&self) -> Vec<i64> {
        self.reports().iter().map(TriggerReport::id).collect()
    }

    pub fn is_fetch_failure(&self) -> bool {
        matches!(self, TriggerBatchReport::FetchFailed(_))
    }
}

/// Pulls pending triggers on a fixed delay, runs each one and acknowledges it.
pub struct TriggerSyncLoop {
    client: RemoteTriggerClient,
    executor: Arc<dyn TriggerExecutor>,
    cluster: String,
    interval: Duration,
    request_timeout: Duration,
    metrics: AgentMetrics,
}

impl TriggerSyncLoop {
    pub fn new(
        settings: &LoopSettings,
        executor: Arc<dyn TriggerExecutor>,
        metrics: AgentMetrics,
    ) -> Self {
        Self {
            client: RemoteTriggerClient::new(settings.endpoint.clone()),
            executor,
            cluster: settings.cluster.clone(),
            interval: settings.trigger_interval,
            request_timeout: settings.request_timeout,
            metrics,
        }
    }

    /// Fetch once, then execute and acknowledge every trigger in retrieval order.
    ///
    /// Every trigger is acknowledged regardless of its execution result, and a
    /// failure on one trigger never stops the rest of the batch.
    pub async fn tick(&self) -> TriggerBatchReport {
        info!(
            cluster = %self.cluster,
            url = %self.client.endpoint().base(),
            "gathering triggers from service"
        );

        let triggers = match bounded(
            "fetch_triggers",
            self.request_timeout,
            self.client.fetch_triggers(&self.cluster),
        )
        .await
        {
            Ok(triggers) => triggers,
            Err(failure) => {
                error!(
                    operation = "fetch_triggers",
                    cluster = %self.cluster,
                    kind = failure.kind(),
                    error = %error_chain(&failure),
                    "unable to retrieve triggers from the service"
                );
                self.metrics.record_trigger_fetch(failure.kind());
                return TriggerBatchReport::FetchFailed(failure);
            }
        };
        self.metrics.record_trigger_fetch("success");

        info!(cluster = %self.cluster, count = triggers.len(), "triggers for this agent");
        if triggers.is_empty() {
            info!(cluster = %self.cluster, "\tNone");
            return TriggerBatchReport::Processed(Vec::new());
        }
        for trigger in &triggers {
            log_trigger(&self.cluster, trigger);
        }

        info!(cluster = %self.cluster, "performing triggers and acknowledging them");
        let mut reports = Vec::with_capacity(triggers.len());
        for trigger in triggers {
            reports.push(self.process(trigger).await);
        }
        TriggerBatchReport::Processed(reports)
    }

    async fn process(&self, trigger: Trigger) -> TriggerReport {
        let execution = self.executor.execute(&trigger).await;
        self.metrics.record_execution(execution.is_ok());
        if let Err(err) = &execution {
            warn!(
                cluster = %self.cluster,
                trigger_id = trigger.id,
                error = %err,
                "trigger execution failed; acknowledging anyway"
            );
        }

        info!(cluster = %self.cluster, trigger_id = trigger.id, "acknowledging trigger");
        let ack = bounded(
            "acknowledge_trigger",
            self.request_timeout,
            self.client.acknowledge(&self.cluster, trigger.id),
        )
        .await;
        match &ack {
            Ok(()) => {
                self.metrics.record_ack("success");
                info!(cluster = %self.cluster, trigger_id = trigger.id, "trigger has been acknowledged");
            }
            Err(failure) => {
                self.metrics.record_ack(failure.kind());
                error!(
                    operation = "acknowledge_trigger",
                    cluster = %self.cluster,
                    trigger_id = trigger.id,
                    kind = failure.kind(),
                    error = %error_chain(failure),
                    "unable to acknowledge trigger"
                );
            }
        }

        TriggerReport {
            trigger,
            execution,
            ack,
        }
    }

    /// Run ticks until shutdown is signalled. The signal is checked between ticks only.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            cluster = %self.cluster,
            interval_secs = self.interval.as_secs(),
            "gathering triggers each {} second(s)",
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
        info!(cluster = %self.cluster, "trigger loop stopped");
    }
}
