//! ---
//! opsync_section: "04-observability"
//! opsync_subsection: "module"
//! opsync_type: "source"
//! opsync_scope: "code"
//! opsync_description: "Metrics collection and export utilities."
//! opsync_version: "v0.1.0"
//! opsync_owner: "tbd"
//! ---
use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::{header, HeaderValue, StatusCode};
use axum::routing::get;
use axum::{response::IntoResponse, Router};
use prometheus::{
    GaugeVec, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Shared registry type used across the agent.
pub type SharedRegistry = Arc<Registry>;

/// Produce a new shared registry.
pub fn new_registry() -> SharedRegistry {
    Arc::new(Registry::new())
}

/// Spawn an HTTP server that exposes the registry at `/metrics`.
pub fn spawn_http_server(registry: SharedRegistry, addr: SocketAddr) -> Result<MetricsServer> {
    let app = Router::new().route(
        "/metrics",
        get({
            let registry = registry.clone();
            move || metrics_handler(registry.clone())
        }),
    );

    let std_listener = StdTcpListener::bind(addr)
        .with_context(|| format!("failed to bind metrics listener {}", addr))?;
    std_listener
        .set_nonblocking(true)
        .with_context(|| "failed to configure metrics listener as non-blocking")?;
    let bound = std_listener
        .local_addr()
        .with_context(|| "failed to read metrics listener address")?;
    let listener = TcpListener::from_std(std_listener)
        .with_context(|| "failed to convert std listener into tokio listener")?;

    info!(address = %bound, "metrics server starting");

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let service = app.into_make_service();
    let handle: JoinHandle<Result<()>> = tokio::spawn(async move {
        axum::serve(listener, service)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await
            .context("metrics server encountered an error")?;
        Ok(())
    });

    Ok(MetricsServer {
        addr: bound,
        shutdown: Some(shutdown_tx),
        task: handle,
    })
}

async fn metrics_handler(registry: SharedRegistry) -> impl IntoResponse {
    let families = registry.gather();
    let encoder = TextEncoder::new();
    match encoder.encode_to_string(&families) {
        Ok(body) => (
            StatusCode::OK,
            [(
                header::CONTENT_TYPE,
                HeaderValue::from_static(prometheus::TEXT_FORMAT),
            )],
            body,
        ),
        Err(err) => {
            error!(error = %err, "failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"))],
                String::from("metrics encoding error"),
            )
        }
    }
}

/// Handle to the running HTTP exporter.
#[derive(Debug)]
pub struct MetricsServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<()>>,
}

impl MetricsServer {
    /// Bound address; differs from the requested one when port 0 was used.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Signal shutdown and await task completion.
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        match self.task.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(err),
            Err(join_err) => Err(anyhow::Error::new(join_err)),
        }
    }
}

/// Metrics recorded by the daemon process itself.
#[derive(Clone)]
pub struct DaemonMetrics {
    registry: SharedRegistry,
    starts_total: IntCounter,
    config_load_seconds: Histogram,
    build_info: GaugeVec,
}

impl DaemonMetrics {
    pub fn new(registry: SharedRegistry) -> Result<Self> {
        let starts_total = IntCounter::with_opts(Opts::new(
            "opsyncd_starts_total",
            "Total number of times the opsync daemon has initialised",
        ))?;
        registry.register(Box::new(starts_total.clone()))?;

        let buckets = prometheus::exponential_buckets(0.001, 2.0, 16)
            .context("failed to construct histogram buckets")?;
        let config_load_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "opsyncd_config_load_seconds",
                "Time spent loading and validating process configuration",
            )
            .buckets(buckets),
        )?;
        registry.register(Box::new(config_load_seconds.clone()))?;

        let build_info = GaugeVec::new(
            Opts::new(
                "opsyncd_build_info",
                "Build metadata for the running daemon binary",
            ),
            &["version", "git_sha", "profile"],
        )?;
        registry.register(Box::new(build_info.clone()))?;

        Ok(Self {
            registry,
            starts_total,
            config_load_seconds,
            build_info,
        })
    }

    pub fn registry(&self) -> SharedRegistry {
        self.registry.clone()
    }

    pub fn inc_start(&self) {
        self.starts_total.inc();
    }

    pub fn observe_config_load(&self, seconds: f64) {
        self.config_load_seconds.observe(seconds);
    }

    pub fn set_build_info(&self, version: &str, git_sha: &str, profile: &str) {
        self.build_info
            .with_label_values(&[version, git_sha, profile])
            .set(1.0);
    }
}

/// Counters for the two polling loops.
///
/// Fetch outcomes are `success` or a failure kind (`transport`, `status`,
/// `body`, `decode`, `timeout`).
#[derive(Clone, Debug)]
pub struct AgentMetrics {
    registry: SharedRegistry,
    config_fetches: IntCounterVec,
    config_merges: IntCounterVec,
    keys_dropped: IntCounter,
    store_keys: IntGauge,
    trigger_fetches: IntCounterVec,
    triggers_executed: IntCounterVec,
    trigger_acks: IntCounterVec,
}

impl AgentMetrics {
    pub fn new(registry: SharedRegistry) -> Result<Self> {
        let config_fetches = IntCounterVec::new(
            Opts::new(
                "opsync_config_fetch_total",
                "Configuration fetch attempts by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(config_fetches.clone()))?;

        let config_merges = IntCounterVec::new(
            Opts::new(
                "opsync_config_merges_total",
                "Configuration deltas merged into the store by merge mode",
            ),
            &["mode"],
        )?;
        registry.register(Box::new(config_merges.clone()))?;

        let keys_dropped = IntCounter::with_opts(Opts::new(
            "opsync_config_keys_dropped_total",
            "Delta keys ignored because the store did not already hold them",
        ))?;
        registry.register(Box::new(keys_dropped.clone()))?;

        let store_keys = IntGauge::with_opts(Opts::new(
            "opsync_config_store_keys",
            "Number of keys currently held by the configuration store",
        ))?;
        registry.register(Box::new(store_keys.clone()))?;

        let trigger_fetches = IntCounterVec::new(
            Opts::new(
                "opsync_trigger_fetch_total",
                "Trigger fetch attempts by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(trigger_fetches.clone()))?;

        let triggers_executed = IntCounterVec::new(
            Opts::new(
                "opsync_triggers_executed_total",
                "Triggers handed to the executor by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(triggers_executed.clone()))?;

        let trigger_acks = IntCounterVec::new(
            Opts::new(
                "opsync_trigger_acks_total",
                "Trigger acknowledgments by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(trigger_acks.clone()))?;

        Ok(Self {
            registry,
            config_fetches,
            config_merges,
            keys_dropped,
            store_keys,
            trigger_fetches,
            triggers_executed,
            trigger_acks,
        })
    }

    /// Metrics bound to a private registry, for tests and one-shot commands.
    pub fn detached() -> Result<Self> {
        Self::new(new_registry())
    }

    pub fn registry(&self) -> SharedRegistry {
        self.registry.clone()
    }

    pub fn record_config_fetch(&self, outcome: &str) {
        self.config_fetches.with_label_values(&[outcome]).inc();
    }

    pub fn record_merge(&self, mode: &str, dropped: usize, store_keys: usize) {
        self.config_merges.with_label_values(&[mode]).inc();
        self.keys_dropped.inc_by(dropped as u64);
        self.store_keys.set(store_keys as i64);
    }

    pub fn set_store_keys(&self, count: usize) {
        self.store_keys.set(count as i64);
    }

    pub fn record_trigger_fetch(&self, outcome: &str) {
        self.trigger_fetches.with_label_values(&[outcome]).inc();
    }

    pub fn record_execution(&self, succeeded: bool) {
        let outcome = if succeeded { "success" } else { "failure" };
        self.triggers_executed.with_label_values(&[outcome]).inc();
    }

    pub fn record_ack(&self, outcome: &str) {
        self.trigger_acks.with_label_values(&[outcome]).inc();
    }

    pub fn config_fetch_count(&self, outcome: &str) -> u64 {
        self.config_fetches.with_label_values(&[outcome]).get()
    }

    pub fn merge_count(&self, mode: &str) -> u64 {
        self.config_merges.with_label_values(&[mode]).get()
    }

    pub fn dropped_key_count(&self) -> u64 {
        self.keys_dropped.get()
    }

    pub fn store_key_count(&self) -> i64 {
        self.store_keys.get()
    }

    pub fn trigger_fetch_count(&self, outcome: &str) -> u64 {
        self.trigger_fetches.with_label_values(&[outcome]).get()
    }

    pub fn execution_count(&self, succeeded: bool) -> u64 {
        let outcome = if succeeded { "success" } else { "failure" };
        self.triggers_executed.with_label_values(&[outcome]).get()
    }

    pub fn ack_count(&self, outcome: &str) -> u64 {
        self.trigger_acks.with_label_values(&[outcome]).get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_and_daemon_metrics_share_a_registry() {
        let registry = new_registry();
        let agent = AgentMetrics::new(registry.clone()).unwrap();
        let daemon = DaemonMetrics::new(registry.clone()).unwrap();

        agent.record_config_fetch("success");
        agent.record_merge("seeded", 2, 5);
        agent.record_ack("status");
        daemon.inc_start();

        assert_eq!(agent.config_fetch_count("success"), 1);
        assert_eq!(agent.merge_count("seeded"), 1);
        assert_eq!(agent.dropped_key_count(), 2);
        assert_eq!(agent.store_key_count(), 5);
        assert_eq!(agent.ack_count("status"), 1);

        let names: Vec<String> = registry
            .gather()
            .iter()
            .map(|family| family.get_name().to_string())
            .collect();
        assert!(names.contains(&"opsync_config_merges_total".to_string()));
        assert!(names.contains(&"opsyncd_starts_total".to_string()));
    }

    #[test]
    fn registering_twice_fails() {
        let registry = new_registry();
        AgentMetrics::new(registry.clone()).unwrap();
        assert!(AgentMetrics::new(registry).is_err());
    }

    #[tokio::test]
    async fn serves_metrics_over_http() {
        let registry = new_registry();
        let agent = AgentMetrics::new(registry.clone()).unwrap();
        agent.record_trigger_fetch("success");

        let server = spawn_http_server(registry, "127.0.0.1:0".parse().unwrap()).unwrap();
        let response = reqwest::get(format!("http://{}/metrics", server.addr()))
            .await
            .unwrap();
        assert_eq!(
            response.headers()[reqwest::header::CONTENT_TYPE],
            prometheus::TEXT_FORMAT
        );
        let body = response.text().await.unwrap();

        assert!(body.contains("opsync_trigger_fetch_total{outcome=\"success\"} 1"));
        server.shutdown().await.unwrap();
    }
}
