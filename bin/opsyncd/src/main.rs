//! ---
//! opsync_section: "06-daemon"
//! opsync_subsection: "binary"
//! opsync_type: "source"
//! opsync_scope: "code"
//! opsync_description: "Binary entrypoint for the opsync daemon."
//! opsync_version: "v0.1.0"
//! opsync_owner: "tbd"
//! ---
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use opsync_agent::{LoggingExecutor, LoopSettings, Supervisor};
use opsync_common::logging::init_tracing;
use opsync_common::version::VersionInfo;
use opsync_common::{AgentConfig, ConfigOverrides, LoadedAgentConfig};
use opsync_metrics::{new_registry, spawn_http_server, AgentMetrics, DaemonMetrics};
use opsync_remote::{RemoteConfigClient, RemoteTriggerClient};
use opsync_store::{load_bootstrap, ConfigStore};
use tokio::signal;
use tracing::{info, warn};
use url::Url;

const DEFAULT_CONFIG_CANDIDATES: [&str; 2] = ["configs/agent.toml", "config.toml"];

#[derive(Debug, Parser)]
#[command(
    author,
    disable_version_flag = true,
    version = concat!("opsync ", env!("CARGO_PKG_VERSION")),
    about = "Keeps local configuration in sync with a control service and runs remote triggers",
    long_about = None
)]
struct Cli {
    #[arg(long, value_name = "FILE", help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[arg(long, env = "OPSYNC_URL", help = "Override the control service base URL")]
    url: Option<Url>,

    #[arg(long, env = "OPSYNC_CLUSTER", help = "Override the cluster identifier")]
    cluster: Option<String>,

    #[arg(
        long,
        value_name = "SECONDS",
        env = "OPSYNC_CONFIG_INTERVAL",
        help = "Override the configuration poll interval"
    )]
    config_interval: Option<u64>,

    #[arg(
        long,
        value_name = "SECONDS",
        env = "OPSYNC_TRIGGER_INTERVAL",
        help = "Override the trigger poll interval"
    )]
    trigger_interval: Option<u64>,

    #[arg(
        long,
        value_name = "FILE",
        env = "OPSYNC_CONFIGFILE",
        help = "Override the bootstrap configuration file"
    )]
    bootstrap_file: Option<PathBuf>,

    #[arg(
        short = 'V',
        long = "version",
        action = ArgAction::SetTrue,
        help = "Print extended version information and exit"
    )]
    version: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            url: self.url.clone(),
            cluster: self.cluster.clone(),
            config_interval_secs: self.config_interval,
            trigger_interval_secs: self.trigger_interval,
            bootstrap_file: self.bootstrap_file.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum Commands {
    #[command(about = "Run both polling loops until terminated")]
    Run,
    #[command(about = "Validate configuration and the bootstrap file, then exit")]
    Validate,
    #[command(about = "Fetch configuration and triggers once without merging or acknowledging")]
    Probe,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let version = VersionInfo::current();
    if cli.version {
        println!("{}", version.extended());
        return Ok(());
    }

    let load_started = Instant::now();
    let LoadedAgentConfig { config, source } = load_config(&cli)?;
    let load_duration = load_started.elapsed();

    init_tracing("opsyncd", &config.logging)?;
    info!(
        config_path = %source.display(),
        cluster = %config.service.cluster,
        url = %config.service.url,
        "configuration loaded"
    );

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_daemon(config, load_duration, version).await?,
        Commands::Validate => validate(&config, &source)?,
        Commands::Probe => probe(&config).await?,
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<LoadedAgentConfig> {
    let mut loaded = match &cli.config {
        Some(path) => LoadedAgentConfig {
            config: AgentConfig::from_path(path)?,
            source: path.clone(),
        },
        None => AgentConfig::load_with_source(&DEFAULT_CONFIG_CANDIDATES)?,
    };
    loaded.config.apply_overrides(cli.overrides());
    loaded
        .config
        .validate()
        .with_context(|| format!("invalid configuration in {}", loaded.source.display()))?;
    Ok(loaded)
}

async fn run_daemon(config: AgentConfig, load_duration: Duration, version: VersionInfo) -> Result<()> {
    let registry = new_registry();
    let daemon_metrics = DaemonMetrics::new(registry.clone())?;
    daemon_metrics.observe_config_load(load_duration.as_secs_f64());
    daemon_metrics.inc_start();
    daemon_metrics.set_build_info(&version.semver, &version.git_sha, &version.profile);
    let agent_metrics = AgentMetrics::new(registry.clone())?;

    let metrics_server = if config.metrics.enabled {
        let server = spawn_http_server(registry, config.metrics.listen)?;
        info!(address = %server.addr(), "metrics exporter enabled");
        Some(server)
    } else {
        info!("metrics exporter disabled by configuration");
        None
    };

    let settings = LoopSettings::from_config(&config)?;
    let store = Arc::new(ConfigStore::bootstrap(config.bootstrap.file.as_deref()));
    let handle = Supervisor::new(settings, store, Arc::new(LoggingExecutor), agent_metrics).start();

    info!(version = %version.cli_string(), "daemon running; waiting for termination signal");
    shutdown_signal().await;
    info!("termination signal received; shutting down");
    handle.shutdown().await;

    if let Some(server) = metrics_server {
        server.shutdown().await?;
    }
    Ok(())
}

fn validate(config: &AgentConfig, source: &std::path::Path) -> Result<()> {
    println!("Configuration: {}", source.display());
    println!("Service URL: {}", config.service.url);
    println!("Cluster: {}", config.service.cluster);
    println!(
        "Intervals: configuration {}s, triggers {}s, request timeout {}s",
        config.polling.config_interval.as_secs(),
        config.polling.trigger_interval.as_secs(),
        config.service.request_timeout.as_secs()
    );
    if config.metrics.enabled {
        println!("Metrics: {}", config.metrics.listen);
    } else {
        println!("Metrics: disabled");
    }

    match &config.bootstrap.file {
        None => println!("Bootstrap: none (store starts empty)"),
        Some(path) => {
            let delta = load_bootstrap(path)?;
            println!("Bootstrap: {} ({} keys)", path.display(), delta.len());
            for key in delta.keys() {
                println!("\t{key}");
            }
        }
    }
    Ok(())
}

async fn probe(config: &AgentConfig) -> Result<()> {
    let settings = LoopSettings::from_config(config)?;
    let cluster = settings.cluster.as_str();
    let limit = settings.request_timeout;

    let configuration = RemoteConfigClient::new(settings.endpoint.clone());
    let delta = tokio::time::timeout(limit, configuration.fetch(cluster))
        .await
        .map_err(|_| anyhow!("configuration fetch did not complete within {limit:?}"))??;
    println!("Configuration:\n{}", serde_json::to_string_pretty(&delta)?);

    let triggers = RemoteTriggerClient::new(settings.endpoint.clone());
    let pending = tokio::time::timeout(limit, triggers.fetch_triggers(cluster))
        .await
        .map_err(|_| anyhow!("trigger fetch did not complete within {limit:?}"))??;
    println!("Triggers:\n{}", serde_json::to_string_pretty(&pending)?);
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        tokio::select! {
            _ = ctrl_c() => {},
            _ = terminate() => {},
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c().await;
    }
}

async fn ctrl_c() {
    if let Err(err) = signal::ctrl_c().await {
        warn!(?err, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            term.recv().await;
        }
        Err(err) => {
            warn!(?err, "failed to install SIGTERM handler");
            std::future::pending::<()>().await;
        }
    }
}
