//! ---
//! opsync_section: "01-common"
//! opsync_subsection: "module"
//! opsync_type: "source"
//! opsync_scope: "code"
//! opsync_description: "Tracing subscriber bootstrap for the agent daemon."
//! opsync_version: "v0.1.0"
//! opsync_owner: "tbd"
//! ---
use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::daily;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LoggingConfig;

const LOG_ENV: &str = "OPSYNC_LOG";
const DEFAULT_DIRECTIVE: &str = "info";

static GUARDS: OnceCell<[WorkerGuard; 2]> = OnceCell::new();

/// Available log formats for stdout.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    StructuredJson,
    #[default]
    Pretty,
}

/// Pick the event filter: `OPSYNC_LOG`, then `RUST_LOG`, then `info`.
///
/// An unparsable `OPSYNC_LOG` falls back to `info` and the parse error is
/// returned so it can be logged once the subscriber exists.
fn resolve_filter(directive: Option<&str>) -> (EnvFilter, Option<String>) {
    match directive {
        Some(directive) => match EnvFilter::try_new(directive) {
            Ok(filter) => (filter, None),
            Err(err) => (
                EnvFilter::new(DEFAULT_DIRECTIVE),
                Some(format!("{directive:?}: {err}")),
            ),
        },
        None => (
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE)),
            None,
        ),
    }
}

/// Install the global subscriber for `service_name`.
///
/// Stdout carries either pretty or JSON lines. Every event is also written as
/// JSON to a daily file `<prefix>.log` under `logging.directory`, where the
/// prefix defaults to the service name. A second call keeps the first
/// subscriber.
pub fn init_tracing(service_name: &str, config: &LoggingConfig) -> Result<()> {
    std::fs::create_dir_all(&config.directory).with_context(|| {
        format!("failed to create log directory {}", config.directory.display())
    })?;
    let prefix = config.file_prefix.as_deref().unwrap_or(service_name);

    let (file_writer, file_guard) =
        tracing_appender::non_blocking(daily(&config.directory, format!("{prefix}.log")));
    let (stdout_writer, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());

    let directive = std::env::var(LOG_ENV).ok();
    let (filter, rejected) = resolve_filter(directive.as_deref());

    // Configuration and trigger dumps are one event per line; no target keeps their columns aligned.
    let stdout_layer = match config.format {
        LogFormat::StructuredJson => fmt::layer()
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .json()
            .with_writer(stdout_writer)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .with_target(false)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_writer(stdout_writer)
            .boxed(),
    };
    let file_layer = fmt::layer()
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .json()
        .with_writer(file_writer)
        .boxed();

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .is_ok();
    if !installed {
        return Ok(());
    }
    let _ = GUARDS.set([file_guard, stdout_guard]);

    if let Some(rejected) = rejected {
        warn!(variable = LOG_ENV, %rejected, "ignoring invalid log directive; using {DEFAULT_DIRECTIVE}");
    }
    info!(
        service = %service_name,
        log_dir = %config.directory.display(),
        format = ?config.format,
        "tracing initialised"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_directive_falls_back_to_info() {
        let (filter, rejected) = resolve_filter(Some("opsync_agent=[bogus"));
        assert_eq!(filter.to_string(), DEFAULT_DIRECTIVE);
        assert!(rejected.is_some_and(|msg| msg.contains("bogus")));
    }

    #[test]
    fn valid_directive_is_used() {
        let (filter, rejected) = resolve_filter(Some("debug,opsync_remote=trace"));
        assert!(rejected.is_none());
        assert!(filter.to_string().contains("opsync_remote=trace"));
    }

    #[test]
    fn init_creates_log_directory() {
        let dir = tempfile::tempdir().unwrap();
        let config = LoggingConfig {
            directory: dir.path().join("logs"),
            format: LogFormat::StructuredJson,
            file_prefix: Some("test".into()),
        };
        init_tracing("opsync-test", &config).unwrap();
        assert!(config.directory.is_dir());
    }
}
