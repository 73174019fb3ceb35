//! ---
//! opsync_section: "05-agent-runtime"
//! opsync_subsection: "module"
//! opsync_type: "source"
//! opsync_scope: "code"
//! opsync_description: "Failures observed by the polling loops."
//! opsync_version: "v0.1.0"
//! opsync_owner: "tbd"
//! ---
use std::error::Error as StdError;
use std::time::Duration;

use opsync_remote::{AckError, FetchError};
use thiserror::Error;

/// A remote call that did not produce a usable result within one tick.
#[derive(Debug, Error)]
pub enum RemoteFailure {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Ack(#[from] AckError),
    #[error("{operation} did not complete within {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },
}

impl RemoteFailure {
    /// Metric and log label: `timeout` or the underlying error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            RemoteFailure::Fetch(err) => err.kind(),
            RemoteFailure::Ack(err) => err.kind(),
            RemoteFailure::Timeout { .. } => "timeout",
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, RemoteFailure::Timeout { .. })
    }
}

/// Render an error and its sources as `outer: inner: root`.
pub fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}
