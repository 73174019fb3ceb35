//! ---
//! opsync_section: "05-agent-runtime"
//! opsync_subsection: "module"
//! opsync_type: "source"
//! opsync_scope: "code"
//! opsync_description: "Fixed-delay pacing and cancellation helpers."
//! opsync_version: "v0.1.0"
//! opsync_owner: "tbd"
//! ---
use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::timeout;

use crate::error::RemoteFailure;

pub(crate) fn shutdown_requested(shutdown: &watch::Receiver<bool>) -> bool {
    *shutdown.borrow()
}

/// Sleep for `delay` unless shutdown is signalled first. Returns `true` on shutdown.
pub(crate) async fn sleep_or_shutdown(
    delay: Duration,
    shutdown: &mut watch::Receiver<bool>,
) -> bool {
    if shutdown_requested(shutdown) {
        return true;
    }
    tokio::select! {
        _ = tokio::time::sleep(delay) => false,
        changed = shutdown.changed() => match changed {
            Ok(()) => shutdown_requested(shutdown),
            // Sender dropped.
            Err(_) => true,
        },
    }
}

/// Bound a remote call, mapping an elapsed deadline to [`RemoteFailure::Timeout`].
pub(crate) async fn bounded<T, E, F>(
    operation: &'static str,
    after: Duration,
    call: F,
) -> Result<T, RemoteFailure>
where
    F: Future<Output = Result<T, E>>,
    E: Into<RemoteFailure>,
{
    match timeout(after, call).await {
        Ok(result) => result.map_err(Into::into),
        Err(_) => Err(RemoteFailure::Timeout { operation, after }),
    }
}
