//! ---
//! opsync_section: "05-agent-runtime"
//! opsync_subsection: "module"
//! opsync_type: "source"
//! opsync_scope: "code"
//! opsync_description: "Polling loops, trigger hook and supervisor."
//! opsync_version: "v0.1.0"
//! opsync_owner: "tbd"
//! ---
//! The agent runtime: two independently scheduled loops sharing one
//! [`opsync_store::ConfigStore`]. Neither loop waits on the other, and a
//! failed remote call only skips the current tick.

pub mod config_sync;
pub mod error;
pub mod executor;
pub mod render;
mod schedule;
pub mod settings;
pub mod supervisor;
pub mod trigger_sync;

pub use config_sync::{ConfigSyncLoop, ConfigTickOutcome};
pub use error::RemoteFailure;
pub use executor::{ExecutionError, LoggingExecutor, TriggerExecutor};
pub use settings::LoopSettings;
pub use supervisor::{Supervisor, SupervisorHandle};
pub use trigger_sync::{TriggerBatchReport, TriggerReport, TriggerSyncLoop};
