//! ---
//! opsync_section: "05-agent-runtime"
//! opsync_subsection: "module"
//! opsync_type: "source"
//! opsync_scope: "code"
//! opsync_description: "Hook invoked for every retrieved trigger."
//! opsync_version: "v0.1.0"
//! opsync_owner: "tbd"
//! ---
use async_trait::async_trait;
use opsync_remote::Trigger;
use thiserror::Error;
use tracing::info;

/// Failure reported by a [`TriggerExecutor`]. The trigger is acknowledged anyway.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("trigger {trigger_id} failed: {message}")]
    Failed { trigger_id: i64, message: String },
}

impl ExecutionError {
    pub fn failed(trigger_id: i64, message: impl Into<String>) -> Self {
        ExecutionError::Failed {
            trigger_id,
            message: message.into(),
        }
    }
}

/// Business logic behind a trigger.
///
/// Triggers are delivered at least once, so implementations must tolerate
/// seeing the same id again on a later poll.
#[async_trait]
pub trait TriggerExecutor: Send + Sync {
    async fn execute(&self, trigger: &Trigger) -> Result<(), ExecutionError>;
}

/// Executor that only records the trigger in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingExecutor;

#[async_trait]
impl TriggerExecutor for LoggingExecutor {
    async fn execute(&self, trigger: &Trigger) -> Result<(), ExecutionError> {
        info!(
            trigger_id = trigger.id,
            kind = %trigger.kind,
            active = trigger.is_active(),
            "performing trigger"
        );
        Ok(())
    }
}
