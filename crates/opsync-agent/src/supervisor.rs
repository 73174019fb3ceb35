//! ---
//! opsync_section: "05-agent-runtime"
//! opsync_subsection: "module"
//! opsync_type: "source"
//! opsync_scope: "code"
//! opsync_description: "Starts and stops the two polling loops."
//! opsync_version: "v0.1.0"
//! opsync_owner: "tbd"
//! ---
use std::sync::Arc;

use opsync_metrics::AgentMetrics;
use opsync_store::ConfigStore;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::config_sync::ConfigSyncLoop;
use crate::executor::TriggerExecutor;
use crate::settings::LoopSettings;
use crate::trigger_sync::TriggerSyncLoop;

/// Owns everything needed to launch the agent loops.
pub struct Supervisor {
    settings: LoopSettings,
    store: Arc<ConfigStore>,
    executor: Arc<dyn TriggerExecutor>,
    metrics: AgentMetrics,
}

impl Supervisor {
    pub fn new(
        settings: LoopSettings,
        store: Arc<ConfigStore>,
        executor: Arc<dyn TriggerExecutor>,
        metrics: AgentMetrics,
    ) -> Self {
        Self {
            settings,
            store,
            executor,
            metrics,
        }
    }

    /// Spawn both loops as independent tasks on the current runtime.
    pub fn start(self) -> SupervisorHandle {
        let (shutdown, signal) = watch::channel(false);

        let config_loop = ConfigSyncLoop::new(&self.settings, self.store.clone(), self.metrics.clone());
        let trigger_loop =
            TriggerSyncLoop::new(&self.settings, self.executor.clone(), self.metrics.clone());

        let tasks = vec![
            ("configuration", tokio::spawn(config_loop.run(signal.clone()))),
            ("triggers", tokio::spawn(trigger_loop.run(signal))),
        ];
        info!(
            cluster = %self.settings.cluster,
            url = %self.settings.endpoint.base(),
            "agent loops started"
        );

        SupervisorHandle {
            store: self.store,
            shutdown,
            tasks,
        }
    }
}

/// Runtime handle returned by [`Supervisor::start`].
#[derive(Debug)]
pub struct SupervisorHandle {
    store: Arc<ConfigStore>,
    shutdown: watch::Sender<bool>,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
}

impl SupervisorHandle {
    pub fn store(&self) -> Arc<ConfigStore> {
        self.store.clone()
    }

    /// True while at least one loop task is still running.
    pub fn is_running(&self) -> bool {
        self.tasks.iter().any(|(_, task)| !task.is_finished())
    }

    /// Signal both loops and wait for them to finish their current tick.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for (name, task) in self.tasks {
            match task.await {
                Ok(()) => debug!(task = name, "loop joined"),
                Err(err) => error!(task = name, error = %err, "loop join error"),
            }
        }
        info!("agent loops stopped");
    }
}
