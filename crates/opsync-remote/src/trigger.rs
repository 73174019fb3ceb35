//! ---
//! opsync_section: "03-remote-service"
//! opsync_subsection: "module"
//! opsync_type: "source"
//! opsync_scope: "code"
//! opsync_description: "Trigger records delivered by the control service."
//! opsync_version: "v0.1.0"
//! opsync_owner: "tbd"
//! ---
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DefaultOnNull};

/// A remotely issued one-shot command.
///
/// Only `id` is required on the wire; every other field takes its zero value
/// when absent or `null`. The same id can be delivered again on a later poll.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    pub id: i64,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub cluster: String,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub reason: String,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub link: String,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub triggered_at: String,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub triggered_by: String,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub parameters: String,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub active: i64,
}

impl Trigger {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    pub fn is_active(&self) -> bool {
        self.active != 0
    }
}
