//! ---
//! opsync_section: "02-configuration-store"
//! opsync_subsection: "module"
//! opsync_type: "source"
//! opsync_scope: "code"
//! opsync_description: "Lock-guarded configuration store and merge algorithm."
//! opsync_version: "v0.1.0"
//! opsync_owner: "tbd"
//! ---
//! Local configuration state for the agent.
//!
//! Once the store holds any key, its key set is fixed: remote deltas may only
//! change values. Introducing a new key means editing the bootstrap file and
//! restarting the agent.

pub mod bootstrap;
pub mod delta;
pub mod store;

pub use bootstrap::{load_bootstrap, BootstrapError};
pub use delta::ConfigurationDelta;
pub use store::{ConfigSnapshot, ConfigStore, MergeMode, MergeOutcome};
