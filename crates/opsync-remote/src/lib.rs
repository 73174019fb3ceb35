//! ---
//! opsync_section: "03-remote-service"
//! opsync_subsection: "module"
//! opsync_type: "source"
//! opsync_scope: "code"
//! opsync_description: "HTTP clients for the control service."
//! opsync_version: "v0.1.0"
//! opsync_owner: "tbd"
//! ---
//! Clients for the control service wire contract:
//!
//! | Operation | Method | Path |
//! |---|---|---|
//! | fetch configuration | GET | `/api/v1/operator/configuration/{cluster}` |
//! | fetch triggers | GET | `/api/v1/operator/triggers/{cluster}` |
//! | acknowledge trigger | PUT | `/api/v1/operator/trigger/{cluster}/ack/{id}` |
//!
//! Neither client applies timeouts or retries; callers bound each request.

pub mod config_client;
pub mod error;
pub mod http;
pub mod trigger;
pub mod trigger_client;

pub use config_client::RemoteConfigClient;
pub use error::{AckError, EndpointError, FetchError, Resource};
pub use http::ServiceEndpoint;
pub use trigger::Trigger;
pub use trigger_client::{RemoteTriggerClient, ACK_SUCCESS};
