//! ---
//! opsync_section: "03-remote-service"
//! opsync_subsection: "module"
//! opsync_type: "source"
//! opsync_scope: "code"
//! opsync_description: "Error types for control service requests."
//! opsync_version: "v0.1.0"
//! opsync_owner: "tbd"
//! ---
use std::fmt;

use reqwest::StatusCode;
use thiserror::Error;
use url::Url;

/// Remote resource a fetch was aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Configuration,
    Triggers,
}

impl Resource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Configuration => "configuration",
            Resource::Triggers => "triggers",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure to obtain a configuration delta or a trigger list.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{resource} request for cluster {cluster:?} to {url} failed")]
    Transport {
        resource: Resource,
        cluster: String,
        url: Url,
        #[source]
        source: reqwest::Error,
    },
    #[error("{resource} request for cluster {cluster:?} to {url} returned {status}, expected 200 OK")]
    UnexpectedStatus {
        resource: Resource,
        cluster: String,
        url: Url,
        status: StatusCode,
    },
    #[error("failed to read {resource} response body for cluster {cluster:?} from {url}")]
    Body {
        resource: Resource,
        cluster: String,
        url: Url,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to decode {resource} response for cluster {cluster:?} from {url}")]
    Decode {
        resource: Resource,
        cluster: String,
        url: Url,
        #[source]
        source: serde_json::Error,
    },
}

impl FetchError {
    /// True when the service answered 200 but the payload was unusable.
    pub fn is_decode(&self) -> bool {
        matches!(self, FetchError::Decode { .. })
    }

    /// Short label used for log fields and metric outcomes.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Transport { .. } => "transport",
            FetchError::UnexpectedStatus { .. } => "status",
            FetchError::Body { .. } => "body",
            FetchError::Decode { .. } => "decode",
        }
    }

    pub fn resource(&self) -> Resource {
        match self {
            FetchError::Transport { resource, .. }
            | FetchError::UnexpectedStatus { resource, .. }
            | FetchError::Body { resource, .. }
            | FetchError::Decode { resource, .. } => *resource,
        }
    }

    pub fn cluster(&self) -> &str {
        match self {
            FetchError::Transport { cluster, .. }
            | FetchError::UnexpectedStatus { cluster, .. }
            | FetchError::Body { cluster, .. }
            | FetchError::Decode { cluster, .. } => cluster,
        }
    }

    pub fn url(&self) -> &Url {
        match self {
            FetchError::Transport { url, .. }
            | FetchError::UnexpectedStatus { url, .. }
            | FetchError::Body { url, .. }
            | FetchError::Decode { url, .. } => url,
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            FetchError::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Failure to acknowledge a trigger.
#[derive(Debug, Error)]
pub enum AckError {
    #[error("acknowledgment of trigger {trigger_id} for cluster {cluster:?} to {url} failed")]
    Transport {
        cluster: String,
        trigger_id: i64,
        url: Url,
        #[source]
        source: reqwest::Error,
    },
    #[error("acknowledgment of trigger {trigger_id} for cluster {cluster:?} to {url} returned {status}, expected 200, 201 or 202")]
    UnexpectedStatus {
        cluster: String,
        trigger_id: i64,
        url: Url,
        status: StatusCode,
    },
}

impl AckError {
    pub fn kind(&self) -> &'static str {
        match self {
            AckError::Transport { .. } => "transport",
            AckError::UnexpectedStatus { .. } => "status",
        }
    }

    pub fn trigger_id(&self) -> i64 {
        match self {
            AckError::Transport { trigger_id, .. } | AckError::UnexpectedStatus { trigger_id, .. } => {
                *trigger_id
            }
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            AckError::UnexpectedStatus { status, .. } => Some(*status),
            AckError::Transport { .. } => None,
        }
    }
}

/// Failure to construct a [`crate::ServiceEndpoint`].
#[derive(Debug, Error)]
pub enum EndpointError {
    #[error("service URL {0} cannot carry path segments")]
    InvalidBase(Url),
    #[error("failed to build HTTP client")]
    Client(#[source] reqwest::Error),
}
