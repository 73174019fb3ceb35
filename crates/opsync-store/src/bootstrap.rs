//! ---
//! opsync_section: "02-configuration-store"
//! opsync_subsection: "module"
//! opsync_type: "source"
//! opsync_scope: "code"
//! opsync_description: "Bootstrap configuration file loading."
//! opsync_version: "v0.1.0"
//! opsync_owner: "tbd"
//! ---
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::delta::ConfigurationDelta;

/// Failure to read the optional bootstrap document. Never fatal to the agent.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("failed to read bootstrap configuration from {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode bootstrap configuration at {path:?}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Read a JSON object document from disk.
pub fn load_bootstrap(path: impl AsRef<Path>) -> Result<ConfigurationDelta, BootstrapError> {
    let path = path.as_ref();
    debug!(path = %path.display(), "reading bootstrap configuration");
    let contents = std::fs::read(path).map_err(|source| BootstrapError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_slice(&contents).map_err(|source| BootstrapError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_json_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seed.json");
        std::fs::write(&path, r#"{"log_level": "info", "retries": 3}"#).unwrap();

        let delta = load_bootstrap(&path).unwrap();
        assert_eq!(delta.get("retries"), Some(&json!(3)));
        assert_eq!(delta.len(), 2);
    }

    #[test]
    fn missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_bootstrap(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, BootstrapError::Read { .. }));
    }

    #[test]
    fn malformed_file_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = load_bootstrap(&path).unwrap_err();
        assert!(matches!(err, BootstrapError::Decode { .. }));
    }
}
