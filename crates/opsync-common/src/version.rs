//! ---
//! opsync_section: "01-common"
//! opsync_subsection: "module"
//! opsync_type: "source"
//! opsync_scope: "code"
//! opsync_description: "Build and version metadata."
//! opsync_version: "v0.1.0"
//! opsync_owner: "tbd"
//! ---
use serde::Serialize;

/// Version metadata reported by `--version` and the build info gauge.
#[derive(Debug, Clone, Serialize)]
pub struct VersionInfo {
    /// Workspace semantic version.
    pub semver: String,
    /// Git commit hash injected by CI through `OPSYNC_GIT_SHA`.
    pub git_sha: String,
    /// Target architecture and operating system.
    pub target: String,
    /// Cargo profile used during compilation.
    pub profile: String,
}

impl VersionInfo {
    #[must_use]
    pub fn current() -> Self {
        Self {
            semver: env!("CARGO_PKG_VERSION").to_owned(),
            git_sha: option_env!("OPSYNC_GIT_SHA").unwrap_or("UNKNOWN").to_owned(),
            target: format!("{}-{}", std::env::consts::ARCH, std::env::consts::OS),
            profile: if cfg!(debug_assertions) {
                "debug".to_owned()
            } else {
                "release".to_owned()
            },
        }
    }

    /// Concise string combining semantic version and git hash.
    #[must_use]
    pub fn cli_string(&self) -> String {
        format!("{} ({})", self.semver, self.git_sha)
    }

    #[must_use]
    pub fn extended(&self) -> String {
        format!(
            "opsync v{} (git {})\nTarget: {}\nProfile: {}",
            self.semver, self.git_sha, self.target, self.profile
        )
    }
}
