//! Error taxonomy for cluster bootstrap.
//!
//! Variants are grouped by how the operator is expected to react:
//! - precondition and validation errors name the offending value and are
//!   never retried
//! - external-process, timeout and storage errors abort the current phase
//! - `PreflightsFailed` and `UserAborted` are terminal signals, not crashes

use std::time::Duration;
use thiserror::Error;

/// Result alias used throughout the workspace.
pub type ClusterResult<T> = Result<T, ClusterError>;

/// Which override layer a patch fragment came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideSource {
    /// Overrides shipped inside the release bundle.
    Embedded,
    /// Overrides supplied by the operator with `--overrides`.
    User,
}

impl std::fmt::Display for OverrideSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverrideSource::Embedded => f.write_str("embedded"),
            OverrideSource::User => f.write_str("user"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ClusterError {
    /// Image name or architecture missing from the embedded manifest.
    #[error("image {name} has no tag for architecture {arch}")]
    MissingImage { name: String, arch: String },

    /// No manifest architecture key for the running machine.
    #[error("unsupported architecture {arch}")]
    UnsupportedArch { arch: String },

    /// An override fragment could not be applied.
    #[error("unable to apply {layer} overrides: {cause}")]
    Patch { layer: OverrideSource, cause: String },

    /// The install marker already exists on this host.
    #[error("an installation has been detected on this machine ({marker})")]
    AlreadyInstalled { marker: String },

    #[error("{command} command must be run as root")]
    NotRoot { command: String },

    /// License and release metadata disagree.
    #[error("{0}")]
    License(String),

    /// The cluster runs a different version than this binary.
    #[error(
        "embedded cluster version mismatch - this binary is version {binary:?}, but the cluster is running version {cluster:?}"
    )]
    VersionMismatch { binary: String, cluster: String },

    /// The node address would be reached through the proxy.
    #[error("no-proxy config {no_proxy:?} does not allow access to local IP {local_ip:?}")]
    ProxyNotExempt { no_proxy: String, local_ip: String },

    /// Host preflights reported failures. The results table has already
    /// been printed, so callers should not print this error again.
    #[error("preflights haven't passed on the host")]
    PreflightsFailed,

    #[error("user aborted")]
    UserAborted,

    /// External process exited non-zero or could not be spawned.
    #[error("command {command:?} failed{}: {stderr}", exit_suffix(.code))]
    Command {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("timeout waiting for {resource} after {waited:?}")]
    Timeout { resource: String, waited: Duration },

    #[error("operation cancelled")]
    Cancelled,

    #[error("http error: {0}")]
    Http(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("network error: {0}")]
    Network(String),

    /// A state machine phase failed; wraps the underlying cause.
    #[error("{phase}: {source}")]
    Phase {
        phase: &'static str,
        #[source]
        source: Box<ClusterError>,
    },

    #[error("internal error: {0}")]
    Internal(String),
}

impl ClusterError {
    /// Wrap this error with the name of the phase it happened in.
    pub fn in_phase(self, phase: &'static str) -> Self {
        ClusterError::Phase {
            phase,
            source: Box::new(self),
        }
    }

    /// The innermost error, skipping phase wrappers.
    pub fn root(&self) -> &ClusterError {
        match self {
            ClusterError::Phase { source, .. } => source.root(),
            other => other,
        }
    }

    /// True when this is (or wraps) the preflight failure sentinel.
    pub fn is_preflights_failed(&self) -> bool {
        matches!(self.root(), ClusterError::PreflightsFailed)
    }
}

fn exit_suffix(code: &Option<i32>) -> String {
    code.map(|c| format!(" with exit code {c}"))
        .unwrap_or_default()
}

impl From<std::io::Error> for ClusterError {
    fn from(err: std::io::Error) -> Self {
        ClusterError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for ClusterError {
    fn from(err: serde_json::Error) -> Self {
        ClusterError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_unwraps_nested_phases() {
        let err = ClusterError::PreflightsFailed
            .in_phase("preflight gating")
            .in_phase("join");
        assert!(err.is_preflights_failed());
        assert!(matches!(err.root(), ClusterError::PreflightsFailed));
    }

    #[test]
    fn test_phase_display_includes_phase_name() {
        let err = ClusterError::Timeout {
            resource: "/run/k0s/status.sock".into(),
            waited: Duration::from_secs(60),
        }
        .in_phase("waiting ready");
        let msg = err.to_string();
        assert!(msg.starts_with("waiting ready: "));
        assert!(msg.contains("/run/k0s/status.sock"));
    }

    #[test]
    fn test_command_display_with_and_without_code() {
        let with_code = ClusterError::Command {
            command: "k0s start".into(),
            code: Some(1),
            stderr: "boom".into(),
        };
        assert!(with_code.to_string().contains("exit code 1"));

        let without = ClusterError::Command {
            command: "k0s start".into(),
            code: None,
            stderr: "killed".into(),
        };
        assert!(!without.to_string().contains("exit code"));
    }

    #[test]
    fn test_non_sentinel_errors() {
        assert!(!ClusterError::UserAborted.is_preflights_failed());
        assert!(
            !ClusterError::Internal("x".into())
                .in_phase("outro")
                .is_preflights_failed()
        );
    }
}
