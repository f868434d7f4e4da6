//! Host filesystem layout.
//!
//! Every well-known path the bootstrap engine touches hangs off a single
//! host root (normally `/`). Tests point the root at a temporary directory.
//!
//! ```text
//! {root}/
//! ├── etc/
//! │   ├── k0s/
//! │   │   ├── k0s.yaml            # install marker + distribution config
//! │   │   └── join-token          # join token (join only)
//! │   └── systemd/system/
//! │       ├── k0scontroller.service
//! │       ├── k0sworker.service     # worker joins only
//! │       └── {binary}.service    # alias created after install
//! ├── run/k0s/status.sock         # readiness signal
//! ├── usr/local/bin/k0s           # host-managed distribution binary
//! ├── var/lib/embedded-cluster/bin/  # materialized binaries
//! ├── var/lib/k0s/pki/admin.conf  # admin kubeconfig
//! └── var/log/embedded-cluster/   # debug logs
//! ```

use crate::constants::names;
use std::path::{Path, PathBuf};

/// Relative paths under the host root.
pub mod paths {
    pub const K0S_CONFIG: &str = "etc/k0s/k0s.yaml";
    pub const JOIN_TOKEN: &str = "etc/k0s/join-token";
    pub const SYSTEMD_UNITS: &str = "etc/systemd/system";
    pub const STATUS_SOCKET: &str = "run/k0s/status.sock";
    pub const HOST_BIN: &str = "usr/local/bin";
    pub const MATERIALIZED_BIN: &str = "var/lib/embedded-cluster/bin";
    pub const KUBECONFIG: &str = "var/lib/k0s/pki/admin.conf";
    pub const LOGS: &str = "var/log/embedded-cluster";
}

#[derive(Clone, Debug)]
pub struct HostLayout {
    root: PathBuf,
}

impl Default for HostLayout {
    fn default() -> Self {
        Self::new(PathBuf::from("/"))
    }
}

impl HostLayout {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Distribution config. Its existence marks the host as installed.
    pub fn k0s_config_path(&self) -> PathBuf {
        self.root.join(paths::K0S_CONFIG)
    }

    pub fn join_token_path(&self) -> PathBuf {
        self.root.join(paths::JOIN_TOKEN)
    }

    pub fn systemd_dir(&self) -> PathBuf {
        self.root.join(paths::SYSTEMD_UNITS)
    }

    /// Unit file written by the distribution installer.
    pub fn controller_unit_path(&self) -> PathBuf {
        self.systemd_dir().join(names::K0S_CONTROLLER_UNIT)
    }

    /// Unit file written for a worker-only node.
    pub fn worker_unit_path(&self) -> PathBuf {
        self.systemd_dir().join(names::K0S_WORKER_UNIT)
    }

    /// Alias unit named after the installer binary.
    pub fn service_alias_path(&self, binary_name: &str) -> PathBuf {
        self.systemd_dir().join(format!("{binary_name}.service"))
    }

    pub fn status_socket_path(&self) -> PathBuf {
        self.root.join(paths::STATUS_SOCKET)
    }

    /// Host-managed location of the distribution binary.
    pub fn k0s_binary_path(&self) -> PathBuf {
        self.root.join(paths::HOST_BIN).join(names::K0S_BINARY)
    }

    /// Directory binaries are materialized into from the release bundle.
    pub fn bin_dir(&self) -> PathBuf {
        self.root.join(paths::MATERIALIZED_BIN)
    }

    /// Path of a materialized binary.
    pub fn materialized_binary(&self, name: &str) -> PathBuf {
        self.bin_dir().join(name)
    }

    pub fn kubeconfig_path(&self) -> PathBuf {
        self.root.join(paths::KUBECONFIG)
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join(paths::LOGS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout_uses_system_paths() {
        let layout = HostLayout::default();
        assert_eq!(layout.k0s_config_path(), PathBuf::from("/etc/k0s/k0s.yaml"));
        assert_eq!(
            layout.status_socket_path(),
            PathBuf::from("/run/k0s/status.sock")
        );
        assert_eq!(
            layout.k0s_binary_path(),
            PathBuf::from("/usr/local/bin/k0s")
        );
    }

    #[test]
    fn test_layout_is_rooted() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = HostLayout::new(tmp.path().to_path_buf());
        assert!(layout.k0s_config_path().starts_with(tmp.path()));
        assert_eq!(
            layout.service_alias_path("my-app"),
            tmp.path().join("etc/systemd/system/my-app.service")
        );
        assert_eq!(
            layout.worker_unit_path(),
            tmp.path().join("etc/systemd/system/k0sworker.service")
        );
        assert_eq!(
            layout.materialized_binary("k0s"),
            tmp.path().join("var/lib/embedded-cluster/bin/k0s")
        );
    }
}
