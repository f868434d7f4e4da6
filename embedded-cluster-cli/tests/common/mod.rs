#![allow(dead_code)]

use assert_cmd::Command;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

/// A CLI invocation against a throwaway host root and release bundle.
pub struct TestContext {
    pub cmd: Command,
    pub dir: TempDir,
}

impl TestContext {
    /// Another command sharing the same host root.
    pub fn new_cmd(&self) -> Command {
        command(&self.host_root(), &self.release_dir())
    }

    pub fn host_root(&self) -> PathBuf {
        self.dir.path().join("root")
    }

    pub fn release_dir(&self) -> PathBuf {
        self.dir.path().join("release")
    }

    pub fn marker(&self) -> PathBuf {
        self.host_root().join("etc/k0s/k0s.yaml")
    }

    pub fn mark_installed(&self) {
        let marker = self.marker();
        std::fs::create_dir_all(marker.parent().unwrap()).unwrap();
        std::fs::write(marker, "existing").unwrap();
    }
}

fn command(host_root: &Path, release_dir: &Path) -> Command {
    let bin_path = env!("CARGO_BIN_EXE_embedded-cluster");
    let mut cmd = Command::new(bin_path);
    cmd.timeout(Duration::from_secs(30));
    cmd.env("EMBEDDED_CLUSTER_HOST_ROOT", host_root);
    cmd.env("EMBEDDED_CLUSTER_RELEASE_DIR", release_dir);
    for var in ["HTTP_PROXY", "HTTPS_PROXY", "NO_PROXY", "RUST_LOG"] {
        cmd.env_remove(var);
    }
    cmd
}

pub fn embedded_cluster() -> TestContext {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("root")).unwrap();
    std::fs::create_dir_all(dir.path().join("release/bin")).unwrap();
    let cmd = command(&dir.path().join("root"), &dir.path().join("release"));
    TestContext { cmd, dir }
}
