//! Stage: distribution install and start.
//!
//! Proxy variables reach k0s only through the child's environment.

use crate::join::JoinCommand;
use crate::util::{CommandRunner, CommandSpec};
use embedded_cluster_shared::HostLayout;
use embedded_cluster_shared::constants::names;
use embedded_cluster_shared::errors::{ClusterError, ClusterResult};
use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

/// Move the materialized k0s binary to its well-known location.
pub fn relocate_binary(layout: &HostLayout) -> ClusterResult<()> {
    let src = layout.materialized_binary(names::K0S_BINARY);
    let dst = layout.k0s_binary_path();
    if let Some(parent) = dst.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| ClusterError::Storage(format!("unable to create directory: {e}")))?;
    }

    match std::fs::rename(&src, &dst) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::CrossesDevices => {
            std::fs::copy(&src, &dst)
                .and_then(|_| std::fs::remove_file(&src))
                .map_err(|e| ClusterError::Storage(format!("unable to move k0s binary: {e}")))?;
        }
        Err(e) => {
            return Err(ClusterError::Storage(format!(
                "unable to move {} to {}: {e}",
                src.display(),
                dst.display()
            )));
        }
    }
    tracing::debug!(path = %dst.display(), "installed k0s binary");
    Ok(())
}

/// `k0s install controller` for a fresh cluster, then `k0s start`.
pub async fn install_controller(
    runner: &dyn CommandRunner,
    layout: &HostLayout,
    envs: &[(String, String)],
) -> ClusterResult<()> {
    relocate_binary(layout)?;
    let k0s = layout.k0s_binary_path();
    let marker = layout.k0s_config_path();

    let install = CommandSpec::new(&k0s)
        .args(["install", "controller", "--enable-worker", "--no-taints", "-c"])
        .arg(marker.display().to_string())
        .envs(envs.iter().cloned());
    runner.run(&install).await?;
    start(runner, &k0s, envs).await
}

/// Join flavour: persists the token and reuses the flags from the join command.
pub async fn install_join(
    runner: &dyn CommandRunner,
    layout: &HostLayout,
    cmd: &JoinCommand,
    envs: &[(String, String)],
) -> ClusterResult<()> {
    relocate_binary(layout)?;
    write_token(&layout.join_token_path(), &cmd.k0s_token)?;

    let k0s = layout.k0s_binary_path();
    let install = CommandSpec::new(&k0s)
        .args(join_args(layout, cmd))
        .envs(envs.iter().cloned());
    runner.run(&install).await?;
    start(runner, &k0s, envs).await
}

/// Arguments for the join install, without the program.
///
/// The first field of the join command names the binary and is dropped.
pub fn join_args(layout: &HostLayout, cmd: &JoinCommand) -> Vec<String> {
    let mut args: Vec<String> = cmd
        .k0s_join_command
        .split_whitespace()
        .skip(1)
        .map(str::to_string)
        .collect();
    args.push("--token-file".to_string());
    args.push(layout.join_token_path().display().to_string());
    if cmd.is_controller() {
        args.push("-c".to_string());
        args.push(layout.k0s_config_path().display().to_string());
    }
    args
}

fn write_token(path: &Path, token: &str) -> ClusterResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| ClusterError::Storage(format!("unable to create directory: {e}")))?;
    }
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
        .map_err(|e| ClusterError::Storage(format!("unable to create join token file: {e}")))?;
    file.write_all(token.as_bytes())
        .map_err(|e| ClusterError::Storage(format!("unable to write join token file: {e}")))
}

async fn start(runner: &dyn CommandRunner, k0s: &Path, envs: &[(String, String)]) -> ClusterResult<()> {
    runner
        .run(&CommandSpec::new(k0s).arg("start").envs(envs.iter().cloned()))
        .await?;
    Ok(())
}
