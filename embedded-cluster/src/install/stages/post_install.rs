//! Stage: service alias.

use crate::util::{CommandRunner, CommandSpec};
use embedded_cluster_shared::HostLayout;
use embedded_cluster_shared::constants::names;
use embedded_cluster_shared::errors::{ClusterError, ClusterResult};
use std::io::ErrorKind;
use std::path::Path;

/// Alias the distribution's unit under the binary's name and reload systemd.
///
/// `unit` is the controller unit, or the worker unit for worker joins.
pub async fn run(
    runner: &dyn CommandRunner,
    layout: &HostLayout,
    unit: &Path,
    binary_name: &str,
) -> ClusterResult<()> {
    let dir = layout.systemd_dir();
    std::fs::create_dir_all(&dir)
        .map_err(|e| ClusterError::Storage(format!("unable to create systemd dir: {e}")))?;

    let alias = layout.service_alias_path(binary_name);
    match std::fs::symlink_metadata(&alias) {
        Ok(_) => tracing::debug!(alias = %alias.display(), "service alias already present"),
        Err(e) if e.kind() == ErrorKind::NotFound => std::os::unix::fs::symlink(unit, &alias)
            .map_err(|e| {
                ClusterError::Storage(format!("unable to create symlink {}: {e}", alias.display()))
            })?,
        Err(e) => {
            return Err(ClusterError::Storage(format!(
                "unable to inspect {}: {e}",
                alias.display()
            )));
        }
    }

    runner
        .run(&CommandSpec::new(names::SYSTEMCTL).arg("daemon-reload"))
        .await
        .map_err(|e| ClusterError::Internal(format!("unable to reload systemd daemon: {e}")))?;
    Ok(())
}
