//! Stage: configuration rendering.
//!
//! Renders the base config, applies embedded then operator overrides and
//! writes the result to the marker path.

use crate::config::{ClusterConfig, RenderContext, collect_overrides, patch, render};
use crate::context::HostContext;
use embedded_cluster_shared::HostLayout;
use embedded_cluster_shared::errors::{ClusterError, ClusterResult};
use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

pub fn render_and_patch(
    host: &HostContext,
    user_overrides: Option<&Path>,
) -> ClusterResult<ClusterConfig> {
    let cfg = render(&RenderContext::new(&host.binary_name)?)?;
    let fragments = collect_overrides(&host.release, user_overrides)?;
    patch(cfg, &fragments)
}

/// Write `cfg` to the marker path, mode 0600.
///
/// Fails if the file already exists.
pub fn write_marker(layout: &HostLayout, cfg: &ClusterConfig) -> ClusterResult<PathBuf> {
    let path = layout.k0s_config_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| ClusterError::Storage(format!("unable to create directory: {e}")))?;
    }

    let data = cfg.to_yaml()?;
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(&path)
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::AlreadyExists => {
                ClusterError::Storage(format!("configuration file {} already exists", path.display()))
            }
            _ => ClusterError::Storage(format!("unable to create config file: {e}")),
        })?;
    file.write_all(data.as_bytes())
        .map_err(|e| ClusterError::Storage(format!("unable to write config file: {e}")))?;

    tracing::debug!(path = %path.display(), "wrote cluster config");
    Ok(path)
}

pub fn run(host: &HostContext, user_overrides: Option<&Path>) -> ClusterResult<PathBuf> {
    let cfg = render_and_patch(host, user_overrides)?;
    write_marker(&host.layout, &cfg)
}
