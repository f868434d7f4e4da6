//! Binary materialization.

use async_trait::async_trait;
use embedded_cluster_shared::HostLayout;
use embedded_cluster_shared::errors::{ClusterError, ClusterResult};
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;

/// Places the binaries the install needs into the host bin directory.
///
/// Must be idempotent: a re-run after a failed install materializes again
/// without complaint.
#[async_trait]
pub trait Materializer: Send + Sync {
    async fn materialize(&self, layout: &HostLayout) -> ClusterResult<()>;
}

/// Copies every file from the release bundle's `bin/` directory.
#[derive(Debug, Clone)]
pub struct BundleMaterializer {
    source: PathBuf,
}

impl BundleMaterializer {
    pub fn new(source: PathBuf) -> Self {
        Self { source }
    }
}

#[async_trait]
impl Materializer for BundleMaterializer {
    async fn materialize(&self, layout: &HostLayout) -> ClusterResult<()> {
        let source = self.source.clone();
        let target = layout.bin_dir();

        tokio::task::spawn_blocking(move || {
            let entries = std::fs::read_dir(&source).map_err(|e| {
                ClusterError::Storage(format!(
                    "release bundle has no binaries at {}: {e}",
                    source.display()
                ))
            })?;
            std::fs::create_dir_all(&target).map_err(|e| {
                ClusterError::Storage(format!("failed to create {}: {e}", target.display()))
            })?;

            for entry in entries {
                let path = entry?.path();
                if !path.is_file() {
                    continue;
                }
                let Some(name) = path.file_name() else {
                    continue;
                };
                let dst = target.join(name);
                std::fs::copy(&path, &dst).map_err(|e| {
                    ClusterError::Storage(format!(
                        "failed to materialize {}: {e}",
                        path.display()
                    ))
                })?;
                std::fs::set_permissions(&dst, std::fs::Permissions::from_mode(0o755))?;
                tracing::debug!(binary = %dst.display(), "materialized binary");
            }
            Ok(())
        })
        .await
        .map_err(|e| ClusterError::Internal(format!("materialize task failed: {e}")))?
    }
}
