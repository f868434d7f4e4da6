//! Addon layer hooks.
//!
//! Chart and addon logic live outside this crate. The bootstrap only calls
//! the completion hook after install and the promotion hook for HA joins.

use crate::bundle::yaml_files;
use crate::util::{CommandRunner, CommandSpec};
use async_trait::async_trait;
use embedded_cluster_shared::constants::envs;
use embedded_cluster_shared::errors::ClusterResult;
use std::path::PathBuf;
use std::sync::Arc;

/// Cluster access handed to addon hooks.
#[derive(Debug, Clone)]
pub struct AddonContext {
    /// Host-managed distribution binary, used for `k0s kubectl`
    pub k0s: PathBuf,
    pub kubeconfig: PathBuf,
    /// Extra child environment, e.g. proxy settings
    pub envs: Vec<(String, String)>,
}

#[async_trait]
pub trait AddonApplier: Send + Sync {
    /// Completion hook, run once the node is ready.
    async fn outro(&self, ctx: &AddonContext) -> ClusterResult<()>;
}

#[async_trait]
pub trait HaPromoter: Send + Sync {
    /// Turn an existing cluster into a highly available one.
    async fn promote(&self, ctx: &AddonContext) -> ClusterResult<()>;
}

/// Applies every manifest in a directory with `k0s kubectl apply`.
///
/// An absent directory applies nothing.
pub struct ManifestApplier {
    dir: PathBuf,
    runner: Arc<dyn CommandRunner>,
}

impl ManifestApplier {
    pub fn new(dir: PathBuf, runner: Arc<dyn CommandRunner>) -> Self {
        Self { dir, runner }
    }

    async fn apply_all(&self, ctx: &AddonContext) -> ClusterResult<()> {
        let manifests = yaml_files(&self.dir)?;
        for manifest in &manifests {
            let cmd = CommandSpec::new(&ctx.k0s)
                .args(["kubectl", "apply", "-f"])
                .arg(manifest.display().to_string())
                .env(envs::KUBECONFIG, ctx.kubeconfig.display().to_string())
                .envs(ctx.envs.clone());
            self.runner.run(&cmd).await?;
            tracing::debug!(manifest = %manifest.display(), "applied manifest");
        }
        tracing::info!(dir = %self.dir.display(), count = manifests.len(), "applied addon manifests");
        Ok(())
    }
}

#[async_trait]
impl AddonApplier for ManifestApplier {
    async fn outro(&self, ctx: &AddonContext) -> ClusterResult<()> {
        self.apply_all(ctx).await
    }
}

#[async_trait]
impl HaPromoter for ManifestApplier {
    async fn promote(&self, ctx: &AddonContext) -> ClusterResult<()> {
        self.apply_all(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::SystemCommandRunner;
    use std::os::unix::fs::PermissionsExt;

    #[tokio::test]
    async fn test_applies_each_manifest_with_kubeconfig() {
        let tmp = tempfile::tempdir().unwrap();
        let log = tmp.path().join("calls.log");
        let k0s = tmp.path().join("k0s");
        std::fs::write(
            &k0s,
            format!(
                "#!/bin/sh\necho \"$KUBECONFIG $*\" >> {}\n",
                log.display()
            ),
        )
        .unwrap();
        std::fs::set_permissions(&k0s, std::fs::Permissions::from_mode(0o755)).unwrap();

        let dir = tmp.path().join("addons");
        std::fs::create_dir(&dir).unwrap();
        std::fs::write(dir.join("b.yaml"), "kind: B\n").unwrap();
        std::fs::write(dir.join("a.yaml"), "kind: A\n").unwrap();

        let ctx = AddonContext {
            k0s,
            kubeconfig: PathBuf::from("/var/lib/k0s/pki/admin.conf"),
            envs: vec![],
        };
        ManifestApplier::new(dir.clone(), Arc::new(SystemCommandRunner))
            .outro(&ctx)
            .await
            .unwrap();

        let calls = std::fs::read_to_string(&log).unwrap();
        let lines: Vec<&str> = calls.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("/var/lib/k0s/pki/admin.conf kubectl apply -f"));
        assert!(lines[0].ends_with("a.yaml"));
        assert!(lines[1].ends_with("b.yaml"));
    }

    #[tokio::test]
    async fn test_missing_dir_is_noop() {
        let ctx = AddonContext {
            k0s: PathBuf::from("/nonexistent/k0s"),
            kubeconfig: PathBuf::new(),
            envs: vec![],
        };
        ManifestApplier::new(PathBuf::from("/nonexistent/ha"), Arc::new(SystemCommandRunner))
            .promote(&ctx)
            .await
            .unwrap();
    }
}
