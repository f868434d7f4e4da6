//! Collaborators shared by install and join.

use crate::addons::{AddonApplier, HaPromoter, ManifestApplier};
use crate::bundle::{BundleMaterializer, Materializer, ReleaseBundle};
use crate::install::RetryPolicy;
use crate::metrics::{HttpMetricsReporter, MetricsReporter};
use crate::preflight::{BinaryPreflightRunner, PreflightRunner};
use crate::terminal::{StdTerminal, Terminal};
use crate::util::{CommandRunner, SystemCommandRunner};
use embedded_cluster_shared::HostLayout;
use embedded_cluster_shared::constants::names;
use embedded_cluster_shared::errors::{ClusterError, ClusterResult};
use std::sync::Arc;

/// Everything a bootstrap run reads from or acts on.
///
/// [`HostContext::system`] wires the real host; tests swap in fakes.
#[derive(Clone)]
pub struct HostContext {
    pub layout: HostLayout,
    pub release: ReleaseBundle,
    /// Name the operator invoked us by
    pub binary_name: String,
    pub version: String,
    pub readiness: RetryPolicy,
    pub runner: Arc<dyn CommandRunner>,
    pub terminal: Arc<dyn Terminal>,
    pub metrics: Arc<dyn MetricsReporter>,
    pub materializer: Arc<dyn Materializer>,
    pub preflights: Arc<dyn PreflightRunner>,
    pub addons: Arc<dyn AddonApplier>,
    pub ha: Arc<dyn HaPromoter>,
}

impl HostContext {
    pub fn system(
        layout: HostLayout,
        release: ReleaseBundle,
        binary_name: impl Into<String>,
    ) -> ClusterResult<Self> {
        let runner: Arc<dyn CommandRunner> = Arc::new(SystemCommandRunner);
        let preflight_bin = layout.materialized_binary(names::PREFLIGHT_BINARY);

        Ok(Self {
            binary_name: binary_name.into(),
            version: crate::VERSION.to_string(),
            readiness: RetryPolicy::default(),
            terminal: Arc::new(StdTerminal),
            metrics: Arc::new(HttpMetricsReporter::new()?),
            materializer: Arc::new(BundleMaterializer::new(release.bin_dir())),
            preflights: Arc::new(BinaryPreflightRunner::new(preflight_bin, runner.clone())),
            addons: Arc::new(ManifestApplier::new(release.addons_dir(), runner.clone())),
            ha: Arc::new(ManifestApplier::new(release.ha_dir(), runner.clone())),
            runner,
            layout,
            release,
        })
    }

    /// Refuse to touch a host that already carries the install marker.
    ///
    /// Only checks for existence; nothing else on the host is read.
    pub fn ensure_not_installed(&self) -> ClusterResult<()> {
        let marker = self.layout.k0s_config_path();
        tracing::debug!(marker = %marker.display(), "checking if already installed");
        match std::fs::symlink_metadata(&marker) {
            Ok(_) => {
                tracing::error!("An installation has been detected on this machine.");
                tracing::info!(
                    "If you want to reinstall you need to remove the existing installation first. \
                     You can do this by running: sudo ./{} node reset",
                    self.binary_name
                );
                Err(ClusterError::AlreadyInstalled {
                    marker: marker.display().to_string(),
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ClusterError::Storage(format!(
                "unable to check if already installed: {e}"
            ))),
        }
    }
}
