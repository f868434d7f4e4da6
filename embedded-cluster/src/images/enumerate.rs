//! Image list filtering.
//!
//! The distribution can enumerate every image a config needs, but its
//! enumerator always reports the distribution's own default pause image
//! instead of the configured one. [`list_images`] takes that raw list and
//! applies the substitution, and drops components that the addon layer
//! manages.

use crate::config::{ClusterConfig, DEFAULT_PAUSE_IMAGE};
use crate::util::{CommandRunner, CommandSpec};
use embedded_cluster_shared::errors::ClusterResult;
use std::path::Path;

/// Components whose images are never listed here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExcludedComponent {
    KubeRouterCni,
    KubeRouterCniInstaller,
    Konnectivity,
    EnvoyProxy,
}

pub const EXCLUDED_COMPONENTS: &[ExcludedComponent] = &[
    ExcludedComponent::KubeRouterCni,
    ExcludedComponent::KubeRouterCniInstaller,
    ExcludedComponent::Konnectivity,
    ExcludedComponent::EnvoyProxy,
];

impl ExcludedComponent {
    /// Image URI of this component in `cfg`.
    pub fn uri(&self, cfg: &ClusterConfig) -> String {
        let images = cfg.spec.images.clone().unwrap_or_default();
        match self {
            ExcludedComponent::KubeRouterCni => images.kuberouter.cni.uri(),
            ExcludedComponent::KubeRouterCniInstaller => images.kuberouter.cni_installer.uri(),
            ExcludedComponent::Konnectivity => images.konnectivity.uri(),
            ExcludedComponent::EnvoyProxy => cfg.envoy_proxy_image().uri(),
        }
    }
}

/// Filter the distribution-reported image list for `cfg`.
pub fn list_images<I>(cfg: &ClusterConfig, upstream: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let excluded: Vec<String> = EXCLUDED_COMPONENTS.iter().map(|c| c.uri(cfg)).collect();
    let configured_pause = cfg.spec.images.clone().unwrap_or_default().pause.uri();

    upstream
        .into_iter()
        .filter(|image| !excluded.contains(image))
        .map(|image| {
            if image.contains(DEFAULT_PAUSE_IMAGE) {
                configured_pause.clone()
            } else {
                image
            }
        })
        .collect()
}

/// Ask the distribution binary for the images `config_path` needs.
pub async fn distribution_images(
    runner: &dyn CommandRunner,
    k0s: &Path,
    config_path: &Path,
) -> ClusterResult<Vec<String>> {
    let cmd = CommandSpec::new(k0s)
        .args(["airgap", "list-images", "--all", "--config"])
        .arg(config_path.display().to_string());
    let stdout = runner.run(&cmd).await?;

    Ok(stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}
