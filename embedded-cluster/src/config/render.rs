//! Base cluster configuration rendering.

use super::{ClusterConfig, ImageSpec};
use crate::images::{Arch, ImageMetadata, metadata};
use embedded_cluster_shared::errors::ClusterResult;

/// Inputs for rendering the base configuration.
#[derive(Debug, Clone)]
pub struct RenderContext {
    /// Cluster name, normally the installer binary name
    pub cluster_name: String,
    pub arch: Arch,
}

impl RenderContext {
    /// Context for the running machine's architecture.
    pub fn new(cluster_name: impl Into<String>) -> ClusterResult<Self> {
        Ok(Self {
            cluster_name: cluster_name.into(),
            arch: Arch::current()?,
        })
    }
}

/// Render the base configuration using the embedded image manifest.
pub fn render(ctx: &RenderContext) -> ClusterResult<ClusterConfig> {
    render_with(ctx, metadata())
}

/// Render the base configuration against an explicit manifest.
pub fn render_with(ctx: &RenderContext, md: &ImageMetadata) -> ClusterResult<ClusterConfig> {
    let mut cfg = ClusterConfig::default_for(&ctx.cluster_name);
    cfg.spec.telemetry.enabled = false;
    cfg.spec.network.provider = "calico".to_string();
    override_images(&mut cfg, md, ctx.arch)?;

    tracing::debug!(
        cluster = %ctx.cluster_name,
        arch = %ctx.arch,
        "rendered base cluster config"
    );
    Ok(cfg)
}

/// Point every managed component at the manifest's images.
fn override_images(cfg: &mut ClusterConfig, md: &ImageMetadata, arch: Arch) -> ClusterResult<()> {
    let resolve = |name: &str| -> ClusterResult<ImageSpec> {
        let image = md.resolve(name, arch)?;
        Ok(ImageSpec {
            image: image.repo,
            version: image.tag,
        })
    };

    // Resolve everything before touching the config so a missing entry
    // leaves it unchanged.
    let coredns = resolve("coredns")?;
    let calico_node = resolve("calico-node")?;
    let calico_cni = resolve("calico-cni")?;
    let calico_controllers = resolve("calico-kube-controllers")?;
    let metrics_server = resolve("metrics-server")?;
    let kube_proxy = resolve("kube-proxy")?;
    let pause = resolve("pause")?;

    let images = cfg.images_mut();
    images.coredns = coredns;
    images.calico.node = calico_node;
    images.calico.cni = calico_cni;
    images.calico.kubecontrollers = calico_controllers;
    images.metricsserver = metrics_server;
    images.kubeproxy = kube_proxy;
    images.pause = pause;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_cluster_shared::errors::ClusterError;

    #[test]
    fn test_render_uses_embedded_manifest() {
        let cfg = render(&RenderContext::new("my-app").unwrap()).unwrap();
        let images = cfg.spec.images.as_ref().unwrap();
        let expected = metadata().resolve("pause", Arch::current().unwrap()).unwrap();

        assert_eq!(cfg.metadata.name, "my-app");
        assert!(!cfg.spec.telemetry.enabled);
        assert_eq!(cfg.spec.network.provider, "calico");
        assert_eq!(images.pause.uri(), expected.uri());
    }

    #[test]
    fn test_render_selects_architecture() {
        let amd = render_with(
            &RenderContext {
                cluster_name: "k0s".into(),
                arch: Arch::Amd64,
            },
            metadata(),
        )
        .unwrap();
        let arm = render_with(
            &RenderContext {
                cluster_name: "k0s".into(),
                arch: Arch::Arm64,
            },
            metadata(),
        )
        .unwrap();

        let amd_images = amd.spec.images.unwrap();
        let arm_images = arm.spec.images.unwrap();
        assert_eq!(amd_images.coredns.image, arm_images.coredns.image);
        assert_ne!(amd_images.coredns.version, arm_images.coredns.version);
    }

    #[test]
    fn test_render_fails_on_missing_image() {
        let md = ImageMetadata::parse(
            "images:\n  coredns:\n    repo: r/coredns\n    tag:\n      amd64: '1'\n",
        )
        .unwrap();
        let err = render_with(
            &RenderContext {
                cluster_name: "k0s".into(),
                arch: Arch::Amd64,
            },
            &md,
        )
        .unwrap_err();
        assert!(matches!(err, ClusterError::MissingImage { .. }));
    }

    #[test]
    fn test_unmanaged_images_keep_defaults() {
        let cfg = render(&RenderContext::new("k0s").unwrap()).unwrap();
        let images = cfg.spec.images.unwrap();
        assert_eq!(
            images.konnectivity.image,
            "quay.io/k0sproject/apiserver-network-proxy-agent"
        );
    }
}
