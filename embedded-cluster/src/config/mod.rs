//! Distribution cluster configuration.
//!
//! `ClusterConfig` models the parts of the k0s `ClusterConfig` document the
//! bootstrap engine reads or writes. Every other key is carried through
//! untouched in flattened `extra` maps so operator overrides survive a
//! render → patch → write round trip.

pub mod patch;
pub mod render;

pub use patch::{OverrideFragment, collect_overrides, patch};
pub use render::{RenderContext, render};

use embedded_cluster_shared::constants::network;
use embedded_cluster_shared::errors::{ClusterError, ClusterResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Default pause image the distribution reports regardless of config.
pub const DEFAULT_PAUSE_IMAGE: &str = "registry.k8s.io/pause";

pub const API_VERSION: &str = "k0s.k0sproject.io/v1beta1";
pub const KIND: &str = "ClusterConfig";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterConfig {
    pub api_version: String,
    pub kind: String,
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: ClusterSpec,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectMeta {
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterSpec {
    #[serde(default)]
    pub network: NetworkSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<ClusterImages>,
    #[serde(default)]
    pub telemetry: TelemetrySpec,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSpec {
    #[serde(default)]
    pub provider: String,
    #[serde(rename = "podCIDR", default)]
    pub pod_cidr: String,
    #[serde(rename = "serviceCIDR", default)]
    pub service_cidr: String,
    #[serde(
        rename = "nodeLocalLoadBalancing",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub node_local_load_balancing: Option<NodeLocalLoadBalancing>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for NetworkSpec {
    fn default() -> Self {
        Self {
            provider: "kuberouter".to_string(),
            pod_cidr: network::DEFAULT_POD_CIDR.to_string(),
            service_cidr: network::DEFAULT_SERVICE_CIDR.to_string(),
            node_local_load_balancing: None,
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeLocalLoadBalancing {
    #[serde(default)]
    pub enabled: bool,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub envoy_proxy: Option<EnvoyProxy>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvoyProxy {
    #[serde(default)]
    pub image: ImageSpec,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySpec {
    #[serde(default)]
    pub enabled: bool,
}

/// A single image reference in the distribution's `image:version` form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSpec {
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub version: String,
}

impl ImageSpec {
    pub fn new(image: &str, version: &str) -> Self {
        Self {
            image: image.to_string(),
            version: version.to_string(),
        }
    }

    pub fn uri(&self) -> String {
        format!("{}:{}", self.image, self.version)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterImages {
    #[serde(default)]
    pub konnectivity: ImageSpec,
    #[serde(default)]
    pub pushgateway: ImageSpec,
    #[serde(default)]
    pub metricsserver: ImageSpec,
    #[serde(default)]
    pub kubeproxy: ImageSpec,
    #[serde(default)]
    pub coredns: ImageSpec,
    #[serde(default)]
    pub pause: ImageSpec,
    #[serde(default)]
    pub calico: CalicoImages,
    #[serde(default)]
    pub kuberouter: KubeRouterImages,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalicoImages {
    #[serde(default)]
    pub cni: ImageSpec,
    #[serde(default)]
    pub node: ImageSpec,
    #[serde(default)]
    pub kubecontrollers: ImageSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KubeRouterImages {
    #[serde(default)]
    pub cni: ImageSpec,
    #[serde(default)]
    pub cni_installer: ImageSpec,
}

impl Default for CalicoImages {
    fn default() -> Self {
        Self {
            cni: ImageSpec::new("quay.io/k0sproject/calico-cni", "v3.28.1-0"),
            node: ImageSpec::new("quay.io/k0sproject/calico-node", "v3.28.1-0"),
            kubecontrollers: ImageSpec::new(
                "quay.io/k0sproject/calico-kube-controllers",
                "v3.28.1-0",
            ),
        }
    }
}

impl Default for KubeRouterImages {
    fn default() -> Self {
        Self {
            cni: ImageSpec::new("quay.io/k0sproject/kube-router", "v2.1.3-iptables1.8.9-0"),
            cni_installer: ImageSpec::new("quay.io/k0sproject/cni-node", "1.3.0-k0s.0"),
        }
    }
}

/// The distribution's built-in image defaults.
impl Default for ClusterImages {
    fn default() -> Self {
        Self {
            konnectivity: ImageSpec::new(
                "quay.io/k0sproject/apiserver-network-proxy-agent",
                "v0.1.4",
            ),
            pushgateway: ImageSpec::new("quay.io/k0sproject/pushgateway-ttl", "1.4.0-k0s.0"),
            metricsserver: ImageSpec::new("registry.k8s.io/metrics-server/metrics-server", "v0.7.1"),
            kubeproxy: ImageSpec::new("registry.k8s.io/kube-proxy", "v1.29.7"),
            coredns: ImageSpec::new("quay.io/k0sproject/coredns", "1.11.3"),
            pause: ImageSpec::new(DEFAULT_PAUSE_IMAGE, "3.9"),
            calico: CalicoImages::default(),
            kuberouter: KubeRouterImages::default(),
            extra: Map::new(),
        }
    }
}

/// Default envoy image for node-local load balancing.
pub fn default_envoy_image() -> ImageSpec {
    ImageSpec::new("quay.io/k0sproject/envoy-distroless", "v1.30.4")
}

impl ClusterConfig {
    /// The distribution's default configuration for a cluster named `name`.
    pub fn default_for(name: &str) -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ObjectMeta {
                name: name.to_string(),
                extra: Map::new(),
            },
            spec: ClusterSpec {
                network: NetworkSpec::default(),
                images: Some(ClusterImages::default()),
                telemetry: TelemetrySpec { enabled: true },
                extra: Map::new(),
            },
            extra: Map::new(),
        }
    }

    /// Images block, populated with defaults when absent.
    pub fn images_mut(&mut self) -> &mut ClusterImages {
        self.spec.images.get_or_insert_with(ClusterImages::default)
    }

    /// Envoy image used for node-local load balancing, defaulted when unset.
    pub fn envoy_proxy_image(&self) -> ImageSpec {
        self.spec
            .network
            .node_local_load_balancing
            .as_ref()
            .and_then(|nllb| nllb.envoy_proxy.as_ref())
            .map(|envoy| envoy.image.clone())
            .filter(|image| !image.image.is_empty())
            .unwrap_or_else(default_envoy_image)
    }

    pub fn to_yaml(&self) -> ClusterResult<String> {
        serde_yaml::to_string(self)
            .map_err(|e| ClusterError::Config(format!("unable to marshal config: {e}")))
    }

    pub fn from_yaml(raw: &str) -> ClusterResult<Self> {
        serde_yaml::from_str(raw)
            .map_err(|e| ClusterError::Config(format!("unable to unmarshal config: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_shape() {
        let cfg = ClusterConfig::default_for("my-app");
        assert_eq!(cfg.api_version, API_VERSION);
        assert_eq!(cfg.kind, KIND);
        assert_eq!(cfg.metadata.name, "my-app");
        assert!(cfg.spec.images.is_some());
        assert_eq!(
            cfg.spec.images.as_ref().unwrap().pause.uri(),
            "registry.k8s.io/pause:3.9"
        );
    }

    #[test]
    fn test_unknown_keys_survive_round_trip() {
        let raw = r#"
apiVersion: k0s.k0sproject.io/v1beta1
kind: ClusterConfig
metadata:
  name: k0s
spec:
  api:
    address: 10.0.0.5
  network:
    provider: calico
    podCIDR: 10.244.0.0/16
    serviceCIDR: 10.96.0.0/12
    calico:
      mode: vxlan
"#;
        let cfg = ClusterConfig::from_yaml(raw).unwrap();
        assert_eq!(cfg.spec.network.provider, "calico");
        assert!(cfg.spec.images.is_none());

        let back = ClusterConfig::from_yaml(&cfg.to_yaml().unwrap()).unwrap();
        assert_eq!(back, cfg);
        assert_eq!(back.spec.extra["api"]["address"], "10.0.0.5");
        assert_eq!(back.spec.network.extra["calico"]["mode"], "vxlan");
    }

    #[test]
    fn test_images_mut_fills_missing_block() {
        let mut cfg = ClusterConfig::from_yaml(
            "apiVersion: k0s.k0sproject.io/v1beta1\nkind: ClusterConfig\n",
        )
        .unwrap();
        assert!(cfg.spec.images.is_none());
        cfg.images_mut().coredns.version = "x".into();
        assert!(cfg.spec.images.is_some());
    }

    #[test]
    fn test_envoy_image_defaults() {
        let cfg = ClusterConfig::default_for("k0s");
        assert_eq!(cfg.envoy_proxy_image(), default_envoy_image());
    }
}
