//! Release bundle shipped alongside the installer binary.
//!
//! ```text
//! {release_dir}/
//! ├── bin/                    # binaries to materialize (k0s, kubectl-preflight)
//! ├── cluster-config.yaml     # embedded Config with unsupported overrides
//! ├── channel-release.yaml    # app slug / channel the binary was built for
//! ├── host-preflights/*.yaml  # HostPreflight documents (templated)
//! ├── addons/*.yaml           # manifests applied by the outro
//! └── ha/*.yaml               # manifests applied on HA promotion
//! ```
//!
//! Every piece is optional except `bin/`, which materialization requires.

pub mod materialize;

pub use materialize::{BundleMaterializer, Materializer};

use embedded_cluster_shared::constants::envs;
use embedded_cluster_shared::errors::{ClusterError, ClusterResult};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Bundle layout names.
pub mod files {
    pub const BIN_DIR: &str = "bin";
    pub const CLUSTER_CONFIG: &str = "cluster-config.yaml";
    pub const CHANNEL_RELEASE: &str = "channel-release.yaml";
    pub const HOST_PREFLIGHTS_DIR: &str = "host-preflights";
    pub const ADDONS_DIR: &str = "addons";
    pub const HA_DIR: &str = "ha";
}

/// `Config` document carrying unsupported distribution overrides.
///
/// Used both for the embedded config and for the operator's `--overrides`
/// file.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct EmbeddedClusterConfig {
    #[serde(default)]
    pub spec: EmbeddedClusterSpec,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddedClusterSpec {
    #[serde(default)]
    pub unsupported_overrides: UnsupportedOverrides,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct UnsupportedOverrides {
    /// Raw YAML patch for the distribution config
    #[serde(default)]
    pub k0s: String,
}

impl EmbeddedClusterConfig {
    pub fn parse(raw: &str) -> ClusterResult<Self> {
        serde_yaml::from_str(raw).map_err(|e| ClusterError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> ClusterResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ClusterError::Storage(format!("unable to read {}: {e}", path.display()))
        })?;
        Self::parse(&raw)
    }

    pub fn k0s_overrides(&self) -> &str {
        &self.spec.unsupported_overrides.k0s
    }
}

/// Channel the binary was built for.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChannelRelease {
    pub app_slug: String,
    #[serde(rename = "channelID")]
    pub channel_id: String,
    #[serde(default)]
    pub channel_slug: String,
    #[serde(default)]
    pub version_label: String,
}

#[derive(Debug, Clone)]
pub struct ReleaseBundle {
    dir: PathBuf,
}

impl ReleaseBundle {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Bundle from `EMBEDDED_CLUSTER_RELEASE_DIR`, else `release/` next to
    /// the running executable.
    pub fn locate() -> ClusterResult<Self> {
        if let Ok(dir) = std::env::var(envs::RELEASE_DIR) {
            return Ok(Self::new(PathBuf::from(dir)));
        }

        let exe = std::env::current_exe()
            .map_err(|e| ClusterError::Internal(format!("unable to locate executable: {e}")))?;
        let dir = exe
            .parent()
            .map(|p| p.join("release"))
            .ok_or_else(|| ClusterError::Internal("executable has no parent dir".into()))?;
        Ok(Self::new(dir))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.dir.join(files::BIN_DIR)
    }

    pub fn addons_dir(&self) -> PathBuf {
        self.dir.join(files::ADDONS_DIR)
    }

    pub fn ha_dir(&self) -> PathBuf {
        self.dir.join(files::HA_DIR)
    }

    /// Embedded override config, if the release ships one.
    pub fn embedded_config(&self) -> ClusterResult<Option<EmbeddedClusterConfig>> {
        self.read_optional(files::CLUSTER_CONFIG)?
            .map(|raw| {
                EmbeddedClusterConfig::parse(&raw).map_err(|e| {
                    ClusterError::Config(format!("unable to get embedded cluster config: {e}"))
                })
            })
            .transpose()
    }

    /// Channel release metadata, if the release ships one.
    pub fn channel_release(&self) -> ClusterResult<Option<ChannelRelease>> {
        self.read_optional(files::CHANNEL_RELEASE)?
            .map(|raw| {
                serde_yaml::from_str(&raw).map_err(|e| {
                    ClusterError::Config(format!("failed to get release from binary: {e}"))
                })
            })
            .transpose()
    }

    /// Raw host preflight documents, sorted by file name.
    pub fn host_preflight_documents(&self) -> ClusterResult<Vec<String>> {
        yaml_files(&self.dir.join(files::HOST_PREFLIGHTS_DIR))?
            .iter()
            .map(|path| {
                std::fs::read_to_string(path).map_err(|e| {
                    ClusterError::Storage(format!("unable to read {}: {e}", path.display()))
                })
            })
            .collect()
    }

    fn read_optional(&self, name: &str) -> ClusterResult<Option<String>> {
        let path = self.dir.join(name);
        match std::fs::read_to_string(&path) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ClusterError::Storage(format!(
                "unable to read {}: {e}",
                path.display()
            ))),
        }
    }
}

/// `*.yaml` / `*.yml` files in `dir`, sorted. A missing dir yields none.
pub fn yaml_files(dir: &Path) -> ClusterResult<Vec<PathBuf>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(ClusterError::Storage(format!(
                "unable to list {}: {e}",
                dir.display()
            )));
        }
    };

    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let is_yaml = path
            .extension()
            .is_some_and(|ext| ext == "yaml" || ext == "yml");
        if is_yaml && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
