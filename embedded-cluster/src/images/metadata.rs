//! Embedded image manifest.
//!
//! The manifest is compiled into the binary and parsed once per process.
//! Entry points call [`load`] before touching the host so a malformed
//! manifest fails at startup. [`metadata`] panics if that step was skipped
//! and the manifest is broken.

use embedded_cluster_shared::errors::{ClusterError, ClusterResult};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

const EMBEDDED_MANIFEST: &str = include_str!("../../static/metadata.yaml");

static METADATA: LazyLock<Result<ImageMetadata, String>> =
    LazyLock::new(|| ImageMetadata::parse(EMBEDDED_MANIFEST).map_err(|e| e.to_string()));

/// Parse the embedded manifest, failing if it is malformed.
pub fn load() -> ClusterResult<&'static ImageMetadata> {
    METADATA.as_ref().map_err(|e| {
        ClusterError::Config(format!("unable to unmarshal embedded image metadata: {e}"))
    })
}

/// Process-wide image metadata. Read-only after first access.
pub fn metadata() -> &'static ImageMetadata {
    match load() {
        Ok(md) => md,
        Err(e) => panic!("{e}"),
    }
}

/// Architecture key used in the manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    Amd64,
    Arm64,
}

impl Arch {
    /// Architecture this binary was built for.
    pub fn current() -> ClusterResult<Self> {
        Self::from_target(std::env::consts::ARCH)
    }

    /// Map a Rust target architecture onto a manifest key.
    pub fn from_target(arch: &str) -> ClusterResult<Self> {
        match arch {
            "x86_64" => Ok(Arch::Amd64),
            "aarch64" => Ok(Arch::Arm64),
            other => Err(ClusterError::UnsupportedArch {
                arch: other.to_string(),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Arch::Amd64 => "amd64",
            Arch::Arm64 => "arm64",
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One manifest entry.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ImageEntry {
    pub repo: String,
    /// Tag per architecture key (`amd64`, `arm64`)
    pub tag: BTreeMap<String, String>,
}

/// Resolved image reference for a single architecture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub repo: String,
    pub tag: String,
}

impl ImageRef {
    pub fn uri(&self) -> String {
        format!("{}:{}", self.repo, self.tag)
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ImageMetadata {
    images: BTreeMap<String, ImageEntry>,
}

impl ImageMetadata {
    /// Parse a manifest document.
    pub fn parse(raw: &str) -> ClusterResult<Self> {
        let metadata: ImageMetadata = serde_yaml::from_str(raw)
            .map_err(|e| ClusterError::Config(format!("invalid image metadata: {e}")))?;

        for (name, entry) in &metadata.images {
            if entry.repo.is_empty() {
                return Err(ClusterError::Config(format!(
                    "invalid image metadata: image {name} has an empty repo"
                )));
            }
        }
        Ok(metadata)
    }

    /// Resolve a logical image name for an architecture.
    pub fn resolve(&self, name: &str, arch: Arch) -> ClusterResult<ImageRef> {
        let missing = || ClusterError::MissingImage {
            name: name.to_string(),
            arch: arch.to_string(),
        };

        let entry = self.images.get(name).ok_or_else(missing)?;
        let tag = entry
            .tag
            .get(arch.as_str())
            .filter(|t| !t.is_empty())
            .ok_or_else(missing)?;

        Ok(ImageRef {
            repo: entry.repo.clone(),
            tag: tag.clone(),
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.images.keys().map(String::as_str)
    }
}
