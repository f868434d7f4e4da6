//! Layered override patching.
//!
//! Fragments are YAML documents applied with JSON merge-patch semantics
//! (RFC 7386): mappings merge recursively, `null` removes a key, anything
//! else replaces. Embedded overrides go first and operator overrides second,
//! so the operator wins on conflicts.

use super::ClusterConfig;
use crate::bundle::{EmbeddedClusterConfig, ReleaseBundle};
use embedded_cluster_shared::errors::{ClusterError, ClusterResult, OverrideSource};
use serde_json::Value;
use std::path::Path;

/// One raw override document and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideFragment {
    pub source: OverrideSource,
    pub raw: String,
}

impl OverrideFragment {
    pub fn embedded(raw: impl Into<String>) -> Self {
        Self {
            source: OverrideSource::Embedded,
            raw: raw.into(),
        }
    }

    pub fn user(raw: impl Into<String>) -> Self {
        Self {
            source: OverrideSource::User,
            raw: raw.into(),
        }
    }

    fn is_empty(&self) -> bool {
        self.raw.trim().is_empty()
    }
}

/// Gather override fragments in precedence order: embedded, then user.
///
/// Missing sources contribute nothing.
pub fn collect_overrides(
    release: &ReleaseBundle,
    user_file: Option<&Path>,
) -> ClusterResult<Vec<OverrideFragment>> {
    let mut fragments = Vec::new();

    if let Some(embedded) = release.embedded_config()? {
        fragments.push(OverrideFragment::embedded(embedded.k0s_overrides()));
    }

    if let Some(path) = user_file {
        let end_user = EmbeddedClusterConfig::load(path).map_err(|e| {
            ClusterError::Config(format!("unable to process overrides file: {e}"))
        })?;
        fragments.push(OverrideFragment::user(end_user.k0s_overrides()));
    }

    Ok(fragments)
}

/// Apply `fragments` to `config` in order.
///
/// Either every fragment applies or an error is returned; the caller never
/// sees a partially patched config.
pub fn patch(config: ClusterConfig, fragments: &[OverrideFragment]) -> ClusterResult<ClusterConfig> {
    let mut doc = serde_json::to_value(&config)?;
    let mut last = None;

    for fragment in fragments.iter().filter(|f| !f.is_empty()) {
        let overlay: Value = serde_yaml::from_str(&fragment.raw).map_err(|e| ClusterError::Patch {
            layer: fragment.source,
            cause: e.to_string(),
        })?;
        if !overlay.is_object() {
            return Err(ClusterError::Patch {
                layer: fragment.source,
                cause: "override document must be a mapping".to_string(),
            });
        }

        merge_patch(&mut doc, &overlay);
        last = Some(fragment.source);
        tracing::debug!(source = %fragment.source, "applied config overrides");
    }

    let Some(layer) = last else {
        return Ok(config);
    };
    serde_json::from_value(doc).map_err(|e| ClusterError::Patch {
        layer,
        cause: format!("patched config is invalid: {e}"),
    })
}

/// RFC 7386 merge of `patch` into `target`.
pub fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch_map) = patch else {
        *target = patch.clone();
        return;
    };

    if !target.is_object() {
        *target = Value::Object(Default::default());
    }
    if let Value::Object(target_map) = target {
        for (key, value) in patch_map {
            if value.is_null() {
                target_map.remove(key);
            } else {
                merge_patch(target_map.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
    }
}
