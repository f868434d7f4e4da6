//! Host preflight checks.
//!
//! Collectors and analyzers are opaque to this crate; only the aggregated
//! verdicts matter. [`PreflightGate`] turns those verdicts into a go/no-go
//! decision.

pub mod gate;
pub mod runner;
pub mod template;

pub use gate::PreflightGate;
pub use runner::{BinaryPreflightRunner, PreflightRunner};
pub use template::TemplateContext;

use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use embedded_cluster_shared::errors::{ClusterError, ClusterResult};
use serde::{Deserialize, Serialize};

const HOST_PREFLIGHT_KIND: &str = "HostPreflight";
const TROUBLESHOOT_API_VERSION: &str = "troubleshoot.sh/v1beta2";

/// Merged collectors and analyzers from every host preflight document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HostPreflightSpec {
    #[serde(default)]
    pub collectors: Vec<serde_yaml::Value>,
    #[serde(default)]
    pub analyzers: Vec<serde_yaml::Value>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HostPreflightDocument {
    #[serde(default)]
    api_version: String,
    #[serde(default)]
    kind: String,
    #[serde(default)]
    metadata: serde_yaml::Mapping,
    #[serde(default)]
    spec: HostPreflightSpec,
}

impl HostPreflightSpec {
    /// Nothing to collect and nothing to analyze.
    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty() && self.analyzers.is_empty()
    }

    pub fn merge(&mut self, other: HostPreflightSpec) {
        self.collectors.extend(other.collectors);
        self.analyzers.extend(other.analyzers);
    }

    /// Parse a (possibly multi-document) YAML stream, keeping only
    /// `HostPreflight` documents.
    pub fn parse(raw: &str) -> ClusterResult<Self> {
        let mut merged = HostPreflightSpec::default();
        for document in serde_yaml::Deserializer::from_str(raw) {
            let value = serde_yaml::Value::deserialize(document)
                .map_err(|e| ClusterError::Config(format!("invalid host preflight: {e}")))?;
            if value.is_null() {
                continue;
            }
            let doc: HostPreflightDocument = serde_yaml::from_value(value)
                .map_err(|e| ClusterError::Config(format!("invalid host preflight: {e}")))?;
            if doc.kind == HOST_PREFLIGHT_KIND {
                merged.merge(doc.spec);
            }
        }
        Ok(merged)
    }

    /// Render as a single `HostPreflight` document for the runner.
    pub fn to_document(&self) -> ClusterResult<String> {
        let mut metadata = serde_yaml::Mapping::new();
        metadata.insert("name".into(), "embedded-cluster".into());
        let doc = HostPreflightDocument {
            api_version: TROUBLESHOOT_API_VERSION.to_string(),
            kind: HOST_PREFLIGHT_KIND.to_string(),
            metadata,
            spec: self.clone(),
        };
        serde_yaml::to_string(&doc).map_err(|e| ClusterError::Config(e.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Warn,
    Fail,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Pass => f.write_str("PASS"),
            Verdict::Warn => f.write_str("WARN"),
            Verdict::Fail => f.write_str("FAIL"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzerResult {
    pub verdict: Verdict,
    pub title: String,
    pub message: String,
}

/// Aggregated verdicts of one preflight run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreflightOutput {
    pub results: Vec<AnalyzerResult>,
}

#[derive(Debug, Default, Deserialize)]
struct RawOutput {
    #[serde(default)]
    pass: Vec<RawRecord>,
    #[serde(default)]
    warn: Vec<RawRecord>,
    #[serde(default)]
    fail: Vec<RawRecord>,
}

#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(default)]
    title: String,
    #[serde(default)]
    message: String,
}

impl PreflightOutput {
    /// Parse the runner's JSON report (`{pass, warn, fail}`).
    pub fn from_json(raw: &str) -> ClusterResult<Self> {
        let raw: RawOutput = serde_json::from_str(raw)
            .map_err(|e| ClusterError::Config(format!("unable to parse preflight output: {e}")))?;

        let tagged = |verdict: Verdict| {
            move |r: RawRecord| AnalyzerResult {
                verdict,
                title: r.title,
                message: r.message,
            }
        };
        let results = raw
            .fail
            .into_iter()
            .map(tagged(Verdict::Fail))
            .chain(raw.warn.into_iter().map(tagged(Verdict::Warn)))
            .chain(raw.pass.into_iter().map(tagged(Verdict::Pass)))
            .collect();
        Ok(Self { results })
    }

    pub fn has_fail(&self) -> bool {
        self.results.iter().any(|r| r.verdict == Verdict::Fail)
    }

    pub fn has_warn(&self) -> bool {
        self.results.iter().any(|r| r.verdict == Verdict::Warn)
    }

    /// Human-readable results table.
    pub fn table(&self) -> String {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec!["Status", "Title", "Message"]);
        for result in &self.results {
            table.add_row(vec![
                result.verdict.to_string(),
                result.title.clone(),
                result.message.clone(),
            ]);
        }
        table.to_string()
    }
}
