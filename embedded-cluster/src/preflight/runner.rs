//! Preflight execution.

use super::{HostPreflightSpec, PreflightOutput};
use crate::util::{CommandRunner, CommandSpec};
use async_trait::async_trait;
use embedded_cluster_shared::errors::{ClusterError, ClusterResult};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

/// Exit codes of the preflight binary that still carry a valid report.
const EXIT_OK: i32 = 0;
const EXIT_HAS_FAIL: i32 = 3;
const EXIT_HAS_WARN: i32 = 4;

/// Executes collectors and analyzers and reports aggregated verdicts.
#[async_trait]
pub trait PreflightRunner: Send + Sync {
    /// `envs` is extra child environment, e.g. proxy settings.
    async fn run(
        &self,
        spec: &HostPreflightSpec,
        envs: &[(String, String)],
    ) -> ClusterResult<PreflightOutput>;
}

/// Runs the materialized `kubectl-preflight` binary.
pub struct BinaryPreflightRunner {
    binary: PathBuf,
    runner: Arc<dyn CommandRunner>,
}

impl BinaryPreflightRunner {
    pub fn new(binary: PathBuf, runner: Arc<dyn CommandRunner>) -> Self {
        Self { binary, runner }
    }
}

#[async_trait]
impl PreflightRunner for BinaryPreflightRunner {
    async fn run(
        &self,
        spec: &HostPreflightSpec,
        envs: &[(String, String)],
    ) -> ClusterResult<PreflightOutput> {
        let document = spec.to_document()?;
        let mut file = tempfile::Builder::new()
            .prefix("host-preflights-")
            .suffix(".yaml")
            .tempfile()
            .map_err(|e| ClusterError::Storage(format!("unable to create temp file: {e}")))?;
        file.write_all(document.as_bytes())?;
        file.flush()?;

        let cmd = CommandSpec::new(&self.binary)
            .args(["--interactive=false", "--format=json"])
            .arg(file.path().display().to_string())
            .envs(envs.to_vec());

        let output = self.runner.output(&cmd).await?;
        match output.code {
            Some(EXIT_OK | EXIT_HAS_FAIL | EXIT_HAS_WARN) => {
                PreflightOutput::from_json(&output.stdout)
            }
            code => {
                tracing::debug!("stdout: {}", output.stdout);
                tracing::debug!("stderr: {}", output.stderr);
                Err(ClusterError::Command {
                    command: cmd.display(),
                    code,
                    stderr: output.stderr.trim().to_string(),
                })
            }
        }
    }
}
