//! Preflight gating policy.

use super::{HostPreflightSpec, PreflightOutput, PreflightRunner, TemplateContext};
use crate::terminal::Terminal;
use embedded_cluster_shared::errors::{ClusterError, ClusterResult};

/// Runs host preflights and decides whether installation may proceed.
///
/// | outcome            | action                                  |
/// |--------------------|-----------------------------------------|
/// | any fail           | print table, `PreflightsFailed`         |
/// | warn, no prompt    | print table, proceed                    |
/// | warn, interactive  | print table, confirm or `UserAborted`   |
/// | clean              | print table, proceed                    |
pub struct PreflightGate<'a> {
    runner: &'a dyn PreflightRunner,
    terminal: &'a dyn Terminal,
    no_prompt: bool,
}

impl<'a> PreflightGate<'a> {
    pub fn new(runner: &'a dyn PreflightRunner, terminal: &'a dyn Terminal, no_prompt: bool) -> Self {
        Self {
            runner,
            terminal,
            no_prompt,
        }
    }

    /// Template and merge `documents`, then execute them.
    ///
    /// Returns `None` without running anything when the merged spec has no
    /// collectors and no analyzers.
    pub async fn run(
        &self,
        documents: &[String],
        ctx: &TemplateContext,
    ) -> ClusterResult<Option<PreflightOutput>> {
        let mut spec = HostPreflightSpec::default();
        for raw in documents {
            spec.merge(HostPreflightSpec::parse(&ctx.render(raw)?)?);
        }

        if spec.is_empty() {
            tracing::debug!("no host preflights configured, skipping");
            return Ok(None);
        }

        tracing::info!(
            collectors = spec.collectors.len(),
            analyzers = spec.analyzers.len(),
            "Running host preflights on node"
        );
        let envs = ctx.proxy.as_ref().map(|p| p.envs()).unwrap_or_default();
        let output = self
            .runner
            .run(&spec, &envs)
            .await
            .map_err(|e| ClusterError::Internal(format!("host preflights failed: {e}")))?;
        Ok(Some(output))
    }

    /// Apply the gating policy to a finished run.
    pub fn enforce(&self, output: &PreflightOutput) -> ClusterResult<()> {
        self.terminal.print(&output.table());

        if output.has_fail() {
            return Err(ClusterError::PreflightsFailed);
        }
        if !output.has_warn() || self.no_prompt {
            return Ok(());
        }

        tracing::info!("Host preflights have warnings");
        if self.terminal.confirm("Do you want to continue ?", false)? {
            Ok(())
        } else {
            Err(ClusterError::UserAborted)
        }
    }

    /// [`run`](Self::run) followed by [`enforce`](Self::enforce).
    pub async fn check(&self, documents: &[String], ctx: &TemplateContext) -> ClusterResult<()> {
        match self.run(documents, ctx).await? {
            Some(output) => self.enforce(&output),
            None => Ok(()),
        }
    }
}
