//! Phase driver shared by install and join.

use super::phase::Phase;
use super::ready::ReadinessWaiter;
use super::stages;
use crate::context::HostContext;
use crate::join::JoinCommand;
use crate::metrics::{self, MetricsEvent, MetricsTarget};
use crate::net::ProxySpec;
use crate::preflight::TemplateContext;
use embedded_cluster_shared::errors::{ClusterError, ClusterResult};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

/// What the `Installing` phase does.
#[derive(Debug, Clone, Copy)]
pub enum Flavour<'a> {
    /// Bootstrap the first controller.
    Install,
    /// Join an existing cluster with the fetched command.
    Join(&'a JoinCommand),
}

/// One bootstrap run over a host.
pub struct Bootstrap<'a> {
    pub host: &'a HostContext,
    pub cancel: &'a CancellationToken,
    pub flavour: Flavour<'a>,
    pub no_prompt: bool,
    pub proxy: Option<ProxySpec>,
    pub preflight_ctx: TemplateContext,
    pub overrides: Option<PathBuf>,
    pub license: Option<PathBuf>,
}

impl<'a> Bootstrap<'a> {
    pub fn new(host: &'a HostContext, cancel: &'a CancellationToken, flavour: Flavour<'a>) -> Self {
        Self {
            host,
            cancel,
            flavour,
            no_prompt: false,
            proxy: None,
            preflight_ctx: TemplateContext::default(),
            overrides: None,
            license: None,
        }
    }

    /// Proxy variables for child processes.
    pub fn child_envs(&self) -> Vec<(String, String)> {
        self.proxy.as_ref().map(ProxySpec::envs).unwrap_or_default()
    }

    /// Run `phases` in order, stopping at the first error.
    ///
    /// Cancellation is observed between phases; a started phase always
    /// runs to completion (waits inside it observe the token themselves).
    pub async fn drive(&self, phases: &[Phase], target: Option<&MetricsTarget>) -> ClusterResult<()> {
        for &phase in phases {
            if self.cancel.is_cancelled() {
                tracing::warn!(phase = %phase, "cancelled before phase");
                return Err(ClusterError::Cancelled);
            }

            tracing::debug!(phase = %phase, "entering phase");
            if let Some(target) = target {
                metrics::report(
                    self.host.metrics.as_ref(),
                    target,
                    MetricsEvent::PhaseStarted { phase: phase.name() },
                )
                .await;
            }

            let result = self.execute(phase).await;

            if let Some(target) = target {
                metrics::report(
                    self.host.metrics.as_ref(),
                    target,
                    MetricsEvent::PhaseFinished {
                        phase: phase.name(),
                        error: result.as_ref().err().map(ToString::to_string),
                    },
                )
                .await;
            }
            result.map_err(|e| e.in_phase(phase.name()))?;
        }
        Ok(())
    }

    async fn execute(&self, phase: Phase) -> ClusterResult<()> {
        let host = self.host;
        match phase {
            Phase::CheckingLicense => {
                stages::license::run(&host.release, self.license.as_deref()).map(|_| ())
            }
            Phase::Materializing => stages::materialize::run(host).await,
            Phase::PreflightGating => {
                stages::preflight::run(host, &self.preflight_ctx, self.no_prompt).await
            }
            Phase::ConfigRendering => {
                stages::config::run(host, self.overrides.as_deref()).map(|_| ())
            }
            Phase::Installing => {
                let envs = self.child_envs();
                match self.flavour {
                    Flavour::Install => {
                        tracing::info!("Installing node");
                        stages::k0s::install_controller(host.runner.as_ref(), &host.layout, &envs)
                            .await
                    }
                    Flavour::Join(cmd) => {
                        tracing::info!("Joining node to cluster");
                        stages::k0s::install_join(host.runner.as_ref(), &host.layout, cmd, &envs)
                            .await
                    }
                }
            }
            Phase::PostInstall => {
                let unit = match self.flavour {
                    Flavour::Join(cmd) if !cmd.is_controller() => host.layout.worker_unit_path(),
                    _ => host.layout.controller_unit_path(),
                };
                stages::post_install::run(
                    host.runner.as_ref(),
                    &host.layout,
                    &unit,
                    &host.binary_name,
                )
                .await
            }
            Phase::WaitingReady => {
                ReadinessWaiter::new(host.readiness, host.runner.as_ref())
                    .wait(
                        &host.layout.status_socket_path(),
                        &host.layout.k0s_binary_path(),
                        self.cancel,
                    )
                    .await
            }
            Phase::Outro => stages::outro::run(host, &self.child_envs()).await,
        }
    }
}
