//! Local install of the first node.
//!
//! ```text
//! NotInstalled → CheckingLicense → Materializing → PreflightGating
//!     → ConfigRendering → Installing → PostInstall → WaitingReady → Outro → Installed
//! ```
//!
//! The install marker is checked before anything else happens; a host that
//! already carries one is left untouched and nothing is reported.

pub mod phase;
pub mod pipeline;
pub mod ready;
pub mod stages;

pub use phase::{INSTALL_PHASES, JOIN_PHASES, PREFLIGHT_PHASES, Phase};
pub use pipeline::{Bootstrap, Flavour};
pub use ready::{ReadinessWaiter, RetryPolicy};

use crate::context::HostContext;
use crate::license::License;
use crate::metrics::{self, MetricsEvent, MetricsTarget};
use crate::net::{ProxySpec, include_local_ip_in_no_proxy};
use crate::preflight::TemplateContext;
use embedded_cluster_shared::constants::network;
use embedded_cluster_shared::errors::ClusterResult;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Operator choices for `install`.
#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    pub no_prompt: bool,
    /// Operator override document applied after the embedded overrides
    pub overrides: Option<PathBuf>,
    pub license: Option<PathBuf>,
    pub network_interface: Option<String>,
    pub proxy: Option<ProxySpec>,
}

/// Install the first node of a new cluster.
pub async fn install(
    host: &HostContext,
    opts: &InstallOptions,
    cancel: &CancellationToken,
) -> ClusterResult<()> {
    crate::images::load()?;
    host.ensure_not_installed()?;

    let license = preload_license(opts);
    let bootstrap = prepare(host, opts, license.as_ref(), cancel)?;
    let target = metrics_target(host, license.as_ref());

    metrics::report(host.metrics.as_ref(), &target, MetricsEvent::ApplyStarted).await;
    let result = bootstrap.drive(INSTALL_PHASES, Some(&target)).await;
    metrics::report(
        host.metrics.as_ref(),
        &target,
        MetricsEvent::ApplyFinished {
            error: result.as_ref().err().map(ToString::to_string),
        },
    )
    .await;

    if result.is_ok() {
        tracing::info!(
            "Installation complete. Visit the admin console to configure and install your application."
        );
    }
    result
}

/// Materialize the bundle and gate the host, nothing more.
///
/// No telemetry is sent.
pub async fn install_preflights(
    host: &HostContext,
    opts: &InstallOptions,
    cancel: &CancellationToken,
) -> ClusterResult<()> {
    let license = preload_license(opts);
    prepare(host, opts, license.as_ref(), cancel)?
        .drive(PREFLIGHT_PHASES, None)
        .await?;
    tracing::info!("Host preflights completed successfully");
    Ok(())
}

fn prepare<'a>(
    host: &'a HostContext,
    opts: &InstallOptions,
    license: Option<&License>,
    cancel: &'a CancellationToken,
) -> ClusterResult<Bootstrap<'a>> {
    let proxy = include_local_ip_in_no_proxy(
        opts.proxy.clone(),
        opts.network_interface.as_deref(),
        network::DEFAULT_POD_CIDR,
        network::DEFAULT_SERVICE_CIDR,
    )?;

    let mut bootstrap = Bootstrap::new(host, cancel, Flavour::Install);
    bootstrap.no_prompt = opts.no_prompt;
    bootstrap.preflight_ctx = preflight_context(license, proxy.clone());
    bootstrap.proxy = proxy;
    bootstrap.overrides = opts.overrides.clone();
    bootstrap.license = opts.license.clone();
    Ok(bootstrap)
}

/// Best-effort license read for values needed before the license phase.
///
/// A broken license is reported by `CheckingLicense`, not here.
fn preload_license(opts: &InstallOptions) -> Option<License> {
    let path = opts.license.as_deref()?;
    match License::load(path) {
        Ok(license) => Some(license),
        Err(e) => {
            tracing::debug!(error = %e, "unable to preload license");
            None
        }
    }
}

pub(crate) fn preflight_context(license: Option<&License>, proxy: Option<ProxySpec>) -> TemplateContext {
    let mut ctx = TemplateContext {
        proxy,
        ..Default::default()
    };
    if let Some(license) = license {
        ctx.replicated_api_url = license.spec.endpoint.clone();
        ctx.proxy_registry_url = format!("https://{}", network::PROXY_REGISTRY_ADDRESS);
    }
    ctx
}

fn metrics_target(host: &HostContext, license: Option<&License>) -> MetricsTarget {
    let base_url = license
        .map(|l| l.spec.endpoint.trim())
        .filter(|e| !e.is_empty())
        .unwrap_or(network::DEFAULT_METRICS_BASE_URL)
        .to_string();
    MetricsTarget {
        base_url,
        cluster_id: Uuid::new_v4(),
        binary_name: host.binary_name.clone(),
        version: host.version.clone(),
    }
}
