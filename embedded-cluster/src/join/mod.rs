//! Joining a node to an existing cluster.
//!
//! The join command is fetched from the admin console first. Nothing on the
//! host changes until the version and proxy checks have passed.

pub mod token;

pub use token::{HttpTokenSource, InstallationSpec, JoinCommand, JoinTokenSource};

use crate::context::HostContext;
use crate::install::{Bootstrap, Flavour, JOIN_PHASES, PREFLIGHT_PHASES, stages};
use crate::metrics::{self, MetricsEvent, MetricsTarget};
use crate::net::ensure_local_reachability;
use crate::preflight::TemplateContext;
use embedded_cluster_shared::constants::network;
use embedded_cluster_shared::errors::{ClusterError, ClusterResult};
use tokio_util::sync::CancellationToken;

/// Operator choices for `join`.
#[derive(Debug, Clone, Default)]
pub struct JoinOptions {
    pub no_prompt: bool,
    pub network_interface: Option<String>,
    /// Promote the cluster to high availability after a controller join
    pub enable_ha: bool,
}

/// Join this host to the cluster served at `url` (`host:port`).
pub async fn join(
    host: &HostContext,
    tokens: &dyn JoinTokenSource,
    url: &str,
    token: &str,
    opts: &JoinOptions,
    cancel: &CancellationToken,
) -> ClusterResult<()> {
    crate::images::load()?;
    host.ensure_not_installed()?;

    let cmd = fetch(tokens, url, token, cancel).await?;
    let bootstrap = prepare(host, &cmd, url, opts, cancel)?;
    let target = MetricsTarget {
        base_url: metrics_base_url(&cmd),
        cluster_id: cmd.cluster_id,
        binary_name: host.binary_name.clone(),
        version: host.version.clone(),
    };
    let node_name = node_name();

    metrics::report(
        host.metrics.as_ref(),
        &target,
        MetricsEvent::JoinStarted {
            node_name: node_name.clone(),
        },
    )
    .await;
    let result = bootstrap.drive(JOIN_PHASES, Some(&target)).await;
    metrics::report(
        host.metrics.as_ref(),
        &target,
        MetricsEvent::JoinFinished {
            node_name,
            error: result.as_ref().err().map(ToString::to_string),
        },
    )
    .await;
    result?;
    tracing::info!("Node has joined the cluster!");

    if opts.enable_ha {
        enable_ha(&bootstrap, &cmd).await?;
    }
    Ok(())
}

/// Fetch and validate the join command, then gate the host.
///
/// No telemetry is sent.
pub async fn join_preflights(
    host: &HostContext,
    tokens: &dyn JoinTokenSource,
    url: &str,
    token: &str,
    opts: &JoinOptions,
    cancel: &CancellationToken,
) -> ClusterResult<()> {
    let cmd = fetch(tokens, url, token, cancel).await?;
    prepare(host, &cmd, url, opts, cancel)?
        .drive(PREFLIGHT_PHASES, None)
        .await?;
    tracing::info!("Host preflights completed successfully");
    Ok(())
}

async fn fetch(
    tokens: &dyn JoinTokenSource,
    url: &str,
    token: &str,
    cancel: &CancellationToken,
) -> ClusterResult<JoinCommand> {
    tracing::info!("Fetching join token");
    tokio::select! {
        _ = cancel.cancelled() => Err(ClusterError::Cancelled),
        res = tokens.fetch(url, token) => res,
    }
}

fn prepare<'a>(
    host: &'a HostContext,
    cmd: &'a JoinCommand,
    url: &str,
    opts: &JoinOptions,
    cancel: &'a CancellationToken,
) -> ClusterResult<Bootstrap<'a>> {
    check_version(&host.version, &cmd.version)?;

    let proxy = cmd.installation_spec.proxy.clone().filter(|p| p.is_set());
    ensure_local_reachability(proxy.as_ref(), opts.network_interface.as_deref())?;

    let ctx = TemplateContext {
        admin_console_port: admin_console_port(url)?,
        local_artifact_mirror_port: cmd.local_artifact_mirror_port(),
        proxy: proxy.clone(),
        ..Default::default()
    };

    let mut bootstrap = Bootstrap::new(host, cancel, Flavour::Join(cmd));
    bootstrap.no_prompt = opts.no_prompt;
    bootstrap.preflight_ctx = ctx;
    bootstrap.proxy = proxy;
    Ok(bootstrap)
}

/// The joining binary must be exactly the version the cluster runs.
pub fn check_version(binary: &str, cluster: &str) -> ClusterResult<()> {
    if binary == cluster {
        return Ok(());
    }
    Err(ClusterError::VersionMismatch {
        binary: binary.to_string(),
        cluster: cluster.to_string(),
    })
}

/// Port part of a `host:port` admin console address.
pub fn admin_console_port(url: &str) -> ClusterResult<u16> {
    let parts: Vec<&str> = url.split(':').collect();
    let [_, port] = parts.as_slice() else {
        return Err(ClusterError::Config(format!(
            "unable to split host and port from {url}"
        )));
    };
    port.parse()
        .map_err(|e| ClusterError::Config(format!("unable to parse admin console port {port}: {e}")))
}

fn metrics_base_url(cmd: &JoinCommand) -> String {
    let base = cmd.installation_spec.metrics_base_url.trim();
    if base.is_empty() {
        network::DEFAULT_METRICS_BASE_URL.to_string()
    } else {
        base.to_string()
    }
}

fn node_name() -> String {
    nix::unistd::gethostname()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "unable to read hostname");
            String::from("unknown")
        })
}

/// Offer HA promotion after a successful controller join.
///
/// A failure here does not undo the join.
async fn enable_ha(bootstrap: &Bootstrap<'_>, cmd: &JoinCommand) -> ClusterResult<()> {
    let host = bootstrap.host;
    if !cmd.is_controller() {
        tracing::warn!("High availability can only be enabled on controller nodes, ignoring");
        return Ok(());
    }

    if !bootstrap.no_prompt {
        let proceed = host
            .terminal
            .confirm("Do you want to enable high availability?", false)?;
        if !proceed {
            tracing::info!("Skipping high availability");
            return Ok(());
        }
    }

    tracing::info!("Enabling high availability");
    let ctx = stages::outro::addon_context(host, &bootstrap.child_envs());
    host.ha.promote(&ctx).await.map_err(|e| {
        tracing::error!(error = %e, "unable to enable high availability, the node has joined the cluster");
        e.in_phase("HaPromotion")
    })?;
    tracing::info!("High availability enabled!");
    Ok(())
}
