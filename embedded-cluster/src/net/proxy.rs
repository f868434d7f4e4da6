//! Proxy configuration and local reachability checks.
//!
//! A node must never reach itself through the proxy. When a proxy is set,
//! the node address has to be covered by the no-proxy list, either as an
//! exact IP, a CIDR that contains it, or the node hostname.

use super::interface::interface_address;
use embedded_cluster_shared::constants::{envs, network};
use embedded_cluster_shared::errors::{ClusterError, ClusterResult};
use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProxySpec {
    #[serde(default)]
    pub http_proxy: String,
    #[serde(default)]
    pub https_proxy: String,
    /// Comma separated, order preserved
    #[serde(default)]
    pub no_proxy: String,
}

impl ProxySpec {
    /// Trimmed, non-empty no-proxy entries in order.
    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.no_proxy
            .split(',')
            .map(str::trim)
            .filter(|e| !e.is_empty())
    }

    /// True when either proxy URL is configured.
    pub fn is_set(&self) -> bool {
        !self.http_proxy.is_empty() || !self.https_proxy.is_empty()
    }

    /// Environment for child processes. Empty values are left out.
    pub fn envs(&self) -> Vec<(String, String)> {
        [
            (envs::HTTP_PROXY, &self.http_proxy),
            (envs::HTTPS_PROXY, &self.https_proxy),
            (envs::NO_PROXY, &self.no_proxy),
        ]
        .into_iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
    }
}

/// Whether any of `entries` exempts `ip` (or `hostname`) from proxying.
pub fn no_proxy_covers<'a, I>(entries: I, ip: IpAddr, hostname: Option<&str>) -> bool
where
    I: IntoIterator<Item = &'a str>,
{
    entries.into_iter().any(|entry| {
        if let Ok(net) = entry.parse::<IpNet>() {
            return net.contains(&ip);
        }
        if let Ok(addr) = entry.parse::<IpAddr>() {
            return addr == ip;
        }
        let Some(hostname) = hostname else {
            return false;
        };
        match entry.strip_prefix('.') {
            Some(suffix) => hostname
                .to_ascii_lowercase()
                .ends_with(&format!(".{}", suffix.to_ascii_lowercase())),
            None => entry.eq_ignore_ascii_case(hostname),
        }
    })
}

/// Check whether the local address on `interface` bypasses the proxy.
///
/// Returns `(true, 0.0.0.0)` without touching the host when no proxy is
/// configured.
pub fn check_local_reachability(
    proxy: Option<&ProxySpec>,
    interface: Option<&str>,
) -> ClusterResult<(bool, IpAddr)> {
    let Some(proxy) = proxy.filter(|p| p.is_set()) else {
        return Ok((true, IpAddr::V4(Ipv4Addr::UNSPECIFIED)));
    };

    let local = interface_address(interface)?;
    let ip = IpAddr::V4(local.ip());
    let hostname = nix::unistd::gethostname()
        .ok()
        .map(|h| h.to_string_lossy().into_owned());

    let ok = no_proxy_covers(proxy.entries(), ip, hostname.as_deref());
    tracing::debug!(
        interface = %local.name,
        local_ip = %ip,
        no_proxy = %proxy.no_proxy,
        ok,
        "checked no-proxy coverage of local address"
    );
    Ok((ok, ip))
}

/// [`check_local_reachability`], turning a miss into `ProxyNotExempt`.
pub fn ensure_local_reachability(
    proxy: Option<&ProxySpec>,
    interface: Option<&str>,
) -> ClusterResult<()> {
    let (ok, local_ip) = check_local_reachability(proxy, interface).map_err(|e| {
        ClusterError::Network(format!("failed to check proxy config for local IP: {e}"))
    })?;
    if ok {
        return Ok(());
    }
    Err(ClusterError::ProxyNotExempt {
        no_proxy: proxy.map(|p| p.no_proxy.clone()).unwrap_or_default(),
        local_ip: local_ip.to_string(),
    })
}

/// Make sure an operator-supplied proxy leaves the node reachable.
///
/// Without an explicit no-proxy list one is generated from the defaults,
/// the pod and service CIDRs and the node subnet. An explicit list that
/// does not cover the node is kept but logged.
pub fn include_local_ip_in_no_proxy(
    proxy: Option<ProxySpec>,
    interface: Option<&str>,
    pod_cidr: &str,
    service_cidr: &str,
) -> ClusterResult<Option<ProxySpec>> {
    let Some(proxy) = proxy.filter(|p| p.is_set()) else {
        return Ok(None);
    };

    let local = interface_address(interface)?;
    if proxy.no_proxy.trim().is_empty() {
        return Ok(Some(with_default_no_proxy(
            proxy,
            &local.subnet().to_string(),
            pod_cidr,
            service_cidr,
        )));
    }

    let ip = IpAddr::V4(local.ip());
    if !no_proxy_covers(proxy.entries(), ip, None) {
        tracing::warn!(
            no_proxy = %proxy.no_proxy,
            local_ip = %ip,
            "the node IP is not included in the no-proxy list, this may break intra-cluster traffic"
        );
    }
    Ok(Some(proxy))
}

fn with_default_no_proxy(
    mut proxy: ProxySpec,
    subnet: &str,
    pod_cidr: &str,
    service_cidr: &str,
) -> ProxySpec {
    let mut entries: Vec<&str> = network::DEFAULT_NO_PROXY.to_vec();
    entries.extend([pod_cidr, service_cidr, subnet]);
    proxy.no_proxy = entries.join(",");
    tracing::info!(no_proxy = %proxy.no_proxy, "no-proxy not set, using defaults");
    proxy
}
