//! Local interface address lookup.

use embedded_cluster_shared::errors::{ClusterError, ClusterResult};
use ipnet::Ipv4Net;
use std::net::Ipv4Addr;

const ROUTE_TABLE: &str = "/proc/net/route";

/// IPv4 address of a host interface together with its subnet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceAddr {
    pub name: String,
    pub net: Ipv4Net,
}

impl InterfaceAddr {
    pub fn ip(&self) -> Ipv4Addr {
        self.net.addr()
    }

    /// Subnet the address lives in, e.g. `10.0.0.0/24`.
    pub fn subnet(&self) -> Ipv4Net {
        self.net.trunc()
    }
}

/// Interface holding the IPv4 default route in a `/proc/net/route` table.
///
/// Columns are `Iface Destination Gateway Flags RefCnt Use Metric Mask ...`
/// with hex-encoded addresses; the default route has destination and mask
/// both zero.
pub fn default_route_interface(route_table: &str) -> Option<String> {
    route_table.lines().skip(1).find_map(|line| {
        let fields: Vec<&str> = line.split_whitespace().collect();
        match fields.as_slice() {
            [iface, "00000000", _gateway, _flags, _refcnt, _use, _metric, "00000000", ..] => {
                Some((*iface).to_string())
            }
            _ => None,
        }
    })
}

/// Resolve the IPv4 address of `name`, or of the default-route interface.
///
/// Without a default route the first non-loopback interface carrying an
/// IPv4 address is used.
pub fn interface_address(name: Option<&str>) -> ClusterResult<InterfaceAddr> {
    let addrs = ipv4_addresses()?;

    let wanted = match name.filter(|n| !n.is_empty()) {
        Some(name) => Some(name.to_string()),
        None => std::fs::read_to_string(ROUTE_TABLE)
            .ok()
            .and_then(|table| default_route_interface(&table)),
    };

    let found = match &wanted {
        Some(wanted) => addrs.into_iter().find(|a| &a.name == wanted),
        None => addrs.into_iter().find(|a| !a.ip().is_loopback()),
    };

    found.ok_or_else(|| match wanted {
        Some(wanted) => ClusterError::Network(format!(
            "interface {wanted} not found or has no ipv4 address"
        )),
        None => ClusterError::Network("no network interface with an ipv4 address found".into()),
    })
}

fn ipv4_addresses() -> ClusterResult<Vec<InterfaceAddr>> {
    let ifaddrs = nix::ifaddrs::getifaddrs()
        .map_err(|e| ClusterError::Network(format!("unable to list interfaces: {e}")))?;

    let mut addrs = Vec::new();
    for ifaddr in ifaddrs {
        let Some(ip) = ifaddr
            .address
            .as_ref()
            .and_then(|a| a.as_sockaddr_in())
            .map(|sin| sin.ip())
        else {
            continue;
        };
        let prefix = ifaddr
            .netmask
            .as_ref()
            .and_then(|m| m.as_sockaddr_in())
            .and_then(|sin| ipnet::ipv4_mask_to_prefix(sin.ip()).ok())
            .unwrap_or(32);
        let net = Ipv4Net::new(ip, prefix).map_err(|e| {
            ClusterError::Network(format!(
                "invalid address on {}: {e}",
                ifaddr.interface_name
            ))
        })?;

        addrs.push(InterfaceAddr {
            name: ifaddr.interface_name,
            net,
        });
    }
    Ok(addrs)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROUTES: &str = "\
Iface\tDestination\tGateway \tFlags\tRefCnt\tUse\tMetric\tMask\t\tMTU\tWindow\tIRTT
eth1\t0000A8C0\t00000000\t0001\t0\t0\t0\t00FFFFFF\t0\t0\t0
eth0\t00000000\t0101A8C0\t0003\t0\t0\t100\t00000000\t0\t0\t0
";

    #[test]
    fn test_default_route_interface() {
        assert_eq!(default_route_interface(ROUTES).as_deref(), Some("eth0"));
    }

    #[test]
    fn test_no_default_route() {
        let table = ROUTES.lines().take(2).collect::<Vec<_>>().join("\n");
        assert_eq!(default_route_interface(&table), None);
        assert_eq!(default_route_interface(""), None);
    }

    #[test]
    fn test_loopback_address() {
        let lo = interface_address(Some("lo")).unwrap();
        assert_eq!(lo.ip(), Ipv4Addr::LOCALHOST);
        assert_eq!(lo.subnet().to_string(), "127.0.0.0/8");
    }

    #[test]
    fn test_unknown_interface() {
        let err = interface_address(Some("does-not-exist0")).unwrap_err();
        assert!(err.to_string().contains("does-not-exist0"));
    }
}
