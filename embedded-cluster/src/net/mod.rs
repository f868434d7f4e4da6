//! Host networking: interface discovery and proxy validation.

pub mod interface;
pub mod proxy;

pub use interface::{InterfaceAddr, default_route_interface, interface_address};
pub use proxy::{
    ProxySpec, check_local_reachability, ensure_local_reachability, include_local_ip_in_no_proxy,
    no_proxy_covers,
};
