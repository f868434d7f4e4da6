//! Embedded Cluster - bootstrap engine for single-binary Kubernetes installs
//!
//! This crate turns a bare Linux host into the first node of a k0s cluster
//! ([`install`]), or adds it to an existing one ([`join`]). Host access goes
//! through the collaborators carried by [`HostContext`] so every phase can
//! run against a temporary host root in tests.

pub mod addons;
pub mod bundle;
pub mod config;
pub mod context;
pub mod images;
pub mod install;
pub mod join;
pub mod license;
pub mod metrics;
pub mod net;
pub mod preflight;
pub mod terminal;
pub mod util;

/// Version of this binary, compared against the cluster on join.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use context::HostContext;
pub use install::{InstallOptions, Phase, install, install_preflights};
pub use join::{HttpTokenSource, JoinCommand, JoinOptions, JoinTokenSource, join, join_preflights};

pub use embedded_cluster_shared::{ClusterError, ClusterResult, HostLayout};
