//! Embedded Cluster Shared - Common types for the bootstrap engine and CLI
//!
//! This crate contains the error taxonomy, well-known constants and the
//! host filesystem layout used by both the orchestration engine
//! (embedded-cluster) and the command-line frontend.

pub mod constants;
pub mod errors;
pub mod layout;

pub use errors::{ClusterError, ClusterResult};
pub use layout::HostLayout;
