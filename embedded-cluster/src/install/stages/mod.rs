//! Bootstrap stages.
//!
//! Each stage does one thing against the host and is driven by
//! [`Bootstrap`](super::pipeline::Bootstrap). Stages are safe to re-run
//! after a failed attempt, except that `config` refuses to overwrite an
//! existing marker.
//!
//! ```text
//! license ──→ materialize ──→ preflight ──→ config ──→ k0s ──→ post_install ──→ outro
//! ```

pub mod config;
pub mod k0s;
pub mod license;
pub mod materialize;
pub mod outro;
pub mod post_install;
pub mod preflight;
