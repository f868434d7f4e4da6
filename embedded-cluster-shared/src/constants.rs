//! Shared constants between the bootstrap engine and the CLI
//!
//! Paths here are relative to the host root; see [`crate::layout::HostLayout`].

/// Binary and service naming
pub mod names {
    /// Default binary name when it cannot be derived from argv[0]
    pub const DEFAULT_BINARY_NAME: &str = "embedded-cluster";

    /// Distribution binary shipped in the release bundle
    pub const K0S_BINARY: &str = "k0s";

    /// Preflight runner binary shipped in the release bundle
    pub const PREFLIGHT_BINARY: &str = "kubectl-preflight";

    /// systemd unit created by `k0s install controller`
    pub const K0S_CONTROLLER_UNIT: &str = "k0scontroller.service";

    /// systemd unit created by `k0s install worker`
    pub const K0S_WORKER_UNIT: &str = "k0sworker.service";

    /// Host service manager
    pub const SYSTEMCTL: &str = "systemctl";
}

/// Network defaults
pub mod network {
    /// Admin console port used when none is configured
    pub const DEFAULT_ADMIN_CONSOLE_PORT: u16 = 30000;

    /// Local artifact mirror port used when the join spec carries none
    pub const DEFAULT_LOCAL_ARTIFACT_MIRROR_PORT: u16 = 50000;

    /// Default pod network CIDR
    pub const DEFAULT_POD_CIDR: &str = "10.244.0.0/16";

    /// Default service network CIDR
    pub const DEFAULT_SERVICE_CIDR: &str = "10.96.0.0/12";

    /// Entries always added to a generated no-proxy list
    pub const DEFAULT_NO_PROXY: &[&str] = &[
        "localhost",
        "127.0.0.1",
        ".cluster.local",
        ".svc",
        "169.254.169.254",
    ];

    /// Registry proxy used for vendor images
    pub const PROXY_REGISTRY_ADDRESS: &str = "proxy.replicated.com";

    /// Metrics endpoint used when no license endpoint is known
    pub const DEFAULT_METRICS_BASE_URL: &str = "https://replicated.app";

    /// Path on the admin console serving join commands
    pub const JOIN_COMMAND_PATH: &str = "/api/v1/embedded-cluster/join";
}

/// Readiness polling defaults
pub mod readiness {
    use std::time::Duration;

    /// Delay between status socket checks
    pub const POLL_INTERVAL: Duration = Duration::from_secs(2);

    /// Number of checks before giving up (~60s budget)
    pub const MAX_ATTEMPTS: u32 = 30;
}

/// Environment variable names
pub mod envs {
    pub const KUBECONFIG: &str = "KUBECONFIG";

    pub const HTTP_PROXY: &str = "HTTP_PROXY";
    pub const HTTPS_PROXY: &str = "HTTPS_PROXY";
    pub const NO_PROXY: &str = "NO_PROXY";

    /// Overrides the host root all well-known paths are resolved under
    pub const HOST_ROOT: &str = "EMBEDDED_CLUSTER_HOST_ROOT";

    /// Overrides the release bundle location
    pub const RELEASE_DIR: &str = "EMBEDDED_CLUSTER_RELEASE_DIR";
}
