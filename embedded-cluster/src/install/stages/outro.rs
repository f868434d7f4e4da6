//! Stage: addon completion hook.

use crate::addons::AddonContext;
use crate::context::HostContext;
use embedded_cluster_shared::errors::ClusterResult;

/// Context handed to addon hooks for this host.
pub fn addon_context(host: &HostContext, envs: &[(String, String)]) -> AddonContext {
    AddonContext {
        k0s: host.layout.k0s_binary_path(),
        kubeconfig: host.layout.kubeconfig_path(),
        envs: envs.to_vec(),
    }
}

pub async fn run(host: &HostContext, envs: &[(String, String)]) -> ClusterResult<()> {
    host.addons.outro(&addon_context(host, envs)).await
}
