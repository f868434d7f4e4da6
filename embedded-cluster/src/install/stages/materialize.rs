//! Stage: binary materialization.

use crate::context::HostContext;
use embedded_cluster_shared::errors::{ClusterError, ClusterResult};

pub async fn run(host: &HostContext) -> ClusterResult<()> {
    tracing::debug!("materializing binaries");
    host.materializer
        .materialize(&host.layout)
        .await
        .map_err(|e| ClusterError::Storage(format!("unable to materialize binaries: {e}")))
}
