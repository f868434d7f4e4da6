//! Stage: host preflight gate.

use crate::context::HostContext;
use crate::preflight::{PreflightGate, TemplateContext};
use embedded_cluster_shared::errors::ClusterResult;

pub async fn run(host: &HostContext, ctx: &TemplateContext, no_prompt: bool) -> ClusterResult<()> {
    let documents = host.release.host_preflight_documents()?;
    PreflightGate::new(host.preflights.as_ref(), host.terminal.as_ref(), no_prompt)
        .check(&documents, ctx)
        .await
}
