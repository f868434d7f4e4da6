//! Go-template rendering of host preflight documents.
//!
//! Vendors write preflights against a fixed set of fields, e.g.
//! `{{ .AdminConsolePort }}` or `{{ if .IsAirgap }}`.

use crate::net::ProxySpec;
use embedded_cluster_shared::constants::network;
use embedded_cluster_shared::errors::{ClusterError, ClusterResult};
use gtmpl_value::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateContext {
    pub replicated_api_url: String,
    pub proxy_registry_url: String,
    pub admin_console_port: u16,
    pub local_artifact_mirror_port: u16,
    pub is_airgap: bool,
    pub proxy: Option<ProxySpec>,
}

impl Default for TemplateContext {
    fn default() -> Self {
        Self {
            replicated_api_url: String::new(),
            proxy_registry_url: String::new(),
            admin_console_port: network::DEFAULT_ADMIN_CONSOLE_PORT,
            local_artifact_mirror_port: network::DEFAULT_LOCAL_ARTIFACT_MIRROR_PORT,
            is_airgap: false,
            proxy: None,
        }
    }
}

impl TemplateContext {
    fn to_value(&self) -> Value {
        let proxy = self.proxy.clone().unwrap_or_default();
        let string = |s: &str| Value::String(s.to_string());

        let fields: HashMap<String, Value> = [
            ("ReplicatedAPIURL", string(&self.replicated_api_url)),
            ("ProxyRegistryURL", string(&self.proxy_registry_url)),
            (
                "AdminConsolePort",
                string(&self.admin_console_port.to_string()),
            ),
            (
                "LocalArtifactMirrorPort",
                string(&self.local_artifact_mirror_port.to_string()),
            ),
            ("IsAirgap", Value::Bool(self.is_airgap)),
            ("HTTPProxy", string(&proxy.http_proxy)),
            ("HTTPSProxy", string(&proxy.https_proxy)),
            ("NoProxy", string(&proxy.no_proxy)),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        Value::Object(fields)
    }

    /// Render one raw document.
    pub fn render(&self, raw: &str) -> ClusterResult<String> {
        check_delimiters(raw)?;
        gtmpl::template(raw, self.to_value())
            .map_err(|e| ClusterError::Config(format!("unable to template host preflights: {e}")))
    }
}

/// Every `{{` must be closed by `}}` before the next action opens.
///
/// gtmpl's lexer does not terminate on an unclosed action, so this runs first.
fn check_delimiters(raw: &str) -> ClusterResult<()> {
    let mut rest = raw;
    while let Some(open) = rest.find("{{") {
        let action = &rest[open + 2..];
        let close = action.find("}}");
        let next_open = action.find("{{");
        match (close, next_open) {
            (Some(c), Some(n)) if n < c => return Err(unterminated(raw, rest, open)),
            (Some(c), _) => rest = &action[c + 2..],
            (None, _) => return Err(unterminated(raw, rest, open)),
        }
    }
    Ok(())
}

fn unterminated(raw: &str, rest: &str, open: usize) -> ClusterError {
    let offset = raw.len() - rest.len() + open;
    let line = raw[..offset].matches('\n').count() + 1;
    ClusterError::Config(format!(
        "unable to template host preflights: unclosed action on line {line}"
    ))
}
