//! Join command retrieval.

use crate::net::ProxySpec;
use async_trait::async_trait;
use embedded_cluster_shared::constants::network;
use embedded_cluster_shared::errors::{ClusterError, ClusterResult};
use serde::Deserialize;
use std::time::Duration;
use uuid::Uuid;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything the admin console hands a joining node.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JoinCommand {
    /// Version of the binary that installed the cluster
    #[serde(default, alias = "embeddedClusterVersion")]
    pub version: String,
    #[serde(default, rename = "clusterID")]
    pub cluster_id: Uuid,
    /// Full k0s command line; its first field names the binary
    #[serde(default)]
    pub k0s_join_command: String,
    #[serde(default)]
    pub k0s_token: String,
    #[serde(default)]
    pub installation_spec: InstallationSpec,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InstallationSpec {
    #[serde(default)]
    pub proxy: Option<ProxySpec>,
    #[serde(default, rename = "metricsBaseURL")]
    pub metrics_base_url: String,
    #[serde(default)]
    pub local_artifact_mirror: Option<LocalArtifactMirror>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct LocalArtifactMirror {
    #[serde(default)]
    pub port: u16,
}

impl JoinCommand {
    pub fn parse(raw: &str) -> ClusterResult<Self> {
        serde_json::from_str(raw)
            .map_err(|e| ClusterError::Config(format!("unable to decode join command: {e}")))
    }

    /// Controller joins carry the cluster config; workers do not.
    pub fn is_controller(&self) -> bool {
        self.k0s_join_command.contains("controller")
    }

    /// Mirror port from the installation spec, or the default.
    pub fn local_artifact_mirror_port(&self) -> u16 {
        self.installation_spec
            .local_artifact_mirror
            .as_ref()
            .map(|m| m.port)
            .filter(|&p| p > 0)
            .unwrap_or(network::DEFAULT_LOCAL_ARTIFACT_MIRROR_PORT)
    }
}

#[async_trait]
pub trait JoinTokenSource: Send + Sync {
    /// Fetch the join command from the admin console at `url` (`host:port`).
    async fn fetch(&self, url: &str, token: &str) -> ClusterResult<JoinCommand>;
}

/// Fetches join commands over HTTPS.
///
/// The admin console serves a self-signed certificate, so certificate
/// verification is off for this client.
pub struct HttpTokenSource {
    client: reqwest::Client,
}

impl HttpTokenSource {
    pub fn new() -> ClusterResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|e| ClusterError::Http(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

pub fn join_url(url: &str) -> String {
    format!("https://{url}{}", network::JOIN_COMMAND_PATH)
}

#[async_trait]
impl JoinTokenSource for HttpTokenSource {
    async fn fetch(&self, url: &str, token: &str) -> ClusterResult<JoinCommand> {
        let endpoint = join_url(url);
        tracing::debug!(endpoint = %endpoint, "fetching join command");

        let resp = self
            .client
            .get(&endpoint)
            .header(reqwest::header::AUTHORIZATION, token)
            .send()
            .await
            .map_err(|e| ClusterError::Http(format!("unable to get join token: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ClusterError::Http(format!(
                "unexpected status code: {}",
                status.as_u16()
            )));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| ClusterError::Http(format!("unable to read join token: {e}")))?;
        JoinCommand::parse(&body)
    }
}
