//! HTTP transport for installation events.

use super::{MetricsEvent, MetricsReporter, MetricsTarget};
use async_trait::async_trait;
use embedded_cluster_shared::errors::{ClusterError, ClusterResult};
use serde::Serialize;
use std::time::Duration;
use uuid::Uuid;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Posts events to `{base_url}/embedded_cluster_metrics/{EventName}`.
///
/// Phase events have no remote counterpart and are only traced.
pub struct HttpMetricsReporter {
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EventBody<'a> {
    #[serde(rename = "clusterID")]
    cluster_id: Uuid,
    version: &'a str,
    binary_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    node_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct Envelope<'a> {
    event: EventBody<'a>,
}

impl HttpMetricsReporter {
    pub fn new() -> ClusterResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ClusterError::Http(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

/// Remote event name, or `None` for events that stay local.
fn event_name(event: &MetricsEvent) -> Option<&'static str> {
    match event {
        MetricsEvent::ApplyStarted => Some("InstallationStarted"),
        MetricsEvent::ApplyFinished { error: None } => Some("InstallationSucceeded"),
        MetricsEvent::ApplyFinished { error: Some(_) } => Some("InstallationFailed"),
        MetricsEvent::JoinStarted { .. } => Some("JoinStarted"),
        MetricsEvent::JoinFinished { error: None, .. } => Some("JoinSucceeded"),
        MetricsEvent::JoinFinished { error: Some(_), .. } => Some("JoinFailed"),
        MetricsEvent::PhaseStarted { .. } | MetricsEvent::PhaseFinished { .. } => None,
    }
}

#[async_trait]
impl MetricsReporter for HttpMetricsReporter {
    async fn report(&self, target: &MetricsTarget, event: &MetricsEvent) -> ClusterResult<()> {
        let Some(name) = event_name(event) else {
            tracing::debug!(event = ?event, "phase event");
            return Ok(());
        };

        let node_name = match event {
            MetricsEvent::JoinStarted { node_name } | MetricsEvent::JoinFinished { node_name, .. } => {
                Some(node_name.as_str())
            }
            _ => None,
        };
        let body = Envelope {
            event: EventBody {
                cluster_id: target.cluster_id,
                version: &target.version,
                binary_name: &target.binary_name,
                node_name,
                reason: event.error(),
            },
        };

        let url = format!(
            "{}/embedded_cluster_metrics/{name}",
            target.base_url.trim_end_matches('/')
        );
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ClusterError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ClusterError::Http(format!(
                "metrics endpoint {url} returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names() {
        assert_eq!(event_name(&MetricsEvent::ApplyStarted), Some("InstallationStarted"));
        assert_eq!(
            event_name(&MetricsEvent::ApplyFinished {
                error: Some("x".into())
            }),
            Some("InstallationFailed")
        );
        assert_eq!(
            event_name(&MetricsEvent::JoinFinished {
                node_name: "n".into(),
                error: None
            }),
            Some("JoinSucceeded")
        );
        assert_eq!(
            event_name(&MetricsEvent::PhaseStarted { phase: "Installing" }),
            None
        );
    }

    #[test]
    fn test_body_shape() {
        let id = Uuid::nil();
        let body = Envelope {
            event: EventBody {
                cluster_id: id,
                version: "1.2.3",
                binary_name: "my-app",
                node_name: None,
                reason: Some("boom"),
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["event"]["clusterID"], id.to_string());
        assert_eq!(json["event"]["binaryName"], "my-app");
        assert_eq!(json["event"]["reason"], "boom");
        assert!(json["event"].get("nodeName").is_none());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_error() {
        let reporter = HttpMetricsReporter::new().unwrap();
        let target = MetricsTarget {
            base_url: "http://127.0.0.1:1".into(),
            cluster_id: Uuid::new_v4(),
            binary_name: "embedded-cluster".into(),
            version: "1.0.0".into(),
        };
        let err = reporter
            .report(&target, &MetricsEvent::ApplyStarted)
            .await
            .unwrap_err();
        assert!(matches!(err, ClusterError::Http(_)));
    }
}
