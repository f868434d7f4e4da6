//! Installation telemetry.
//!
//! Reporting is best-effort: [`report`] logs and drops every reporter
//! failure so it can never hide the error of the phase being reported.

mod http;

pub use http::HttpMetricsReporter;

use async_trait::async_trait;
use embedded_cluster_shared::errors::ClusterResult;
use uuid::Uuid;

/// Where events go and which installation they belong to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsTarget {
    pub base_url: String,
    pub cluster_id: Uuid,
    pub binary_name: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetricsEvent {
    ApplyStarted,
    PhaseStarted {
        phase: &'static str,
    },
    PhaseFinished {
        phase: &'static str,
        error: Option<String>,
    },
    ApplyFinished {
        error: Option<String>,
    },
    JoinStarted {
        node_name: String,
    },
    JoinFinished {
        node_name: String,
        error: Option<String>,
    },
}

impl MetricsEvent {
    /// Error carried by a finishing event, if any.
    pub fn error(&self) -> Option<&str> {
        match self {
            MetricsEvent::PhaseFinished { error, .. }
            | MetricsEvent::ApplyFinished { error }
            | MetricsEvent::JoinFinished { error, .. } => error.as_deref(),
            _ => None,
        }
    }
}

#[async_trait]
pub trait MetricsReporter: Send + Sync {
    async fn report(&self, target: &MetricsTarget, event: &MetricsEvent) -> ClusterResult<()>;
}

/// Send `event`, logging and swallowing any failure.
pub async fn report(reporter: &dyn MetricsReporter, target: &MetricsTarget, event: MetricsEvent) {
    if let Err(e) = reporter.report(target, &event).await {
        tracing::debug!(error = %e, event = ?event, "unable to report metrics event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_cluster_shared::errors::ClusterError;

    struct Broken;

    #[async_trait]
    impl MetricsReporter for Broken {
        async fn report(&self, _: &MetricsTarget, _: &MetricsEvent) -> ClusterResult<()> {
            Err(ClusterError::Http("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn test_report_swallows_errors() {
        let target = MetricsTarget {
            base_url: "http://127.0.0.1:1".into(),
            cluster_id: Uuid::new_v4(),
            binary_name: "embedded-cluster".into(),
            version: "1.0.0".into(),
        };
        report(&Broken, &target, MetricsEvent::ApplyStarted).await;
    }

    #[test]
    fn test_event_error() {
        let ev = MetricsEvent::ApplyFinished {
            error: Some("boom".into()),
        };
        assert_eq!(ev.error(), Some("boom"));
        assert_eq!(MetricsEvent::ApplyStarted.error(), None);
    }
}
