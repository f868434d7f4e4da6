//! Waiting for the distribution to come up.

use crate::util::{CommandRunner, CommandSpec};
use embedded_cluster_shared::constants::readiness;
use embedded_cluster_shared::errors::{ClusterError, ClusterResult};
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Fixed-interval, bounded polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval: readiness::POLL_INTERVAL,
            max_attempts: readiness::MAX_ATTEMPTS,
        }
    }
}

impl RetryPolicy {
    /// Longest time a wait under this policy can take.
    pub fn budget(&self) -> Duration {
        self.interval * self.max_attempts
    }
}

/// Polls for the status socket, then confirms with `k0s status`.
pub struct ReadinessWaiter<'a> {
    policy: RetryPolicy,
    runner: &'a dyn CommandRunner,
}

impl<'a> ReadinessWaiter<'a> {
    pub fn new(policy: RetryPolicy, runner: &'a dyn CommandRunner) -> Self {
        Self { policy, runner }
    }

    pub async fn wait(
        &self,
        socket: &Path,
        k0s: &Path,
        cancel: &CancellationToken,
    ) -> ClusterResult<()> {
        tracing::info!("Waiting for node to be ready");

        let mut ready = false;
        for attempt in 1..=self.policy.max_attempts {
            tokio::select! {
                _ = cancel.cancelled() => return Err(ClusterError::Cancelled),
                _ = tokio::time::sleep(self.policy.interval) => {}
            }
            if socket.exists() {
                ready = true;
                break;
            }
            tracing::trace!(attempt, socket = %socket.display(), "status socket not there yet");
        }

        if !ready {
            return Err(ClusterError::Timeout {
                resource: socket.display().to_string(),
                waited: self.policy.budget(),
            });
        }

        self.runner
            .run(&CommandSpec::new(k0s).arg("status"))
            .await?;
        tracing::info!("Node installation finished");
        Ok(())
    }
}
