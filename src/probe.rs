//! Readiness probing.
//!
//! A probe is an async attempt that either succeeds, fails in a way that may
//! clear up (connection refused while the container boots), or fails in a way
//! that never will. [`wait_until_ready`] retries transient failures at a fixed
//! interval and gives up at a deadline.

use crate::error::Error;
use crate::phase::Phase;
use std::future::Future;
use std::time::Duration;
use testbed_kafka::{BrokerClient, ClientError, ClusterMetadata};
use tokio::time::{sleep_until, timeout_at, Instant};
use tracing::{debug, info};

/// Upper bound for a single metadata request while probing.
const METADATA_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Why one probe attempt failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeFailure {
    /// Try again after the interval
    Transient(String),
    /// Stop probing
    Fatal(String),
}

impl From<ClientError> for ProbeFailure {
    fn from(err: ClientError) -> Self {
        if err.is_transient() {
            ProbeFailure::Transient(err.to_string())
        } else {
            ProbeFailure::Fatal(err.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    TimedOut {
        waited: Duration,
        attempts: u32,
        last_error: Option<String>,
    },
    Fatal(String),
}

impl ProbeError {
    /// Convert into a provisioning error. Timeouts name `phase`, fatal
    /// failures are built by `on_fatal`.
    pub(crate) fn into_error(self, phase: Phase, on_fatal: impl FnOnce(String) -> Error) -> Error {
        match self {
            ProbeError::TimedOut {
                waited, last_error, ..
            } => Error::StartupTimeout {
                phase,
                waited,
                last_error,
            },
            ProbeError::Fatal(reason) => on_fatal(reason),
        }
    }
}

/// Run `attempt` until it succeeds, a fatal failure occurs, or `deadline`
/// passes. Attempts are spaced `interval` apart and an attempt still running
/// at the deadline is dropped.
pub async fn wait_until_ready<T, F, Fut>(
    target: &str,
    deadline: Instant,
    interval: Duration,
    mut attempt: F,
) -> Result<T, ProbeError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProbeFailure>>,
{
    let started = Instant::now();
    let mut attempts = 0u32;
    let mut last_error: Option<String> = None;

    loop {
        if Instant::now() >= deadline {
            return Err(ProbeError::TimedOut {
                waited: started.elapsed(),
                attempts,
                last_error,
            });
        }

        attempts += 1;
        match timeout_at(deadline, attempt()).await {
            Ok(Ok(value)) => {
                info!(
                    "{} is ready after {} attempt(s) in {:?}",
                    target,
                    attempts,
                    started.elapsed()
                );
                return Ok(value);
            }
            Ok(Err(ProbeFailure::Fatal(reason))) => {
                debug!("{} probe failed permanently: {}", target, reason);
                return Err(ProbeError::Fatal(reason));
            }
            Ok(Err(ProbeFailure::Transient(reason))) => {
                debug!("{} not ready yet (attempt {}): {}", target, attempts, reason);
                last_error = Some(reason);
            }
            Err(_) => {
                // The attempt itself ran into the deadline
                return Err(ProbeError::TimedOut {
                    waited: started.elapsed(),
                    attempts,
                    last_error: last_error
                        .or_else(|| Some("probe attempt did not complete".to_string())),
                });
            }
        }

        sleep_until(deadline.min(Instant::now() + interval)).await;
    }
}

/// Wait until the broker answers a metadata request listing at least one
/// broker.
pub async fn wait_for_broker(
    client: &dyn BrokerClient,
    deadline: Instant,
    interval: Duration,
) -> Result<ClusterMetadata, ProbeError> {
    wait_until_ready("broker", deadline, interval, || async {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let metadata = client
            .fetch_metadata(remaining.min(METADATA_REQUEST_TIMEOUT))
            .await?;
        if metadata.brokers.is_empty() {
            return Err(ProbeFailure::Transient(
                "metadata response lists no brokers".to_string(),
            ));
        }
        Ok(metadata)
    })
    .await
}
