//! Schema registry side-car

use crate::error::{Error, Result};
use crate::image::SCHEMA_REGISTRY_PORT;
use crate::phase::Phase;
use crate::probe::{wait_until_ready, ProbeFailure};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use testbed_container::{ContainerRuntime, ContainerSpec};
use tokio::time::Instant;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// One readiness check against an HTTP side-car.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn check(&self, address: &str) -> std::result::Result<(), ProbeFailure>;
}

/// `GET http://<address>/` must answer 200. Everything else, connection
/// errors included, means "not yet".
#[derive(Debug, Clone)]
pub struct HttpHealthCheck {
    client: Client,
}

impl HttpHealthCheck {
    pub fn new() -> anyhow::Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HealthCheck for HttpHealthCheck {
    async fn check(&self, address: &str) -> std::result::Result<(), ProbeFailure> {
        let url = format!("http://{address}/");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProbeFailure::Transient(format!("GET {url} failed: {e}")))?;

        match response.status() {
            StatusCode::OK => Ok(()),
            status => Err(ProbeFailure::Transient(format!(
                "GET {url} returned {status}"
            ))),
        }
    }
}

/// Start the registry container and wait until it answers health checks.
/// Returns the host address of the registry.
pub async fn start_registry(
    runtime: &dyn ContainerRuntime,
    health: &dyn HealthCheck,
    spec: &ContainerSpec,
    deadline: Instant,
    interval: Duration,
) -> Result<String> {
    let handle = runtime
        .start(spec)
        .await
        .map_err(|e| Error::startup("schema registry", e))?;

    let address = handle.address(SCHEMA_REGISTRY_PORT).ok_or_else(|| {
        Error::startup(
            "schema registry",
            anyhow::anyhow!("port {SCHEMA_REGISTRY_PORT} was not published"),
        )
    })?;

    wait_until_ready("schema registry", deadline, interval, || {
        health.check(&address)
    })
    .await
    .map_err(|e| {
        e.into_error(Phase::ProbingRegistry, |reason| {
            Error::startup("schema registry", anyhow::anyhow!(reason))
        })
    })?;

    Ok(address)
}
