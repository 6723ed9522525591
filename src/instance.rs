//! A provisioned, ready broker.

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use testbed_container::ContainerRuntime;
use testbed_kafka::BrokerClient;
use tracing::{debug, info, warn};

/// Containers and network owned by one instance.
pub(crate) struct Resources {
    runtime: Arc<dyn ContainerRuntime>,
    network: String,
    /// In start order; released in reverse
    containers: Vec<String>,
}

impl Resources {
    pub(crate) fn new(runtime: Arc<dyn ContainerRuntime>, network: String) -> Self {
        Self {
            runtime,
            network,
            containers: Vec::new(),
        }
    }

    pub(crate) fn network(&self) -> &str {
        &self.network
    }

    pub(crate) fn track(&mut self, container: &str) {
        self.containers.push(container.to_string());
    }

    /// Stop every container and remove the network. Every step is attempted
    /// and all failures are reported together.
    pub(crate) async fn release(&self) -> Result<()> {
        let mut failures = Vec::new();

        for name in self.containers.iter().rev() {
            if let Err(e) = self.runtime.stop(name).await {
                failures.push(format!("{name}: {e:#}"));
            }
        }
        if let Err(e) = self.runtime.remove_network(&self.network).await {
            failures.push(format!("{}: {e:#}", self.network));
        }

        if failures.is_empty() {
            debug!("Released {} container(s)", self.containers.len());
            Ok(())
        } else {
            anyhow::bail!(failures.join("; "))
        }
    }

    /// Last container logs, for diagnosing a failed start.
    pub(crate) async fn log_tail(&self) {
        for name in &self.containers {
            match self.runtime.logs(name).await {
                Ok(logs) => debug!("Logs of {}:\n{}", name, logs),
                Err(e) => debug!("Could not read logs of {}: {:#}", name, e),
            }
        }
    }

    fn reap(&self) {
        let network = self.network.as_str();
        self.runtime.reap(&self.containers, Some(network));
    }
}

/// A broker that reached the ready state: topics exist, seed messages are
/// readable, and the registry (if requested) answers.
///
/// Call [`KafkaInstance::stop`] when done. Dropping an instance that was not
/// stopped removes its containers synchronously.
pub struct KafkaInstance {
    name: String,
    broker_address: String,
    registry_address: Option<String>,
    ready_since: DateTime<Utc>,
    client: Arc<dyn BrokerClient>,
    resources: Resources,
    stopped: bool,
}

impl std::fmt::Debug for KafkaInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KafkaInstance")
            .field("name", &self.name)
            .field("broker_address", &self.broker_address)
            .field("registry_address", &self.registry_address)
            .field("ready_since", &self.ready_since)
            .finish()
    }
}

impl KafkaInstance {
    pub(crate) fn new(
        name: String,
        broker_address: String,
        registry_address: Option<String>,
        client: Arc<dyn BrokerClient>,
        resources: Resources,
    ) -> Self {
        Self {
            name,
            broker_address,
            registry_address,
            ready_since: Utc::now(),
            client,
            resources,
            stopped: false,
        }
    }

    /// Broker container name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `host:port` of the broker's external listener.
    pub fn address(&self) -> &str {
        &self.broker_address
    }

    /// `host:port` of the schema registry, when it was requested.
    pub fn registry_address(&self) -> Option<&str> {
        self.registry_address.as_deref()
    }

    pub fn ready_since(&self) -> DateTime<Utc> {
        self.ready_since
    }

    /// The client used during provisioning, still connected.
    pub fn client(&self) -> Arc<dyn BrokerClient> {
        Arc::clone(&self.client)
    }

    /// Delete topics in order. Deleting an unknown topic is an error.
    pub async fn delete_topics(&self, topics: &[&str]) -> testbed_kafka::Result<()> {
        crate::topics::delete_topics(self.client.as_ref(), topics).await
    }

    /// Stop every container and remove the instance network.
    pub async fn stop(mut self) -> Result<()> {
        self.stopped = true;
        info!("[{}] stopping", self.name);
        self.resources.release().await
    }
}

impl Drop for KafkaInstance {
    fn drop(&mut self) {
        if !self.stopped {
            warn!(
                "[{}] dropped without stop(), removing containers",
                self.name
            );
            self.resources.reap();
        }
    }
}
