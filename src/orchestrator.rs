//! Provisioning pipeline.
//!
//! One call to [`Orchestrator::provision`] drives a single broker from nothing
//! to ready:
//!
//! 1. allocate host ports, create the instance network, start the broker
//! 2. probe broker metadata until it answers
//! 3. create topics and publish seed messages, while the schema registry
//!    (when enabled) starts and is probed alongside
//!
//! The whole pass runs under the preset timeout. If anything fails, every
//! container and the network are removed before the error is returned.

use crate::error::{Error, Result};
use crate::image::{broker_container_spec, registry_container_spec, BROKER_PORT};
use crate::instance::{KafkaInstance, Resources};
use crate::phase::{Phase, PhaseObserver, PhaseTracker};
use crate::preset::Preset;
use crate::probe::wait_for_broker;
use crate::registry::{start_registry, HealthCheck, HttpHealthCheck};
use crate::seed::publish_seed_messages;
use crate::topics::provision_topics;
use std::sync::Arc;
use testbed_container::{allocate_host_port, ContainerRuntime, DockerCli};
use testbed_kafka::{BrokerClient, BrokerConnector, RdKafkaConnector};
use tokio::time::{timeout_at, Instant};
use tracing::{info, warn};

/// What a successful pass hands over to [`KafkaInstance`].
struct Provisioned {
    broker_address: String,
    registry_address: Option<String>,
    client: Arc<dyn BrokerClient>,
}

/// Starts brokers through a container runtime and readies them with a broker
/// client.
#[derive(Clone)]
pub struct Orchestrator {
    runtime: Arc<dyn ContainerRuntime>,
    connector: Arc<dyn BrokerConnector>,
    health: Arc<dyn HealthCheck>,
    observer: Option<PhaseObserver>,
}

impl Orchestrator {
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        connector: Arc<dyn BrokerConnector>,
        health: Arc<dyn HealthCheck>,
    ) -> Self {
        Self {
            runtime,
            connector,
            health,
            observer: None,
        }
    }

    /// Docker containers, librdkafka clients and HTTP registry probes.
    pub fn docker() -> anyhow::Result<Self> {
        Ok(Self::new(
            Arc::new(DockerCli::new()),
            Arc::new(RdKafkaConnector::default()),
            Arc::new(HttpHealthCheck::new()?),
        ))
    }

    /// Call `observer` on every phase transition.
    pub fn with_observer(mut self, observer: impl Fn(Phase) + Send + Sync + 'static) -> Self {
        self.observer = Some(Arc::new(observer));
        self
    }

    pub async fn provision(&self, preset: Preset) -> Result<KafkaInstance> {
        let name = preset.container_name().to_string();
        let tracker = PhaseTracker::new(&name, self.observer.clone());
        let mut resources = Resources::new(Arc::clone(&self.runtime), format!("{name}-net"));

        let started = Instant::now();
        let deadline = started + preset.timeout();

        let outcome = match timeout_at(
            deadline,
            self.run(&preset, &tracker, &mut resources, deadline),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(Error::StartupTimeout {
                phase: tracker.current(),
                waited: started.elapsed(),
                last_error: None,
            }),
        };

        match outcome {
            Ok(provisioned) => {
                tracker.enter(Phase::Ready);
                info!(
                    "[{}] broker ready at {} in {:?}",
                    name,
                    provisioned.broker_address,
                    started.elapsed()
                );
                Ok(KafkaInstance::new(
                    name,
                    provisioned.broker_address,
                    provisioned.registry_address,
                    provisioned.client,
                    resources,
                ))
            }
            Err(err) => {
                tracker.enter(Phase::Failed);
                warn!("[{}] provisioning failed: {}", name, err);
                resources.log_tail().await;
                match resources.release().await {
                    Ok(()) => Err(err),
                    Err(teardown) => {
                        warn!("[{}] teardown failed: {:#}", name, teardown);
                        Err(Error::Teardown {
                            primary: Box::new(err),
                            teardown: format!("{teardown:#}"),
                        })
                    }
                }
            }
        }
    }

    async fn run(
        &self,
        preset: &Preset,
        tracker: &PhaseTracker,
        resources: &mut Resources,
        deadline: Instant,
    ) -> Result<Provisioned> {
        let name = preset.container_name();
        let interval = preset.probe_interval();

        tracker.enter(Phase::Starting);

        let broker_port = match preset.ports().broker {
            Some(port) => port,
            None => allocate_host_port().map_err(|e| Error::startup("broker", e))?,
        };
        let registry_port = match (preset.schema_registry(), preset.ports().registry) {
            (false, _) => None,
            (true, Some(port)) => Some(port),
            (true, None) => {
                Some(allocate_host_port().map_err(|e| Error::startup("schema registry", e))?)
            }
        };

        self.runtime
            .create_network(resources.network())
            .await
            .map_err(|e| Error::startup(format!("network {}", resources.network()), e))?;

        let broker_spec = broker_container_spec(
            name,
            preset.version(),
            preset.image(),
            resources.network(),
            broker_port,
        );
        resources.track(&broker_spec.name);
        let handle = self
            .runtime
            .start(&broker_spec)
            .await
            .map_err(|e| Error::startup("broker", e))?;
        let broker_address = handle.address(BROKER_PORT).ok_or_else(|| {
            Error::startup(
                "broker",
                anyhow::anyhow!("port {BROKER_PORT} was not published"),
            )
        })?;

        tracker.enter(Phase::ProbingBroker);
        let client = self
            .connector
            .connect(&broker_address)
            .map_err(|e| Error::startup("broker client", e))?;
        wait_for_broker(client.as_ref(), deadline, interval)
            .await
            .map_err(|e| {
                e.into_error(Phase::ProbingBroker, |reason| {
                    Error::startup("broker", anyhow::anyhow!(reason))
                })
            })?;

        let registry_spec = registry_port.map(|port| {
            registry_container_spec(&format!("{name}-registry"), resources.network(), port)
        });
        if let Some(spec) = &registry_spec {
            resources.track(&spec.name);
        }

        let topics_and_seed = async {
            tracker.enter(Phase::ProvisioningTopics);
            provision_topics(client.as_ref(), preset.topics(), deadline, interval).await?;
            tracker.leave(Phase::ProvisioningTopics);

            tracker.enter(Phase::SeedingMessages);
            publish_seed_messages(client.as_ref(), preset.messages(), deadline).await?;
            tracker.leave(Phase::SeedingMessages);
            Ok::<_, Error>(())
        };

        let registry = async {
            let Some(spec) = &registry_spec else {
                return Ok::<_, Error>(None);
            };
            tracker.enter(Phase::ProbingRegistry);
            let address = start_registry(
                self.runtime.as_ref(),
                self.health.as_ref(),
                spec,
                deadline,
                interval,
            )
            .await?;
            tracker.leave(Phase::ProbingRegistry);
            Ok(Some(address))
        };

        let ((), registry_address) = futures::try_join!(topics_and_seed, registry)?;

        Ok(Provisioned {
            broker_address,
            registry_address,
            client,
        })
    }
}

/// Provision `preset` with Docker and librdkafka.
pub async fn start(preset: Preset) -> Result<KafkaInstance> {
    let orchestrator = Orchestrator::docker().map_err(|e| Error::startup("orchestrator", e))?;
    orchestrator.provision(preset).await
}
