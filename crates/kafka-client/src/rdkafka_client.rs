//! `BrokerClient` backed by librdkafka

use crate::client::{
    BrokerClient, BrokerConnector, BrokerInfo, ClusterMetadata, PartitionMetadata, Record,
    TopicCreation, TopicMetadata,
};
use crate::error::{ClientError, Result};
use async_trait::async_trait;
use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication};
use rdkafka::client::DefaultClientContext;
use rdkafka::metadata::Metadata;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::types::RDKafkaErrorCode;
use rdkafka::ClientConfig;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Timeouts applied to admin and produce calls.
#[derive(Debug, Clone, Copy)]
pub struct ClientTimeouts {
    /// Broker-side timeout for create/delete topic requests
    pub operation: Duration,
    /// Upper bound on waiting for one delivery report
    pub delivery: Duration,
}

impl Default for ClientTimeouts {
    fn default() -> Self {
        Self {
            operation: Duration::from_secs(10),
            delivery: Duration::from_secs(30),
        }
    }
}

/// Admin client and idempotent producer sharing one bootstrap address.
pub struct RdKafkaClient {
    admin: Arc<AdminClient<DefaultClientContext>>,
    producer: FutureProducer,
    bootstrap_servers: String,
    timeouts: ClientTimeouts,
}

impl RdKafkaClient {
    /// Create the underlying clients. librdkafka connects lazily, so this
    /// succeeds even while the broker is still starting.
    pub fn new(bootstrap_servers: &str, timeouts: ClientTimeouts) -> Result<Self> {
        let admin: AdminClient<DefaultClientContext> = ClientConfig::new()
            .set("bootstrap.servers", bootstrap_servers)
            .create()?;

        // acks=all + idempotence keeps broker-side order equal to send order
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", bootstrap_servers)
            .set("acks", "all")
            .set("enable.idempotence", "true")
            .set("linger.ms", "0")
            .set(
                "message.timeout.ms",
                timeouts.delivery.as_millis().to_string(),
            )
            .create()?;

        Ok(Self {
            admin: Arc::new(admin),
            producer,
            bootstrap_servers: bootstrap_servers.to_string(),
            timeouts,
        })
    }

    pub fn bootstrap_servers(&self) -> &str {
        &self.bootstrap_servers
    }

    fn admin_options(&self) -> AdminOptions {
        AdminOptions::new().operation_timeout(Some(self.timeouts.operation))
    }
}

fn convert_metadata(metadata: &Metadata) -> ClusterMetadata {
    ClusterMetadata {
        brokers: metadata
            .brokers()
            .iter()
            .map(|b| BrokerInfo {
                id: b.id(),
                host: b.host().to_string(),
                port: b.port(),
            })
            .collect(),
        topics: metadata
            .topics()
            .iter()
            .map(|t| TopicMetadata {
                name: t.name().to_string(),
                partitions: t
                    .partitions()
                    .iter()
                    .map(|p| PartitionMetadata {
                        id: p.id(),
                        leader: p.leader(),
                    })
                    .collect(),
                error: t.error().map(|e| format!("{e:?}")),
            })
            .collect(),
    }
}

#[async_trait]
impl BrokerClient for RdKafkaClient {
    async fn fetch_metadata(&self, timeout: Duration) -> Result<ClusterMetadata> {
        let admin = Arc::clone(&self.admin);
        // fetch_metadata blocks the calling thread until the broker answers
        let metadata =
            tokio::task::spawn_blocking(move || admin.inner().fetch_metadata(None, timeout))
                .await??;

        Ok(convert_metadata(&metadata))
    }

    async fn create_topic(&self, topic: &str, partitions: i32) -> Result<TopicCreation> {
        let new_topic = NewTopic::new(topic, partitions, TopicReplication::Fixed(1));
        let results = self
            .admin
            .create_topics(&[new_topic], &self.admin_options())
            .await?;

        match results.into_iter().next() {
            Some(Ok(topic_name)) => {
                debug!("Topic '{}' created with {} partitions", topic_name, partitions);
                Ok(TopicCreation::Created)
            }
            Some(Err((topic_name, RDKafkaErrorCode::TopicAlreadyExists))) => {
                debug!("Topic '{}' already exists", topic_name);
                Ok(TopicCreation::AlreadyExists)
            }
            Some(Err((topic_name, code))) => Err(ClientError::Topic {
                topic: topic_name,
                code,
            }),
            None => Err(ClientError::EmptyResponse(format!("create topic {topic}"))),
        }
    }

    async fn publish(&self, record: Record<'_>) -> Result<()> {
        let future_record = FutureRecord::to(record.topic)
            .key(record.key)
            .payload(record.value)
            .timestamp(record.timestamp_ms);

        self.producer
            .send(future_record, self.timeouts.delivery)
            .await
            .map_err(|(err, _)| err)?;

        debug!("Delivered record with key '{}' to '{}'", record.key, record.topic);
        Ok(())
    }

    async fn flush(&self, timeout: Duration) -> Result<()> {
        let producer = self.producer.clone();
        tokio::task::spawn_blocking(move || producer.flush(timeout)).await??;
        Ok(())
    }

    async fn delete_topic(&self, topic: &str) -> Result<()> {
        let results = self
            .admin
            .delete_topics(&[topic], &self.admin_options())
            .await?;

        match results.into_iter().next() {
            Some(Ok(topic_name)) => {
                debug!("Topic '{}' deleted", topic_name);
                Ok(())
            }
            Some(Err((topic_name, code))) => Err(ClientError::Topic {
                topic: topic_name,
                code,
            }),
            None => Err(ClientError::EmptyResponse(format!("delete topic {topic}"))),
        }
    }
}

/// Connects [`RdKafkaClient`]s with a fixed set of timeouts.
#[derive(Debug, Clone, Copy, Default)]
pub struct RdKafkaConnector {
    pub timeouts: ClientTimeouts,
}

impl BrokerConnector for RdKafkaConnector {
    fn connect(&self, bootstrap_servers: &str) -> Result<Arc<dyn BrokerClient>> {
        Ok(Arc::new(RdKafkaClient::new(
            bootstrap_servers,
            self.timeouts,
        )?))
    }
}
