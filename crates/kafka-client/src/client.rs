//! Broker-facing operations used during provisioning

use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// One record to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Record<'a> {
    pub topic: &'a str,
    pub key: &'a str,
    pub value: &'a str,
    /// Record timestamp in milliseconds since epoch
    pub timestamp_ms: i64,
}

/// Outcome of a create-topic request that the broker did not reject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicCreation {
    Created,
    AlreadyExists,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerInfo {
    pub id: i32,
    pub host: String,
    pub port: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionMetadata {
    pub id: i32,
    /// Leader broker id, -1 while no leader is elected
    pub leader: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicMetadata {
    pub name: String,
    pub partitions: Vec<PartitionMetadata>,
    /// Topic-level error reported in the metadata response
    pub error: Option<String>,
}

impl TopicMetadata {
    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    /// Every partition has an elected leader and the topic carries no error.
    pub fn is_available(&self) -> bool {
        self.error.is_none()
            && !self.partitions.is_empty()
            && self.partitions.iter().all(|p| p.leader >= 0)
    }
}

/// Snapshot of cluster metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterMetadata {
    pub brokers: Vec<BrokerInfo>,
    pub topics: Vec<TopicMetadata>,
}

impl ClusterMetadata {
    pub fn topic(&self, name: &str) -> Option<&TopicMetadata> {
        self.topics.iter().find(|t| t.name == name)
    }

    /// Topics excluding Kafka's internal ones (`__consumer_offsets`, ...).
    pub fn user_topics(&self) -> impl Iterator<Item = &TopicMetadata> {
        self.topics.iter().filter(|t| !t.name.starts_with("__"))
    }
}

/// Admin and produce operations against one broker.
#[async_trait]
pub trait BrokerClient: Send + Sync {
    /// Lightweight connectivity check; succeeds once the broker answers a
    /// metadata request.
    async fn fetch_metadata(&self, timeout: Duration) -> Result<ClusterMetadata>;

    /// Create a topic with replication factor 1.
    async fn create_topic(&self, topic: &str, partitions: i32) -> Result<TopicCreation>;

    /// Produce one record and wait for the broker's acknowledgement.
    async fn publish(&self, record: Record<'_>) -> Result<()>;

    /// Wait until every outstanding record has been delivered.
    async fn flush(&self, timeout: Duration) -> Result<()>;

    /// Delete a topic. Unknown topics are an error.
    async fn delete_topic(&self, topic: &str) -> Result<()>;
}

/// Builds a client once the broker's address is known.
pub trait BrokerConnector: Send + Sync {
    fn connect(&self, bootstrap_servers: &str) -> Result<Arc<dyn BrokerClient>>;
}
