//! In-memory broker

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use testbed_kafka::{
    BrokerClient, BrokerConnector, BrokerInfo, ClientError, ClusterMetadata, KafkaError,
    PartitionMetadata, RDKafkaErrorCode, Record, Result, TopicCreation, TopicMetadata,
};

/// A record as the fake broker stored it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    pub key: String,
    pub value: String,
    pub timestamp_ms: i64,
}

struct Topic {
    partitions: i32,
    records: Vec<StoredRecord>,
    /// Metadata requests left before partitions report a leader
    electing: u32,
}

#[derive(Default)]
struct State {
    topics: BTreeMap<String, Topic>,
    connected: Vec<String>,
    /// Metadata requests that fail with a connection error first
    booting: u32,
    never_ready: bool,
    metadata_fatal: Option<RDKafkaErrorCode>,
    metadata_requests: u32,
    election_polls: u32,
    create_failures: HashMap<String, RDKafkaErrorCode>,
    create_calls: Vec<String>,
    /// (topic, position within topic) -> error
    publish_failures: HashMap<(String, usize), RDKafkaErrorCode>,
    publish_delay: Duration,
    publish_log: Vec<(String, String)>,
    flushes: u32,
}

/// Broker stand-in implementing both [`BrokerClient`] and
/// [`BrokerConnector`]. Clones share state, so a test keeps one clone to
/// inspect what the orchestrator did.
#[derive(Clone, Default)]
pub struct FakeBroker {
    state: Arc<Mutex<State>>,
}

impl FakeBroker {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Refuse the first `attempts` metadata requests like a booting broker.
    pub fn booting_for(self, attempts: u32) -> Self {
        self.state().booting = attempts;
        self
    }

    /// Never answer metadata requests successfully.
    pub fn never_ready(self) -> Self {
        self.state().never_ready = true;
        self
    }

    /// Fail metadata requests with a non-retryable error.
    pub fn metadata_fails_with(self, code: RDKafkaErrorCode) -> Self {
        self.state().metadata_fatal = Some(code);
        self
    }

    /// New topics report no partition leader for this many metadata requests.
    pub fn leader_election_polls(self, polls: u32) -> Self {
        self.state().election_polls = polls;
        self
    }

    /// A topic that exists before provisioning starts.
    pub fn with_existing_topic(self, name: &str, partitions: i32) -> Self {
        self.state().topics.insert(
            name.to_string(),
            Topic {
                partitions,
                records: Vec::new(),
                electing: 0,
            },
        );
        self
    }

    pub fn fail_create_of(self, topic: &str, code: RDKafkaErrorCode) -> Self {
        self.state().create_failures.insert(topic.to_string(), code);
        self
    }

    /// Reject the `position`-th record (0-based) sent to `topic`.
    pub fn fail_publish_of(self, topic: &str, position: usize, code: RDKafkaErrorCode) -> Self {
        self.state()
            .publish_failures
            .insert((topic.to_string(), position), code);
        self
    }

    /// Delay every acknowledgement, so topics interleave.
    pub fn publish_delay(self, delay: Duration) -> Self {
        self.state().publish_delay = delay;
        self
    }

    /// Bootstrap addresses clients were created for.
    pub fn connected(&self) -> Vec<String> {
        self.state().connected.clone()
    }

    /// Topic names with their partition counts.
    pub fn topics(&self) -> BTreeMap<String, i32> {
        self.state()
            .topics
            .iter()
            .map(|(name, topic)| (name.clone(), topic.partitions))
            .collect()
    }

    pub fn records(&self, topic: &str) -> Vec<StoredRecord> {
        self.state()
            .topics
            .get(topic)
            .map(|t| t.records.clone())
            .unwrap_or_default()
    }

    /// `(topic, key)` of every acknowledged record across topics.
    pub fn publish_log(&self) -> Vec<(String, String)> {
        self.state().publish_log.clone()
    }

    pub fn create_calls(&self) -> Vec<String> {
        self.state().create_calls.clone()
    }

    pub fn metadata_requests(&self) -> u32 {
        self.state().metadata_requests
    }

    pub fn flushes(&self) -> u32 {
        self.state().flushes
    }
}

/// librdkafka treats a record timestamp of 0 as "now".
fn stored_timestamp(timestamp_ms: i64) -> i64 {
    if timestamp_ms == 0 {
        chrono::Utc::now().timestamp_millis()
    } else {
        timestamp_ms
    }
}

fn transport_failure() -> ClientError {
    ClientError::Kafka(KafkaError::MetadataFetch(
        RDKafkaErrorCode::BrokerTransportFailure,
    ))
}

#[async_trait]
impl BrokerClient for FakeBroker {
    async fn fetch_metadata(&self, _timeout: Duration) -> Result<ClusterMetadata> {
        let mut state = self.state();
        state.metadata_requests += 1;

        if let Some(code) = state.metadata_fatal {
            return Err(ClientError::Kafka(KafkaError::MetadataFetch(code)));
        }
        if state.never_ready {
            return Err(transport_failure());
        }
        if state.booting > 0 {
            state.booting -= 1;
            return Err(transport_failure());
        }

        let topics = state
            .topics
            .iter_mut()
            .map(|(name, topic)| {
                let leader = if topic.electing > 0 {
                    topic.electing -= 1;
                    -1
                } else {
                    1
                };
                TopicMetadata {
                    name: name.clone(),
                    partitions: (0..topic.partitions)
                        .map(|id| PartitionMetadata { id, leader })
                        .collect(),
                    error: None,
                }
            })
            .collect();

        Ok(ClusterMetadata {
            brokers: vec![BrokerInfo {
                id: 1,
                host: "127.0.0.1".to_string(),
                port: 9092,
            }],
            topics,
        })
    }

    async fn create_topic(&self, topic: &str, partitions: i32) -> Result<TopicCreation> {
        let mut state = self.state();
        state.create_calls.push(topic.to_string());

        if let Some(code) = state.create_failures.get(topic) {
            return Err(ClientError::Topic {
                topic: topic.to_string(),
                code: *code,
            });
        }
        if state.topics.contains_key(topic) {
            return Ok(TopicCreation::AlreadyExists);
        }

        let electing = state.election_polls;
        state.topics.insert(
            topic.to_string(),
            Topic {
                partitions,
                records: Vec::new(),
                electing,
            },
        );
        Ok(TopicCreation::Created)
    }

    async fn publish(&self, record: Record<'_>) -> Result<()> {
        let delay = self.state().publish_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state();
        let position = match state.topics.get(record.topic) {
            Some(topic) => topic.records.len(),
            None => {
                return Err(ClientError::Kafka(KafkaError::MessageProduction(
                    RDKafkaErrorCode::UnknownTopicOrPartition,
                )))
            }
        };
        if let Some(code) = state
            .publish_failures
            .get(&(record.topic.to_string(), position))
        {
            return Err(ClientError::Kafka(KafkaError::MessageProduction(*code)));
        }

        state
            .publish_log
            .push((record.topic.to_string(), record.key.to_string()));
        if let Some(topic) = state.topics.get_mut(record.topic) {
            topic.records.push(StoredRecord {
                key: record.key.to_string(),
                value: record.value.to_string(),
                timestamp_ms: stored_timestamp(record.timestamp_ms),
            });
        }
        Ok(())
    }

    async fn flush(&self, _timeout: Duration) -> Result<()> {
        self.state().flushes += 1;
        Ok(())
    }

    async fn delete_topic(&self, topic: &str) -> Result<()> {
        match self.state().topics.remove(topic) {
            Some(_) => Ok(()),
            None => Err(ClientError::Topic {
                topic: topic.to_string(),
                code: RDKafkaErrorCode::UnknownTopicOrPartition,
            }),
        }
    }
}

impl BrokerConnector for FakeBroker {
    fn connect(&self, bootstrap_servers: &str) -> Result<Arc<dyn BrokerClient>> {
        self.state().connected.push(bootstrap_servers.to_string());
        Ok(Arc::new(self.clone()))
    }
}
