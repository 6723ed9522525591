//! Topic provisioning

use crate::error::{Error, Result};
use crate::phase::Phase;
use crate::preset::TopicConfig;
use crate::probe::{wait_until_ready, ProbeFailure};
use futures::future::join_all;
use std::collections::HashSet;
use std::time::Duration;
use testbed_kafka::{BrokerClient, ClientError, ClusterMetadata, TopicCreation};
use tokio::time::Instant;
use tracing::{debug, info, warn};

const METADATA_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Create every topic, then wait until the broker reports each one with its
/// full partition count and a leader for every partition.
///
/// Creation requests run concurrently and all of them finish before this
/// returns. A topic that already exists is accepted only when its partition
/// count matches the requested one. Transient broker errors are retried until
/// `deadline`.
pub async fn provision_topics(
    client: &dyn BrokerClient,
    topics: &[TopicConfig],
    deadline: Instant,
    interval: Duration,
) -> Result<()> {
    if topics.is_empty() {
        debug!("No topics to create");
        return Ok(());
    }

    let outcomes = join_all(
        topics
            .iter()
            .map(|topic| create_topic(client, topic, deadline, interval)),
    )
    .await;

    let mut preexisting = HashSet::new();
    for (topic, outcome) in topics.iter().zip(outcomes) {
        match outcome? {
            TopicCreation::Created => info!(
                "Created topic '{}' with {} partition(s)",
                topic.topic, topic.num_partitions
            ),
            TopicCreation::AlreadyExists => {
                warn!("Topic '{}' already exists", topic.topic);
                preexisting.insert(topic.topic.as_str());
            }
        }
    }

    wait_until_ready("topics", deadline, interval, || async {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let metadata = client
            .fetch_metadata(remaining.min(METADATA_REQUEST_TIMEOUT))
            .await?;
        check_topics(&metadata, topics, &preexisting)
    })
    .await
    .map_err(|e| {
        e.into_error(Phase::ProvisioningTopics, |reason| Error::Provisioning {
            topic: topic_list(topics),
            reason,
        })
    })
}

async fn create_topic(
    client: &dyn BrokerClient,
    topic: &TopicConfig,
    deadline: Instant,
    interval: Duration,
) -> Result<TopicCreation> {
    let target = format!("topic '{}'", topic.topic);
    wait_until_ready(&target, deadline, interval, || async {
        client
            .create_topic(&topic.topic, topic.num_partitions)
            .await
            .map_err(ProbeFailure::from)
    })
    .await
    .map_err(|e| {
        e.into_error(Phase::ProvisioningTopics, |reason| Error::Provisioning {
            topic: topic.topic.clone(),
            reason,
        })
    })
}

/// Transient while any topic is missing or still electing leaders, fatal when
/// a preexisting topic has the wrong partition count.
fn check_topics(
    metadata: &ClusterMetadata,
    topics: &[TopicConfig],
    preexisting: &HashSet<&str>,
) -> std::result::Result<(), ProbeFailure> {
    for wanted in topics {
        let Some(actual) = metadata.topic(&wanted.topic) else {
            return Err(ProbeFailure::Transient(format!(
                "topic '{}' not in metadata yet",
                wanted.topic
            )));
        };

        let expected = wanted.num_partitions as usize;
        let count = actual.partition_count();
        if count != expected && count > 0 && preexisting.contains(wanted.topic.as_str()) {
            return Err(ProbeFailure::Fatal(format!(
                "topic '{}' already exists with {} partition(s), expected {}",
                wanted.topic, count, expected
            )));
        }

        if count != expected || !actual.is_available() {
            return Err(ProbeFailure::Transient(format!(
                "topic '{}' has {}/{} partition(s) with leaders",
                wanted.topic,
                actual.partitions.iter().filter(|p| p.leader >= 0).count(),
                expected
            )));
        }
    }
    Ok(())
}

fn topic_list(topics: &[TopicConfig]) -> String {
    topics
        .iter()
        .map(|t| t.topic.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Delete topics one by one; the first failure stops the sequence.
pub async fn delete_topics(
    client: &dyn BrokerClient,
    topics: &[&str],
) -> std::result::Result<(), ClientError> {
    for topic in topics {
        client.delete_topic(topic).await?;
        info!("Deleted topic '{}'", topic);
    }
    Ok(())
}
