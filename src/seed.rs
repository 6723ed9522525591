//! Seed message publishing.
//!
//! Messages for one topic are sent strictly one after another, each send
//! waiting for the broker's acknowledgement, so the topic ends up holding
//! them in declared order. Different topics have no ordering relationship
//! and are published concurrently.

use crate::error::{Error, Result};
use crate::preset::Message;
use futures::future::try_join_all;
use std::time::Duration;
use testbed_kafka::{BrokerClient, Record};
use tokio::time::Instant;
use tracing::{debug, info};

/// Messages of one topic with their positions in the declared sequence.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct TopicBatch<'a> {
    pub(crate) topic: &'a str,
    pub(crate) messages: Vec<(usize, &'a Message)>,
}

/// Group messages by topic in first-appearance order, keeping relative
/// order inside each topic.
pub(crate) fn group_by_topic(messages: &[Message]) -> Vec<TopicBatch<'_>> {
    let mut batches: Vec<TopicBatch<'_>> = Vec::new();
    for (index, message) in messages.iter().enumerate() {
        match batches.iter_mut().find(|b| b.topic == message.topic) {
            Some(batch) => batch.messages.push((index, message)),
            None => batches.push(TopicBatch {
                topic: &message.topic,
                messages: vec![(index, message)],
            }),
        }
    }
    batches
}

/// Publish every message and flush the producer.
///
/// The first failed delivery cancels the other topics' in-flight sends and is
/// reported with the failing message's position in `messages`.
pub async fn publish_seed_messages(
    client: &dyn BrokerClient,
    messages: &[Message],
    deadline: Instant,
) -> Result<()> {
    if messages.is_empty() {
        debug!("No seed messages to publish");
        return Ok(());
    }

    let batches = group_by_topic(messages);
    try_join_all(batches.iter().map(|batch| publish_batch(client, batch))).await?;

    let remaining = deadline.saturating_duration_since(Instant::now());
    client
        .flush(remaining.max(Duration::from_millis(1)))
        .await
        .map_err(|e| Error::Seeding {
            topic: batches
                .iter()
                .map(|b| b.topic)
                .collect::<Vec<_>>()
                .join(", "),
            index: None,
            reason: e.to_string(),
        })?;

    info!(
        "Published {} seed message(s) to {} topic(s)",
        messages.len(),
        batches.len()
    );
    Ok(())
}

async fn publish_batch(client: &dyn BrokerClient, batch: &TopicBatch<'_>) -> Result<()> {
    for (index, message) in &batch.messages {
        let record = Record {
            topic: &message.topic,
            key: &message.key,
            value: &message.value,
            timestamp_ms: message.timestamp_ms(),
        };
        client.publish(record).await.map_err(|e| Error::Seeding {
            topic: batch.topic.to_string(),
            index: Some(*index),
            reason: e.to_string(),
        })?;
    }
    debug!(
        "Published {} message(s) to '{}'",
        batch.messages.len(),
        batch.topic
    );
    Ok(())
}
