//! Topic declarations and their merge rules

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Kafka's limit on topic name length.
const MAX_TOPIC_NAME_LEN: usize = 249;

/// A topic with an explicit partition count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicConfig {
    pub topic: String,
    pub num_partitions: i32,
}

impl TopicConfig {
    pub fn new(topic: impl Into<String>, num_partitions: i32) -> Self {
        Self {
            topic: topic.into(),
            num_partitions,
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_topic_name(&self.topic)?;
        if self.num_partitions < 1 {
            return Err(Error::configuration(format!(
                "Topic '{}' must have at least 1 partition, got {}",
                self.topic, self.num_partitions
            )));
        }
        Ok(())
    }
}

/// Apply the broker's topic naming rules up front, so an invalid name fails
/// before a container is started.
pub fn validate_topic_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::configuration("Topic name must not be empty"));
    }
    if name.len() > MAX_TOPIC_NAME_LEN {
        return Err(Error::configuration(format!(
            "Topic name '{name}' is longer than {MAX_TOPIC_NAME_LEN} characters"
        )));
    }
    if name == "." || name == ".." {
        return Err(Error::configuration(format!(
            "Topic name '{name}' is not allowed"
        )));
    }
    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')))
    {
        return Err(Error::configuration(format!(
            "Topic name '{name}' contains illegal character '{c}'"
        )));
    }
    Ok(())
}

/// Accumulates topic declarations, one entry per name.
///
/// Name-only declarations default to one partition and never change an
/// existing entry. An explicit declaration always sets the partition count,
/// so it overrides a name-only one and the last explicit one wins.
#[derive(Debug, Clone, Default)]
pub(crate) struct TopicSet {
    topics: Vec<TopicConfig>,
}

impl TopicSet {
    fn position(&self, name: &str) -> Option<usize> {
        self.topics.iter().position(|t| t.topic == name)
    }

    pub(crate) fn declare_name(&mut self, name: &str) {
        if self.position(name).is_none() {
            self.topics.push(TopicConfig::new(name, 1));
        }
    }

    pub(crate) fn declare_config(&mut self, config: TopicConfig) {
        match self.position(&config.topic) {
            Some(idx) => self.topics[idx] = config,
            None => self.topics.push(config),
        }
    }

    /// Validated topics in first-declaration order.
    pub(crate) fn freeze(self) -> Result<Vec<TopicConfig>> {
        for topic in &self.topics {
            topic.validate()?;
        }
        Ok(self.topics)
    }
}
