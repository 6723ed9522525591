//! Seed messages and seed files

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// A message published into a topic before the broker is handed out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub topic: String,
    pub key: String,
    pub value: String,
    /// Epoch nanoseconds. Anything below one millisecond truncates to a
    /// record timestamp of 0, which the producer replaces with the send time.
    pub time: i64,
}

impl Message {
    pub fn new(
        topic: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
        time: i64,
    ) -> Self {
        Self {
            topic: topic.into(),
            key: key.into(),
            value: value.into(),
            time,
        }
    }

    /// Message stamped with the current wall-clock time.
    pub fn now(topic: impl Into<String>, key: impl Into<String>, value: impl Into<String>) -> Self {
        let time = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
        Self::new(topic, key, value, time)
    }

    /// Kafka record timestamps have millisecond resolution.
    pub fn timestamp_ms(&self) -> i64 {
        self.time / 1_000_000
    }

    /// Whether the broker will store the send time instead of `time`.
    pub fn uses_send_time(&self) -> bool {
        self.timestamp_ms() == 0
    }
}

/// Read a seed file: a JSON array of `{topic, key, value, time}` objects.
///
/// Any read or parse problem is an error; a malformed file never yields an
/// empty message list.
pub fn load_messages_file(path: &Path) -> Result<Vec<Message>> {
    let content = fs::read_to_string(path).map_err(|e| {
        Error::configuration(format!("Failed to read messages file {path:?}: {e}"))
    })?;

    let messages: Vec<Message> = serde_json::from_str(&content).map_err(|e| {
        Error::configuration(format!("Failed to parse messages file {path:?}: {e}"))
    })?;

    tracing::debug!("Loaded {} seed messages from {:?}", messages.len(), path);
    Ok(messages)
}
