//! Declarative description of the broker to provision.
//!
//! A [`PresetBuilder`] accumulates options in call order and [`PresetBuilder::build`]
//! freezes them into an immutable [`Preset`]. Building is the only step that
//! touches the filesystem (seed files), and every configuration problem is
//! reported here, before any container exists.

mod message;
mod topic;

pub use message::{load_messages_file, Message};
pub use topic::{validate_topic_name, TopicConfig};

use crate::error::{Error, Result};
use crate::image::KafkaVersion;
use std::path::PathBuf;
use std::time::Duration;
use topic::TopicSet;

/// Broker version used when none is selected.
pub const DEFAULT_VERSION: &str = "3.7.0";

/// Overall provisioning timeout used when none is selected.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

/// Pause between readiness probe attempts.
pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_millis(250);

/// Host ports to publish. `None` picks a free port when the instance starts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Ports {
    pub broker: Option<u16>,
    pub registry: Option<u16>,
}

/// Frozen provisioning request. Consumed by exactly one provisioning pass.
#[derive(Debug, Clone)]
pub struct Preset {
    topics: Vec<TopicConfig>,
    messages: Vec<Message>,
    version: KafkaVersion,
    schema_registry: bool,
    ports: Ports,
    container_name: String,
    timeout: Duration,
    probe_interval: Duration,
    image: Option<String>,
}

impl Preset {
    pub fn builder() -> PresetBuilder {
        PresetBuilder::default()
    }

    /// Topics to create, one entry per name, in first-declaration order.
    pub fn topics(&self) -> &[TopicConfig] {
        &self.topics
    }

    pub fn topic(&self, name: &str) -> Option<&TopicConfig> {
        self.topics.iter().find(|t| t.topic == name)
    }

    /// Seed messages: inline messages first, then seed-file messages.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn version(&self) -> &KafkaVersion {
        &self.version
    }

    pub fn schema_registry(&self) -> bool {
        self.schema_registry
    }

    pub fn ports(&self) -> Ports {
        self.ports
    }

    pub fn container_name(&self) -> &str {
        &self.container_name
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn probe_interval(&self) -> Duration {
        self.probe_interval
    }

    /// Image reference overriding version-based selection.
    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }
}

/// Accumulates preset options.
#[derive(Debug, Clone, Default)]
pub struct PresetBuilder {
    topics: TopicSet,
    messages: Vec<Message>,
    message_files: Vec<PathBuf>,
    version: Option<String>,
    schema_registry: bool,
    ports: Ports,
    container_name: Option<String>,
    timeout: Option<Duration>,
    probe_interval: Option<Duration>,
    image: Option<String>,
}

impl PresetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare topics with one partition each.
    pub fn with_topics<I, S>(mut self, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for topic in topics {
            self.topics.declare_name(topic.as_ref());
        }
        self
    }

    /// Declare topics with explicit partition counts.
    pub fn with_topic_configs(mut self, configs: impl IntoIterator<Item = TopicConfig>) -> Self {
        for config in configs {
            self.topics.declare_config(config);
        }
        self
    }

    pub fn with_messages(mut self, messages: impl IntoIterator<Item = Message>) -> Self {
        self.messages.extend(messages);
        self
    }

    /// Seed messages from a JSON file, read when the preset is built.
    pub fn with_messages_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.message_files.push(path.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Start a schema registry next to the broker and wait for it too.
    pub fn with_schema_registry(mut self) -> Self {
        self.schema_registry = true;
        self
    }

    pub fn with_broker_port(mut self, port: u16) -> Self {
        self.ports.broker = Some(port);
        self
    }

    pub fn with_registry_port(mut self, port: u16) -> Self {
        self.ports.registry = Some(port);
        self
    }

    pub fn with_container_name(mut self, name: impl Into<String>) -> Self {
        self.container_name = Some(name.into());
        self
    }

    /// Upper bound for the whole provisioning pass.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_probe_interval(mut self, interval: Duration) -> Self {
        self.probe_interval = Some(interval);
        self
    }

    /// Run this image instead of the version-selected one.
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn build(self) -> Result<Preset> {
        let mut messages = self.messages;
        for path in &self.message_files {
            messages.extend(load_messages_file(path)?);
        }

        let mut topics = self.topics;
        for message in &messages {
            validate_topic_name(&message.topic)?;
            if message.time < 0 {
                return Err(Error::configuration(format!(
                    "Message with key '{}' for topic '{}' has a negative timestamp",
                    message.key, message.topic
                )));
            }
            // Topics only referenced by messages are created like name-only ones
            topics.declare_name(&message.topic);
        }
        let topics = topics.freeze()?;

        let stamped_on_send = messages.iter().filter(|m| m.uses_send_time()).count();
        if stamped_on_send > 0 {
            tracing::warn!(
                "{} seed message(s) have a time below 1ms; Kafka stamps them with the send time",
                stamped_on_send
            );
        }

        let version = self
            .version
            .as_deref()
            .unwrap_or(DEFAULT_VERSION)
            .parse::<KafkaVersion>()?;

        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT);
        if timeout.is_zero() {
            return Err(Error::configuration("Timeout must be greater than zero"));
        }

        let probe_interval = self.probe_interval.unwrap_or(DEFAULT_PROBE_INTERVAL);
        if probe_interval.is_zero() {
            return Err(Error::configuration(
                "Probe interval must be greater than zero",
            ));
        }

        if self.schema_registry
            && self.ports.broker.is_some()
            && self.ports.broker == self.ports.registry
        {
            return Err(Error::configuration(
                "Broker and schema registry cannot share a host port",
            ));
        }

        let container_name = match self.container_name {
            Some(name) => {
                validate_container_name(&name)?;
                name
            }
            None => default_container_name(),
        };

        if let Some(image) = &self.image {
            if image.is_empty() || image.contains(char::is_whitespace) {
                return Err(Error::configuration(format!("Invalid image '{image}'")));
            }
        }

        Ok(Preset {
            topics,
            messages,
            version,
            schema_registry: self.schema_registry,
            ports: self.ports,
            container_name,
            timeout,
            probe_interval,
            image: self.image,
        })
    }
}

fn default_container_name() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("kafka-testbed-{}", &id[..8])
}

/// Docker accepts `[a-zA-Z0-9][a-zA-Z0-9_.-]*`.
fn validate_container_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphanumeric())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));
    if !valid {
        return Err(Error::configuration(format!(
            "Invalid container name '{name}'"
        )));
    }
    Ok(())
}
