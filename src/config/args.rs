//! Command-line preset options.
//!
//! Flags layer on top of an optional preset file: list flags add to the
//! file's lists, scalar flags replace the file's values.

use super::duration::parse_duration;
use super::file::PresetFile;
use crate::error::Result;
use crate::preset::{PresetBuilder, TopicConfig};
use clap::Args;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Args, Debug, Clone, Default)]
pub struct PresetArgs {
    /// Preset file (YAML, or JSON with a .json extension)
    #[arg(long, env = "KAFKA_TESTBED_PRESET")]
    pub preset: Option<PathBuf>,

    /// Topic to create with one partition (repeatable)
    #[arg(long = "topic", value_name = "NAME")]
    pub topics: Vec<String>,

    /// Topic with an explicit partition count (repeatable)
    #[arg(long = "topic-config", value_name = "NAME:PARTITIONS", value_parser = parse_topic_config)]
    pub topic_configs: Vec<TopicConfig>,

    /// JSON file with seed messages (repeatable)
    #[arg(long = "messages-file", value_name = "PATH")]
    pub messages_files: Vec<PathBuf>,

    /// Kafka version to run
    #[arg(long = "kafka-version", env = "KAFKA_TESTBED_VERSION")]
    pub version: Option<String>,

    /// Also start a schema registry
    #[arg(long)]
    pub schema_registry: bool,

    /// Host port for the broker (default: any free port)
    #[arg(long)]
    pub broker_port: Option<u16>,

    /// Host port for the schema registry (default: any free port)
    #[arg(long)]
    pub registry_port: Option<u16>,

    /// Broker container name
    #[arg(long)]
    pub container_name: Option<String>,

    /// Give up if the broker is not ready within this time, e.g. "10m", "90s"
    #[arg(long, value_parser = parse_duration)]
    pub timeout: Option<Duration>,

    /// Pause between readiness probes, e.g. "250ms"
    #[arg(long, value_parser = parse_duration)]
    pub probe_interval: Option<Duration>,

    /// Broker image to run instead of the version-selected one
    #[arg(long, env = "KAFKA_TESTBED_IMAGE")]
    pub image: Option<String>,
}

impl PresetArgs {
    pub fn into_builder(self) -> Result<PresetBuilder> {
        let mut builder = match &self.preset {
            Some(path) => PresetFile::load(path)?,
            None => PresetBuilder::new(),
        };

        builder = builder
            .with_topics(&self.topics)
            .with_topic_configs(self.topic_configs);
        for file in self.messages_files {
            builder = builder.with_messages_file(file);
        }

        if let Some(version) = self.version {
            builder = builder.with_version(version);
        }
        if self.schema_registry {
            builder = builder.with_schema_registry();
        }
        if let Some(port) = self.broker_port {
            builder = builder.with_broker_port(port);
        }
        if let Some(port) = self.registry_port {
            builder = builder.with_registry_port(port);
        }
        if let Some(name) = self.container_name {
            builder = builder.with_container_name(name);
        }
        if let Some(timeout) = self.timeout {
            builder = builder.with_timeout(timeout);
        }
        if let Some(interval) = self.probe_interval {
            builder = builder.with_probe_interval(interval);
        }
        if let Some(image) = self.image {
            builder = builder.with_image(image);
        }

        Ok(builder)
    }
}

/// Parse `name:partitions`.
pub fn parse_topic_config(s: &str) -> anyhow::Result<TopicConfig> {
    let (name, partitions) = s
        .rsplit_once(':')
        .ok_or_else(|| anyhow::anyhow!("Expected NAME:PARTITIONS, got '{s}'"))?;
    let partitions: i32 = partitions
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid partition count '{partitions}': {e}"))?;
    Ok(TopicConfig::new(name, partitions))
}
