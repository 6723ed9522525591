//! Preset files.
//!
//! A preset file describes a broker declaratively, in YAML or JSON:
//!
//! ```yaml
//! version: 3.7.0
//! topics: [events]
//! topic_configs:
//!   - topic: alerts
//!     num_partitions: 3
//! messages_files: [seed/messages.json]
//! schema_registry: true
//! timeout: 5m
//! ```
//!
//! Relative `messages_files` entries resolve against the directory holding the
//! preset file.

use super::duration::parse_duration;
use crate::error::{Error, Result};
use crate::preset::{Message, PresetBuilder, TopicConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PresetFile {
    pub topics: Vec<String>,
    pub topic_configs: Vec<TopicConfig>,
    pub messages: Vec<Message>,
    pub messages_files: Vec<PathBuf>,
    pub version: Option<String>,
    pub schema_registry: bool,
    pub broker_port: Option<u16>,
    pub registry_port: Option<u16>,
    pub container_name: Option<String>,
    pub timeout: Option<String>,
    pub probe_interval: Option<String>,
    pub image: Option<String>,
}

impl PresetFile {
    /// Read a preset file. `.json` files are parsed as JSON, anything else as
    /// YAML.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::configuration(format!("Failed to read preset file {path:?}: {e}"))
        })?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let parsed = if is_json {
            serde_json::from_str(&content).map_err(|e| e.to_string())
        } else {
            serde_yaml::from_str(&content).map_err(|e| e.to_string())
        };

        parsed.map_err(|e| {
            Error::configuration(format!("Failed to parse preset file {path:?}: {e}"))
        })
    }

    /// Load a preset file and resolve it relative to its own directory.
    pub fn load(path: &Path) -> Result<PresetBuilder> {
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_path(path)?.into_builder(base_dir)
    }

    pub fn into_builder(self, base_dir: &Path) -> Result<PresetBuilder> {
        let mut builder = PresetBuilder::new()
            .with_topics(&self.topics)
            .with_topic_configs(self.topic_configs)
            .with_messages(self.messages);

        for file in self.messages_files {
            let resolved = if file.is_absolute() {
                file
            } else {
                base_dir.join(file)
            };
            builder = builder.with_messages_file(resolved);
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
            builder = builder.with_timeout(parse_field("timeout", &timeout)?);
        }
        if let Some(interval) = self.probe_interval {
            builder = builder.with_probe_interval(parse_field("probe_interval", &interval)?);
        }
        if let Some(image) = self.image {
            builder = builder.with_image(image);
        }

        Ok(builder)
    }
}

fn parse_field(field: &str, value: &str) -> Result<std::time::Duration> {
    parse_duration(value).map_err(|e| Error::configuration(format!("Invalid {field}: {e:#}")))
}
