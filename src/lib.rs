//! kafka-testbed
//!
//! Ephemeral Kafka brokers for tests. A [`Preset`] describes the broker: topics
//! with partition counts, seed messages, broker version, and an optional
//! schema registry. [`Orchestrator::provision`] starts an isolated container,
//! waits until the broker answers, creates the topics, publishes the seed
//! messages in declared per-topic order, and only then returns a
//! [`KafkaInstance`]. If any step fails, everything that was started is torn
//! down and a typed [`Error`] comes back instead.
//!
//! # Example
//!
//! ```no_run
//! use kafka_testbed::{Message, Preset, TopicConfig};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let preset = Preset::builder()
//!     .with_topics(["topic-1"])
//!     .with_topic_configs([TopicConfig::new("topic-2", 3)])
//!     .with_messages([Message::now("events", "order", "1")])
//!     .build()?;
//!
//! let kafka = kafka_testbed::start(preset).await?;
//! println!("broker at {}", kafka.address());
//! kafka.stop().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! # Start a broker from a preset file and keep it running until Ctrl-C
//! kafka-testbed up --preset preset.yaml
//!
//! # Validate a preset without starting anything
//! kafka-testbed check --preset preset.yaml --topic extra-topic
//! ```

pub mod config;
pub mod error;
pub mod image;
pub mod instance;
pub mod orchestrator;
pub mod phase;
pub mod preset;
pub mod probe;
pub mod registry;
pub mod seed;
pub mod testing;
pub mod topics;

pub use error::{Error, ErrorKind, Result};
pub use instance::KafkaInstance;
pub use orchestrator::{start, Orchestrator};
pub use phase::{Phase, PhaseObserver};
pub use preset::{load_messages_file, Message, Ports, Preset, PresetBuilder, TopicConfig};
