//! Broker client boundary for kafka-testbed.
//!
//! The orchestrator needs four things from a broker: a connectivity probe,
//! topic creation, produce-with-acknowledgement, and topic deletion. They are
//! expressed by the [`BrokerClient`] trait so the provisioning logic can be
//! exercised against an in-memory fake, and implemented for real brokers by
//! [`RdKafkaClient`] (librdkafka via `rdkafka`).

pub mod client;
pub mod error;
pub mod rdkafka_client;

pub use client::{
    BrokerClient, BrokerConnector, BrokerInfo, ClusterMetadata, PartitionMetadata, Record,
    TopicCreation, TopicMetadata,
};
pub use error::{is_transient_code, ClientError, Result};
pub use rdkafka_client::{ClientTimeouts, RdKafkaClient, RdKafkaConnector};

// Fakes build errors from these
pub use rdkafka::error::KafkaError;
pub use rdkafka::types::RDKafkaErrorCode;
