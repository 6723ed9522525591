//! Broker and schema-registry container definitions.
//!
//! Kafka 3.7 and later ship an official `apache/kafka` image configured through
//! `KAFKA_*` variables. Earlier KRaft-capable releases (3.3 to 3.6) run on
//! `bitnami/kafka`, which reads the same broker properties from `KAFKA_CFG_*`.
//! Both layouts expose:
//!
//! - `PLAINTEXT://kafka:19092` on the instance network, for the side-car
//! - `EXTERNAL://127.0.0.1:<host port>` for clients on the host
//! - `CONTROLLER://:9093` for the single-node KRaft quorum

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;
use testbed_container::ContainerSpec;

/// Container port of the external listener.
pub const BROKER_PORT: u16 = 9092;

/// Listener the side-car uses over the instance network.
pub const INTERNAL_PORT: u16 = 19092;

pub const CONTROLLER_PORT: u16 = 9093;

/// Network alias of the broker container.
pub const BROKER_ALIAS: &str = "kafka";

/// Container port the schema registry listens on.
pub const SCHEMA_REGISTRY_PORT: u16 = 8081;

pub const SCHEMA_REGISTRY_IMAGE: &str = "confluentinc/cp-schema-registry";
pub const SCHEMA_REGISTRY_VERSION: &str = "7.6.1";

const CLUSTER_ID: &str = "kafka-testbed-cluster-01";

/// A `major.minor[.patch][-suffix]` broker version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KafkaVersion {
    raw: String,
    major: u32,
    minor: u32,
}

/// Which image family a version runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFlavor {
    Apache,
    Bitnami,
}

impl KafkaVersion {
    pub fn major(&self) -> u32 {
        self.major
    }

    pub fn minor(&self) -> u32 {
        self.minor
    }

    pub fn flavor(&self) -> ImageFlavor {
        if (self.major, self.minor) >= (3, 7) {
            ImageFlavor::Apache
        } else {
            ImageFlavor::Bitnami
        }
    }

    /// Full image reference for this version.
    pub fn image(&self) -> String {
        match self.flavor() {
            ImageFlavor::Apache => format!("apache/kafka:{}", self.raw),
            ImageFlavor::Bitnami => format!("bitnami/kafka:{}", self.raw),
        }
    }
}

impl FromStr for KafkaVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || {
            Error::configuration(format!(
                "Invalid Kafka version '{s}', expected major.minor[.patch][-suffix]"
            ))
        };

        let (numbers, suffix) = match s.split_once('-') {
            Some((numbers, suffix)) => (numbers, Some(suffix)),
            None => (s, None),
        };
        if suffix.is_some_and(|suffix| suffix.is_empty()) {
            return Err(invalid());
        }

        let parts = numbers
            .split('.')
            .map(|part| part.parse::<u32>().map_err(|_| invalid()))
            .collect::<Result<Vec<_>>>()?;
        let (major, minor) = match parts.as_slice() {
            [major, minor] | [major, minor, _] => (*major, *minor),
            _ => return Err(invalid()),
        };

        if (major, minor) < (3, 3) {
            return Err(Error::configuration(format!(
                "Kafka version '{s}' is not supported, KRaft mode needs 3.3 or later"
            )));
        }

        Ok(Self {
            raw: s.to_string(),
            major,
            minor,
        })
    }
}

impl fmt::Display for KafkaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Broker properties shared by both image flavors.
fn broker_properties(host_port: u16) -> Vec<(&'static str, String)> {
    vec![
        ("node.id", "1".to_string()),
        ("process.roles", "broker,controller".to_string()),
        (
            "listeners",
            format!(
                "PLAINTEXT://:{INTERNAL_PORT},EXTERNAL://:{BROKER_PORT},CONTROLLER://:{CONTROLLER_PORT}"
            ),
        ),
        (
            "advertised.listeners",
            format!("PLAINTEXT://{BROKER_ALIAS}:{INTERNAL_PORT},EXTERNAL://127.0.0.1:{host_port}"),
        ),
        (
            "listener.security.protocol.map",
            "PLAINTEXT:PLAINTEXT,EXTERNAL:PLAINTEXT,CONTROLLER:PLAINTEXT".to_string(),
        ),
        ("controller.listener.names", "CONTROLLER".to_string()),
        (
            "controller.quorum.voters",
            format!("1@localhost:{CONTROLLER_PORT}"),
        ),
        ("inter.broker.listener.name", "PLAINTEXT".to_string()),
        ("offsets.topic.replication.factor", "1".to_string()),
        ("transaction.state.log.replication.factor", "1".to_string()),
        ("transaction.state.log.min.isr", "1".to_string()),
        ("group.initial.rebalance.delay.ms", "0".to_string()),
        // Topics are created explicitly, never by a stray produce
        ("auto.create.topics.enable", "false".to_string()),
    ]
}

/// `listener.security.protocol.map` -> `<prefix>LISTENER_SECURITY_PROTOCOL_MAP`
fn env_name(prefix: &str, property: &str) -> String {
    format!("{prefix}{}", property.replace('.', "_").to_uppercase())
}

/// Container definition for the broker.
///
/// `image` overrides the version-selected image and is configured like an
/// official Apache image.
pub fn broker_container_spec(
    name: &str,
    version: &KafkaVersion,
    image: Option<&str>,
    network: &str,
    host_port: u16,
) -> ContainerSpec {
    let (flavor, image) = match image {
        Some(image) => (ImageFlavor::Apache, image.to_string()),
        None => (version.flavor(), version.image()),
    };

    let prefix = match flavor {
        ImageFlavor::Apache => "KAFKA_",
        ImageFlavor::Bitnami => "KAFKA_CFG_",
    };

    let mut spec = ContainerSpec::new(name, image)
        .network(network, Some(BROKER_ALIAS))
        .port(host_port, BROKER_PORT);

    spec = match flavor {
        ImageFlavor::Apache => spec.env("CLUSTER_ID", CLUSTER_ID),
        ImageFlavor::Bitnami => spec
            .env("KAFKA_KRAFT_CLUSTER_ID", CLUSTER_ID)
            .env("ALLOW_PLAINTEXT_LISTENER", "yes"),
    };

    for (property, value) in broker_properties(host_port) {
        spec = spec.env(env_name(prefix, property), value);
    }
    spec
}

/// Container definition for the schema registry side-car.
pub fn registry_container_spec(name: &str, network: &str, host_port: u16) -> ContainerSpec {
    ContainerSpec::new(
        name,
        format!("{SCHEMA_REGISTRY_IMAGE}:{SCHEMA_REGISTRY_VERSION}"),
    )
    .network(network, None)
    .port(host_port, SCHEMA_REGISTRY_PORT)
    .env("SCHEMA_REGISTRY_HOST_NAME", "schema-registry")
    .env(
        "SCHEMA_REGISTRY_LISTENERS",
        format!("http://0.0.0.0:{SCHEMA_REGISTRY_PORT}"),
    )
    .env(
        "SCHEMA_REGISTRY_KAFKASTORE_BOOTSTRAP_SERVERS",
        format!("PLAINTEXT://{BROKER_ALIAS}:{INTERNAL_PORT}"),
    )
}
