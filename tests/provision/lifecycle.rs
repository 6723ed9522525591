use crate::{fakes, messages_file, phase_log};
use kafka_testbed::testing::{orchestrator, StoredRecord};
use kafka_testbed::{Message, Phase, Preset, TopicConfig};
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

#[tokio::test(start_paused = true)]
async fn test_topics_messages_and_file_seed() {
    let (runtime, broker, health) = fakes();
    let preset = Preset::builder()
        .with_topics(["topic-1"])
        .with_topic_configs([TopicConfig::new("topic-2", 3)])
        .with_messages([
            Message::new("events", "order", "1", 1_700_000_000_000_000_000),
            Message::new("alerts", "CPU", "92", 1_700_000_000_050_000_000),
        ])
        .with_version("3.6.1")
        .with_messages_file(messages_file())
        .with_container_name("kafka")
        .with_broker_port(39092)
        .build()
        .unwrap();

    let kafka = orchestrator(&runtime, &broker, &health)
        .provision(preset)
        .await
        .unwrap();

    assert_eq!(kafka.address(), "127.0.0.1:39092");
    assert_eq!(broker.connected(), vec!["127.0.0.1:39092".to_string()]);
    assert!(kafka.registry_address().is_none());

    let topics = broker.topics();
    assert_eq!(topics.get("topic-1"), Some(&1));
    assert_eq!(topics.get("topic-2"), Some(&3));
    assert_eq!(topics.get("events"), Some(&1));
    assert_eq!(topics.get("alerts"), Some(&1));
    assert_eq!(topics.get("audit"), Some(&1));

    assert_eq!(
        broker.records("alerts"),
        vec![StoredRecord {
            key: "CPU".to_string(),
            value: "92".to_string(),
            timestamp_ms: 1_700_000_000_050,
        }]
    );
    let events: Vec<_> = broker
        .records("events")
        .into_iter()
        .map(|r| r.key)
        .collect();
    assert_eq!(events, ["order", "shipment", "refund"]);
    assert_eq!(broker.records("audit")[0].value, "alice");
    assert_eq!(broker.flushes(), 1);

    let started = runtime.started();
    assert_eq!(started.len(), 1);
    assert_eq!(started[0].name, "kafka");
    assert_eq!(started[0].image, "bitnami/kafka:3.6.1");
    assert_eq!(runtime.networks(), vec!["kafka-net".to_string()]);

    assert_ok!(kafka.delete_topics(&["topic-1", "topic-2"]).await);
    assert_err!(kafka.delete_topics(&["unknown-topic"]).await);
    assert!(!broker.topics().contains_key("topic-1"));

    kafka.stop().await.unwrap();
    assert!(runtime.running().is_empty());
    assert!(runtime.networks().is_empty());
    assert!(!runtime.reaped());
}

#[tokio::test(start_paused = true)]
async fn test_defaults() {
    let (runtime, broker, health) = fakes();
    let preset = Preset::builder().build().unwrap();
    let name = preset.container_name().to_string();

    let kafka = orchestrator(&runtime, &broker, &health)
        .provision(preset)
        .await
        .unwrap();

    assert!(kafka.address().starts_with("127.0.0.1:"));
    assert!(broker.create_calls().is_empty());
    assert_eq!(broker.flushes(), 0);
    assert_eq!(runtime.started()[0].image, "apache/kafka:3.7.0");
    assert_eq!(runtime.running(), vec![name]);

    let metadata = kafka
        .client()
        .fetch_metadata(Duration::from_secs(1))
        .await
        .unwrap();
    assert_eq!(metadata.user_topics().count(), 0);

    kafka.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_phase_sequence() {
    let (runtime, broker, health) = fakes();
    let (log, observer) = phase_log();
    let preset = Preset::builder()
        .with_messages([Message::new("events", "k", "v", 0)])
        .build()
        .unwrap();

    let kafka = orchestrator(&runtime, &broker, &health)
        .with_observer(observer)
        .provision(preset)
        .await
        .unwrap();

    assert_eq!(
        *log.lock().unwrap(),
        vec![
            Phase::Starting,
            Phase::ProbingBroker,
            Phase::ProvisioningTopics,
            Phase::SeedingMessages,
            Phase::Ready,
        ]
    );
    assert!(kafka.ready_since() <= chrono::Utc::now());
    kafka.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_broker_probe_retries_until_ready() {
    let (runtime, broker, health) = fakes();
    let broker = broker.booting_for(5);
    let preset = Preset::builder().with_topics(["a"]).build().unwrap();

    let kafka = orchestrator(&runtime, &broker, &health)
        .provision(preset)
        .await
        .unwrap();

    // 5 refused + 1 answered probe, then at least one topic check
    assert!(broker.metadata_requests() >= 7);
    kafka.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_waits_for_partition_leaders() {
    let (runtime, broker, health) = fakes();
    let broker = broker.leader_election_polls(3);
    let preset = Preset::builder()
        .with_topic_configs([TopicConfig::new("orders", 4)])
        .with_messages([Message::new("orders", "1", "created", 0)])
        .build()
        .unwrap();

    let kafka = orchestrator(&runtime, &broker, &health)
        .provision(preset)
        .await
        .unwrap();

    // 1 broker probe + 3 leaderless + 1 ready
    assert_eq!(broker.metadata_requests(), 5);
    assert_eq!(broker.records("orders").len(), 1);
    kafka.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_existing_topic_with_matching_partitions() {
    let (runtime, broker, health) = fakes();
    let broker = broker.with_existing_topic("orders", 2);
    let preset = Preset::builder()
        .with_topic_configs([TopicConfig::new("orders", 2)])
        .build()
        .unwrap();

    let kafka = orchestrator(&runtime, &broker, &health)
        .provision(preset)
        .await
        .unwrap();
    assert_eq!(broker.topics().get("orders"), Some(&2));
    kafka.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_drop_without_stop_removes_containers() {
    let (runtime, broker, health) = fakes();
    let preset = Preset::builder().with_schema_registry().build().unwrap();

    let kafka = orchestrator(&runtime, &broker, &health)
        .provision(preset)
        .await
        .unwrap();
    assert_eq!(runtime.running().len(), 2);

    drop(kafka);

    assert!(runtime.reaped());
    assert!(runtime.running().is_empty());
    assert!(runtime.networks().is_empty());
}
