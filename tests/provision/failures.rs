use crate::{fakes, phase_log};
use kafka_testbed::testing::orchestrator;
use kafka_testbed::{Error, ErrorKind, Message, Phase, Preset, TopicConfig};
use std::io::Write;
use testbed_kafka::RDKafkaErrorCode;

#[tokio::test(start_paused = true)]
async fn test_broker_start_failure_cleans_up() {
    let (runtime, broker, health) = fakes();
    let runtime = runtime.fail_start_of("kafka-broken");
    let (log, observer) = phase_log();
    let preset = Preset::builder()
        .with_container_name("kafka-broken")
        .build()
        .unwrap();

    let err = orchestrator(&runtime, &broker, &health)
        .with_observer(observer)
        .provision(preset)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Startup);
    assert!(err.to_string().contains("pull access denied"));
    assert!(broker.connected().is_empty());
    assert_eq!(
        runtime.events(),
        vec![
            "create-network kafka-broken-net",
            "start kafka-broken",
            "stop kafka-broken",
            "remove-network kafka-broken-net",
        ]
    );
    assert_eq!(
        *log.lock().unwrap(),
        vec![Phase::Starting, Phase::Failed]
    );
}

#[tokio::test(start_paused = true)]
async fn test_fatal_metadata_error_is_startup_failure() {
    let (runtime, broker, health) = fakes();
    let broker = broker.metadata_fails_with(RDKafkaErrorCode::SaslAuthenticationFailed);
    let preset = Preset::builder().build().unwrap();

    let err = orchestrator(&runtime, &broker, &health)
        .provision(preset)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Startup { ref what, .. } if what == "broker"));
    assert_eq!(broker.metadata_requests(), 1);
    assert!(runtime.running().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_rejected_topic_is_provisioning_error() {
    let (runtime, broker, health) = fakes();
    let broker = broker.fail_create_of("topic-2", RDKafkaErrorCode::InvalidReplicationFactor);
    let preset = Preset::builder()
        .with_topics(["topic-1", "topic-2", "topic-3"])
        .build()
        .unwrap();

    let err = orchestrator(&runtime, &broker, &health)
        .provision(preset)
        .await
        .unwrap_err();

    match &err {
        Error::Provisioning { topic, .. } => assert_eq!(topic, "topic-2"),
        other => panic!("expected provisioning error, got {other:?}"),
    }
    // Every creation request completed before the failure was reported
    assert_eq!(broker.create_calls().len(), 3);
    assert!(runtime.running().is_empty());
    assert!(runtime.networks().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_existing_topic_with_other_partition_count_fails() {
    let (runtime, broker, health) = fakes();
    let broker = broker.with_existing_topic("orders", 1);
    let preset = Preset::builder()
        .with_topic_configs([TopicConfig::new("orders", 3)])
        .build()
        .unwrap();

    let err = orchestrator(&runtime, &broker, &health)
        .provision(preset)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Provisioning);
    assert!(err.to_string().contains("expected 3"));
    assert!(runtime.running().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_seeding_failure_names_message() {
    let (runtime, broker, health) = fakes();
    let broker = broker.fail_publish_of("events", 1, RDKafkaErrorCode::MessageSizeTooLarge);
    let preset = Preset::builder()
        .with_messages([
            Message::new("events", "a", "1", 0),
            Message::new("alerts", "x", "1", 0),
            Message::new("events", "b", "2", 0),
            Message::new("events", "c", "3", 0),
        ])
        .build()
        .unwrap();

    let err = orchestrator(&runtime, &broker, &health)
        .provision(preset)
        .await
        .unwrap_err();

    match &err {
        Error::Seeding { topic, index, .. } => {
            assert_eq!(topic, "events");
            assert_eq!(*index, Some(2));
        }
        other => panic!("expected seeding error, got {other:?}"),
    }
    // Nothing after the failed message was sent
    let events: Vec<_> = broker.records("events").into_iter().map(|r| r.key).collect();
    assert_eq!(events, ["a"]);
    assert!(runtime.running().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_teardown_failure_keeps_primary_error() {
    let (runtime, broker, health) = fakes();
    let runtime = runtime.fail_stop_of("kafka-td");
    let broker = broker.fail_create_of("events", RDKafkaErrorCode::PolicyViolation);
    let preset = Preset::builder()
        .with_topics(["events"])
        .with_container_name("kafka-td")
        .build()
        .unwrap();

    let err = orchestrator(&runtime, &broker, &health)
        .provision(preset)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Provisioning);
    assert!(matches!(err.primary(), Error::Provisioning { .. }));
    assert!(err
        .teardown_failure()
        .is_some_and(|t| t.contains("permission denied stopping kafka-td")));
    // Teardown kept going after the failed stop
    assert!(runtime
        .events()
        .contains(&"remove-network kafka-td-net".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_malformed_seed_file_starts_nothing() {
    let (runtime, _broker, _health) = fakes();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"[{\"topic\": \"events\", \"key\": ").unwrap();

    let err = Preset::builder()
        .with_topics(["events"])
        .with_messages_file(file.path())
        .build()
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(runtime.events().is_empty());
}
