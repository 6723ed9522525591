use crate::{fakes, phase_log};
use kafka_testbed::testing::orchestrator;
use kafka_testbed::{Error, Message, Phase, Preset};
use std::time::Duration;
use testbed_kafka::RDKafkaErrorCode;
use tokio::time::Instant;

#[tokio::test(start_paused = true)]
async fn test_registry_gates_readiness() {
    let (runtime, broker, health) = fakes();
    let health = health.ready_after(5);
    let (log, observer) = phase_log();
    let preset = Preset::builder()
        .with_topics(["events"])
        .with_schema_registry()
        .with_container_name("kafka-with-registry")
        .with_registry_port(38081)
        .build()
        .unwrap();

    let kafka = orchestrator(&runtime, &broker, &health)
        .with_observer(observer)
        .provision(preset)
        .await
        .unwrap();

    assert_eq!(kafka.registry_address(), Some("127.0.0.1:38081"));
    assert_eq!(health.checked().len(), 6);
    assert!(health.checked().iter().all(|a| a == "127.0.0.1:38081"));

    let started = runtime.started();
    assert_eq!(started.len(), 2);
    assert_eq!(started[1].name, "kafka-with-registry-registry");
    assert_eq!(started[1].network.as_deref(), Some("kafka-with-registry-net"));
    assert!(started[1].env.contains(&(
        "SCHEMA_REGISTRY_KAFKASTORE_BOOTSTRAP_SERVERS".to_string(),
        "PLAINTEXT://kafka:19092".to_string()
    )));

    let phases = log.lock().unwrap().clone();
    assert!(phases.contains(&Phase::ProbingRegistry));
    assert_eq!(phases.last(), Some(&Phase::Ready));

    kafka.stop().await.unwrap();
    assert!(runtime.running().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_registry_disabled_is_never_started() {
    let (runtime, broker, health) = fakes();
    let (log, observer) = phase_log();
    let preset = Preset::builder().with_registry_port(38081).build().unwrap();

    let kafka = orchestrator(&runtime, &broker, &health)
        .with_observer(observer)
        .provision(preset)
        .await
        .unwrap();

    assert!(kafka.registry_address().is_none());
    assert!(health.checked().is_empty());
    assert_eq!(runtime.started().len(), 1);
    assert!(!log.lock().unwrap().contains(&Phase::ProbingRegistry));
    kafka.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_registry_never_ready_times_out() {
    let (runtime, broker, health) = fakes();
    let health = health.never_ready();
    let preset = Preset::builder()
        .with_topics(["events"])
        .with_schema_registry()
        .with_container_name("kafka-r")
        .with_timeout(Duration::from_secs(30))
        .build()
        .unwrap();

    let err = orchestrator(&runtime, &broker, &health)
        .provision(preset)
        .await
        .unwrap_err();

    match &err {
        Error::StartupTimeout {
            phase, last_error, ..
        } => {
            assert_eq!(*phase, Phase::ProbingRegistry);
            assert_eq!(last_error.as_deref(), Some("HTTP 503"));
        }
        other => panic!("expected registry timeout, got {other:?}"),
    }
    assert!(runtime.running().is_empty());
    assert!(runtime.networks().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_registry_start_failure_cancels_seeding() {
    let (runtime, broker, health) = fakes();
    let runtime = runtime.fail_start_of("kafka-r-registry");
    let broker = broker.publish_delay(Duration::from_secs(1));
    let messages = (0..10).map(|i| Message::new("events", i.to_string(), "v", 0));
    let preset = Preset::builder()
        .with_messages(messages)
        .with_schema_registry()
        .with_container_name("kafka-r")
        .build()
        .unwrap();

    let err = orchestrator(&runtime, &broker, &health)
        .provision(preset)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Startup { ref what, .. } if what == "schema registry"));
    // The sibling branch was dropped long before all ten 1s acknowledgements
    assert!(broker.records("events").len() < 10);
    assert!(runtime.running().is_empty());
    assert!(runtime
        .events()
        .contains(&"stop kafka-r-registry".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_seeding_failure_stops_registry_checks() {
    let (runtime, broker, health) = fakes();
    let health = health.never_ready();
    let broker = broker
        .publish_delay(Duration::from_secs(1))
        .fail_publish_of("events", 2, RDKafkaErrorCode::MessageSizeTooLarge);
    let messages = (0..4).map(|i| Message::new("events", i.to_string(), "v", 0));
    let preset = Preset::builder()
        .with_messages(messages)
        .with_schema_registry()
        .with_container_name("kafka-rs")
        .build()
        .unwrap();

    let started = Instant::now();
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
    // Well inside the 600s default timeout
    assert!(started.elapsed() < Duration::from_secs(10));
    let checks = health.checked().len();
    assert!(checks > 0);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(health.checked().len(), checks);
    assert!(runtime.running().is_empty());
    assert!(runtime
        .events()
        .contains(&"stop kafka-rs-registry".to_string()));
}
