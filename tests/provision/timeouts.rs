use crate::fakes;
use kafka_testbed::testing::orchestrator;
use kafka_testbed::{Error, ErrorKind, Phase, Preset, TopicConfig};
use std::time::Duration;
use tokio::time::Instant;

#[tokio::test(start_paused = true)]
async fn test_broker_never_ready() {
    let (runtime, broker, health) = fakes();
    let broker = broker.never_ready();
    let preset = Preset::builder()
        .with_topics(["events"])
        .with_timeout(Duration::from_secs(30))
        .build()
        .unwrap();

    let started = Instant::now();
    let err = orchestrator(&runtime, &broker, &health)
        .provision(preset)
        .await
        .unwrap_err();

    match &err {
        Error::StartupTimeout {
            phase,
            waited,
            last_error,
        } => {
            assert_eq!(*phase, Phase::ProbingBroker);
            assert!(*waited <= Duration::from_secs(30));
            assert!(last_error.is_some());
        }
        other => panic!("expected timeout, got {other:?}"),
    }
    assert_eq!(started.elapsed(), Duration::from_secs(30));
    assert!(broker.create_calls().is_empty());
    assert!(runtime.running().is_empty());
    assert!(runtime.networks().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_probe_interval_bounds_attempts() {
    let (runtime, broker, health) = fakes();
    let broker = broker.never_ready();
    let preset = Preset::builder()
        .with_timeout(Duration::from_secs(2))
        .with_probe_interval(Duration::from_millis(500))
        .build()
        .unwrap();

    let err = orchestrator(&runtime, &broker, &health)
        .provision(preset)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::StartupTimeout);
    // Attempts at 0, 0.5, 1.0 and 1.5 seconds
    assert_eq!(broker.metadata_requests(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_slow_boot_within_timeout() {
    let (runtime, broker, health) = fakes();
    let broker = broker.booting_for(20);
    let preset = Preset::builder()
        .with_timeout(Duration::from_secs(10))
        .with_probe_interval(Duration::from_millis(100))
        .build()
        .unwrap();

    let kafka = orchestrator(&runtime, &broker, &health)
        .provision(preset)
        .await
        .unwrap();
    kafka.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_leaders_never_elected() {
    let (runtime, broker, health) = fakes();
    let broker = broker.leader_election_polls(u32::MAX);
    let preset = Preset::builder()
        .with_topic_configs([TopicConfig::new("orders", 2)])
        .with_timeout(Duration::from_secs(5))
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
            assert_eq!(*phase, Phase::ProvisioningTopics);
            assert!(last_error
                .as_deref()
                .is_some_and(|e| e.contains("0/2 partition(s) with leaders")));
        }
        other => panic!("expected timeout, got {other:?}"),
    }
    assert!(runtime.running().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_timeout_while_starting_tears_down() {
    let (runtime, broker, health) = fakes();
    let runtime = runtime.start_delay(Duration::from_secs(3600));
    let preset = Preset::builder()
        .with_topics(["events"])
        .with_container_name("kafka-slow")
        .with_timeout(Duration::from_secs(30))
        .build()
        .unwrap();

    let started = Instant::now();
    let err = orchestrator(&runtime, &broker, &health)
        .provision(preset)
        .await
        .unwrap_err();

    match &err {
        Error::StartupTimeout { phase, .. } => assert_eq!(*phase, Phase::Starting),
        other => panic!("expected timeout, got {other:?}"),
    }
    assert_eq!(started.elapsed(), Duration::from_secs(30));
    assert!(broker.connected().is_empty());
    assert_eq!(
        runtime.events(),
        vec![
            "create-network kafka-slow-net",
            "start kafka-slow",
            "stop kafka-slow",
            "remove-network kafka-slow-net",
        ]
    );
    assert!(runtime.running().is_empty());
    assert!(runtime.networks().is_empty());
}
