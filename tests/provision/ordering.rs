use crate::fakes;
use kafka_testbed::testing::orchestrator;
use kafka_testbed::{Message, Preset};
use std::collections::HashSet;
use std::time::Duration;

fn interleaved_messages() -> Vec<Message> {
    let mut messages = Vec::new();
    for i in 0..4 {
        for topic in ["orders", "payments", "shipments"] {
            messages.push(Message::new(
                topic,
                format!("{topic}-{i}"),
                i.to_string(),
                (i as i64 + 1) * 1_000_000,
            ));
        }
    }
    messages
}

#[tokio::test(start_paused = true)]
async fn test_per_topic_order_is_declared_order() {
    let (runtime, broker, health) = fakes();
    let broker = broker.publish_delay(Duration::from_millis(10));
    let preset = Preset::builder()
        .with_messages(interleaved_messages())
        .build()
        .unwrap();

    let kafka = orchestrator(&runtime, &broker, &health)
        .provision(preset)
        .await
        .unwrap();

    for topic in ["orders", "payments", "shipments"] {
        let records = broker.records(topic);
        let keys: Vec<_> = records.iter().map(|r| r.key.clone()).collect();
        let expected: Vec<_> = (0..4).map(|i| format!("{topic}-{i}")).collect();
        assert_eq!(keys, expected, "order of {topic}");

        let timestamps: Vec<_> = records.iter().map(|r| r.timestamp_ms).collect();
        assert_eq!(timestamps, vec![1, 2, 3, 4]);
    }
    kafka.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_topics_are_published_concurrently() {
    let (runtime, broker, health) = fakes();
    let broker = broker.publish_delay(Duration::from_millis(10));
    let preset = Preset::builder()
        .with_messages(interleaved_messages())
        .build()
        .unwrap();

    let kafka = orchestrator(&runtime, &broker, &health)
        .provision(preset)
        .await
        .unwrap();

    // One acknowledgement per topic lands before any topic's second one
    let first_round: HashSet<_> = broker
        .publish_log()
        .into_iter()
        .take(3)
        .map(|(topic, _)| topic)
        .collect();
    assert_eq!(first_round.len(), 3);
    assert_eq!(broker.publish_log().len(), 12);
    kafka.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_seeding_happens_after_topics_exist() {
    let (runtime, broker, health) = fakes();
    let broker = broker.leader_election_polls(2);
    let preset = Preset::builder()
        .with_messages([
            Message::new("events", "order", "1", 0),
            Message::new("alerts", "CPU", "92", 0),
        ])
        .build()
        .unwrap();

    let kafka = orchestrator(&runtime, &broker, &health)
        .provision(preset)
        .await
        .unwrap();

    // The fake rejects records for topics it does not know, so every
    // acknowledged record proves its topic was created first
    assert_eq!(broker.records("events").len(), 1);
    assert_eq!(broker.records("alerts").len(), 1);
    assert_eq!(broker.create_calls().len(), 2);
    kafka.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_and_empty_messages_are_published() {
    let (runtime, broker, health) = fakes();
    let duplicate = Message::new("events", "", "", 0);
    let preset = Preset::builder()
        .with_messages([duplicate.clone(), duplicate])
        .build()
        .unwrap();

    let kafka = orchestrator(&runtime, &broker, &health)
        .provision(preset)
        .await
        .unwrap();

    let records = broker.records("events");
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.key.is_empty() && r.value.is_empty()));
    kafka.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_sub_millisecond_time_is_stamped_on_send() {
    let (runtime, broker, health) = fakes();
    let preset = Preset::builder()
        .with_messages([
            Message::new("events", "epoch", "1", 0),
            Message::new("events", "early", "2", 999_999),
            Message::new("events", "later", "3", 1_000_000),
        ])
        .build()
        .unwrap();

    let before = chrono::Utc::now().timestamp_millis();
    let kafka = orchestrator(&runtime, &broker, &health)
        .provision(preset)
        .await
        .unwrap();

    let records = broker.records("events");
    assert!(records[0].timestamp_ms >= before);
    assert!(records[1].timestamp_ms >= before);
    assert_eq!(records[2].timestamp_ms, 1);
    kafka.stop().await.unwrap();
}
