//! Provisioning pipeline tests
//!
//! These drive the orchestrator against the in-memory runtime, broker and
//! registry health check from `kafka_testbed::testing`, on a paused clock.

mod failures;
mod lifecycle;
mod ordering;
mod registry;
mod timeouts;

use kafka_testbed::testing::{FakeBroker, FakeHealth, FakeRuntime};
use kafka_testbed::Phase;
use std::sync::{Arc, Mutex};

pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter("kafka_testbed=debug")
        .with_test_writer()
        .try_init()
        .ok();
}

/// Fresh fakes with default behavior.
pub fn fakes() -> (FakeRuntime, FakeBroker, FakeHealth) {
    init_logging();
    (FakeRuntime::new(), FakeBroker::new(), FakeHealth::new())
}

/// Shared phase log for `Orchestrator::with_observer`.
pub fn phase_log() -> (Arc<Mutex<Vec<Phase>>>, impl Fn(Phase) + Send + Sync + 'static) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    (log, move |phase| sink.lock().unwrap().push(phase))
}

pub fn messages_file() -> &'static str {
    concat!(env!("CARGO_MANIFEST_DIR"), "/testdata/messages.json")
}
