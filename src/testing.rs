//! In-memory collaborators for exercising the provisioning pipeline without
//! Docker or a broker.
//!
//! Every fake is cheaply cloneable and clones share state: hand one clone to
//! the [`Orchestrator`](crate::Orchestrator) and keep another to inspect what
//! happened.

pub mod broker;
pub mod health;
pub mod runtime;

pub use broker::{FakeBroker, StoredRecord};
pub use health::FakeHealth;
pub use runtime::FakeRuntime;

use crate::Orchestrator;
use std::sync::Arc;

/// Orchestrator wired to the given fakes.
pub fn orchestrator(
    runtime: &FakeRuntime,
    broker: &FakeBroker,
    health: &FakeHealth,
) -> Orchestrator {
    Orchestrator::new(
        Arc::new(runtime.clone()),
        Arc::new(broker.clone()),
        Arc::new(health.clone()),
    )
}
