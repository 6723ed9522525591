//! Scripted registry health checks

use crate::probe::ProbeFailure;
use crate::registry::HealthCheck;
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Default)]
struct State {
    /// Checks that answer 503 before the first 200
    unavailable_for: u32,
    never_ready: bool,
    checked: Vec<String>,
}

#[derive(Clone, Default)]
pub struct FakeHealth {
    state: Arc<Mutex<State>>,
}

impl FakeHealth {
    /// Healthy on the first check.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ready_after(self, checks: u32) -> Self {
        self.state().unavailable_for = checks;
        self
    }

    pub fn never_ready(self) -> Self {
        self.state().never_ready = true;
        self
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Addresses checked, one entry per check.
    pub fn checked(&self) -> Vec<String> {
        self.state().checked.clone()
    }
}

#[async_trait]
impl HealthCheck for FakeHealth {
    async fn check(&self, address: &str) -> Result<(), ProbeFailure> {
        let mut state = self.state();
        state.checked.push(address.to_string());
        if state.never_ready {
            return Err(ProbeFailure::Transient("HTTP 503".to_string()));
        }
        if state.unavailable_for > 0 {
            state.unavailable_for -= 1;
            return Err(ProbeFailure::Transient("HTTP 503".to_string()));
        }
        Ok(())
    }
}
