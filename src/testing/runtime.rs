//! In-memory container runtime

use anyhow::Result;
use async_trait::async_trait;
use std::collections::{BTreeSet, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use testbed_container::{ContainerHandle, ContainerRuntime, ContainerSpec};

#[derive(Default)]
struct State {
    containers: BTreeSet<String>,
    networks: BTreeSet<String>,
    started: Vec<ContainerSpec>,
    events: Vec<String>,
    fail_start: HashSet<String>,
    fail_stop: HashSet<String>,
    fail_network_removal: bool,
    start_delay: Duration,
    reaped: bool,
}

/// Records what would have been started and stopped. Clones share state.
#[derive(Clone, Default)]
pub struct FakeRuntime {
    state: Arc<Mutex<State>>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make starting the named container fail.
    pub fn fail_start_of(self, name: &str) -> Self {
        self.state().fail_start.insert(name.to_string());
        self
    }

    /// Make stopping the named container fail.
    pub fn fail_stop_of(self, name: &str) -> Self {
        self.state().fail_stop.insert(name.to_string());
        self
    }

    /// Make every container start take this long, like a slow image pull.
    pub fn start_delay(self, delay: Duration) -> Self {
        self.state().start_delay = delay;
        self
    }

    pub fn fail_network_removal(self) -> Self {
        self.state().fail_network_removal = true;
        self
    }

    /// Containers currently running, sorted by name.
    pub fn running(&self) -> Vec<String> {
        self.state().containers.iter().cloned().collect()
    }

    pub fn networks(&self) -> Vec<String> {
        self.state().networks.iter().cloned().collect()
    }

    /// Specs of every container start that succeeded, in order.
    pub fn started(&self) -> Vec<ContainerSpec> {
        self.state().started.clone()
    }

    /// `"<verb> <name>"` for every call, in order.
    pub fn events(&self) -> Vec<String> {
        self.state().events.clone()
    }

    /// Whether the synchronous fallback teardown ran.
    pub fn reaped(&self) -> bool {
        self.state().reaped
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn create_network(&self, name: &str) -> Result<()> {
        let mut state = self.state();
        state.events.push(format!("create-network {name}"));
        if !state.networks.insert(name.to_string()) {
            anyhow::bail!("network {name} already exists");
        }
        Ok(())
    }

    async fn remove_network(&self, name: &str) -> Result<()> {
        let mut state = self.state();
        state.events.push(format!("remove-network {name}"));
        if state.fail_network_removal {
            anyhow::bail!("network {name} has active endpoints");
        }
        state.networks.remove(name);
        Ok(())
    }

    async fn start(&self, spec: &ContainerSpec) -> Result<ContainerHandle> {
        let delay = {
            let mut state = self.state();
            state.events.push(format!("start {}", spec.name));
            state.start_delay
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state();
        if state.fail_start.contains(&spec.name) {
            anyhow::bail!("pull access denied for {}", spec.image);
        }
        if let Some(network) = &spec.network {
            if !state.networks.contains(network) {
                anyhow::bail!("network {network} not found");
            }
        }
        state.containers.insert(spec.name.clone());
        state.started.push(spec.clone());

        Ok(ContainerHandle {
            id: format!("{}-id", spec.name),
            name: spec.name.clone(),
            host: "127.0.0.1".to_string(),
            ports: spec.ports.clone(),
        })
    }

    async fn stop(&self, name: &str) -> Result<()> {
        let mut state = self.state();
        state.events.push(format!("stop {name}"));
        if state.fail_stop.contains(name) {
            anyhow::bail!("permission denied stopping {name}");
        }
        state.containers.remove(name);
        Ok(())
    }

    async fn logs(&self, name: &str) -> Result<String> {
        Ok(format!("logs of {name}"))
    }

    fn reap(&self, containers: &[String], network: Option<&str>) {
        let mut state = self.state();
        state.reaped = true;
        for name in containers {
            state.events.push(format!("reap {name}"));
            state.containers.remove(name);
        }
        if let Some(network) = network {
            state.networks.remove(network);
        }
    }
}
