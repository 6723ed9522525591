//! Provisioning state machine phases

use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Where a provisioning pass is.
///
/// `Created → Starting → ProbingBroker → ProvisioningTopics → SeedingMessages
/// → Ready`, with `ProbingRegistry` running alongside the topic and seeding
/// phases when the registry side-car is enabled. `Failed` is reachable from
/// every non-terminal phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Created,
    Starting,
    ProbingBroker,
    ProvisioningTopics,
    SeedingMessages,
    ProbingRegistry,
    Ready,
    Failed,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Ready | Phase::Failed)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Created => write!(f, "created"),
            Phase::Starting => write!(f, "starting"),
            Phase::ProbingBroker => write!(f, "probing broker"),
            Phase::ProvisioningTopics => write!(f, "provisioning topics"),
            Phase::SeedingMessages => write!(f, "seeding messages"),
            Phase::ProbingRegistry => write!(f, "probing schema registry"),
            Phase::Ready => write!(f, "ready"),
            Phase::Failed => write!(f, "failed"),
        }
    }
}

/// Callback invoked on every phase transition.
pub type PhaseObserver = Arc<dyn Fn(Phase) + Send + Sync>;

/// Records the transitions of one provisioning pass.
///
/// Concurrent branches enter their own phases, so a phase can also be left
/// explicitly; [`PhaseTracker::current`] skips phases that were left.
pub(crate) struct PhaseTracker {
    instance: String,
    history: Mutex<Vec<Phase>>,
    left: Mutex<Vec<Phase>>,
    observer: Option<PhaseObserver>,
}

impl PhaseTracker {
    pub(crate) fn new(instance: &str, observer: Option<PhaseObserver>) -> Self {
        Self {
            instance: instance.to_string(),
            history: Mutex::new(Vec::new()),
            left: Mutex::new(Vec::new()),
            observer,
        }
    }

    pub(crate) fn enter(&self, phase: Phase) {
        info!("[{}] {}", self.instance, phase);
        if let Ok(mut history) = self.history.lock() {
            history.push(phase);
        }
        if let Some(observer) = &self.observer {
            observer(phase);
        }
    }

    pub(crate) fn leave(&self, phase: Phase) {
        debug!("[{}] finished {}", self.instance, phase);
        if let Ok(mut left) = self.left.lock() {
            left.push(phase);
        }
    }

    /// Most recently entered phase that is still running.
    pub(crate) fn current(&self) -> Phase {
        let left = self.left.lock().map(|l| l.clone()).unwrap_or_default();
        self.history
            .lock()
            .ok()
            .and_then(|history| {
                history
                    .iter()
                    .rev()
                    .find(|phase| !left.contains(phase))
                    .copied()
            })
            .unwrap_or(Phase::Created)
    }
}
