//! Error types surfaced to callers of the provisioning pipeline.

use crate::phase::Phase;
use std::time::Duration;
use thiserror::Error;

/// Category of a provisioning failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected before any container was started
    Configuration,
    /// The container runtime could not start something
    Startup,
    /// Broker or registry (or the whole pass) ran out of time
    StartupTimeout,
    /// A topic could not be created
    Provisioning,
    /// A seed message could not be published
    Seeding,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Failed to start {what}: {cause:#}")]
    Startup { what: String, cause: anyhow::Error },

    #[error(
        "Timed out while {phase} after {waited:?} (last error: {})",
        .last_error.as_deref().unwrap_or("none")
    )]
    StartupTimeout {
        phase: Phase,
        waited: Duration,
        last_error: Option<String>,
    },

    #[error("Failed to create topic '{topic}': {reason}")]
    Provisioning { topic: String, reason: String },

    #[error(
        "Failed to publish seed messages to '{topic}'{}: {reason}",
        .index.map(|i| format!(" (message #{i})")).unwrap_or_default()
    )]
    Seeding {
        topic: String,
        index: Option<usize>,
        reason: String,
    },

    #[error("{primary} (teardown also failed: {teardown})")]
    Teardown {
        primary: Box<Error>,
        teardown: String,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn configuration(msg: impl Into<String>) -> Self {
        Error::Configuration(msg.into())
    }

    pub(crate) fn startup(what: impl Into<String>, cause: impl Into<anyhow::Error>) -> Self {
        Error::Startup {
            what: what.into(),
            cause: cause.into(),
        }
    }

    /// The original failure, looking through a teardown failure.
    pub fn primary(&self) -> &Error {
        match self {
            Error::Teardown { primary, .. } => primary.primary(),
            other => other,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Configuration(_) => ErrorKind::Configuration,
            Error::Startup { .. } => ErrorKind::Startup,
            Error::StartupTimeout { .. } => ErrorKind::StartupTimeout,
            Error::Provisioning { .. } => ErrorKind::Provisioning,
            Error::Seeding { .. } => ErrorKind::Seeding,
            Error::Teardown { primary, .. } => primary.kind(),
        }
    }

    /// Teardown problems attached to this error, if any.
    pub fn teardown_failure(&self) -> Option<&str> {
        match self {
            Error::Teardown { teardown, .. } => Some(teardown),
            _ => None,
        }
    }
}
