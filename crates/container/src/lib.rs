//! Container runtime boundary for kafka-testbed
//!
//! The provisioning orchestrator never talks to Docker directly. It describes
//! what it wants as a [`ContainerSpec`], asks a [`ContainerRuntime`] to start
//! it, and gets back a [`ContainerHandle`] that knows which host port every
//! exposed container port was mapped to.
//!
//! - `DockerCli` - shells out to the `docker` binary
//! - Any other runtime (or a test fake) only needs to implement the trait

pub mod docker;
pub mod ports;
pub mod spec;

pub use docker::DockerCli;
pub use ports::allocate_host_port;
pub use spec::{ContainerHandle, ContainerSpec, PortBinding};

use anyhow::Result;
use async_trait::async_trait;

/// Start/address/stop contract for isolated execution environments.
///
/// Implementations must treat stopping or removing something that does not
/// exist as success, so teardown can be attempted blindly after a partial
/// start.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Create a private network that containers of one instance share.
    async fn create_network(&self, name: &str) -> Result<()>;

    /// Remove a network created by [`ContainerRuntime::create_network`].
    async fn remove_network(&self, name: &str) -> Result<()>;

    /// Start a detached container and return its handle once the runtime
    /// reports it as created.
    async fn start(&self, spec: &ContainerSpec) -> Result<ContainerHandle>;

    /// Stop and remove a container by name.
    async fn stop(&self, name: &str) -> Result<()>;

    /// Combined stdout/stderr of a container, for diagnostics.
    async fn logs(&self, name: &str) -> Result<String>;

    /// Synchronous best-effort removal, usable from `Drop`.
    fn reap(&self, containers: &[String], network: Option<&str>);
}
