//! Docker CLI runtime

use crate::{ContainerHandle, ContainerRuntime, ContainerSpec};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::process::{Output, Stdio};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Runs containers through the `docker` binary on `PATH`.
#[derive(Debug, Clone)]
pub struct DockerCli {
    /// Binary to invoke (`docker`, `podman`, ...)
    program: String,
    /// Host that published ports are reachable on
    host: String,
}

impl Default for DockerCli {
    fn default() -> Self {
        Self {
            program: "docker".to_string(),
            host: "127.0.0.1".to_string(),
        }
    }
}

impl DockerCli {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    async fn run(&self, args: &[String]) -> Result<Output> {
        debug!("{} {}", self.program, args.join(" "));
        Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("Failed to execute {} {}", self.program, args[0]))
    }
}

/// Docker reports a missing object on stderr with one of these phrases.
fn is_missing(stderr: &str) -> bool {
    stderr.contains("No such container")
        || stderr.contains("No such network")
        || stderr.contains("not found")
}

#[async_trait]
impl ContainerRuntime for DockerCli {
    async fn create_network(&self, name: &str) -> Result<()> {
        let output = self
            .run(&["network".into(), "create".into(), name.into()])
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("Failed to create network {name}: {}", stderr.trim());
        }

        debug!("Created network: {}", name);
        Ok(())
    }

    async fn remove_network(&self, name: &str) -> Result<()> {
        let output = self
            .run(&["network".into(), "rm".into(), name.into()])
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if is_missing(&stderr) {
                debug!("Network {} already gone", name);
                return Ok(());
            }
            anyhow::bail!("Failed to remove network {name}: {}", stderr.trim());
        }

        debug!("Removed network: {}", name);
        Ok(())
    }

    async fn start(&self, spec: &ContainerSpec) -> Result<ContainerHandle> {
        info!("Starting container {} from {}", spec.name, spec.image);

        // A leftover container with the same name makes `docker run` fail
        self.stop(&spec.name).await?;

        let mut args = vec!["run".to_string()];
        args.extend(spec.run_args());

        let output = self
            .run(&args)
            .await
            .context("Failed to start Docker container")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("Failed to start container {}: {}", spec.name, stderr.trim());
        }

        let id = String::from_utf8_lossy(&output.stdout).trim().to_string();
        info!("Started container {} ({})", spec.name, id);

        Ok(ContainerHandle {
            id,
            name: spec.name.clone(),
            host: self.host.clone(),
            ports: spec.ports.clone(),
        })
    }

    async fn stop(&self, name: &str) -> Result<()> {
        let output = self
            .run(&["rm".into(), "-f".into(), "-v".into(), name.into()])
            .await
            .context("Failed to remove container")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if is_missing(&stderr) {
                debug!("Container {} does not exist", name);
                return Ok(());
            }
            anyhow::bail!("Failed to remove container {name}: {}", stderr.trim());
        }

        debug!("Container {} stopped and removed", name);
        Ok(())
    }

    async fn logs(&self, name: &str) -> Result<String> {
        let output = self
            .run(&["logs".into(), name.into()])
            .await
            .context("Failed to get container logs")?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        Ok(format!("STDOUT:\n{stdout}\n\nSTDERR:\n{stderr}"))
    }

    fn reap(&self, containers: &[String], network: Option<&str>) {
        for name in containers {
            let result = std::process::Command::new(&self.program)
                .args(["rm", "-f", "-v", name])
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status();
            if let Err(e) = result {
                warn!("Failed to remove container {}: {}", name, e);
            }
        }

        if let Some(network) = network {
            let _ = std::process::Command::new(&self.program)
                .args(["network", "rm", network])
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status();
        }
    }
}
