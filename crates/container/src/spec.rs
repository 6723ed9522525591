//! Container descriptions and handles

/// Mapping of one container port to a host port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortBinding {
    pub host: u16,
    pub container: u16,
}

/// Everything a runtime needs to start one container.
#[derive(Debug, Clone, Default)]
pub struct ContainerSpec {
    /// Container name, unique per host
    pub name: String,
    /// Full image reference including tag (e.g. `apache/kafka:3.7.0`)
    pub image: String,
    /// Environment variables, applied in order
    pub env: Vec<(String, String)>,
    /// Published ports
    pub ports: Vec<PortBinding>,
    /// Network to attach to
    pub network: Option<String>,
    /// DNS alias inside `network`
    pub network_alias: Option<String>,
}

impl ContainerSpec {
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            ..Default::default()
        }
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn port(mut self, host: u16, container: u16) -> Self {
        self.ports.push(PortBinding { host, container });
        self
    }

    pub fn network(mut self, network: impl Into<String>, alias: Option<&str>) -> Self {
        self.network = Some(network.into());
        self.network_alias = alias.map(str::to_string);
        self
    }

    /// Arguments for `docker run`, without the leading `run`.
    pub fn run_args(&self) -> Vec<String> {
        let mut args = vec!["-d".to_string(), "--name".to_string(), self.name.clone()];

        if let Some(network) = &self.network {
            args.push("--network".to_string());
            args.push(network.clone());
            if let Some(alias) = &self.network_alias {
                args.push("--network-alias".to_string());
                args.push(alias.clone());
            }
        }

        for (key, value) in &self.env {
            args.push("-e".to_string());
            args.push(format!("{key}={value}"));
        }

        for binding in &self.ports {
            args.push("-p".to_string());
            args.push(format!("{}:{}", binding.host, binding.container));
        }

        args.push(self.image.clone());
        args
    }
}

/// A container the runtime reported as started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHandle {
    pub id: String,
    pub name: String,
    /// Host the published ports are reachable on
    pub host: String,
    pub ports: Vec<PortBinding>,
}

impl ContainerHandle {
    /// `host:port` for a container port, if it was published.
    pub fn address(&self, container_port: u16) -> Option<String> {
        self.ports
            .iter()
            .find(|binding| binding.container == container_port)
            .map(|binding| format!("{}:{}", self.host, binding.host))
    }
}
