//! Host port allocation

use anyhow::{Context, Result};
use std::net::TcpListener;

/// Ask the OS for a free TCP port on the loopback interface.
///
/// The listener is dropped before returning, so another process may grab the
/// port in between. Kafka needs the advertised port before the container
/// starts, which rules out letting the runtime pick one.
pub fn allocate_host_port() -> Result<u16> {
    let listener =
        TcpListener::bind(("127.0.0.1", 0)).context("Failed to bind an ephemeral port")?;
    let port = listener
        .local_addr()
        .context("Failed to read ephemeral port")?
        .port();
    Ok(port)
}
