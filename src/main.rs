//! Command-line interface for kafka-testbed
//!
//! # Usage Examples
//!
//! ```bash
//! # Broker with two topics, seeded from a file, until Ctrl-C
//! kafka-testbed up \
//!   --topic topic-1 \
//!   --topic-config topic-2:3 \
//!   --messages-file testdata/messages.json
//!
//! # Everything from a preset file, plus a schema registry
//! kafka-testbed up --preset preset.yaml --schema-registry
//!
//! # Resolve and validate a preset without starting containers
//! kafka-testbed check --preset preset.yaml
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use kafka_testbed::config::PresetArgs;
use kafka_testbed::{Orchestrator, Preset};
use serde_json::json;

#[derive(Parser)]
#[command(name = "kafka-testbed")]
#[command(about = "Ephemeral, pre-provisioned Kafka brokers for tests")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a broker, print its addresses, and keep it running until Ctrl-C
    Up {
        #[command(flatten)]
        preset: PresetArgs,
    },

    /// Validate a preset and print the resolved topics without starting anything
    Check {
        #[command(flatten)]
        preset: PresetArgs,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Up { preset } => {
            let preset = preset.into_builder()?.build()?;
            up(preset).await
        }
        Commands::Check { preset } => {
            let preset = preset.into_builder()?.build()?;
            check(&preset)
        }
    }
}

async fn up(preset: Preset) -> anyhow::Result<()> {
    let orchestrator = Orchestrator::docker().context("Failed to set up orchestrator")?;
    let instance = orchestrator.provision(preset).await?;

    let summary = json!({
        "container": instance.name(),
        "broker": instance.address(),
        "schema_registry": instance.registry_address(),
        "ready_since": instance.ready_since().to_rfc3339(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    tracing::info!("Press Ctrl-C to stop");
    let waited = tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C");

    instance.stop().await.context("Failed to stop broker")?;
    waited
}

fn check(preset: &Preset) -> anyhow::Result<()> {
    let image = preset
        .image()
        .map(str::to_string)
        .unwrap_or_else(|| preset.version().image());

    let summary = json!({
        "container": preset.container_name(),
        "version": preset.version().to_string(),
        "image": image,
        "topics": preset.topics(),
        "messages": preset.messages().len(),
        "schema_registry": preset.schema_registry(),
        "timeout_secs": preset.timeout().as_secs(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
