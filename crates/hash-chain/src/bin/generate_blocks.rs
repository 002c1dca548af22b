//! Generate or check the static chain file for the viewer.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hash_chain::{bread_supply_chain, ChainSnapshot};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "generate-blocks")]
#[command(about = "Precompute the bread supply chain hashes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the chain and write it as JSON
    Generate {
        /// Output file
        #[arg(short, long, default_value = "docs/data/blocks.json")]
        output: PathBuf,
    },
    /// Recompute every hash of an existing chain file
    Verify {
        /// Chain file to check
        #[arg(short, long, default_value = "docs/data/blocks.json")]
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate { output } => {
            let records = bread_supply_chain().context("Invalid stage dataset")?;
            let snapshot = ChainSnapshot::generate(&records, chrono::Utc::now())
                .context("Failed to build chain")?;
            snapshot
                .write_to(&output)
                .with_context(|| format!("Failed to write {}", output.display()))?;

            for link in &snapshot.blockchain {
                info!(
                    "Block #{}: {} {}...",
                    link.record.index,
                    link.record.title,
                    &link.hash[..16]
                );
            }
        }
        Commands::Verify { input } => {
            let snapshot = ChainSnapshot::read_from(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            snapshot
                .verify()
                .with_context(|| format!("{} failed verification", input.display()))?;

            info!(
                "{}: {} blocks verified (generated {})",
                input.display(),
                snapshot.metadata.total_blocks,
                snapshot.metadata.generated_at
            );
        }
    }

    Ok(())
}
