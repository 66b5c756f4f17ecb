//! # ejb3 management demo
//!
//! Boots a [`ManagementHost`] with the `ejb3` extension, then either loads a
//! subsystem document or builds a small model through the typed client, and
//! prints the model re-written in the requested schema version.
//!
//! ```bash
//! RUST_LOG=info cargo run -- --document ejb3.xml --write-version 1.0
//! EJB3__CODEC__DOWNGRADE_POLICY=omit cargo run -- --write-version 1.0
//! ```

use anyhow::{bail, Context};
use clap::Parser;
use ejb3_subsystem::clients::Ejb3Client;
use ejb3_subsystem::config::ManagementConfig;
use ejb3_subsystem::framework::handler::READ_RESOURCE_DESCRIPTION;
use ejb3_subsystem::framework::{Parameters, SchemaVersion};
use ejb3_subsystem::lifecycle::{setup_tracing, ManagementHost};
use ejb3_subsystem::model::{StrictMaxPool, TimeoutUnit};
use ejb3_subsystem::subsystem::{pool_address, Ejb3Extension};
use std::path::PathBuf;
use tracing::{info, Instrument};

#[derive(Parser)]
#[command(name = "ejb3-subsystem")]
#[command(about = "Load, validate and re-write ejb3 subsystem configuration")]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Subsystem document to load; a demo model is built when absent
    #[arg(long)]
    document: Option<PathBuf>,

    /// Only validate the document; nothing is committed
    #[arg(long, default_value = "false")]
    dry_run: bool,

    /// Schema version to write (defaults to the newest)
    #[arg(long)]
    write_version: Option<SchemaVersion>,

    /// Print the pool resource description as JSON
    #[arg(long, default_value = "false")]
    describe_pools: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    setup_tracing();
    let cli = Cli::parse();

    let config = ManagementConfig::load(cli.config.as_deref()).context("loading configuration")?;
    let host = ManagementHost::start(&config, vec![Box::new(Ejb3Extension)])?;

    match &cli.document {
        Some(path) => {
            let document = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            if cli.dry_run {
                let results = host.validate_document(&document).await?;
                info!(operations = results.len(), "Document is valid");
                host.shutdown().await.map_err(anyhow::Error::msg)?;
                return Ok(());
            }
            let load = host.load_document(&document).await;
            if let Some(e) = load.error {
                bail!("{} was rejected: {}", path.display(), e);
            }
        }
        None => {
            let client = Ejb3Client::new(host.client());
            async {
                client.add_subsystem().await?;
                client
                    .add_strict_max_pool(&StrictMaxPool::new("slsb-strict-max-pool", 20))
                    .await?;
                client
                    .add_strict_max_pool(
                        &StrictMaxPool::new("mdb-strict-max-pool", 20)
                            .with_timeout(30, TimeoutUnit::Seconds),
                    )
                    .await?;
                client.set_default_slsb_pool("slsb-strict-max-pool").await?;
                client.set_default_mdb_pool("mdb-strict-max-pool").await
            }
            .instrument(tracing::info_span!("demo_model"))
            .await?;
        }
    }

    if cli.describe_pools {
        let description = host
            .invoke(pool_address("*"), READ_RESOURCE_DESCRIPTION, Parameters::new())
            .await?;
        println!("{}", serde_json::to_string_pretty(&description)?);
    }

    let document = match cli.write_version {
        Some(version) => host.write(version)?,
        None => host.write_default()?,
    };
    println!("{}", document);

    host.shutdown().await.map_err(anyhow::Error::msg)?;
    Ok(())
}
