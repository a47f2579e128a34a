use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use awx_pg_inventory::cli::Cli;
use awx_pg_inventory::config::Config;
use awx_pg_inventory::errors::InventoryError;

/// Loads configuration, generates the document, and prints it once.
async fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded successfully");

    let document = awx_pg_inventory::generate(&config, &cli.mode(), cli.pretty).await?;

    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", document)?;
    stdout.flush()?;

    Ok(())
}

/// Entry point for the inventory script.
///
/// Stdout carries only the inventory document; logs go to stderr. Any failure
/// is reported once on stderr, leaves stdout empty, and exits with status 1,
/// which AWX reports as a failed inventory source.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "awx_pg_inventory=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let data_source = e
                .downcast_ref::<InventoryError>()
                .is_some_and(InventoryError::is_data_source);
            if data_source {
                tracing::error!("Inventory source unavailable: {}", e);
            } else {
                tracing::error!("{}", e);
            }
            ExitCode::FAILURE
        }
    }
}
