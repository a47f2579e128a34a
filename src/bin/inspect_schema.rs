//! Utility to inspect the catalogue tables the inventory query reads.

use awx_pg_inventory::config::Config;
use awx_pg_inventory::db::{Database, SOURCE_SCHEMA, SOURCE_TABLES};

/// Main entry point for the schema inspection utility.
///
/// Connects with the same settings as the inventory script and lists the
/// columns of each source table, flagging tables that are missing.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env()?;
    let mut db = Database::connect(&config).await?;
    let columns = db.describe_source_tables().await;
    db.close().await;
    let columns = columns?;

    for table in SOURCE_TABLES {
        println!("{}.\"{}\"", SOURCE_SCHEMA, table);

        let mut found = false;
        for (_, column, data_type) in columns.iter().filter(|(t, _, _)| t == table) {
            println!("  - {}: {}", column, data_type);
            found = true;
        }
        if !found {
            println!("  (missing)");
        }
        println!();
    }

    Ok(())
}
