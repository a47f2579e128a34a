//! Ansible Tower/AWX dynamic inventory backed by PostgreSQL.
//!
//! Reads virtual machines from a monitoring catalogue, sorts them into
//! environment and role groups, and renders the JSON document Ansible's
//! script inventory protocol expects.
//!
//! # Modules
//!
//! - `cli`: `--list` / `--host` argument handling.
//! - `classify`: Row to host classification.
//! - `config`: Configuration management.
//! - `db`: Single-connection database access.
//! - `errors`: Error handling types.
//! - `inventory`: Inventory document and its JSON rendering.
//! - `models`: Database rows and host records.

pub mod classify;
pub mod cli;
pub mod config;
pub mod db;
pub mod errors;
pub mod inventory;
pub mod models;

use crate::cli::Mode;
use crate::config::{ClassifierSettings, Config};
use crate::errors::InventoryError;
use crate::inventory::Inventory;
use crate::models::ObjectRow;

/// Classifies rows and assembles the inventory.
pub fn build_inventory(
    rows: &[ObjectRow],
    settings: &ClassifierSettings,
) -> Result<Inventory, InventoryError> {
    let inventory = Inventory::from_hosts(classify::classify_rows(rows, settings))?;
    inventory.validate()?;

    tracing::info!(
        "Inventory built: {} hosts in {} groups ({} ungrouped)",
        inventory.host_count(),
        inventory.groups().len(),
        inventory.ungrouped().len()
    );
    Ok(inventory)
}

/// Renders the document for `mode` from already-fetched rows.
pub fn render(
    rows: &[ObjectRow],
    settings: &ClassifierSettings,
    mode: &Mode,
    pretty: bool,
) -> Result<String, InventoryError> {
    let inventory = build_inventory(rows, settings)?;
    match mode {
        Mode::List => inventory.to_json(pretty),
        Mode::Host(name) => {
            if !inventory.hostvars().contains_key(name) {
                tracing::warn!("Host {} not found; returning empty variables", name);
            }
            inventory.host_json(name, pretty)
        }
    }
}

/// Fetches hosts from the database and renders the document for `mode`.
///
/// Nothing is written anywhere; the caller prints the returned document.
pub async fn generate(
    config: &Config,
    mode: &Mode,
    pretty: bool,
) -> Result<String, InventoryError> {
    let rows = db::fetch_objects(config).await?;
    render(&rows, &config.classifier, mode, pretty)
}
