//! Ansible dynamic inventory document.
//!
//! Rendered as
//!
//! ```json
//! {"webservers": {"hosts": ["web1"]}, "_meta": {"hostvars": {"web1": {"ansible_host": "10.0.0.5"}}}}
//! ```
//!
//! Groups come first in name order, `_meta` last. Host lists and variable maps
//! are sorted as well, so the same hosts always render to the same bytes.

use std::collections::{BTreeMap, BTreeSet};

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::errors::InventoryError;
use crate::models::{HostRecord, HostVars};

/// Reserved top-level key holding per-host variables.
pub const META_KEY: &str = "_meta";

/// A named group of hosts.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Group {
    pub hosts: BTreeSet<String>,
}

#[derive(Serialize)]
struct Meta<'a> {
    hostvars: &'a BTreeMap<String, HostVars>,
}

/// The full inventory: groups plus `_meta.hostvars`.
///
/// Hosts only enter a group through [`Inventory::add_host`], which registers
/// their variables at the same time, so every grouped host has a hostvars entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inventory {
    groups: BTreeMap<String, Group>,
    hostvars: BTreeMap<String, HostVars>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an inventory from hosts in order.
    pub fn from_hosts<I>(hosts: I) -> Result<Self, InventoryError>
    where
        I: IntoIterator<Item = HostRecord>,
    {
        let mut inventory = Self::new();
        for host in hosts {
            inventory.add_host(host)?;
        }
        Ok(inventory)
    }

    /// Adds a host, its group memberships, and its variables.
    ///
    /// A host seen before keeps its earlier groups; variables from the later
    /// record overwrite earlier keys.
    pub fn add_host(&mut self, host: HostRecord) -> Result<(), InventoryError> {
        let HostRecord { name, groups, vars } = host;

        if name.trim().is_empty() {
            return Err(InventoryError::Malformed(
                "host name cannot be empty".to_string(),
            ));
        }
        if let Some(bad) = groups.iter().find(|g| g.trim().is_empty() || *g == META_KEY) {
            return Err(InventoryError::Malformed(format!(
                "host {} has invalid group name {:?}",
                name, bad
            )));
        }

        match self.hostvars.get_mut(&name) {
            Some(existing) => {
                tracing::warn!("Duplicate host {}; merging groups and variables", name);
                existing.extend(vars);
            }
            None => {
                self.hostvars.insert(name.clone(), vars);
            }
        }

        for group in groups {
            self.groups
                .entry(group)
                .or_default()
                .hosts
                .insert(name.clone());
        }

        Ok(())
    }

    pub fn groups(&self) -> &BTreeMap<String, Group> {
        &self.groups
    }

    pub fn hostvars(&self) -> &BTreeMap<String, HostVars> {
        &self.hostvars
    }

    pub fn host_count(&self) -> usize {
        self.hostvars.len()
    }

    /// Variables for one host; empty when the host is unknown.
    pub fn host_vars(&self, name: &str) -> HostVars {
        self.hostvars.get(name).cloned().unwrap_or_default()
    }

    /// Hosts that appear in `_meta.hostvars` but in no group.
    pub fn ungrouped(&self) -> Vec<&str> {
        let grouped: BTreeSet<&str> = self
            .groups
            .values()
            .flat_map(|g| g.hosts.iter().map(String::as_str))
            .collect();
        self.hostvars
            .keys()
            .map(String::as_str)
            .filter(|h| !grouped.contains(h))
            .collect()
    }

    /// Checks that every grouped host has a hostvars entry.
    pub fn validate(&self) -> Result<(), InventoryError> {
        for (group_name, group) in &self.groups {
            if group_name == META_KEY {
                return Err(InventoryError::Malformed(format!(
                    "group name {} is reserved",
                    META_KEY
                )));
            }
            if let Some(missing) = group.hosts.iter().find(|h| !self.hostvars.contains_key(*h)) {
                return Err(InventoryError::Malformed(format!(
                    "host {} in group {} has no hostvars entry",
                    missing, group_name
                )));
            }
        }
        Ok(())
    }

    /// Validates and renders the `--list` document.
    pub fn to_json(&self, pretty: bool) -> Result<String, InventoryError> {
        self.validate()?;
        render(self, pretty)
    }

    /// Renders the `--host <name>` document.
    pub fn host_json(&self, name: &str, pretty: bool) -> Result<String, InventoryError> {
        render(&self.host_vars(name), pretty)
    }
}

fn render<T: Serialize + ?Sized>(value: &T, pretty: bool) -> Result<String, InventoryError> {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(rendered)
}

impl Serialize for Inventory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.groups.len() + 1))?;
        for (name, group) in &self.groups {
            map.serialize_entry(name, group)?;
        }
        map.serialize_entry(
            META_KEY,
            &Meta {
                hostvars: &self.hostvars,
            },
        )?;
        map.end()
    }
}
