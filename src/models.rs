use std::collections::BTreeSet;

use serde_json::{Map, Value};
use sqlx::types::JsonValue;
use sqlx::FromRow;

// ============ Database Models ============

/// One virtual machine row from the monitoring catalogue.
#[derive(Debug, Clone, FromRow)]
pub struct ObjectRow {
    /// Name of the datasource the object was discovered through.
    pub datasource_name: Option<String>,
    /// Catalogue identifier of the object, rendered as text.
    pub object_id: String,
    /// Object name; used as the Ansible host name.
    pub object_name: String,
    /// The `tags` member of the object's JSON document.
    /// Either a JSON object or a JSON-encoded string, depending on how it was stored.
    pub tags: Option<JsonValue>,
}

// ============ Inventory Models ============

/// Host variables, keyed by variable name.
pub type HostVars = Map<String, Value>;

/// A host ready to be placed in the inventory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HostRecord {
    pub name: String,
    /// Groups the host belongs to; empty means ungrouped.
    pub groups: BTreeSet<String>,
    pub vars: HostVars,
}

impl HostRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.groups.insert(group.into());
        self
    }

    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_collects_groups_and_vars() {
        let host = HostRecord::new("web1")
            .with_group("webservers")
            .with_group("webservers")
            .with_var("ansible_host", "10.0.0.5")
            .with_var("connected_hosts", json!([]));

        assert_eq!(host.groups.len(), 1);
        assert_eq!(host.vars["ansible_host"], json!("10.0.0.5"));
        assert_eq!(host.vars["connected_hosts"], json!([]));
    }
}
