use sqlx::postgres::PgConnection;
use sqlx::Connection;

use crate::config::Config;
use crate::errors::{InventoryError, ResultExt};
use crate::models::ObjectRow;

/// Schema holding the monitoring catalogue.
pub const SOURCE_SCHEMA: &str = "dbo";

/// Tables the host query reads from.
pub const SOURCE_TABLES: [&str; 3] = ["Objects", "ObjectInventory", "Datasource"];

/// Virtual machines from the cached inventory of the supported connection
/// types, restricted to objects carrying at least one tag that matches `$1`.
pub const HOSTS_QUERY: &str = r#"
    SELECT
        d."Name"::text AS datasource_name,
        a."ObjectId"::text AS object_id,
        a."ObjectName"::text AS object_name,
        CAST(a."Object" AS jsonb) -> 'tags' AS tags
    FROM
        dbo."Objects" a
    INNER JOIN
        dbo."ObjectInventory" b ON a."InventoryId" = b."Id"
    INNER JOIN
        dbo."Datasource" d ON b."DatasourceId" = d."DatasourceId"
    WHERE
        a."SystemEntityId" = 3001
        AND b."CacheGroup" = 4
        AND d."ConnectionTypeId" IN (5, 8, 10)
        AND a."ObjectName" IS NOT NULL
        AND btrim(a."ObjectName"::text) <> ''
        AND EXISTS (
            SELECT 1
            FROM jsonb_each_text(CAST(a."Object" AS jsonb) -> 'tags') AS kv
            WHERE kv.value ILIKE $1
        )
    ORDER BY
        a."ObjectName"::text, a."ObjectId"::text
"#;

/// A single PostgreSQL session, held for one invocation.
pub struct Database {
    conn: PgConnection,
}

impl Database {
    /// Opens one connection, giving up after the configured connect timeout.
    pub async fn connect(config: &Config) -> Result<Self, InventoryError> {
        let options = config.connect_options();

        tracing::debug!(
            "Connecting to {}:{}/{} (timeout {:?})",
            config.db_hostname,
            config.db_port,
            config.db_name,
            config.connect_timeout
        );

        let conn = tokio::time::timeout(
            config.connect_timeout,
            PgConnection::connect_with(&options),
        )
        .await
        .map_err(|_| InventoryError::ConnectTimeout(config.connect_timeout))?
        .map_err(InventoryError::Connection)?;

        tracing::info!(
            "Connected to database {} on {}",
            config.db_name,
            config.db_hostname
        );
        Ok(Self { conn })
    }

    /// Runs the host query.
    pub async fn fetch_objects(
        &mut self,
        tag_filter: &str,
    ) -> Result<Vec<ObjectRow>, InventoryError> {
        let rows = sqlx::query_as::<_, ObjectRow>(HOSTS_QUERY)
            .bind(tag_filter)
            .fetch_all(&mut self.conn)
            .await
            .map_err(InventoryError::Query)?;

        tracing::info!("Fetched {} host rows", rows.len());
        Ok(rows)
    }

    /// Lists `(table, column, data type)` for the source tables, in column order.
    pub async fn describe_source_tables(
        &mut self,
    ) -> Result<Vec<(String, String, String)>, InventoryError> {
        sqlx::query_as(
            "SELECT table_name::text, column_name::text, data_type::text \
             FROM information_schema.columns \
             WHERE table_schema = $1 AND table_name = ANY($2) \
             ORDER BY table_name, ordinal_position",
        )
        .bind(SOURCE_SCHEMA)
        .bind(SOURCE_TABLES.to_vec())
        .fetch_all(&mut self.conn)
        .await
        .map_err(InventoryError::Query)
    }

    /// Closes the session. Failures here are logged, never surfaced.
    pub async fn close(self) {
        if let Err(e) = self.conn.close().await {
            tracing::warn!("Error closing database connection: {}", e);
        }
    }
}

/// Connects, runs the host query, and closes the connection on every path.
pub async fn fetch_objects(config: &Config) -> Result<Vec<ObjectRow>, InventoryError> {
    let mut db = Database::connect(config)
        .await
        .context("connecting to inventory database")?;

    let result = db
        .fetch_objects(&config.classifier.tag_filter)
        .await
        .context("fetching hosts");

    db.close().await;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_binds_tag_filter_once() {
        assert_eq!(HOSTS_QUERY.matches("$1").count(), 1);
        assert!(!HOSTS_QUERY.contains("$2"));
    }

    #[test]
    fn test_query_reads_every_source_table() {
        for table in SOURCE_TABLES {
            assert!(
                HOSTS_QUERY.contains(&format!("{}.\"{}\"", SOURCE_SCHEMA, table)),
                "query should read {}",
                table
            );
        }
    }

    #[test]
    fn test_query_excludes_blank_names() {
        assert!(HOSTS_QUERY.contains(r#"a."ObjectName" IS NOT NULL"#));
        assert!(HOSTS_QUERY.contains(r#"btrim(a."ObjectName"::text) <> ''"#));
    }

    #[test]
    fn test_query_columns_match_row_fields() {
        for column in ["datasource_name", "object_id", "object_name", "tags"] {
            assert!(HOSTS_QUERY.contains(&format!("AS {}", column)));
        }
    }
}
