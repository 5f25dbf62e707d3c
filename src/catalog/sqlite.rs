//! SQLite catalog

use std::str::FromStr;

use async_trait::async_trait;
use log::debug;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};

use crate::catalog::{PoolCache, SourceCatalog, TableRef, native_url};
use crate::models::enums::SourceKind;
use crate::models::structs::ConnectionParams;
use crate::planner::errors::Result;

pub struct SqliteCatalog {
    pools: PoolCache<SqlitePool>,
}

impl SqliteCatalog {
    pub fn new() -> Self {
        Self {
            pools: PoolCache::new(),
        }
    }

    /// Reuse an already open pool for lookups against `url`. In-memory
    /// databases can only be inspected this way.
    pub fn with_pool(self, url: impl Into<String>, pool: SqlitePool) -> Self {
        self.pools.insert(url, pool);
        self
    }

    async fn pool(&self, connection: &ConnectionParams) -> Result<SqlitePool> {
        if let Some(pool) = self.pools.get(&connection.url) {
            return Ok(pool);
        }
        let options = SqliteConnectOptions::from_str(native_url(&connection.url))?.read_only(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        self.pools.insert(connection.url.clone(), pool.clone());
        Ok(pool)
    }
}

impl Default for SqliteCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceCatalog for SqliteCatalog {
    fn source_kind(&self) -> SourceKind {
        SourceKind::SQLite
    }

    async fn column_type(
        &self,
        connection: &ConnectionParams,
        table: &TableRef<'_>,
        column: &str,
    ) -> Result<Option<String>> {
        let pool = self.pool(connection).await?;

        // Quote and escape names; PRAGMA does not take bind parameters
        let escaped_table = table.name.replace('\'', "''");
        let pragma = match table.schema {
            Some(schema) => format!(
                "PRAGMA \"{}\".table_info('{}')",
                schema.replace('"', "\"\""),
                escaped_table
            ),
            None => format!("PRAGMA table_info('{}')", escaped_table),
        };
        debug!("SqliteCatalog: {}", pragma);

        let rows = sqlx::query(&pragma).fetch_all(&pool).await?;
        for row in rows {
            let name: String = row.try_get("name")?;
            if name.eq_ignore_ascii_case(column) {
                return Ok(Some(row.try_get::<String, _>("type")?));
            }
        }
        Ok(None)
    }
}
