//! MySQL catalog

use std::str::FromStr;

use async_trait::async_trait;
use log::debug;
use sqlx::MySqlPool;
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};

use crate::catalog::{PoolCache, SourceCatalog, TableRef, native_url};
use crate::models::enums::SourceKind;
use crate::models::structs::ConnectionParams;
use crate::planner::errors::Result;

// DATA_TYPE is a longtext with a binary collation on MySQL 8
const COLUMN_TYPE_SQL: &str = "SELECT CAST(DATA_TYPE AS CHAR) FROM INFORMATION_SCHEMA.COLUMNS \
     WHERE TABLE_SCHEMA = COALESCE(?, DATABASE()) AND TABLE_NAME = ? AND COLUMN_NAME = ?";

pub struct MySqlCatalog {
    pools: PoolCache<MySqlPool>,
}

impl MySqlCatalog {
    pub fn new() -> Self {
        Self {
            pools: PoolCache::new(),
        }
    }

    async fn pool(&self, connection: &ConnectionParams) -> Result<MySqlPool> {
        if let Some(pool) = self.pools.get(&connection.url) {
            return Ok(pool);
        }
        let mut options = MySqlConnectOptions::from_str(native_url(&connection.url))?;
        if let Some(user) = &connection.username {
            options = options.username(user);
        }
        if let Some(password) = &connection.password {
            options = options.password(password);
        }
        let pool = MySqlPoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        self.pools.insert(connection.url.clone(), pool.clone());
        Ok(pool)
    }
}

impl Default for MySqlCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceCatalog for MySqlCatalog {
    fn source_kind(&self) -> SourceKind {
        SourceKind::MySQL
    }

    async fn column_type(
        &self,
        connection: &ConnectionParams,
        table: &TableRef<'_>,
        column: &str,
    ) -> Result<Option<String>> {
        let pool = self.pool(connection).await?;
        debug!("MySqlCatalog: type of {}.{}", table.name, column);
        let data_type = sqlx::query_scalar::<_, String>(COLUMN_TYPE_SQL)
            .bind(table.schema)
            .bind(table.name)
            .bind(column)
            .fetch_optional(&pool)
            .await?;
        Ok(data_type)
    }
}
