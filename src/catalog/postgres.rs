//! PostgreSQL catalog

use std::str::FromStr;

use async_trait::async_trait;
use log::debug;
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};

use crate::catalog::{PoolCache, SourceCatalog, TableRef, native_url};
use crate::models::enums::SourceKind;
use crate::models::structs::ConnectionParams;
use crate::planner::errors::Result;

// information_schema columns are sql_identifier/character_data domains, which
// sqlx will not decode as String without the casts.
const COLUMN_TYPE_SQL: &str = "SELECT data_type::text FROM information_schema.columns \
     WHERE table_schema = COALESCE($1::text, current_schema()::text) \
     AND table_name = $2 AND column_name = $3";

pub struct PostgresCatalog {
    pools: PoolCache<PgPool>,
}

impl PostgresCatalog {
    pub fn new() -> Self {
        Self {
            pools: PoolCache::new(),
        }
    }

    async fn pool(&self, connection: &ConnectionParams) -> Result<PgPool> {
        if let Some(pool) = self.pools.get(&connection.url) {
            return Ok(pool);
        }
        let mut options = PgConnectOptions::from_str(native_url(&connection.url))?;
        if let Some(user) = &connection.username {
            options = options.username(user);
        }
        if let Some(password) = &connection.password {
            options = options.password(password);
        }
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        self.pools.insert(connection.url.clone(), pool.clone());
        Ok(pool)
    }
}

impl Default for PostgresCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceCatalog for PostgresCatalog {
    fn source_kind(&self) -> SourceKind {
        SourceKind::PostgreSQL
    }

    async fn column_type(
        &self,
        connection: &ConnectionParams,
        table: &TableRef<'_>,
        column: &str,
    ) -> Result<Option<String>> {
        let pool = self.pool(connection).await?;
        debug!("PostgresCatalog: type of {}.{}", table.name, column);
        let data_type = sqlx::query_scalar::<_, String>(COLUMN_TYPE_SQL)
            .bind(table.schema)
            .bind(table.name)
            .bind(column)
            .fetch_optional(&pool)
            .await?;
        Ok(data_type)
    }
}
