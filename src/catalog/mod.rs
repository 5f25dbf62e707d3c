//! Catalog lookups used to resolve a column's native type.
//!
//! The planner only sees [`MetadataResolver`]. [`CatalogRegistry`] is the
//! shipped implementation: it picks a per-source [`SourceCatalog`] from the
//! connection URL and asks it for the column's declared type.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::models::enums::SourceKind;
use crate::models::structs::ConnectionParams;
use crate::planner::errors::{PlanError, Result};

pub mod mssql;
pub mod mysql;
pub mod postgres;
pub mod sqlite;

pub use mssql::MssqlCatalog;
pub use mysql::MySqlCatalog;
pub use postgres::PostgresCatalog;
pub use sqlite::SqliteCatalog;

/// Single-column type lookup. `Ok(None)` means the column does not exist on
/// the table; `Err` means the lookup itself failed. Retries, if any, are the
/// implementation's concern.
#[async_trait]
pub trait MetadataResolver: Send + Sync {
    async fn lookup_column_type(
        &self,
        connection: &ConnectionParams,
        table: &str,
        column: &str,
    ) -> Result<Option<String>>;
}

/// Catalog access for one kind of source.
#[async_trait]
pub trait SourceCatalog: Send + Sync {
    fn source_kind(&self) -> SourceKind;

    async fn column_type(
        &self,
        connection: &ConnectionParams,
        table: &TableRef<'_>,
        column: &str,
    ) -> Result<Option<String>>;
}

/// A table name split into its optional schema and bare name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableRef<'a> {
    pub schema: Option<&'a str>,
    pub name: &'a str,
}

impl<'a> TableRef<'a> {
    /// `sales.orders` -> schema `sales`, name `orders`. Surrounding quote
    /// characters are stripped from both parts.
    pub fn parse(table: &'a str) -> Self {
        let unquote = |s: &'a str| s.trim().trim_matches(|c: char| matches!(c, '"' | '`' | '[' | ']'));
        match table.rsplit_once('.') {
            Some((schema, name)) => Self {
                schema: Some(unquote(schema)),
                name: unquote(name),
            },
            None => Self {
                schema: None,
                name: unquote(table),
            },
        }
    }
}

/// Strip the `jdbc:` prefix and any JDBC query string so the URL can be fed
/// to the native driver's option parser.
pub(crate) fn native_url(url: &str) -> &str {
    let url = url.trim();
    let url = url.strip_prefix("jdbc:").unwrap_or(url);
    url.split('?').next().unwrap_or(url)
}

/// Pools opened by a catalog, keyed by connection URL. sqlx pools are cheap
/// to clone, so lookups clone one out and never hold the lock across awaits.
pub(crate) struct PoolCache<P: Clone> {
    pools: Mutex<HashMap<String, P>>,
}

impl<P: Clone> PoolCache<P> {
    pub(crate) fn new() -> Self {
        Self {
            pools: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn get(&self, url: &str) -> Option<P> {
        self.pools.lock().ok()?.get(url).cloned()
    }

    pub(crate) fn insert(&self, url: impl Into<String>, pool: P) {
        if let Ok(mut g) = self.pools.lock() {
            g.insert(url.into(), pool);
        }
    }
}

/// Registry of source catalogs
///
/// Dispatches each lookup to the catalog registered for the source kind named
/// by the connection URL.
pub struct CatalogRegistry {
    catalogs: HashMap<SourceKind, Box<dyn SourceCatalog>>,
}

impl CatalogRegistry {
    pub fn new() -> Self {
        Self {
            catalogs: HashMap::new(),
        }
    }

    /// Register a catalog, replacing any previous one for the same source kind.
    pub fn register(&mut self, catalog: Box<dyn SourceCatalog>) {
        self.catalogs.insert(catalog.source_kind(), catalog);
    }

    pub fn get(&self, kind: &SourceKind) -> Option<&dyn SourceCatalog> {
        self.catalogs.get(kind).map(|b| &**b)
    }

    /// Create a registry with every built-in catalog
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(MySqlCatalog::new()));
        registry.register(Box::new(PostgresCatalog::new()));
        registry.register(Box::new(SqliteCatalog::new()));
        registry.register(Box::new(MssqlCatalog::new()));
        registry
    }
}

impl Default for CatalogRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[async_trait]
impl MetadataResolver for CatalogRegistry {
    async fn lookup_column_type(
        &self,
        connection: &ConnectionParams,
        table: &str,
        column: &str,
    ) -> Result<Option<String>> {
        let kind = SourceKind::from_url(&connection.url)
            .map_err(|e| PlanError::MetadataLookup(e.to_string()))?;
        let catalog = self.get(&kind).ok_or_else(|| {
            PlanError::MetadataLookup(format!("no catalog registered for source kind {}", kind))
        })?;
        log::debug!("looking up type of {}.{} via {} catalog", table, column, kind);
        catalog
            .column_type(connection, &TableRef::parse(table), column)
            .await
    }
}
