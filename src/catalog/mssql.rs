//! MS SQL Server catalog
//!
//! Uses tiberius directly and opens one connection per lookup; the planner
//! issues at most one lookup per request.

use async_trait::async_trait;
use log::debug;
use tokio::net::TcpStream;
use tokio_util::compat::TokioAsyncWriteCompatExt;

use crate::catalog::{SourceCatalog, TableRef};
use crate::models::enums::SourceKind;
use crate::models::structs::ConnectionParams;
use crate::planner::errors::{PlanError, Result};

const COLUMN_TYPE_SQL: &str = "SELECT DATA_TYPE FROM INFORMATION_SCHEMA.COLUMNS \
     WHERE TABLE_SCHEMA = SCHEMA_NAME() AND TABLE_NAME = @P1 AND COLUMN_NAME = @P2";

const COLUMN_TYPE_IN_SCHEMA_SQL: &str = "SELECT DATA_TYPE FROM INFORMATION_SCHEMA.COLUMNS \
     WHERE TABLE_SCHEMA = @P3 AND TABLE_NAME = @P1 AND COLUMN_NAME = @P2";

pub struct MssqlCatalog {
    // Stateless - a connection is opened per lookup
}

impl MssqlCatalog {
    pub fn new() -> Self {
        Self {}
    }

    fn config(connection: &ConnectionParams) -> Result<tiberius::Config> {
        let mut config = tiberius::Config::from_jdbc_string(connection.url.trim())?;
        if let Some(user) = &connection.username {
            config.authentication(tiberius::AuthMethod::sql_server(
                user,
                connection.password.as_deref().unwrap_or_default(),
            ));
        }
        config.trust_cert();
        Ok(config)
    }
}

impl Default for MssqlCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceCatalog for MssqlCatalog {
    fn source_kind(&self) -> SourceKind {
        SourceKind::SqlServer
    }

    async fn column_type(
        &self,
        connection: &ConnectionParams,
        table: &TableRef<'_>,
        column: &str,
    ) -> Result<Option<String>> {
        let config = Self::config(connection)?;

        let tcp = TcpStream::connect(config.get_addr())
            .await
            .map_err(|e| PlanError::MetadataLookup(format!("failed to connect TCP: {}", e)))?;
        let _ = tcp.set_nodelay(true);

        let mut client = tiberius::Client::connect(config, tcp.compat_write()).await?;
        debug!("MssqlCatalog: type of {}.{}", table.name, column);

        let row = match table.schema {
            Some(schema) => {
                client
                    .query(COLUMN_TYPE_IN_SCHEMA_SQL, &[&table.name, &column, &schema])
                    .await?
                    .into_row()
                    .await?
            }
            None => {
                client
                    .query(COLUMN_TYPE_SQL, &[&table.name, &column])
                    .await?
                    .into_row()
                    .await?
            }
        };

        Ok(row.and_then(|r| r.get::<&str, _>(0).map(str::to_string)))
    }
}
