//! Reader job description.
//!
//! A job file describes one reader in the usual plugin layout:
//!
//! ```json
//! {
//!   "name": "mysqlreader",
//!   "channel": 2,
//!   "parameter": {
//!     "username": "etl",
//!     "password": "secret",
//!     "connection": [{ "jdbcUrl": ["jdbc:mysql://db:3306/shop"], "table": ["orders"] }],
//!     "column": ["id", { "name": "amount", "type": "decimal" }],
//!     "where": "status='OK'",
//!     "splitPk": "id",
//!     "increColumn": "updated_at",
//!     "startLocation": "100"
//!   }
//! }
//! ```

use std::fs;
use std::path::Path;

use log::info;
use serde::Deserialize;

use crate::models::enums::{SourceKind, SplitScheme, WatermarkBoundary};
use crate::models::structs::{ColumnSpec, ConnectionParams, ReadRequest};
use crate::planner::errors::{PlanError, Result};

/// Environment variable holding the log filter for the binary.
pub const LOG_ENV: &str = "RDBSCAN_LOG";

#[derive(Debug, Clone, Deserialize)]
pub struct JobConfig {
    /// Reader plugin or source kind name, e.g. `mysqlreader` or `postgresql`.
    pub name: String,
    /// Requested number of concurrent workers.
    #[serde(default = "default_channel")]
    pub channel: u32,
    pub parameter: ReaderParameter,
}

fn default_channel() -> u32 {
    1
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReaderParameter {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    pub connection: Vec<ConnectionEntry>,
    pub column: Vec<ColumnEntry>,
    #[serde(default, rename = "where")]
    pub filter: Option<String>,
    #[serde(default)]
    pub split_pk: Option<String>,
    #[serde(default)]
    pub split_range: Option<RangeBounds>,
    #[serde(default)]
    pub incre_column: Option<String>,
    #[serde(default)]
    pub start_location: Option<StartLocation>,
    #[serde(default)]
    pub watermark_boundary: Option<WatermarkBoundary>,
    #[serde(default)]
    pub fetch_size: u32,
    #[serde(default, rename = "queryTimeOut")]
    pub query_timeout: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionEntry {
    pub jdbc_url: Vec<String>,
    pub table: Vec<String>,
}

/// A column is either a bare name or `{ "name": ..., "type": ... }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ColumnEntry {
    Name(String),
    Spec(ColumnSpec),
}

impl From<ColumnEntry> for ColumnSpec {
    fn from(entry: ColumnEntry) -> Self {
        match entry {
            ColumnEntry::Name(name) => ColumnSpec::new(name),
            ColumnEntry::Spec(spec) => spec,
        }
    }
}

/// Starting watermark, accepted as a JSON number or a numeric string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StartLocation {
    Number(i64),
    Text(String),
}

impl StartLocation {
    fn value(&self) -> Result<Option<i64>> {
        match self {
            StartLocation::Number(n) => Ok(Some(*n)),
            StartLocation::Text(s) if s.trim().is_empty() => Ok(None),
            StartLocation::Text(s) => s
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| PlanError::config(format!("startLocation {:?} is not an integer", s))),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RangeBounds {
    pub lower: i64,
    pub upper: i64,
}

impl JobConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| PlanError::config(format!("cannot read job file {}: {}", path.display(), e)))?;
        info!("loaded job description from {}", path.display());
        Self::from_json_str(&text)
    }

    /// Validate the job and turn it into a [`ReadRequest`]. Only the first
    /// connection entry and its first URL and table are read.
    pub fn into_read_request(self) -> Result<ReadRequest> {
        let source_kind: SourceKind = self.name.parse()?;
        let p = self.parameter;

        let entry = p
            .connection
            .into_iter()
            .next()
            .ok_or_else(|| PlanError::config("parameter.connection must not be empty"))?;
        let url = entry
            .jdbc_url
            .into_iter()
            .next()
            .ok_or_else(|| PlanError::config("connection.jdbcUrl must not be empty"))?;
        let table = entry
            .table
            .into_iter()
            .next()
            .ok_or_else(|| PlanError::config("connection.table must not be empty"))?;

        let mut connection = ConnectionParams::new(url);
        connection.username = p.username;
        connection.password = p.password;

        let mut builder = ReadRequest::builder(source_kind, table)
            .parallelism(self.channel)
            .filter(p.filter.unwrap_or_default())
            .fetch_size(p.fetch_size)
            .query_timeout_secs(p.query_timeout)
            .connection(connection);

        for column in p.column {
            builder = builder.column(column.into());
        }
        if let Some(key) = p.split_pk {
            builder = builder.split_key(key);
        }
        if let Some(RangeBounds { lower, upper }) = p.split_range {
            builder = builder.split_scheme(SplitScheme::Range { lower, upper });
        }
        if let Some(column) = p.incre_column {
            builder = builder.incremental_column(column);
        }
        if let Some(start) = p.start_location {
            if let Some(watermark) = start.value()? {
                builder = builder.start_watermark(watermark);
            }
        }
        if let Some(boundary) = p.watermark_boundary {
            builder = builder.watermark_boundary(boundary);
        }

        builder.build()
    }
}
