use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::enums::{SourceKind, SplitScheme, WatermarkBoundary};
use crate::planner::dialect::get_dialect;
use crate::planner::errors::{PlanError, Result};

/// One projected column. `data_type` stays `None` until a catalog fills it in.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: None,
        }
    }

    pub fn typed(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: Some(data_type.into()),
        }
    }

    /// Declared type, ignoring blank strings.
    pub fn declared_type(&self) -> Option<&str> {
        self.data_type
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

/// Connection URL and credentials, passed through to the catalog and executor untouched.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ConnectionParams {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
}

impl ConnectionParams {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            username: None,
            password: None,
        }
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }
}

impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// A validated, immutable read request. Build one with [`ReadRequest::builder`].
#[derive(Clone, PartialEq, Debug)]
pub struct ReadRequest {
    source_kind: SourceKind,
    table: String,
    columns: Vec<ColumnSpec>,
    filter: String,
    parallelism: u32,
    split_key: Option<String>,
    split_scheme: SplitScheme,
    incremental_column: Option<String>,
    start_watermark: Option<i64>,
    watermark_boundary: WatermarkBoundary,
    fetch_size: u32,
    query_timeout_secs: u32,
    connection: ConnectionParams,
}

impl ReadRequest {
    pub fn builder(source_kind: SourceKind, table: impl Into<String>) -> ReadRequestBuilder {
        ReadRequestBuilder::new(source_kind, table)
    }

    pub fn source_kind(&self) -> SourceKind {
        self.source_kind
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn parallelism(&self) -> u32 {
        self.parallelism
    }

    /// Split key as configured; may be blank, which disables splitting.
    pub fn split_key(&self) -> Option<&str> {
        self.split_key.as_deref()
    }

    pub fn split_scheme(&self) -> SplitScheme {
        self.split_scheme
    }

    pub fn incremental_column(&self) -> Option<&str> {
        self.incremental_column.as_deref()
    }

    pub fn start_watermark(&self) -> Option<i64> {
        self.start_watermark
    }

    pub fn watermark_boundary(&self) -> WatermarkBoundary {
        self.watermark_boundary
    }

    /// Requested fetch size, 0 meaning "dialect default".
    pub fn fetch_size(&self) -> u32 {
        self.fetch_size
    }

    /// Requested query timeout in seconds, 0 meaning "dialect default".
    pub fn query_timeout_secs(&self) -> u32 {
        self.query_timeout_secs
    }

    pub fn connection(&self) -> &ConnectionParams {
        &self.connection
    }
}

#[derive(Clone, Debug)]
pub struct ReadRequestBuilder {
    request: ReadRequest,
}

impl ReadRequestBuilder {
    fn new(source_kind: SourceKind, table: impl Into<String>) -> Self {
        Self {
            request: ReadRequest {
                source_kind,
                table: table.into(),
                columns: Vec::new(),
                filter: String::new(),
                parallelism: 1,
                split_key: None,
                split_scheme: SplitScheme::default(),
                incremental_column: None,
                start_watermark: None,
                watermark_boundary: WatermarkBoundary::default(),
                fetch_size: 0,
                query_timeout_secs: 0,
                connection: ConnectionParams::default(),
            },
        }
    }

    pub fn column(mut self, column: ColumnSpec) -> Self {
        self.request.columns.push(column);
        self
    }

    pub fn columns<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.request
            .columns
            .extend(names.into_iter().map(ColumnSpec::new));
        self
    }

    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.request.filter = filter.into();
        self
    }

    pub fn parallelism(mut self, parallelism: u32) -> Self {
        self.request.parallelism = parallelism;
        self
    }

    pub fn split_key(mut self, key: impl Into<String>) -> Self {
        self.request.split_key = Some(key.into());
        self
    }

    pub fn split_scheme(mut self, scheme: SplitScheme) -> Self {
        self.request.split_scheme = scheme;
        self
    }

    pub fn incremental_column(mut self, column: impl Into<String>) -> Self {
        self.request.incremental_column = Some(column.into());
        self
    }

    pub fn start_watermark(mut self, watermark: i64) -> Self {
        self.request.start_watermark = Some(watermark);
        self
    }

    pub fn watermark_boundary(mut self, boundary: WatermarkBoundary) -> Self {
        self.request.watermark_boundary = boundary;
        self
    }

    pub fn fetch_size(mut self, fetch_size: u32) -> Self {
        self.request.fetch_size = fetch_size;
        self
    }

    pub fn query_timeout_secs(mut self, secs: u32) -> Self {
        self.request.query_timeout_secs = secs;
        self
    }

    pub fn connection(mut self, connection: ConnectionParams) -> Self {
        self.request.connection = connection;
        self
    }

    /// Validate and freeze the request. The connection URL is normalized for the dialect.
    pub fn build(self) -> Result<ReadRequest> {
        let mut request = self.request;

        request.table = request.table.trim().to_string();
        if request.table.is_empty() {
            return Err(PlanError::config("table must not be empty"));
        }
        if request.parallelism == 0 {
            return Err(PlanError::config("parallelism must be >= 1"));
        }
        if request.columns.is_empty() {
            return Err(PlanError::config("at least one column must be projected"));
        }

        let mut seen = HashSet::new();
        for column in &mut request.columns {
            column.name = column.name.trim().to_string();
            if column.name.is_empty() {
                return Err(PlanError::config("column name must not be empty"));
            }
            if column.name == "*" {
                return Err(PlanError::config(
                    "wildcard projection is not supported, list the columns explicitly",
                ));
            }
            if !seen.insert(column.name.clone()) {
                return Err(PlanError::config(format!(
                    "column {} is projected more than once",
                    column.name
                )));
            }
        }

        request.incremental_column = request
            .incremental_column
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        if let SplitScheme::Range { lower, upper } = request.split_scheme {
            if lower >= upper {
                return Err(PlanError::config(format!(
                    "split range lower bound {} must be below upper bound {}",
                    lower, upper
                )));
            }
        }

        if request.connection.url.trim().is_empty() {
            return Err(PlanError::config("connection url must not be empty"));
        }
        request.connection.url = get_dialect(&request.source_kind).normalize_url(&request.connection.url);

        Ok(request)
    }
}
