//! Read planning: turns a [`ReadRequest`] into an immutable [`ExtractionPlan`].
//!
//! Pipeline, run once per request and strictly in this order:
//! incremental column resolution -> split planning -> query building.
//! The first failure aborts the whole assembly; no partial plan escapes.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use serde::Serialize;

use crate::catalog::MetadataResolver;
use crate::models::enums::SourceKind;
use crate::models::structs::{ColumnSpec, ConnectionParams, ReadRequest};

pub mod builder;
pub mod dialect;
pub mod errors;
pub mod incremental;
pub mod split;

pub use errors::{PlanError, Result};
pub use incremental::ResolvedIncrementalColumn;
pub use split::{PartitionParams, SplitPlan};

use dialect::get_dialect;

/// One partition's concrete statement.
#[derive(Clone, PartialEq, Eq, Serialize, Debug)]
pub struct PartitionQuery {
    pub index: usize,
    pub params: PartitionParams,
    pub sql: String,
}

#[derive(Serialize, Debug, PartialEq)]
struct PlanInner {
    source_kind: SourceKind,
    driver: &'static str,
    table: String,
    /// Statement without any split predicate; the union of every partition.
    sql: String,
    /// Modulo-split statement with `${N}`/`${M}` placeholders; equals `sql` otherwise.
    query_template: String,
    fetch_size: u32,
    #[serde(rename = "query_timeout_secs", serialize_with = "serialize_secs")]
    query_timeout: Duration,
    projection: Vec<ColumnSpec>,
    incremental: Option<ResolvedIncrementalColumn>,
    split: SplitPlan,
    partitions: Vec<PartitionQuery>,
    connection: ConnectionParams,
}

fn serialize_secs<S: serde::Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_secs())
}

/// Everything an executor needs to run one read request. Cheap to clone and
/// safe to share across the workers scanning its partitions.
#[derive(Clone, Debug, PartialEq)]
pub struct ExtractionPlan {
    inner: Arc<PlanInner>,
}

impl Serialize for ExtractionPlan {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.inner.serialize(s)
    }
}

/// Descriptor handed to one independent scan worker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScanTask<'a> {
    pub index: usize,
    pub sql: &'a str,
    pub fetch_size: u32,
    /// Applies to this worker alone, not to the plan as a whole.
    pub query_timeout: Duration,
    pub connection: &'a ConnectionParams,
}

impl ExtractionPlan {
    pub fn source_kind(&self) -> SourceKind {
        self.inner.source_kind
    }

    pub fn driver(&self) -> &'static str {
        self.inner.driver
    }

    pub fn table(&self) -> &str {
        &self.inner.table
    }

    /// The unpartitioned statement.
    pub fn sql(&self) -> &str {
        &self.inner.sql
    }

    /// Statement shared by all partitions, with `${N}` standing for the
    /// partition count and `${M}` for the partition index. Range splits have
    /// no common template; use [`partition_query`](Self::partition_query).
    pub fn query_template(&self) -> &str {
        &self.inner.query_template
    }

    pub fn fetch_size(&self) -> u32 {
        self.inner.fetch_size
    }

    pub fn query_timeout(&self) -> Duration {
        self.inner.query_timeout
    }

    /// Ordered result columns; every scanned row has exactly this shape.
    pub fn projection(&self) -> &[ColumnSpec] {
        &self.inner.projection
    }

    pub fn incremental(&self) -> Option<&ResolvedIncrementalColumn> {
        self.inner.incremental.as_ref()
    }

    pub fn split(&self) -> &SplitPlan {
        &self.inner.split
    }

    pub fn partitions(&self) -> &[PartitionQuery] {
        &self.inner.partitions
    }

    pub fn partition_query(&self, index: usize) -> Option<&str> {
        self.inner.partitions.get(index).map(|p| p.sql.as_str())
    }

    pub fn connection(&self) -> &ConnectionParams {
        &self.inner.connection
    }

    /// One task per partition, in partition order. A single-scan plan yields one task.
    pub fn scan_tasks(&self) -> Vec<ScanTask<'_>> {
        self.inner
            .partitions
            .iter()
            .map(|p| ScanTask {
                index: p.index,
                sql: &p.sql,
                fetch_size: self.inner.fetch_size,
                query_timeout: self.inner.query_timeout,
                connection: &self.inner.connection,
            })
            .collect()
    }
}

/// Builds extraction plans. Holds nothing but the metadata resolver, so one
/// assembler can serve any number of requests; each call goes from nothing to
/// a finished plan or an error.
pub struct PlanAssembler<'r> {
    resolver: &'r dyn MetadataResolver,
}

impl<'r> PlanAssembler<'r> {
    pub fn new(resolver: &'r dyn MetadataResolver) -> Self {
        Self { resolver }
    }

    pub async fn assemble(&self, request: &ReadRequest) -> Result<ExtractionPlan> {
        let dialect = get_dialect(&request.source_kind());
        debug!(
            "assembling {} read of {} (parallelism {})",
            dialect.kind(),
            request.table(),
            request.parallelism()
        );

        // 1. incremental column: finalizes the projection
        let (projection, incremental) = match request.incremental_column() {
            Some(column) => {
                let (projection, resolved) = incremental::resolve_incremental_column(
                    request.columns(),
                    column,
                    request.table(),
                    request.connection(),
                    self.resolver,
                )
                .await?;
                (projection, Some(resolved))
            }
            None => (request.columns().to_vec(), None),
        };

        // 2. split plan
        let split = split::plan_split(request.parallelism(), request.split_key(), request.split_scheme());

        // 3. queries
        let incremental_predicate = match &incremental {
            Some(col) => builder::incremental_predicate(
                dialect.as_ref(),
                col,
                request.start_watermark(),
                request.watermark_boundary(),
            )?,
            None => None,
        };
        let build = |split_predicate: Option<&str>| {
            builder::build_select(
                dialect.as_ref(),
                &projection,
                request.table(),
                request.filter(),
                incremental_predicate.as_deref(),
                split_predicate,
            )
        };

        let sql = build(None)?;
        let query_template = match (split.split_key(), split.partitions().first()) {
            (Some(key), Some(PartitionParams::Modulo { .. })) => {
                build(Some(dialect.modulo_fragment(&dialect.ident(key), "${N}", "${M}").as_str()))?
            }
            _ => sql.clone(),
        };
        let partitions = split
            .partitions()
            .iter()
            .enumerate()
            .map(|(index, params)| -> Result<PartitionQuery> {
                let predicate = split
                    .split_key()
                    .and_then(|key| params.predicate(dialect.as_ref(), key));
                Ok(PartitionQuery {
                    index,
                    params: *params,
                    sql: build(predicate.as_deref())?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let fetch_size = match request.fetch_size() {
            0 => dialect.default_fetch_size(),
            n => n,
        };
        let timeout_secs = match request.query_timeout_secs() {
            0 => dialect.default_query_timeout_secs(),
            n => n,
        };

        info!(
            "planned read of {}: {} partition(s), fetch size {}, timeout {}s",
            request.table(),
            partitions.len(),
            fetch_size,
            timeout_secs
        );
        if log::log_enabled!(log::Level::Debug) {
            debug!(
                "query:\n{}",
                sqlformat::format(&sql, &sqlformat::QueryParams::None, &sqlformat::FormatOptions::default())
            );
        }

        Ok(ExtractionPlan {
            inner: Arc::new(PlanInner {
                source_kind: dialect.kind(),
                driver: dialect.driver_name(),
                table: request.table().to_string(),
                sql,
                query_template,
                fetch_size,
                query_timeout: Duration::from_secs(u64::from(timeout_secs)),
                projection,
                incremental,
                split,
                partitions,
                connection: request.connection().clone(),
            }),
        })
    }
}
