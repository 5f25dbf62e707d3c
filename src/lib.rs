//! Planning for parallel, incremental table reads from relational sources.
//!
//! A [`ReadRequest`] goes in, an immutable [`ExtractionPlan`] comes out: the
//! final projection, one concrete SELECT per partition and the effective
//! fetch size and query timeout. Executing the plan is left to the caller.

pub mod catalog;
pub mod config;
pub mod models;
pub mod planner;

pub use catalog::{CatalogRegistry, MetadataResolver, SourceCatalog};
pub use config::JobConfig;
pub use models::enums::{IncrementalKind, SourceKind, SplitScheme, WatermarkBoundary};
pub use models::structs::{ColumnSpec, ConnectionParams, ReadRequest};
pub use planner::{ExtractionPlan, PartitionQuery, PlanAssembler, PlanError, ScanTask};

/// Set up `env_logger` the way the binary does. Reads `.env` first so the
/// level can come from there; safe to call more than once.
pub fn init_logging() {
    dotenv::dotenv().ok();
    let level = std::env::var(config::LOG_ENV)
        .ok()
        .and_then(|v| v.parse::<log::LevelFilter>().ok())
        .unwrap_or(log::LevelFilter::Info);
    let _ = env_logger::Builder::from_default_env()
        .filter_module("rdbscan", level)
        .is_test(false)
        .try_init();
}
