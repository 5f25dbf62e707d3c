//! Incremental column resolution.
//!
//! Makes sure the watermark column is part of the projection and knows its
//! native type before any SQL is generated. The request's column list is never
//! touched; a new projection is returned instead.

use log::{debug, info};
use serde::Serialize;

use crate::catalog::MetadataResolver;
use crate::models::enums::IncrementalKind;
use crate::models::structs::{ColumnSpec, ConnectionParams};
use crate::planner::errors::{PlanError, Result};

#[derive(Clone, PartialEq, Eq, Serialize, Debug)]
pub struct ResolvedIncrementalColumn {
    pub name: String,
    pub native_type: String,
    pub kind: IncrementalKind,
    /// True when the column was appended because it was not projected.
    pub injected: bool,
    /// Index of the column in the resolved projection.
    pub position: usize,
}

/// Resolve `column` against `projection`, consulting the catalog at most once.
///
/// Returns the final projection (with the incremental column typed, and
/// appended last if it was missing) together with the resolved column.
pub async fn resolve_incremental_column(
    projection: &[ColumnSpec],
    column: &str,
    table: &str,
    connection: &ConnectionParams,
    resolver: &dyn MetadataResolver,
) -> Result<(Vec<ColumnSpec>, ResolvedIncrementalColumn)> {
    let mut resolved = projection.to_vec();
    let existing = resolved.iter().position(|c| c.name == column);

    let (position, injected) = match existing {
        Some(idx) => (idx, false),
        None => {
            resolved.push(ColumnSpec::new(column));
            (resolved.len() - 1, true)
        }
    };

    let native_type = match resolved[position].declared_type() {
        Some(declared) => declared.to_string(),
        None => {
            debug!("resolving type of incremental column {} on {}", column, table);
            resolver
                .lookup_column_type(connection, table, column)
                .await?
                .ok_or_else(|| PlanError::IncrementalColumnNotFound {
                    column: column.to_string(),
                    table: table.to_string(),
                })?
        }
    };

    let kind = IncrementalKind::classify(&native_type).ok_or_else(|| {
        PlanError::config(format!(
            "incremental column {} has unsupported type {:?}, expected an integer or date/time type",
            column, native_type
        ))
    })?;

    resolved[position].data_type = Some(native_type.clone());
    if injected {
        info!("incremental column {} not projected, appending it to the select list", column);
    }

    Ok((
        resolved,
        ResolvedIncrementalColumn {
            name: column.to_string(),
            native_type,
            kind,
            injected,
            position,
        },
    ))
}
