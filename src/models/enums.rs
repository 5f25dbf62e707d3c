use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::planner::errors::PlanError;

/// Relational source a read request targets. Selects the dialect adapter.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Debug)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    MySQL,
    PostgreSQL,
    SQLite,
    SqlServer,
    Oracle,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::MySQL => "mysql",
            SourceKind::PostgreSQL => "postgresql",
            SourceKind::SQLite => "sqlite",
            SourceKind::SqlServer => "sqlserver",
            SourceKind::Oracle => "oracle",
        }
    }

    /// Infer the source kind from a connection URL such as
    /// `jdbc:mysql://host/db` or `postgres://host/db`.
    pub fn from_url(url: &str) -> Result<Self, PlanError> {
        let trimmed = url.trim();
        let rest = trimmed.strip_prefix("jdbc:").unwrap_or(trimmed);
        let scheme = rest.split(':').next().unwrap_or_default();
        scheme.parse()
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = PlanError;

    /// Accepts canonical names, common aliases and reader plugin names
    /// (`mysqlreader`, `postgresqlreader`, ...).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let name = lower.strip_suffix("reader").unwrap_or(&lower);
        match name {
            "mysql" | "mariadb" => Ok(SourceKind::MySQL),
            "postgresql" | "postgres" | "pg" => Ok(SourceKind::PostgreSQL),
            "sqlite" | "sqlite3" => Ok(SourceKind::SQLite),
            "sqlserver" | "mssql" => Ok(SourceKind::SqlServer),
            "oracle" => Ok(SourceKind::Oracle),
            _ => Err(PlanError::UnsupportedDialect(s.to_string())),
        }
    }
}

/// Comparison used against a supplied watermark.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Debug, Default)]
#[serde(rename_all = "lowercase")]
pub enum WatermarkBoundary {
    /// `col > watermark`: the boundary row was already emitted by the previous run.
    #[default]
    Exclusive,
    /// `col >= watermark`: the watermark is a seeded starting point whose row must be read.
    Inclusive,
}

impl WatermarkBoundary {
    pub fn operator(&self) -> &'static str {
        match self {
            WatermarkBoundary::Exclusive => ">",
            WatermarkBoundary::Inclusive => ">=",
        }
    }
}

/// How a split key's domain is divided across workers.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Debug, Default)]
#[serde(rename_all = "lowercase", tag = "scheme")]
pub enum SplitScheme {
    /// `MOD(key, N) = i`. Assumes non-null, non-negative integer keys.
    #[default]
    Modulo,
    /// Contiguous ranges between `lower` and `upper`. Outer partitions are
    /// open-ended and the first one also claims NULL keys.
    Range { lower: i64, upper: i64 },
}

/// Value class of an incremental column, derived from its native type.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Debug)]
#[serde(rename_all = "lowercase")]
pub enum IncrementalKind {
    Numeric,
    Temporal,
}

impl IncrementalKind {
    /// Classify a native type name as reported by a catalog
    /// (`bigint`, `int(11) unsigned`, `timestamp without time zone`, `NUMBER(19)`...).
    pub fn classify(native_type: &str) -> Option<Self> {
        let lower = native_type.trim().to_ascii_lowercase();
        let base = lower
            .split(['(', ' '])
            .next()
            .unwrap_or_default();
        match base {
            "tinyint" | "smallint" | "mediumint" | "int" | "integer" | "bigint" | "int2"
            | "int4" | "int8" | "serial" | "smallserial" | "bigserial" | "number"
            | "numeric" | "decimal" | "long" => Some(IncrementalKind::Numeric),
            "date" | "datetime" | "datetime2" | "smalldatetime" | "datetimeoffset"
            | "timestamp" | "timestamptz" => Some(IncrementalKind::Temporal),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_aliases_and_plugin_names() {
        assert_eq!("mysqlreader".parse::<SourceKind>().unwrap(), SourceKind::MySQL);
        assert_eq!("Postgres".parse::<SourceKind>().unwrap(), SourceKind::PostgreSQL);
        assert_eq!("mssql".parse::<SourceKind>().unwrap(), SourceKind::SqlServer);
        assert!(matches!(
            "db2".parse::<SourceKind>(),
            Err(PlanError::UnsupportedDialect(_))
        ));
    }

    #[test]
    fn infers_kind_from_url() {
        assert_eq!(
            SourceKind::from_url("jdbc:postgresql://localhost:5432/shop").unwrap(),
            SourceKind::PostgreSQL
        );
        assert_eq!(SourceKind::from_url("sqlite::memory:").unwrap(), SourceKind::SQLite);
        assert_eq!(
            SourceKind::from_url("jdbc:sqlserver://db:1433;databaseName=shop").unwrap(),
            SourceKind::SqlServer
        );
    }

    #[test]
    fn classifies_native_types() {
        assert_eq!(IncrementalKind::classify("BIGINT"), Some(IncrementalKind::Numeric));
        assert_eq!(
            IncrementalKind::classify("int(11) unsigned"),
            Some(IncrementalKind::Numeric)
        );
        assert_eq!(
            IncrementalKind::classify("timestamp without time zone"),
            Some(IncrementalKind::Temporal)
        );
        assert_eq!(IncrementalKind::classify("TIMESTAMP(6)"), Some(IncrementalKind::Temporal));
        assert_eq!(IncrementalKind::classify("varchar(32)"), None);
    }
}
