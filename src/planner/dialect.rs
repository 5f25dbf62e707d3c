//! Database dialect adapters.
//!
//! Each source kind gets a unit struct implementing [`SqlDialect`]. The trait
//! is the only place dialect-specific SQL syntax lives: identifier quoting,
//! literal formatting and the predicate fragments used by the split planner
//! and the query builder.

use std::collections::HashSet;

use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::enums::SourceKind;
use crate::planner::errors::Result;

static PLAIN_IDENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z_][a-z0-9_]*$").expect("static regex"));

static RESERVED_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "all", "and", "as", "asc", "between", "by", "case", "check", "column", "constraint",
        "create", "date", "default", "delete", "desc", "distinct", "drop", "else", "end",
        "exists", "from", "group", "having", "in", "index", "insert", "into", "is", "join",
        "key", "level", "like", "limit", "not", "null", "number", "offset", "on", "or",
        "order", "primary", "select", "session", "size", "table", "then", "timestamp", "to",
        "union", "unique", "update", "user", "values", "when", "where", "with",
    ]
    .into_iter()
    .collect()
});

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

fn native_base(native_type: &str) -> String {
    native_type.trim().to_ascii_lowercase()
}

/// Trait for database-specific SQL dialect
pub trait SqlDialect: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Driver identity handed to the executor's connection layer.
    fn driver_name(&self) -> &'static str;

    fn default_fetch_size(&self) -> u32 {
        1000
    }

    /// Default per-worker query timeout, in seconds.
    fn default_query_timeout_secs(&self) -> u32 {
        1000
    }

    /// Unconditionally quote one identifier part.
    fn quote_ident(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    /// Quote an identifier (possibly `schema.table` dotted) only where needed:
    /// plain lower-case identifiers that are not reserved words are emitted
    /// as-is. Parts already quoted in any style (`"a"`, `` `a` ``, `[a]`) are
    /// re-quoted in this dialect's style; dots inside them do not split.
    fn ident(&self, name: &str) -> String {
        ident_parts(name)
            .into_iter()
            .map(|(part, quoted)| {
                if !quoted && PLAIN_IDENT.is_match(&part) && !RESERVED_WORDS.contains(part.as_str()) {
                    part
                } else {
                    self.quote_ident(&part)
                }
            })
            .collect::<Vec<_>>()
            .join(".")
    }

    fn quote_string(&self, s: &str) -> String {
        format!("'{}'", s.replace('\'', "''"))
    }

    fn timestamp_literal(&self, ts: &NaiveDateTime) -> String {
        self.quote_string(&ts.format(TIMESTAMP_FORMAT).to_string())
    }

    /// Literal for a UTC instant compared against a zone-aware column.
    fn timestamp_utc_literal(&self, ts: &NaiveDateTime) -> String {
        self.timestamp_literal(ts)
    }

    /// Whether values of this native type are instants rather than wall-clock
    /// times, so the watermark literal must carry an explicit UTC offset.
    fn is_zone_aware(&self, _native_type: &str) -> bool {
        false
    }

    /// Watermark comparison for a date/time incremental column.
    fn temporal_fragment(&self, column: &str, operator: &str, ts: &NaiveDateTime, zone_aware: bool) -> String {
        let literal = if zone_aware {
            self.timestamp_utc_literal(ts)
        } else {
            self.timestamp_literal(ts)
        };
        self.incremental_fragment(column, operator, &literal)
    }

    /// Modulo partition fragment. `modulus`/`remainder` are rendered text so the
    /// same builder serves concrete values and `${N}`/`${M}` templates.
    fn modulo_fragment(&self, column: &str, modulus: &str, remainder: &str) -> String {
        format!("MOD({},{})={}", column, modulus, remainder)
    }

    /// Range partition fragment over a half-open interval. A missing lower bound
    /// also admits NULL keys; missing both yields an empty fragment.
    fn range_fragment(&self, column: &str, lower: Option<i64>, upper: Option<i64>) -> String {
        match (lower, upper) {
            (Some(l), Some(u)) => format!("{} >= {} AND {} < {}", column, l, column, u),
            (None, Some(u)) => format!("({} < {} OR {} IS NULL)", column, u, column),
            (Some(l), None) => format!("{} >= {}", column, l),
            (None, None) => String::new(),
        }
    }

    fn incremental_fragment(&self, column: &str, operator: &str, literal: &str) -> String {
        format!("{} {} {}", column, operator, literal)
    }

    /// Normalize a JDBC-style URL for this dialect.
    fn normalize_url(&self, url: &str) -> String {
        url.trim().to_string()
    }
}

/// Split a dotted name into unquoted parts, flagging the ones that were quoted.
fn ident_parts(name: &str) -> Vec<(String, bool)> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut chars = name.trim().chars().peekable();

    while let Some(c) = chars.next() {
        let close = match c {
            '"' => Some('"'),
            '`' => Some('`'),
            '[' => Some(']'),
            _ => None,
        };
        match close {
            Some(close) if current.is_empty() && !quoted => {
                quoted = true;
                while let Some(c) = chars.next() {
                    if c != close {
                        current.push(c);
                    } else if chars.peek() == Some(&close) {
                        // doubled closer is an escaped literal one
                        chars.next();
                        current.push(close);
                    } else {
                        break;
                    }
                }
            }
            _ if c == '.' => {
                parts.push((std::mem::take(&mut current), quoted));
                quoted = false;
            }
            _ => current.push(c),
        }
    }
    parts.push((current, quoted));
    parts
}

/// Connection properties forced on MySQL URLs so large scans stream through a
/// server-side cursor instead of buffering the whole result.
const MYSQL_URL_DEFAULTS: [(&str, &str); 2] = [("useCursorFetch", "true"), ("zeroDateTimeBehavior", "convertToNull")];

/// MySQL dialect
pub struct MySqlDialect;

impl SqlDialect for MySqlDialect {
    fn kind(&self) -> SourceKind {
        SourceKind::MySQL
    }

    fn driver_name(&self) -> &'static str {
        "com.mysql.cj.jdbc.Driver"
    }

    fn quote_ident(&self, ident: &str) -> String {
        format!("`{}`", ident.replace('`', "``"))
    }

    // TIMESTAMP is stored as UTC and read in the session time zone; DATETIME is wall clock.
    fn is_zone_aware(&self, native_type: &str) -> bool {
        native_base(native_type).split(['(', ' ']).next() == Some("timestamp")
    }

    // Offsets in datetime literals need MySQL 8.0.19+
    fn timestamp_utc_literal(&self, ts: &NaiveDateTime) -> String {
        self.quote_string(&format!("{}+00:00", ts.format(TIMESTAMP_FORMAT)))
    }

    fn normalize_url(&self, url: &str) -> String {
        let url = url.trim();
        let (base, query) = url.split_once('?').unwrap_or((url, ""));
        let mut params: Vec<String> = query
            .split('&')
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();
        for (key, value) in MYSQL_URL_DEFAULTS {
            let present = params.iter().any(|p| {
                p.split('=')
                    .next()
                    .is_some_and(|k| k.eq_ignore_ascii_case(key))
            });
            if !present {
                params.push(format!("{}={}", key, value));
            }
        }
        format!("{}?{}", base, params.join("&"))
    }
}

/// PostgreSQL dialect
pub struct PostgresDialect;

impl SqlDialect for PostgresDialect {
    fn kind(&self) -> SourceKind {
        SourceKind::PostgreSQL
    }

    fn driver_name(&self) -> &'static str {
        "org.postgresql.Driver"
    }

    fn timestamp_literal(&self, ts: &NaiveDateTime) -> String {
        format!("TIMESTAMP {}", self.quote_string(&ts.format(TIMESTAMP_FORMAT).to_string()))
    }

    fn is_zone_aware(&self, native_type: &str) -> bool {
        let t = native_base(native_type);
        t.starts_with("timestamptz") || t.contains("with time zone")
    }

    fn timestamp_utc_literal(&self, ts: &NaiveDateTime) -> String {
        format!(
            "TIMESTAMPTZ {}",
            self.quote_string(&format!("{}+00", ts.format(TIMESTAMP_FORMAT)))
        )
    }
}

/// SQLite dialect
pub struct SqliteDialect;

impl SqlDialect for SqliteDialect {
    fn kind(&self) -> SourceKind {
        SourceKind::SQLite
    }

    fn driver_name(&self) -> &'static str {
        "org.sqlite.JDBC"
    }

    fn default_query_timeout_secs(&self) -> u32 {
        60
    }

    // Date/times are stored as text, and '... 22:13:20' sorts below
    // '... 22:13:20.000'; compare as Julian day numbers instead.
    fn temporal_fragment(&self, column: &str, operator: &str, ts: &NaiveDateTime, _zone_aware: bool) -> String {
        format!(
            "julianday({}) {} julianday({})",
            column,
            operator,
            self.timestamp_literal(ts)
        )
    }

    // MOD() only exists when SQLite is compiled with math functions.
    fn modulo_fragment(&self, column: &str, modulus: &str, remainder: &str) -> String {
        format!("({} % {})={}", column, modulus, remainder)
    }
}

/// MS SQL Server dialect
pub struct MssqlDialect;

impl SqlDialect for MssqlDialect {
    fn kind(&self) -> SourceKind {
        SourceKind::SqlServer
    }

    fn driver_name(&self) -> &'static str {
        "com.microsoft.sqlserver.jdbc.SQLServerDriver"
    }

    fn quote_ident(&self, ident: &str) -> String {
        format!("[{}]", ident.replace(']', "]]"))
    }

    fn timestamp_literal(&self, ts: &NaiveDateTime) -> String {
        format!(
            "CONVERT(DATETIME2, {}, 121)",
            self.quote_string(&ts.format(TIMESTAMP_FORMAT).to_string())
        )
    }

    fn is_zone_aware(&self, native_type: &str) -> bool {
        native_base(native_type).starts_with("datetimeoffset")
    }

    fn timestamp_utc_literal(&self, ts: &NaiveDateTime) -> String {
        format!(
            "CAST({} AS DATETIMEOFFSET)",
            self.quote_string(&format!("{} +00:00", ts.format(TIMESTAMP_FORMAT)))
        )
    }

    fn modulo_fragment(&self, column: &str, modulus: &str, remainder: &str) -> String {
        format!("({} % {})={}", column, modulus, remainder)
    }
}

/// Oracle dialect
pub struct OracleDialect;

impl SqlDialect for OracleDialect {
    fn kind(&self) -> SourceKind {
        SourceKind::Oracle
    }

    fn driver_name(&self) -> &'static str {
        "oracle.jdbc.OracleDriver"
    }

    fn timestamp_literal(&self, ts: &NaiveDateTime) -> String {
        format!(
            "TO_TIMESTAMP({}, 'YYYY-MM-DD HH24:MI:SS.FF3')",
            self.quote_string(&ts.format(TIMESTAMP_FORMAT).to_string())
        )
    }

    fn is_zone_aware(&self, native_type: &str) -> bool {
        native_base(native_type).contains("time zone")
    }

    fn timestamp_utc_literal(&self, ts: &NaiveDateTime) -> String {
        format!(
            "TO_TIMESTAMP_TZ({}, 'YYYY-MM-DD HH24:MI:SS.FF3 TZH:TZM')",
            self.quote_string(&format!("{} +00:00", ts.format(TIMESTAMP_FORMAT)))
        )
    }
}

/// Get dialect for a source kind
pub fn get_dialect(kind: &SourceKind) -> Box<dyn SqlDialect> {
    match kind {
        SourceKind::MySQL => Box::new(MySqlDialect),
        SourceKind::PostgreSQL => Box::new(PostgresDialect),
        SourceKind::SQLite => Box::new(SqliteDialect),
        SourceKind::SqlServer => Box::new(MssqlDialect),
        SourceKind::Oracle => Box::new(OracleDialect),
    }
}

/// Look a dialect up by its textual source-kind name. Unknown names fail with
/// `UnsupportedDialect`.
pub fn dialect_for_name(name: &str) -> Result<Box<dyn SqlDialect>> {
    let kind: SourceKind = name.parse()?;
    Ok(get_dialect(&kind))
}
