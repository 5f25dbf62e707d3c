//! SELECT statement synthesis.
//!
//! Everything here is pure: identical inputs always produce identical SQL.
//! Dialect syntax is delegated to [`SqlDialect`].

use chrono::DateTime;

use crate::models::enums::{IncrementalKind, WatermarkBoundary};
use crate::models::structs::ColumnSpec;
use crate::planner::dialect::SqlDialect;
use crate::planner::errors::{PlanError, Result};
use crate::planner::incremental::ResolvedIncrementalColumn;

/// Compose `SELECT <projection> FROM <table> [WHERE ...]`.
///
/// The base filter, incremental predicate and split predicate are AND-combined
/// in that order; empty clauses are left out. Column order follows
/// `projection` exactly.
pub fn build_select(
    dialect: &dyn SqlDialect,
    projection: &[ColumnSpec],
    table: &str,
    base_filter: &str,
    incremental_predicate: Option<&str>,
    split_predicate: Option<&str>,
) -> Result<String> {
    if projection.is_empty() {
        return Err(PlanError::config("cannot build a query without columns"));
    }

    let columns = projection
        .iter()
        .map(|c| dialect.ident(&c.name))
        .collect::<Vec<_>>()
        .join(", ");
    let mut sql = format!("SELECT {} FROM {}", columns, dialect.ident(table));

    let clauses: Vec<String> = normalize_filter(base_filter)
        .into_iter()
        .chain(incremental_predicate.map(str::to_string))
        .chain(split_predicate.map(str::to_string))
        .filter(|c| !c.trim().is_empty())
        .collect();

    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    Ok(sql)
}

/// Lower-bound predicate on the incremental column, or `None` when there is
/// no watermark yet (the first run reads everything).
pub fn incremental_predicate(
    dialect: &dyn SqlDialect,
    column: &ResolvedIncrementalColumn,
    watermark: Option<i64>,
    boundary: WatermarkBoundary,
) -> Result<Option<String>> {
    let Some(watermark) = watermark else {
        return Ok(None);
    };

    let column_sql = dialect.ident(&column.name);
    let operator = boundary.operator();
    let fragment = match column.kind {
        IncrementalKind::Numeric => dialect.incremental_fragment(&column_sql, operator, &watermark.to_string()),
        IncrementalKind::Temporal => {
            let ts = DateTime::from_timestamp_millis(watermark).ok_or_else(|| {
                PlanError::config(format!("watermark {} is not a valid epoch-millisecond timestamp", watermark))
            })?;
            dialect.temporal_fragment(
                &column_sql,
                operator,
                &ts.naive_utc(),
                dialect.is_zone_aware(&column.native_type),
            )
        }
    };
    Ok(Some(fragment))
}

/// Trim the configured filter and make it safe to AND more predicates onto:
/// a top-level `OR` is parenthesised, and trailing line comments must not
/// swallow the clauses that follow.
pub fn normalize_filter(filter: &str) -> Option<String> {
    let filter = filter.trim().trim_end_matches(';').trim();
    if filter.is_empty() {
        return None;
    }
    Some(render_filter(filter))
}

/// Opaque wrapping: the newline ends any `--` comment inside the filter.
fn wrap_opaque(filter: &str) -> String {
    format!("(\n{}\n)", filter)
}

#[cfg(feature = "filter_ast")]
fn render_filter(filter: &str) -> String {
    use sqlparser::ast::{BinaryOperator, Expr};
    use sqlparser::dialect::GenericDialect;
    use sqlparser::parser::Parser;
    use sqlparser::tokenizer::{Token, Tokenizer, Whitespace};

    let dialect = GenericDialect {};
    let parsed = Parser::new(&dialect).try_with_sql(filter).and_then(|mut parser| {
        let expr = parser.parse_expr()?;
        Ok((expr, parser.peek_token().token == Token::EOF))
    });
    let expr = match parsed {
        Ok((expr, true)) => expr,
        // Unparseable or trailing tokens
        _ => return wrap_opaque(filter),
    };

    let has_comment = Tokenizer::new(&dialect, filter)
        .tokenize()
        .map(|tokens| {
            tokens.iter().any(|t| {
                matches!(
                    t,
                    Token::Whitespace(Whitespace::SingleLineComment { .. } | Whitespace::MultiLineComment(_))
                )
            })
        })
        .unwrap_or(true);
    // The parser drops comments, so the re-rendered expression is comment free
    let text = if has_comment { expr.to_string() } else { filter.to_string() };

    if matches!(
        expr,
        Expr::BinaryOp {
            op: BinaryOperator::Or,
            ..
        }
    ) {
        format!("({})", text)
    } else {
        text
    }
}

#[cfg(not(feature = "filter_ast"))]
fn render_filter(filter: &str) -> String {
    if filter.contains("--") || filter.contains("/*") {
        return wrap_opaque(filter);
    }
    let has_or = filter
        .split(|c: char| !c.is_ascii_alphanumeric() && c != '_')
        .any(|word| word.eq_ignore_ascii_case("or"));
    if has_or {
        format!("({})", filter)
    } else {
        filter.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::dialect::{MssqlDialect, MySqlDialect, PostgresDialect};

    fn cols(names: &[&str]) -> Vec<ColumnSpec> {
        names.iter().map(|n| ColumnSpec::new(*n)).collect()
    }

    fn resolved(kind: IncrementalKind) -> ResolvedIncrementalColumn {
        ResolvedIncrementalColumn {
            name: "updated_at".into(),
            native_type: "whatever".into(),
            kind,
            injected: false,
            position: 0,
        }
    }

    #[test]
    fn bare_select() {
        let sql = build_select(&MySqlDialect, &cols(&["id", "amount"]), "orders", "", None, None).unwrap();
        assert_eq!(sql, "SELECT id, amount FROM orders");
    }

    #[test]
    fn combines_all_clauses() {
        let sql = build_select(
            &MySqlDialect,
            &cols(&["id", "amount", "updated_at"]),
            "orders",
            "status='OK'",
            Some("updated_at > 100"),
            Some("MOD(id,2)=1"),
        )
        .unwrap();
        assert_eq!(
            sql,
            "SELECT id, amount, updated_at FROM orders WHERE status='OK' AND updated_at > 100 AND MOD(id,2)=1"
        );
    }

    #[test]
    fn omits_empty_clauses() {
        let sql = build_select(&PostgresDialect, &cols(&["id"]), "orders", "  ", None, Some("MOD(id,4)=3")).unwrap();
        assert_eq!(sql, "SELECT id FROM orders WHERE MOD(id,4)=3");
    }

    #[test]
    fn quotes_through_dialect() {
        let sql = build_select(&MssqlDialect, &cols(&["Id", "order"]), "dbo.Orders", "", None, None).unwrap();
        assert_eq!(sql, "SELECT [Id], [order] FROM dbo.[Orders]");
    }

    #[test]
    fn wraps_top_level_or() {
        assert_eq!(normalize_filter("a = 1 OR b = 2").as_deref(), Some("(a = 1 OR b = 2)"));
        assert_eq!(normalize_filter("status='OK'").as_deref(), Some("status='OK'"));
        assert_eq!(normalize_filter("(a = 1 OR b = 2) AND c = 3").as_deref(), Some("(a = 1 OR b = 2) AND c = 3"));
        assert_eq!(normalize_filter(" ; "), None);
    }

    #[cfg(feature = "filter_ast")]
    #[test]
    fn strips_comments_from_filter() {
        assert_eq!(
            normalize_filter("status='OK' -- only settled orders").as_deref(),
            Some("status = 'OK'")
        );
        assert_eq!(
            normalize_filter("a = 1 /* legacy */ OR b = 2 -- both").as_deref(),
            Some("(a = 1 OR b = 2)")
        );
    }

    #[test]
    fn unparseable_filter_is_wrapped_on_own_lines() {
        let filter = "status IN ('OK' -- settled";
        assert_eq!(normalize_filter(filter), Some(format!("(\n{}\n)", filter)));
    }

    #[test]
    fn trailing_comment_cannot_hide_later_clauses() {
        let sql = build_select(
            &MySqlDialect,
            &cols(&["id"]),
            "orders",
            "status='OK' -- only settled orders",
            Some("updated_at > 100"),
            Some("MOD(id,2)=0"),
        )
        .unwrap();
        let last_line = sql.lines().last().unwrap();
        assert!(last_line.contains("updated_at > 100 AND MOD(id,2)=0"), "{}", sql);
    }

    #[test]
    fn empty_projection_is_an_error() {
        assert!(build_select(&MySqlDialect, &[], "orders", "", None, None).is_err());
    }

    #[test]
    fn numeric_watermark() {
        let p = incremental_predicate(&MySqlDialect, &resolved(IncrementalKind::Numeric), Some(100), WatermarkBoundary::Exclusive)
            .unwrap();
        assert_eq!(p.as_deref(), Some("updated_at > 100"));
        let p = incremental_predicate(&MySqlDialect, &resolved(IncrementalKind::Numeric), Some(100), WatermarkBoundary::Inclusive)
            .unwrap();
        assert_eq!(p.as_deref(), Some("updated_at >= 100"));
    }

    #[test]
    fn temporal_watermark_uses_dialect_literal() {
        // 2024-01-01T00:00:00Z
        let p = incremental_predicate(
            &PostgresDialect,
            &resolved(IncrementalKind::Temporal),
            Some(1_704_067_200_000),
            WatermarkBoundary::Exclusive,
        )
        .unwrap();
        assert_eq!(p.as_deref(), Some("updated_at > TIMESTAMP '2024-01-01 00:00:00.000'"));
    }

    #[test]
    fn zone_aware_column_gets_utc_offset() {
        let mut col = resolved(IncrementalKind::Temporal);
        col.native_type = "timestamp with time zone".into();
        let p = incremental_predicate(&PostgresDialect, &col, Some(1_704_067_200_000), WatermarkBoundary::Exclusive)
            .unwrap();
        assert_eq!(p.as_deref(), Some("updated_at > TIMESTAMPTZ '2024-01-01 00:00:00.000+00'"));
    }

    #[test]
    fn no_watermark_no_clause() {
        for boundary in [WatermarkBoundary::Exclusive, WatermarkBoundary::Inclusive] {
            let p = incremental_predicate(&MySqlDialect, &resolved(IncrementalKind::Numeric), None, boundary).unwrap();
            assert_eq!(p, None);
        }
    }
}
