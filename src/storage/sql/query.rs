//! SQL database abstraction trait and statement helpers.

use sea_query::{
    Alias, Asterisk, Condition, Expr, Func, IntoTableRef, Order, Query, SelectStatement, SimpleExpr,
};
use tracing::debug;

use crate::query::{Comparison, Predicate, Scope, Selection, Value};
use crate::storage::helpers::format_timestamp;

/// Columns that hold timestamps stored as text.
const TIME_COLUMNS: &[&str] = &[
    "timestamp",
    "startdate",
    "enddate",
    "last_timestamp",
    "next_timestamp",
];

/// Trait for SQL database backends.
///
/// This trait abstracts over different SQL databases (PostgreSQL, SQLite)
/// by providing the pool type and query building method.
pub trait SqlDatabase: Send + Sync + 'static {
    /// The connection pool type for this database.
    type Pool: Clone + Send + Sync;

    /// Build a SQL query string from a sea-query SELECT statement.
    fn build_select(stmt: SelectStatement) -> String;

    /// Build a SQL query string from a sea-query INSERT statement.
    fn build_insert(stmt: sea_query::InsertStatement) -> String;

    /// Build a SQL query string from a sea-query UPDATE statement.
    fn build_update(stmt: sea_query::UpdateStatement) -> String;

    /// Make `stmt` lock the rows it reads until the transaction ends.
    /// Backends that serialise writers when the transaction opens leave it
    /// unchanged.
    fn lock_for_update(stmt: &mut SelectStatement);

    /// Wrap a timestamp text expression so that comparisons and ordering
    /// follow the instant it denotes rather than its spelling.
    fn time_expr(expr: SimpleExpr) -> SimpleExpr;
}

/// `column` as an instant.
pub fn time_column<DB: SqlDatabase>(column: &str) -> SimpleExpr {
    DB::time_expr(Expr::col(Alias::new(column)).into())
}

/// `ts` as an instant, comparable with [`time_column`].
pub fn time_value<DB: SqlDatabase>(ts: &chrono::DateTime<chrono::Utc>) -> SimpleExpr {
    DB::time_expr(SimpleExpr::Value(format_timestamp(ts).into()))
}

/// Render a predicate as a `WHERE` condition over `scope`'s columns.
pub fn condition<DB: SqlDatabase>(scope: Scope, predicate: &Predicate) -> Condition {
    predicate
        .conjuncts()
        .into_iter()
        .fold(Condition::all(), |cond, term| match term {
            Predicate::Compare { field, op, value } => {
                let name = scope.column(*field);
                let (column, value) = match value {
                    Value::Time(ts) => (Expr::expr(time_column::<DB>(name)), time_value::<DB>(ts)),
                    other => (
                        Expr::col(Alias::new(name)),
                        SimpleExpr::Value(sql_value(other)),
                    ),
                };
                cond.add(match op {
                    Comparison::Eq => column.eq(value),
                    Comparison::Gte => column.gte(value),
                    Comparison::Lte => column.lte(value),
                })
            }
            Predicate::And(_) => cond,
        })
}

fn sql_value(value: &Value) -> sea_query::Value {
    match value {
        Value::Bool(b) => (*b).into(),
        Value::Int(i) => (*i).into(),
        Value::Text(s) => s.as_str().into(),
        Value::Time(t) => format_timestamp(t).into(),
    }
}

fn filter<DB: SqlDatabase>(stmt: &mut SelectStatement, selection: &Selection) {
    if let Some(predicate) = &selection.predicate {
        stmt.cond_where(condition::<DB>(selection.scope, predicate));
    }
}

/// `SELECT COUNT(*)` over the rows `selection` matches.
pub fn count_statement<DB: SqlDatabase>(
    table: impl IntoTableRef,
    selection: &Selection,
) -> SelectStatement {
    let mut stmt = Query::select()
        .expr(Func::count(Expr::col(Asterisk)))
        .from(table)
        .to_owned();
    filter::<DB>(&mut stmt, selection);
    stmt
}

/// Add the filter, ordering and pagination of `selection` to `stmt`.
pub fn page_statement<DB: SqlDatabase>(
    mut stmt: SelectStatement,
    selection: &Selection,
) -> SelectStatement {
    filter::<DB>(&mut stmt, selection);

    let ordering = &selection.ordering;
    let order = if ordering.ascending {
        Order::Asc
    } else {
        Order::Desc
    };
    let field = ordering.field.as_str();
    if TIME_COLUMNS.contains(&field) {
        stmt.order_by_expr(time_column::<DB>(field), order.clone());
    } else {
        stmt.order_by(Alias::new(field), order.clone());
    }
    if field != "id" {
        stmt.order_by(Alias::new("id"), order);
    }

    if let Some(page) = ordering.pagination {
        stmt.limit(page.limit).offset(page.offset);
    }
    stmt
}

/// Log a statement before it runs.
pub fn trace_sql(scope: &str, sql: &str) {
    debug!(target: "gapkeeper::storage", scope, sql, "executing statement");
}
