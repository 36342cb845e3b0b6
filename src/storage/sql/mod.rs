//! Unified SQL storage implementation.
//!
//! This module provides one store for SQL-based backends (PostgreSQL,
//! SQLite). The implementation is parameterized by database type using the
//! `SqlDatabase` trait.

mod query;
mod rows;
mod store;

pub use query::SqlDatabase;
pub use store::SqlStore;

#[cfg(feature = "postgres")]
pub mod postgres {
    //! PostgreSQL database backend.

    use std::str::FromStr;

    use sea_query::{Alias, Func, LockType, PostgresQueryBuilder, SelectStatement, SimpleExpr};
    use sqlx::postgres::PgConnectOptions;
    use sqlx::PgPool;

    /// PostgreSQL database marker type.
    pub struct Postgres;

    /// Connection options for `uri` with the session pinned to UTC, so that
    /// stored timestamps without an offset read as UTC.
    pub fn connect_options(uri: &str) -> Result<PgConnectOptions, sqlx::Error> {
        Ok(PgConnectOptions::from_str(uri)?.options([("TimeZone", "UTC")]))
    }

    impl super::SqlDatabase for Postgres {
        type Pool = PgPool;

        fn build_select(stmt: SelectStatement) -> String {
            stmt.to_string(PostgresQueryBuilder)
        }

        fn build_insert(stmt: sea_query::InsertStatement) -> String {
            stmt.to_string(PostgresQueryBuilder)
        }

        fn build_update(stmt: sea_query::UpdateStatement) -> String {
            stmt.to_string(PostgresQueryBuilder)
        }

        fn lock_for_update(stmt: &mut SelectStatement) {
            stmt.lock(LockType::Update);
        }

        fn time_expr(expr: SimpleExpr) -> SimpleExpr {
            Func::cast_as(expr, Alias::new("TIMESTAMPTZ")).into()
        }
    }

    /// PostgreSQL store.
    pub type PostgresStore = super::SqlStore<Postgres>;
}

#[cfg(feature = "sqlite")]
pub mod sqlite {
    //! SQLite database backend.

    use sea_query::{Alias, Func, SelectStatement, SimpleExpr, SqliteQueryBuilder};
    use sqlx::SqlitePool;

    /// SQLite database marker type.
    pub struct Sqlite;

    impl super::SqlDatabase for Sqlite {
        type Pool = SqlitePool;

        fn build_select(stmt: SelectStatement) -> String {
            stmt.to_string(SqliteQueryBuilder)
        }

        fn build_insert(stmt: sea_query::InsertStatement) -> String {
            stmt.to_string(SqliteQueryBuilder)
        }

        fn build_update(stmt: sea_query::UpdateStatement) -> String {
            stmt.to_string(SqliteQueryBuilder)
        }

        fn lock_for_update(_stmt: &mut SelectStatement) {}

        // julianday() reads both the canonical form and the plain
        // "YYYY-MM-DD HH:MM:SS" layout, with or without an offset.
        fn time_expr(expr: SimpleExpr) -> SimpleExpr {
            Func::cust(Alias::new("julianday")).arg(expr).into()
        }
    }

    /// SQLite store.
    pub type SqliteStore = super::SqlStore<Sqlite>;
}
