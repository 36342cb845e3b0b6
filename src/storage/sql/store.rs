//! Unified SQL store implementation.
//!
//! Uses a macro to generate implementations for each SQL backend,
//! eliminating code duplication while maintaining type safety.

use std::marker::PhantomData;

use sea_query::{Asterisk, Expr, Func, IntoTableRef, Query};

use super::query::{count_statement, page_statement, time_column, time_value};
use super::SqlDatabase;
use crate::query::{Scope, Selection};
use crate::storage::schema::{PacketGap, ReplayList};

/// SQL-based implementation of every store capability.
///
/// This generic implementation works with any SQL database that implements
/// the `SqlDatabase` trait (PostgreSQL, SQLite).
pub struct SqlStore<DB: SqlDatabase> {
    pool: DB::Pool,
    _marker: PhantomData<DB>,
}

impl<DB: SqlDatabase> SqlStore<DB> {
    /// Create a new SQL store with the given pool.
    pub fn new(pool: DB::Pool) -> Self {
        Self {
            pool,
            _marker: PhantomData,
        }
    }

    /// Get the underlying pool.
    pub fn pool(&self) -> &DB::Pool {
        &self.pool
    }
}

/// Table or view each listing scope reads from.
fn source_of(scope: Scope) -> sea_query::TableRef {
    match scope {
        Scope::HrdGap => PacketGap::Hrd.into_table_ref(),
        Scope::VmuGap => PacketGap::Vmu.into_table_ref(),
        Scope::Replay => ReplayList::Table.into_table_ref(),
    }
}

fn count_all(table: impl IntoTableRef) -> sea_query::SelectStatement {
    Query::select()
        .expr(Func::count(Expr::col(Asterisk)))
        .from(table)
        .to_owned()
}

fn count_selection<DB: SqlDatabase>(selection: &Selection) -> sea_query::SelectStatement {
    count_statement::<DB>(source_of(selection.scope), selection)
}

/// Columns of `table` whose `timestamp` is at or after `since`.
fn gaps_since<DB: SqlDatabase>(
    table: PacketGap,
    since: &chrono::DateTime<chrono::Utc>,
) -> sea_query::SelectStatement {
    Query::select()
        .columns(gap_columns(table))
        .from(table)
        .and_where(Expr::expr(time_column::<DB>("timestamp")).gte(time_value::<DB>(since)))
        .to_owned()
}

/// Run `$body`, an expression over `$conn: &mut Connection`, inside a write
/// transaction. Commits on success and rolls back on failure.
macro_rules! write_tx {
    (transaction, $store:expr, |$conn:ident| $body:expr) => {{
        let mut tx = $store.pool.begin().await?;
        let result = {
            let $conn = &mut *tx;
            $body.await
        };
        match result {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    tracing::warn!(error = %rollback, "rollback failed");
                }
                Err(e)
            }
        }
    }};
    // BEGIN IMMEDIATE acquires the write lock upfront, preventing deadlocks
    // when concurrent DEFERRED transactions race to upgrade from shared to exclusive.
    (immediate, $store:expr, |$conn:ident| $body:expr) => {{
        let mut conn = $store.pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;
        let result = {
            let $conn = &mut *conn;
            $body.await
        };
        match result {
            Ok(value) => {
                sqlx::query("COMMIT").execute(&mut *conn).await?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback) = sqlx::query("ROLLBACK").execute(&mut *conn).await {
                    tracing::warn!(error = %rollback, "rollback failed");
                }
                Err(e)
            }
        }
    }};
}

fn gap_columns(table: PacketGap) -> Vec<PacketGap> {
    let mut columns = vec![
        PacketGap::Id,
        PacketGap::Timestamp,
        PacketGap::LastTimestamp,
        PacketGap::LastSequenceCount,
        PacketGap::NextTimestamp,
        PacketGap::NextSequenceCount,
        PacketGap::ReplayId,
        PacketGap::Corrupted,
        PacketGap::Completed,
    ];
    match table {
        PacketGap::Vmu => columns.extend([PacketGap::Source, PacketGap::Phase]),
        _ => columns.push(PacketGap::Channel),
    }
    columns
}

/// Macro to implement the store traits for a specific SQL backend.
///
/// `$conn` and `$row` are the sqlx connection and row types. `$tx` picks
/// how multi-statement writes open their transaction (see `write_tx!`).
macro_rules! impl_sql_store {
    ($db_type:ty, $conn:ty, $row:ty, $tx:ident, $feature:literal, $migrations:tt) => {
        #[cfg(feature = $feature)]
        impl SqlStore<$db_type> {
            /// Apply the bundled schema migrations.
            pub async fn migrate(&self) -> crate::interfaces::Result<()> {
                sqlx::migrate!($migrations).run(&self.pool).await?;
                Ok(())
            }

            async fn scalar(&self, scope: &str, sql: String) -> crate::interfaces::Result<i64> {
                use sqlx::Row;

                super::query::trace_sql(scope, &sql);
                let row = sqlx::query(&sql).fetch_one(&self.pool).await?;
                Ok(row.try_get::<i64, _>(0)?)
            }

            /// Auxiliary counter: failures degrade to zero.
            async fn scalar_or_zero(&self, scope: &str, sql: String) -> i64 {
                match self.scalar(scope, sql).await {
                    Ok(n) => n,
                    Err(e) => {
                        tracing::warn!(scope, error = %e, "count failed, reporting zero");
                        0
                    }
                }
            }

            /// Seconds covered by the periods of replays not yet at the
            /// terminal stage; degrades to zero like the counters.
            async fn pending_seconds(&self) -> i64 {
                let sql = <$db_type>::build_select(
                    Query::select()
                        .columns([ReplayList::Startdate, ReplayList::Enddate])
                        .from(ReplayList::Table)
                        .and_where(Expr::col(ReplayList::Cancellable).eq(true))
                        .to_owned(),
                );
                super::query::trace_sql("replay", &sql);

                let periods = match sqlx::query_as::<_, super::rows::PeriodRow>(&sql)
                    .fetch_all(&self.pool)
                    .await
                {
                    Ok(rows) => super::rows::convert::<_, crate::model::Period>(rows),
                    Err(e) => Err(e.into()),
                };
                match periods {
                    Ok(periods) => periods.iter().filter_map(|p| p.seconds()).sum(),
                    Err(e) => {
                        tracing::warn!(error = %e, "pending duration failed, reporting zero");
                        0
                    }
                }
            }

            async fn fetch_page<R>(
                &self,
                scope: &str,
                sql: String,
            ) -> crate::interfaces::Result<Vec<R>>
            where
                R: for<'r> sqlx::FromRow<'r, $row> + Send + Unpin,
            {
                super::query::trace_sql(scope, &sql);
                let rows = sqlx::query_as::<_, R>(&sql).fetch_all(&self.pool).await?;
                tracing::debug!(
                    target: "gapkeeper::storage",
                    scope,
                    rows = rows.len(),
                    "page fetched"
                );
                Ok(rows)
            }

            /// Fail with `NotFound` unless the replay exists. With `lock`,
            /// the row stays locked until the surrounding transaction ends.
            async fn require_replay(
                conn: &mut $conn,
                id: i64,
                lock: bool,
            ) -> crate::interfaces::Result<()> {
                use crate::storage::schema::Replay;

                let mut stmt = Query::select()
                    .column(Replay::Id)
                    .from(Replay::Table)
                    .and_where(Expr::col(Replay::Id).eq(id))
                    .to_owned();
                if lock {
                    <$db_type>::lock_for_update(&mut stmt);
                }
                let sql = <$db_type>::build_select(stmt);
                super::query::trace_sql("replay", &sql);

                match sqlx::query(&sql).fetch_optional(&mut *conn).await? {
                    Some(_) => Ok(()),
                    None => Err(crate::interfaces::StoreError::NotFound(format!("replay {id}"))),
                }
            }

            /// Highest-ordinal history row of a replay, latest first on ties.
            async fn current_job(
                conn: &mut $conn,
                id: i64,
            ) -> crate::interfaces::Result<Option<(crate::model::StatusEntry, i64)>> {
                use sea_query::{Alias, JoinType, Order};
                use sqlx::{FromRow, Row};

                use crate::storage::schema::{ReplayJob, ReplayStatus};

                let (j, s) = (Alias::new("j"), Alias::new("s"));
                let stmt = Query::select()
                    .column((j.clone(), ReplayJob::Timestamp))
                    .column((j.clone(), ReplayJob::ReplayId))
                    .column((j.clone(), ReplayJob::ReplayStatusId))
                    .column((j.clone(), ReplayJob::Text))
                    .column((s.clone(), ReplayStatus::Workflow))
                    .from_as(ReplayJob::Table, j.clone())
                    .join_as(
                        JoinType::InnerJoin,
                        ReplayStatus::Table,
                        s.clone(),
                        Expr::col((s.clone(), ReplayStatus::Id))
                            .equals((j.clone(), ReplayJob::ReplayStatusId)),
                    )
                    .and_where(Expr::col((j.clone(), ReplayJob::ReplayId)).eq(id))
                    .order_by((s, ReplayStatus::Workflow), Order::Desc)
                    .order_by((j.clone(), ReplayJob::Timestamp), Order::Desc)
                    .order_by((j, ReplayJob::Id), Order::Desc)
                    .limit(1)
                    .to_owned();
                let sql = <$db_type>::build_select(stmt);
                super::query::trace_sql("replay_job", &sql);

                let Some(row) = sqlx::query(&sql).fetch_optional(&mut *conn).await? else {
                    return Ok(None);
                };
                let job = super::rows::JobRow::from_row(&row)?;
                let workflow: i64 = row.try_get("workflow")?;
                Ok(Some((job.try_into()?, workflow)))
            }

            async fn insert_job(
                conn: &mut $conn,
                replay_id: i64,
                stage: &crate::model::Stage,
                text: &str,
            ) -> crate::interfaces::Result<()> {
                use crate::storage::schema::ReplayJob;

                let stmt = Query::insert()
                    .into_table(ReplayJob::Table)
                    .columns([
                        ReplayJob::Timestamp,
                        ReplayJob::ReplayId,
                        ReplayJob::ReplayStatusId,
                        ReplayJob::Text,
                    ])
                    .values_panic([
                        crate::storage::helpers::format_timestamp(&chrono::Utc::now()).into(),
                        replay_id.into(),
                        stage.id.into(),
                        text.into(),
                    ])
                    .to_owned();
                let sql = <$db_type>::build_insert(stmt);
                super::query::trace_sql("replay_job", &sql);
                sqlx::query(&sql).execute(&mut *conn).await?;
                Ok(())
            }

            async fn insert_replay_in(
                conn: &mut $conn,
                draft: &crate::model::ReplayDraft,
                initial: &crate::model::Stage,
            ) -> crate::interfaces::Result<i64> {
                use sqlx::Row;

                use crate::storage::helpers::format_timestamp;
                use crate::storage::schema::Replay;

                let stmt = Query::insert()
                    .into_table(Replay::Table)
                    .columns([
                        Replay::Timestamp,
                        Replay::Startdate,
                        Replay::Enddate,
                        Replay::Priority,
                        Replay::Comment,
                        Replay::Automatic,
                    ])
                    .values_panic([
                        format_timestamp(&chrono::Utc::now()).into(),
                        draft.period.starts.as_ref().map(format_timestamp).into(),
                        draft.period.ends.as_ref().map(format_timestamp).into(),
                        draft.priority.into(),
                        draft.comment.as_str().into(),
                        draft.automatic.into(),
                    ])
                    .returning_col(Replay::Id)
                    .to_owned();
                let sql = <$db_type>::build_insert(stmt);
                super::query::trace_sql("replay", &sql);
                let row = sqlx::query(&sql).fetch_one(&mut *conn).await?;
                let id: i64 = row.try_get("id")?;

                Self::insert_job(conn, id, initial, &draft.comment).await?;
                Ok(id)
            }

            async fn append_status_in(
                conn: &mut $conn,
                id: i64,
                stage: &crate::model::Stage,
                text: &str,
            ) -> crate::interfaces::Result<bool> {
                Self::require_replay(conn, id, true).await?;
                let current = Self::current_job(conn, id).await?;
                if current.is_some_and(|(_, workflow)| workflow == stage.workflow) {
                    return Ok(false);
                }
                Self::insert_job(conn, id, stage, text).await?;
                Ok(true)
            }
        }

        #[cfg(feature = $feature)]
        #[async_trait::async_trait]
        impl crate::interfaces::GapStore for SqlStore<$db_type> {
            async fn list_hrd_gaps(
                &self,
                selection: &Selection,
            ) -> crate::interfaces::Result<crate::model::Listing<crate::model::HrdGap>> {
                let count_sql = <$db_type>::build_select(count_selection::<$db_type>(selection));
                let page_sql = <$db_type>::build_select(page_statement::<$db_type>(
                    Query::select()
                        .columns(gap_columns(PacketGap::Hrd))
                        .from(PacketGap::Hrd)
                        .to_owned(),
                    selection,
                ));
                let total = self.scalar("hrd_gap", count_sql).await?;
                let rows: Vec<super::rows::HrdGapRow> = self.fetch_page("hrd_gap", page_sql).await?;
                Ok(crate::model::Listing::new(total, super::rows::convert(rows)?))
            }

            async fn fetch_hrd_gap(&self, id: i64) -> crate::interfaces::Result<crate::model::HrdGap> {
                let stmt = Query::select()
                    .columns(gap_columns(PacketGap::Hrd))
                    .from(PacketGap::Hrd)
                    .and_where(Expr::col(PacketGap::Id).eq(id))
                    .to_owned();
                let sql = <$db_type>::build_select(stmt);
                super::query::trace_sql("hrd_gap", &sql);
                let row: super::rows::HrdGapRow =
                    sqlx::query_as(&sql).fetch_one(&self.pool).await?;
                row.try_into()
            }

            async fn list_vmu_gaps(
                &self,
                selection: &Selection,
            ) -> crate::interfaces::Result<crate::model::Listing<crate::model::VmuGap>> {
                let count_sql = <$db_type>::build_select(count_selection::<$db_type>(selection));
                let page_sql = <$db_type>::build_select(page_statement::<$db_type>(
                    Query::select()
                        .columns(gap_columns(PacketGap::Vmu))
                        .from(PacketGap::Vmu)
                        .to_owned(),
                    selection,
                ));
                let total = self.scalar("vmu_gap", count_sql).await?;
                let rows: Vec<super::rows::VmuGapRow> = self.fetch_page("vmu_gap", page_sql).await?;
                Ok(crate::model::Listing::new(total, super::rows::convert(rows)?))
            }

            async fn fetch_vmu_gap(&self, id: i64) -> crate::interfaces::Result<crate::model::VmuGap> {
                let stmt = Query::select()
                    .columns(gap_columns(PacketGap::Vmu))
                    .from(PacketGap::Vmu)
                    .and_where(Expr::col(PacketGap::Id).eq(id))
                    .to_owned();
                let sql = <$db_type>::build_select(stmt);
                super::query::trace_sql("vmu_gap", &sql);
                let row: super::rows::VmuGapRow =
                    sqlx::query_as(&sql).fetch_one(&self.pool).await?;
                row.try_into()
            }

            async fn list_channels(
                &self,
            ) -> crate::interfaces::Result<Vec<crate::model::ChannelInfo>> {
                let stmt = grouped_count(PacketGap::Hrd, PacketGap::Channel);
                let sql = <$db_type>::build_select(stmt);
                super::query::trace_sql("hrd_gap", &sql);
                let rows: Vec<super::rows::ChannelRow> =
                    sqlx::query_as(&sql).fetch_all(&self.pool).await?;
                Ok(rows.into_iter().map(Into::into).collect())
            }

            async fn list_sources(
                &self,
            ) -> crate::interfaces::Result<Vec<crate::model::SourceInfo>> {
                let stmt = grouped_count(PacketGap::Vmu, PacketGap::Source);
                let sql = <$db_type>::build_select(stmt);
                super::query::trace_sql("vmu_gap", &sql);
                let rows: Vec<super::rows::SourceRow> =
                    sqlx::query_as(&sql).fetch_all(&self.pool).await?;
                Ok(rows.into_iter().map(Into::into).collect())
            }

            async fn list_records(
                &self,
            ) -> crate::interfaces::Result<Vec<crate::model::RecordInfo>> {
                let stmt = grouped_count(PacketGap::Vmu, PacketGap::Phase);
                let sql = <$db_type>::build_select(stmt);
                super::query::trace_sql("vmu_gap", &sql);
                let rows: Vec<super::rows::RecordRow> =
                    sqlx::query_as(&sql).fetch_all(&self.pool).await?;
                Ok(rows.into_iter().map(Into::into).collect())
            }
        }

        #[cfg(feature = $feature)]
        #[async_trait::async_trait]
        impl crate::interfaces::ReplayStore for SqlStore<$db_type> {
            async fn list_replays(
                &self,
                selection: &Selection,
            ) -> crate::interfaces::Result<crate::model::Listing<crate::model::Replay>> {
                let count_sql = <$db_type>::build_select(count_selection::<$db_type>(selection));
                let page_sql = <$db_type>::build_select(page_statement::<$db_type>(
                    Query::select()
                        .column(Asterisk)
                        .from(ReplayList::Table)
                        .to_owned(),
                    selection,
                ));
                let total = self.scalar("replay", count_sql).await?;
                let rows: Vec<super::rows::ReplayRow> = self.fetch_page("replay", page_sql).await?;
                Ok(crate::model::Listing::new(total, super::rows::convert(rows)?))
            }

            async fn fetch_replay(&self, id: i64) -> crate::interfaces::Result<crate::model::Replay> {
                let stmt = Query::select()
                    .column(Asterisk)
                    .from(ReplayList::Table)
                    .and_where(Expr::col(ReplayList::Id).eq(id))
                    .to_owned();
                let sql = <$db_type>::build_select(stmt);
                super::query::trace_sql("replay", &sql);
                let row: super::rows::ReplayRow =
                    sqlx::query_as(&sql).fetch_one(&self.pool).await?;
                row.try_into()
            }

            async fn workflow(&self) -> crate::interfaces::Result<crate::model::Workflow> {
                use crate::storage::schema::ReplayStatus;

                let stmt = Query::select()
                    .columns([ReplayStatus::Id, ReplayStatus::Name, ReplayStatus::Workflow])
                    .from(ReplayStatus::Table)
                    .to_owned();
                let sql = <$db_type>::build_select(stmt);
                super::query::trace_sql("replay_status", &sql);
                let rows: Vec<super::rows::StageRow> =
                    sqlx::query_as(&sql).fetch_all(&self.pool).await?;

                crate::model::Workflow::new(rows.into_iter().map(Into::into).collect()).ok_or_else(
                    || crate::interfaces::StoreError::Internal("no workflow stages defined".to_string()),
                )
            }

            async fn list_status_info(
                &self,
            ) -> crate::interfaces::Result<Vec<crate::model::StatusInfo>> {
                let sql = <$db_type>::build_select(status_info_statement());
                super::query::trace_sql("replay_status", &sql);
                let rows: Vec<super::rows::StatusInfoRow> =
                    sqlx::query_as(&sql).fetch_all(&self.pool).await?;
                Ok(rows.into_iter().map(Into::into).collect())
            }

            async fn status_history(
                &self,
                id: i64,
            ) -> crate::interfaces::Result<Vec<crate::model::StatusEntry>> {
                use sea_query::Order;

                use crate::storage::schema::ReplayJob;

                let mut conn = self.pool.acquire().await?;
                Self::require_replay(&mut conn, id, false).await?;

                let stmt = Query::select()
                    .columns([
                        ReplayJob::Timestamp,
                        ReplayJob::ReplayId,
                        ReplayJob::ReplayStatusId,
                        ReplayJob::Text,
                    ])
                    .from(ReplayJob::Table)
                    .and_where(Expr::col(ReplayJob::ReplayId).eq(id))
                    .order_by(ReplayJob::Timestamp, Order::Asc)
                    .order_by(ReplayJob::Id, Order::Asc)
                    .to_owned();
                let sql = <$db_type>::build_select(stmt);
                super::query::trace_sql("replay_job", &sql);
                let rows: Vec<super::rows::JobRow> =
                    sqlx::query_as(&sql).fetch_all(&mut *conn).await?;
                super::rows::convert(rows)
            }

            async fn current_status(
                &self,
                id: i64,
            ) -> crate::interfaces::Result<Option<crate::model::StatusEntry>> {
                let mut conn = self.pool.acquire().await?;
                Self::require_replay(&mut conn, id, false).await?;
                Ok(Self::current_job(&mut conn, id).await?.map(|(entry, _)| entry))
            }

            async fn insert_replay(
                &self,
                draft: &crate::model::ReplayDraft,
                initial: &crate::model::Stage,
            ) -> crate::interfaces::Result<i64> {
                write_tx!($tx, self, |conn| Self::insert_replay_in(conn, draft, initial))
            }

            async fn append_status(
                &self,
                id: i64,
                stage: &crate::model::Stage,
                text: &str,
            ) -> crate::interfaces::Result<bool> {
                write_tx!($tx, self, |conn| Self::append_status_in(conn, id, stage, text))
            }

            async fn update_priority(&self, id: i64, priority: i64) -> crate::interfaces::Result<()> {
                use crate::storage::schema::Replay;

                let stmt = Query::update()
                    .table(Replay::Table)
                    .value(Replay::Priority, priority)
                    .and_where(Expr::col(Replay::Id).eq(id))
                    .to_owned();
                let sql = <$db_type>::build_update(stmt);
                super::query::trace_sql("replay", &sql);

                let result = sqlx::query(&sql).execute(&self.pool).await?;
                if result.rows_affected() == 0 {
                    return Err(crate::interfaces::StoreError::NotFound(format!("replay {id}")));
                }
                Ok(())
            }
        }

        #[cfg(feature = $feature)]
        #[async_trait::async_trait]
        impl crate::interfaces::ConfigStore for SqlStore<$db_type> {
            async fn list_variables(
                &self,
            ) -> crate::interfaces::Result<Vec<crate::model::Variable>> {
                use sea_query::Order;

                use crate::storage::schema::Variable;

                let stmt = Query::select()
                    .column(Asterisk)
                    .from(Variable::Table)
                    .order_by(Variable::Id, Order::Asc)
                    .to_owned();
                let sql = <$db_type>::build_select(stmt);
                super::query::trace_sql("variable", &sql);
                let rows: Vec<super::rows::VariableRow> =
                    sqlx::query_as(&sql).fetch_all(&self.pool).await?;
                super::rows::convert(rows)
            }

            async fn fetch_variable(&self, id: i64) -> crate::interfaces::Result<crate::model::Variable> {
                use crate::storage::schema::Variable;

                let stmt = Query::select()
                    .column(Asterisk)
                    .from(Variable::Table)
                    .and_where(Expr::col(Variable::Id).eq(id))
                    .to_owned();
                let sql = <$db_type>::build_select(stmt);
                super::query::trace_sql("variable", &sql);
                let row: super::rows::VariableRow =
                    sqlx::query_as(&sql).fetch_one(&self.pool).await?;
                row.try_into()
            }

            async fn update_variable(&self, id: i64, value: &str) -> crate::interfaces::Result<()> {
                use crate::storage::schema::Variable;

                let stmt = Query::update()
                    .table(Variable::Table)
                    .value(Variable::Value, value)
                    .and_where(Expr::col(Variable::Id).eq(id))
                    .to_owned();
                let sql = <$db_type>::build_update(stmt);
                super::query::trace_sql("variable", &sql);

                let result = sqlx::query(&sql).execute(&self.pool).await?;
                if result.rows_affected() == 0 {
                    return Err(crate::interfaces::StoreError::NotFound(format!("variable {id}")));
                }
                Ok(())
            }

            async fn insert_variable(
                &self,
                variable: &crate::model::Variable,
            ) -> crate::interfaces::Result<i64> {
                use sqlx::Row;

                use crate::storage::schema::Variable;

                let allowed = serde_json::to_string(&variable.allowed_range)?;
                let stmt = Query::insert()
                    .into_table(Variable::Table)
                    .columns([
                        Variable::Name,
                        Variable::Value,
                        Variable::Allowed,
                        Variable::Hazardous,
                    ])
                    .values_panic([
                        variable.name.as_str().into(),
                        variable.value.as_str().into(),
                        allowed.into(),
                        variable.hazardous.into(),
                    ])
                    .returning_col(Variable::Id)
                    .to_owned();
                let sql = <$db_type>::build_insert(stmt);
                super::query::trace_sql("variable", &sql);
                let row = sqlx::query(&sql).fetch_one(&self.pool).await?;
                Ok(row.try_get::<i64, _>("id")?)
            }
        }

        #[cfg(feature = $feature)]
        #[async_trait::async_trait]
        impl crate::interfaces::StatsStore for SqlStore<$db_type> {
            async fn summary(&self) -> crate::interfaces::Result<crate::model::Summary> {
                use crate::storage::helpers::start_of_day;
                use crate::storage::schema::Replay;

                let today = start_of_day(chrono::Utc::now());
                let since_today = || {
                    Expr::expr(time_column::<$db_type>("timestamp"))
                        .gte(time_value::<$db_type>(&today))
                };

                let requests = <$db_type>::build_select(
                    count_all(Replay::Table).and_where(since_today()).to_owned(),
                );
                let pending = <$db_type>::build_select(
                    count_all(ReplayList::Table)
                        .and_where(Expr::col(ReplayList::Cancellable).eq(true))
                        .to_owned(),
                );
                let hrd = <$db_type>::build_select(
                    count_all(PacketGap::Hrd).and_where(since_today()).to_owned(),
                );
                let vmu = <$db_type>::build_select(
                    count_all(PacketGap::Vmu).and_where(since_today()).to_owned(),
                );

                Ok(crate::model::Summary {
                    requests: self.scalar_or_zero("replay", requests).await,
                    pending: self.scalar_or_zero("replay", pending).await,
                    pending_time: self.pending_seconds().await,
                    hrd: self.scalar_or_zero("hrd_gap", hrd).await,
                    vmu: self.scalar_or_zero("vmu_gap", vmu).await,
                })
            }

            async fn item_counts(
                &self,
                since: chrono::DateTime<chrono::Utc>,
            ) -> crate::interfaces::Result<Vec<crate::model::ItemCount>> {
                let hrd_sql = <$db_type>::build_select(gaps_since::<$db_type>(PacketGap::Hrd, &since));
                let vmu_sql = <$db_type>::build_select(gaps_since::<$db_type>(PacketGap::Vmu, &since));

                super::query::trace_sql("hrd_gap", &hrd_sql);
                let hrd: Vec<super::rows::HrdGapRow> =
                    sqlx::query_as(&hrd_sql).fetch_all(&self.pool).await?;
                super::query::trace_sql("vmu_gap", &vmu_sql);
                let vmu: Vec<super::rows::VmuGapRow> =
                    sqlx::query_as(&vmu_sql).fetch_all(&self.pool).await?;

                let hrd: Vec<crate::model::HrdGap> = super::rows::convert(hrd)?;
                let vmu: Vec<crate::model::VmuGap> = super::rows::convert(vmu)?;
                Ok(crate::storage::helpers::tally_items(&hrd, &vmu))
            }

            async fn stage_counts(
                &self,
                since: chrono::DateTime<chrono::Utc>,
            ) -> crate::interfaces::Result<Vec<crate::model::StageCount>> {
                let sql = <$db_type>::build_select(stage_events_statement::<$db_type>(&since));
                super::query::trace_sql("replay_job", &sql);
                let rows: Vec<super::rows::StageEventRow> =
                    sqlx::query_as(&sql).fetch_all(&self.pool).await?;
                let events = rows
                    .into_iter()
                    .map(super::rows::StageEventRow::into_event)
                    .collect::<crate::interfaces::Result<Vec<_>>>()?;
                Ok(crate::storage::helpers::tally_stages(events))
            }
        }
    };
}

/// `SELECT <key>, COUNT(id) AS count ... GROUP BY <key> ORDER BY <key>`.
fn grouped_count(table: PacketGap, key: PacketGap) -> sea_query::SelectStatement {
    use sea_query::{Alias, Order};

    Query::select()
        .column(key.clone())
        .expr_as(Func::count(Expr::col(PacketGap::Id)), Alias::new("count"))
        .from(table)
        .group_by_col(key.clone())
        .order_by(key, Order::Asc)
        .to_owned()
}

/// Timestamp and stage name of every history row recorded since `since`.
fn stage_events_statement<DB: SqlDatabase>(
    since: &chrono::DateTime<chrono::Utc>,
) -> sea_query::SelectStatement {
    use sea_query::{Alias, JoinType};

    use crate::storage::schema::{ReplayJob, ReplayStatus};

    let (j, s) = (Alias::new("j"), Alias::new("s"));
    Query::select()
        .column((j.clone(), ReplayJob::Timestamp))
        .column((s.clone(), ReplayStatus::Name))
        .from_as(ReplayJob::Table, j.clone())
        .join_as(
            JoinType::InnerJoin,
            ReplayStatus::Table,
            s.clone(),
            Expr::col((s, ReplayStatus::Id)).equals((j.clone(), ReplayJob::ReplayStatusId)),
        )
        .and_where(
            Expr::expr(DB::time_expr(Expr::col((j, ReplayJob::Timestamp)).into()))
                .gte(time_value::<DB>(since)),
        )
        .to_owned()
}

/// Every workflow stage with the number of history rows recorded at it.
fn status_info_statement() -> sea_query::SelectStatement {
    use sea_query::{Alias, JoinType, Order};

    use crate::storage::schema::{ReplayJob, ReplayStatus};

    let (s, c, count) = (Alias::new("s"), Alias::new("c"), Alias::new("count"));
    let counts = Query::select()
        .column(ReplayJob::ReplayStatusId)
        .expr_as(Func::count(Expr::col(ReplayJob::ReplayStatusId)), count.clone())
        .from(ReplayJob::Table)
        .group_by_col(ReplayJob::ReplayStatusId)
        .to_owned();

    Query::select()
        .column((s.clone(), ReplayStatus::Id))
        .column((s.clone(), ReplayStatus::Name))
        .column((s.clone(), ReplayStatus::Workflow))
        .expr_as(
            Func::coalesce([
                Expr::col((c.clone(), count.clone())).into(),
                Expr::val(0i64).into(),
            ]),
            count,
        )
        .from_as(ReplayStatus::Table, s.clone())
        .join_subquery(
            JoinType::LeftJoin,
            counts,
            c.clone(),
            Expr::col((s.clone(), ReplayStatus::Id)).equals((c, ReplayJob::ReplayStatusId)),
        )
        .order_by((s.clone(), ReplayStatus::Workflow), Order::Asc)
        .order_by((s, ReplayStatus::Id), Order::Asc)
        .to_owned()
}

// Generate implementations for each SQL backend
impl_sql_store!(
    super::postgres::Postgres,
    sqlx::PgConnection,
    sqlx::postgres::PgRow,
    transaction,
    "postgres",
    "migrations/postgres"
);
impl_sql_store!(
    super::sqlite::Sqlite,
    sqlx::SqliteConnection,
    sqlx::sqlite::SqliteRow,
    immediate,
    "sqlite",
    "migrations/sqlite"
);
