//! Route handlers.

use std::collections::HashMap;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::Json;
use http::StatusCode;
use serde::Deserialize;

use super::{ApiError, AppState};
use crate::model::{
    ChannelInfo, HrdGap, ItemCount, Listing, RecordInfo, Replay, ReplayDraft, SourceInfo,
    StageCount, StatusEntry, StatusInfo, Summary, Variable, VmuGap,
};
use crate::query::criteria::{parse_int, stats_window};
use crate::query::{Criteria, Scope, Selection};

type ApiResult<T> = Result<Json<T>, ApiError>;
type Params = Query<HashMap<String, String>>;

fn parse_id(raw: &str) -> Result<i64, ApiError> {
    Ok(parse_int("id", raw)?)
}

fn selection(
    state: &AppState,
    params: &HashMap<String, String>,
    scope: Scope,
) -> Result<Selection, ApiError> {
    let criteria = Criteria::from_params(params)?;
    Ok(Selection::new(&criteria, scope, &state.policy)?)
}

// ============================================================================
// Request bodies
// ============================================================================

#[derive(Debug, Deserialize)]
pub(super) struct CancelBody {
    #[serde(default)]
    comment: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct PriorityBody {
    priority: i64,
}

#[derive(Debug, Deserialize)]
pub(super) struct ValueBody {
    value: String,
}

// ============================================================================
// Status
// ============================================================================

pub(super) async fn summary(State(state): State<AppState>) -> ApiResult<Summary> {
    Ok(Json(state.store.summary().await?))
}

/// Daily gap counts and durations per origin over the last `days` days.
pub(super) async fn item_stats(
    State(state): State<AppState>,
    Query(params): Params,
) -> ApiResult<Vec<ItemCount>> {
    let since = stats_window(&params, chrono::Utc::now())?;
    Ok(Json(state.store.item_counts(since).await?))
}

/// Daily status history counts per stage over the last `days` days.
pub(super) async fn request_stats(
    State(state): State<AppState>,
    Query(params): Params,
) -> ApiResult<Vec<StageCount>> {
    let since = stats_window(&params, chrono::Utc::now())?;
    Ok(Json(state.store.stage_counts(since).await?))
}

// ============================================================================
// Replays
// ============================================================================

pub(super) async fn list_replays(
    State(state): State<AppState>,
    Query(params): Params,
) -> ApiResult<Listing<Replay>> {
    let criteria = Criteria::from_params(&params)?;
    Ok(Json(state.replays.list(&criteria).await?))
}

pub(super) async fn list_statuses(State(state): State<AppState>) -> ApiResult<Vec<StatusInfo>> {
    Ok(Json(state.replays.statuses().await?))
}

pub(super) async fn register_replay(
    State(state): State<AppState>,
    body: Result<Json<ReplayDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<Replay>), ApiError> {
    let Json(draft) = body?;
    let replay = state.replays.register(&draft).await?;
    Ok((StatusCode::CREATED, Json(replay)))
}

pub(super) async fn replay_detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Replay> {
    Ok(Json(state.replays.detail(parse_id(&id)?).await?))
}

pub(super) async fn replay_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Vec<StatusEntry>> {
    Ok(Json(state.replays.history(parse_id(&id)?).await?))
}

pub(super) async fn cancel_replay(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<CancelBody>, JsonRejection>,
) -> ApiResult<Replay> {
    let id = parse_id(&id)?;
    let Json(body) = body?;
    Ok(Json(state.replays.cancel(id, &body.comment).await?))
}

pub(super) async fn update_priority(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<PriorityBody>, JsonRejection>,
) -> ApiResult<Replay> {
    let id = parse_id(&id)?;
    let Json(body) = body?;
    Ok(Json(state.replays.update_priority(id, body.priority).await?))
}

// ============================================================================
// Gap archives
// ============================================================================

pub(super) async fn list_hrd_gaps(
    State(state): State<AppState>,
    Query(params): Params,
) -> ApiResult<Listing<HrdGap>> {
    let selection = selection(&state, &params, Scope::HrdGap)?;
    Ok(Json(state.store.list_hrd_gaps(&selection).await?))
}

pub(super) async fn hrd_gap_detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<HrdGap> {
    Ok(Json(state.store.fetch_hrd_gap(parse_id(&id)?).await?))
}

pub(super) async fn list_channels(State(state): State<AppState>) -> ApiResult<Vec<ChannelInfo>> {
    Ok(Json(state.store.list_channels().await?))
}

pub(super) async fn list_vmu_gaps(
    State(state): State<AppState>,
    Query(params): Params,
) -> ApiResult<Listing<VmuGap>> {
    let selection = selection(&state, &params, Scope::VmuGap)?;
    Ok(Json(state.store.list_vmu_gaps(&selection).await?))
}

pub(super) async fn vmu_gap_detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<VmuGap> {
    Ok(Json(state.store.fetch_vmu_gap(parse_id(&id)?).await?))
}

pub(super) async fn list_sources(State(state): State<AppState>) -> ApiResult<Vec<SourceInfo>> {
    Ok(Json(state.store.list_sources().await?))
}

pub(super) async fn list_records(State(state): State<AppState>) -> ApiResult<Vec<RecordInfo>> {
    Ok(Json(state.store.list_records().await?))
}

// ============================================================================
// Variables
// ============================================================================

pub(super) async fn list_variables(State(state): State<AppState>) -> ApiResult<Vec<Variable>> {
    Ok(Json(state.variables.list().await?))
}

pub(super) async fn register_variable(
    State(state): State<AppState>,
    body: Result<Json<Variable>, JsonRejection>,
) -> Result<(StatusCode, Json<Variable>), ApiError> {
    let Json(variable) = body?;
    let created = state.variables.register(&variable).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub(super) async fn update_variable(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<ValueBody>, JsonRejection>,
) -> ApiResult<Variable> {
    let id = parse_id(&id)?;
    let Json(body) = body?;
    Ok(Json(state.variables.update(id, &body.value).await?))
}
