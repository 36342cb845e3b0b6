//! Raw row shapes and their conversion into model types.
//!
//! Timestamps come back as stored text and are parsed here, so every value
//! leaving the relational backend is already normalized to UTC.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::interfaces::{Result, StoreError};
use crate::model::{
    ChannelInfo, Gap, HrdGap, Period, RecordInfo, Replay, SourceInfo, Stage, StatusEntry,
    StatusInfo, Variable, VmuGap,
};
use crate::storage::helpers::{parse_optional_timestamp, parse_timestamp};

#[derive(FromRow)]
pub struct GapRow {
    id: i64,
    timestamp: String,
    last_timestamp: String,
    last_sequence_count: i64,
    next_timestamp: String,
    next_sequence_count: i64,
    replay_id: Option<i64>,
    corrupted: bool,
    completed: bool,
}

impl TryFrom<GapRow> for Gap {
    type Error = StoreError;

    fn try_from(row: GapRow) -> Result<Self> {
        Ok(Gap {
            id: row.id,
            detected_at: parse_timestamp(&row.timestamp)?,
            range_start: parse_timestamp(&row.last_timestamp)?,
            first_sequence: row.last_sequence_count,
            range_end: parse_timestamp(&row.next_timestamp)?,
            last_sequence: row.next_sequence_count,
            replay_id: row.replay_id,
            corrupted: row.corrupted,
            completed: row.completed,
        })
    }
}

#[derive(FromRow)]
pub struct HrdGapRow {
    #[sqlx(flatten)]
    gap: GapRow,
    channel: String,
}

impl TryFrom<HrdGapRow> for HrdGap {
    type Error = StoreError;

    fn try_from(row: HrdGapRow) -> Result<Self> {
        Ok(HrdGap {
            gap: row.gap.try_into()?,
            channel: row.channel,
        })
    }
}

#[derive(FromRow)]
pub struct VmuGapRow {
    #[sqlx(flatten)]
    gap: GapRow,
    source: i64,
    phase: String,
}

impl TryFrom<VmuGapRow> for VmuGap {
    type Error = StoreError;

    fn try_from(row: VmuGapRow) -> Result<Self> {
        Ok(VmuGap {
            gap: row.gap.try_into()?,
            source: row.source,
            record_phase: row.phase,
        })
    }
}

#[derive(FromRow)]
pub struct ReplayRow {
    id: i64,
    timestamp: String,
    startdate: Option<String>,
    enddate: Option<String>,
    priority: i64,
    comment: String,
    status: String,
    automatic: bool,
    cancellable: bool,
    corrupted: i64,
    missing: i64,
}

impl TryFrom<ReplayRow> for Replay {
    type Error = StoreError;

    fn try_from(row: ReplayRow) -> Result<Self> {
        let endpoint = |raw: Option<String>| match raw {
            Some(raw) => parse_optional_timestamp(&raw),
            None => Ok(None),
        };
        Ok(Replay {
            id: row.id,
            registered_at: parse_timestamp(&row.timestamp)?,
            period: Period::new(endpoint(row.startdate)?, endpoint(row.enddate)?),
            priority: row.priority,
            comment: row.comment,
            status: row.status,
            automatic: row.automatic,
            cancellable: row.cancellable,
            corrupted: row.corrupted,
            missing: row.missing,
        })
    }
}

#[derive(FromRow)]
pub struct StageRow {
    id: i64,
    name: String,
    workflow: i64,
}

impl From<StageRow> for Stage {
    fn from(row: StageRow) -> Self {
        Stage {
            id: row.id,
            name: row.name,
            workflow: row.workflow,
        }
    }
}

#[derive(FromRow)]
pub struct StatusInfoRow {
    id: i64,
    name: String,
    workflow: i64,
    count: i64,
}

impl From<StatusInfoRow> for StatusInfo {
    fn from(row: StatusInfoRow) -> Self {
        StatusInfo {
            id: row.id,
            name: row.name,
            workflow: row.workflow,
            count: row.count,
        }
    }
}

#[derive(FromRow)]
pub struct JobRow {
    timestamp: String,
    replay_id: i64,
    replay_status_id: i64,
    text: String,
}

impl TryFrom<JobRow> for StatusEntry {
    type Error = StoreError;

    fn try_from(row: JobRow) -> Result<Self> {
        Ok(StatusEntry {
            timestamp: parse_timestamp(&row.timestamp)?,
            replay_id: row.replay_id,
            status_id: row.replay_status_id,
            text: row.text,
        })
    }
}

#[derive(FromRow)]
pub struct VariableRow {
    id: i64,
    name: String,
    value: String,
    allowed: String,
    hazardous: bool,
}

impl TryFrom<VariableRow> for Variable {
    type Error = StoreError;

    fn try_from(row: VariableRow) -> Result<Self> {
        let allowed_range = if row.allowed.trim().is_empty() {
            Vec::new()
        } else {
            serde_json::from_str(&row.allowed)?
        };
        Ok(Variable {
            id: row.id,
            name: row.name,
            value: row.value,
            allowed_range,
            hazardous: row.hazardous,
        })
    }
}

#[derive(FromRow)]
pub struct ChannelRow {
    channel: String,
    count: i64,
}

impl From<ChannelRow> for ChannelInfo {
    fn from(row: ChannelRow) -> Self {
        ChannelInfo {
            channel: row.channel,
            count: row.count,
        }
    }
}

#[derive(FromRow)]
pub struct SourceRow {
    source: i64,
    count: i64,
}

impl From<SourceRow> for SourceInfo {
    fn from(row: SourceRow) -> Self {
        SourceInfo {
            source: row.source,
            count: row.count,
        }
    }
}

#[derive(FromRow)]
pub struct RecordRow {
    phase: String,
    count: i64,
}

impl From<RecordRow> for RecordInfo {
    fn from(row: RecordRow) -> Self {
        RecordInfo {
            record: row.phase,
            count: row.count,
        }
    }
}

/// Requested window of a replay.
#[derive(FromRow)]
pub struct PeriodRow {
    startdate: Option<String>,
    enddate: Option<String>,
}

impl TryFrom<PeriodRow> for Period {
    type Error = StoreError;

    fn try_from(row: PeriodRow) -> Result<Self> {
        Ok(Period::new(
            parse_optional_timestamp(row.startdate.as_deref().unwrap_or(""))?,
            parse_optional_timestamp(row.enddate.as_deref().unwrap_or(""))?,
        ))
    }
}

/// A history row joined with its stage name.
#[derive(FromRow)]
pub struct StageEventRow {
    timestamp: String,
    name: String,
}

impl StageEventRow {
    pub fn into_event(self) -> Result<(DateTime<Utc>, String)> {
        Ok((parse_timestamp(&self.timestamp)?, self.name))
    }
}

/// Convert a batch of raw rows, failing on the first bad one.
pub fn convert<R, T>(rows: Vec<R>) -> Result<Vec<T>>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}
