//! Record types returned by the stores.
//!
//! All timestamps are `DateTime<Utc>`; backends normalize whatever the
//! storage layer hands back before building these values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::query::{Filterable, Value};

/// A time window. Absent endpoints are unbounded in that direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    #[serde(rename = "dtstart", default)]
    pub starts: Option<DateTime<Utc>>,
    #[serde(rename = "dtend", default)]
    pub ends: Option<DateTime<Utc>>,
}

impl Period {
    pub fn new(starts: Option<DateTime<Utc>>, ends: Option<DateTime<Utc>>) -> Self {
        Self { starts, ends }
    }

    pub fn between(starts: DateTime<Utc>, ends: DateTime<Utc>) -> Self {
        Self {
            starts: Some(starts),
            ends: Some(ends),
        }
    }

    /// A period is valid for registration when both endpoints are set and
    /// `starts <= ends`.
    pub fn is_valid(&self) -> bool {
        matches!((self.starts, self.ends), (Some(s), Some(e)) if s <= e)
    }

    /// True when neither endpoint is set.
    pub fn is_unbounded(&self) -> bool {
        self.starts.is_none() && self.ends.is_none()
    }

    /// Length in whole seconds, when both endpoints are set.
    pub fn seconds(&self) -> Option<i64> {
        match (self.starts, self.ends) {
            (Some(s), Some(e)) => Some((e - s).num_seconds()),
            _ => None,
        }
    }
}

/// Fields shared by both gap variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gap {
    pub id: i64,
    #[serde(rename = "time")]
    pub detected_at: DateTime<Utc>,
    #[serde(rename = "dtstart")]
    pub range_start: DateTime<Utc>,
    #[serde(rename = "first")]
    pub first_sequence: i64,
    #[serde(rename = "dtend")]
    pub range_end: DateTime<Utc>,
    #[serde(rename = "last")]
    pub last_sequence: i64,
    #[serde(rename = "replay")]
    pub replay_id: Option<i64>,
    pub corrupted: bool,
    pub completed: bool,
}

/// Gap detected in an HRD channel stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HrdGap {
    #[serde(flatten)]
    pub gap: Gap,
    pub channel: String,
}

/// Gap detected in a VMU source stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmuGap {
    #[serde(flatten)]
    pub gap: Gap,
    pub source: i64,
    #[serde(rename = "record")]
    pub record_phase: String,
}

/// Projection of a replay request with its derived current status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replay {
    pub id: i64,
    #[serde(rename = "time")]
    pub registered_at: DateTime<Utc>,
    #[serde(flatten)]
    pub period: Period,
    pub priority: i64,
    pub comment: String,
    pub status: String,
    pub automatic: bool,
    pub cancellable: bool,
    pub corrupted: i64,
    pub missing: i64,
}

/// Body accepted when registering a replay.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayDraft {
    #[serde(flatten)]
    pub period: Period,
    #[serde(default)]
    pub priority: i64,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub automatic: bool,
}

/// One workflow stage a replay can be in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    pub id: i64,
    pub name: String,
    #[serde(rename = "order")]
    pub workflow: i64,
}

/// The ordered set of workflow stages.
///
/// The stage with the lowest ordinal is where every replay starts; the one
/// with the highest ordinal is the terminal "cancelled" stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workflow {
    stages: Vec<Stage>,
}

impl Workflow {
    /// Build a workflow from unordered stages. Returns `None` when empty.
    pub fn new(mut stages: Vec<Stage>) -> Option<Self> {
        if stages.is_empty() {
            return None;
        }
        stages.sort_by_key(|s| (s.workflow, s.id));
        Some(Self { stages })
    }

    pub fn initial(&self) -> &Stage {
        &self.stages[0]
    }

    pub fn cancelled(&self) -> &Stage {
        &self.stages[self.stages.len() - 1]
    }

    pub fn stage(&self, id: i64) -> Option<&Stage> {
        self.stages.iter().find(|s| s.id == id)
    }

    pub fn is_terminal(&self, stage_id: i64) -> bool {
        self.stage(stage_id)
            .is_some_and(|s| s.workflow == self.cancelled().workflow)
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }
}

/// Append-only status history row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEntry {
    pub timestamp: DateTime<Utc>,
    pub replay_id: i64,
    pub status_id: i64,
    pub text: String,
}

/// Configuration variable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    pub value: String,
    #[serde(rename = "range", default)]
    pub allowed_range: Vec<String>,
    #[serde(default)]
    pub hazardous: bool,
}

impl Variable {
    /// Whether `value` is acceptable for this variable.
    pub fn accepts(&self, value: &str) -> bool {
        self.allowed_range.is_empty() || self.allowed_range.iter().any(|v| v == value)
    }
}

/// Workflow stage with the number of history rows recorded at it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusInfo {
    pub id: i64,
    pub name: String,
    #[serde(rename = "order")]
    pub workflow: i64,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub channel: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInfo {
    pub source: i64,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordInfo {
    pub record: String,
    pub count: i64,
}

/// Daily activity counters. Each counter degrades to zero when its query
/// fails.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub requests: i64,
    pub pending: i64,
    /// Seconds of telemetry still to be replayed by pending requests.
    #[serde(rename = "pendingTime")]
    pub pending_time: i64,
    pub hrd: i64,
    pub vmu: i64,
}

/// Gaps detected on one day for one origin (HRD channel or VMU source).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemCount {
    /// `hrd` or `vmu`.
    pub label: String,
    pub origin: String,
    #[serde(rename = "time")]
    pub day: DateTime<Utc>,
    pub count: i64,
    /// Total seconds the gaps span.
    pub duration: i64,
}

/// History rows recorded on one day at one workflow stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageCount {
    pub status: String,
    #[serde(rename = "time")]
    pub day: DateTime<Utc>,
    pub count: i64,
}

/// One page of results together with the total number of matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing<T> {
    pub total: i64,
    pub data: Vec<T>,
}

impl<T> Listing<T> {
    pub fn new(total: i64, data: Vec<T>) -> Self {
        Self { total, data }
    }
}

// Column views used by the in-memory and flat-file backends. Names match the
// relational schema so a single `Selection` means the same thing everywhere.

impl Gap {
    fn column(&self, name: &str) -> Option<Value> {
        Some(match name {
            "id" => Value::Int(self.id),
            "timestamp" => Value::Time(self.detected_at),
            "last_timestamp" => Value::Time(self.range_start),
            "last_sequence_count" => Value::Int(self.first_sequence),
            "next_timestamp" => Value::Time(self.range_end),
            "next_sequence_count" => Value::Int(self.last_sequence),
            "replay_id" => Value::Int(self.replay_id?),
            "corrupted" => Value::Bool(self.corrupted),
            "completed" => Value::Bool(self.completed),
            _ => return None,
        })
    }
}

impl Filterable for HrdGap {
    fn column(&self, name: &str) -> Option<Value> {
        match name {
            "channel" => Some(Value::Text(self.channel.clone())),
            _ => self.gap.column(name),
        }
    }
}

impl Filterable for VmuGap {
    fn column(&self, name: &str) -> Option<Value> {
        match name {
            "source" => Some(Value::Int(self.source)),
            "phase" => Some(Value::Text(self.record_phase.clone())),
            _ => self.gap.column(name),
        }
    }
}

impl Filterable for Replay {
    fn column(&self, name: &str) -> Option<Value> {
        Some(match name {
            "id" => Value::Int(self.id),
            "timestamp" => Value::Time(self.registered_at),
            "startdate" => Value::Time(self.period.starts?),
            "enddate" => Value::Time(self.period.ends?),
            "priority" => Value::Int(self.priority),
            "comment" => Value::Text(self.comment.clone()),
            "status" => Value::Text(self.status.clone()),
            "automatic" => Value::Bool(self.automatic),
            "cancellable" => Value::Bool(self.cancellable),
            "corrupted" => Value::Int(self.corrupted),
            "missing" => Value::Int(self.missing),
            _ => return None,
        })
    }
}
