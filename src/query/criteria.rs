//! Criteria parsing.
//!
//! Turns raw query-string parameters into a validated [`Criteria`]. Absent
//! (or empty) parameters fall back to their defaults; present but malformed
//! values are rejected with [`StoreError::Query`].

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::interfaces::{Result, StoreError};
use crate::model::Period;
use crate::storage::helpers::start_of_day;

pub const FIELD_START: &str = "dtstart";
pub const FIELD_END: &str = "dtend";
pub const FIELD_CHANNEL: &str = "channel";
pub const FIELD_STATUS: &str = "status";
pub const FIELD_RECORD: &str = "record";
pub const FIELD_SOURCE: &str = "source";
pub const FIELD_LIMIT: &str = "limit";
pub const FIELD_PAGE: &str = "page";
pub const FIELD_CORRUPTED: &str = "corrupted";
pub const FIELD_COMPLETED: &str = "completed";
pub const FIELD_ORDER: &str = "order";
pub const FIELD_BY: &str = "by";
pub const FIELD_DAYS: &str = "days";

/// Statistics window when `days` is absent or zero.
pub const DEFAULT_STATS_DAYS: i64 = 30;

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OrderDirection {
    Asc,
    #[default]
    Desc,
}

impl OrderDirection {
    /// Only a case-insensitive `asc` sorts ascending; anything else is
    /// descending.
    pub fn parse(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("asc") {
            OrderDirection::Asc
        } else {
            OrderDirection::Desc
        }
    }
}

/// Normalized filter, sort and pagination parameters of a list request.
///
/// `corrupted` and `completed` default to `false`, which restricts results
/// to non-corrupted / non-completed records. Passing `true` lifts the
/// restriction instead of selecting only flagged records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Criteria {
    pub period: Period,
    pub channel: String,
    pub status: String,
    pub record: String,
    pub source: String,
    pub corrupted: bool,
    pub completed: bool,
    pub order_field: String,
    pub order_direction: OrderDirection,
    pub limit: i64,
    /// Zero-based page index.
    pub page_index: i64,
}

impl Criteria {
    /// Parse criteria from query-string parameters.
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self> {
        let get = |key: &str| params.get(key).map(String::as_str).unwrap_or("");

        let period = Period::new(
            parse_datetime(FIELD_START, get(FIELD_START))?,
            parse_datetime(FIELD_END, get(FIELD_END))?,
        );
        if let (Some(starts), Some(ends)) = (period.starts, period.ends) {
            if starts > ends {
                return Err(StoreError::Query(format!("{FIELD_START}: after {FIELD_END}")));
            }
        }

        let page = parse_int(FIELD_PAGE, get(FIELD_PAGE))?;

        Ok(Self {
            period,
            channel: get(FIELD_CHANNEL).to_string(),
            status: get(FIELD_STATUS).to_string(),
            record: get(FIELD_RECORD).to_string(),
            source: get(FIELD_SOURCE).to_string(),
            corrupted: parse_bool(FIELD_CORRUPTED, get(FIELD_CORRUPTED))?,
            completed: parse_bool(FIELD_COMPLETED, get(FIELD_COMPLETED))?,
            order_field: get(FIELD_BY).to_string(),
            order_direction: OrderDirection::parse(get(FIELD_ORDER)),
            limit: parse_int(FIELD_LIMIT, get(FIELD_LIMIT))?,
            page_index: if page > 0 { page - 1 } else { page },
        })
    }
}

/// Start of the statistics window: midnight UTC `days` days before `now`.
pub fn stats_window(params: &HashMap<String, String>, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let raw = params.get(FIELD_DAYS).map(String::as_str).unwrap_or("");
    let days = match parse_int(FIELD_DAYS, raw)? {
        0 => DEFAULT_STATS_DAYS,
        days => days,
    };
    let delta = chrono::TimeDelta::try_days(days)
        .ok_or_else(|| StoreError::Query(format!("{FIELD_DAYS}: out of range")))?;
    start_of_day(now)
        .checked_sub_signed(delta)
        .ok_or_else(|| StoreError::Query(format!("{FIELD_DAYS}: out of range")))
}

/// Parse an RFC 3339 timestamp. An empty string means "no bound".
pub fn parse_datetime(field: &str, raw: &str) -> Result<Option<DateTime<Utc>>> {
    if raw.is_empty() {
        return Ok(None);
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| Some(dt.with_timezone(&Utc)))
        .map_err(|e| StoreError::Query(format!("{field}: {e}")))
}

/// Parse a boolean flag. Accepts the usual spellings (`1`, `t`, `true`,
/// `TRUE`, `True` and their false counterparts); empty means `false`.
pub fn parse_bool(field: &str, raw: &str) -> Result<bool> {
    match raw {
        "" => Ok(false),
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
        other => Err(StoreError::Query(format!(
            "{field}: invalid boolean {other:?}"
        ))),
    }
}

/// Parse a non-negative integer; empty means `0`.
pub fn parse_int(field: &str, raw: &str) -> Result<i64> {
    if raw.is_empty() {
        return Ok(0);
    }
    let value: i64 = raw
        .parse()
        .map_err(|_| StoreError::Query(format!("{field}: invalid integer {raw:?}")))?;
    if value < 0 {
        return Err(StoreError::Query(format!("{field}: must not be negative")));
    }
    Ok(value)
}
