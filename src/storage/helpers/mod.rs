//! Shared storage helper functions.
//!
//! Timestamps are persisted as text in one fixed-width UTC form so that
//! lexical comparison in SQL agrees with chronological order.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeZone, Utc};

use crate::interfaces::{Result, StoreError};
use crate::model::{HrdGap, ItemCount, StageCount, VmuGap};

/// Layout used by tab-separated exports and legacy rows.
pub const PLAIN_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Render a timestamp in the canonical stored form.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored timestamp.
///
/// Accepts RFC3339 with any offset, and the plain `YYYY-MM-DD HH:MM:SS`
/// layout (with optional fractional seconds) interpreted as UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, PLAIN_TIME_FORMAT))
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(|_| StoreError::Serialization(format!("invalid timestamp {raw:?}")))
}

/// Like [`parse_timestamp`], but an empty field is `None`.
pub fn parse_optional_timestamp(raw: &str) -> Result<Option<DateTime<Utc>>> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    parse_timestamp(raw).map(Some)
}

/// Midnight UTC of the day containing `now`.
pub fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    let midnight = now.date_naive().and_hms_opt(0, 0, 0).unwrap_or(now.naive_utc());
    Utc.from_utc_datetime(&midnight)
}

/// Daily gap totals per origin, ordered by day, label and origin.
pub fn tally_items<'a>(
    hrd: impl IntoIterator<Item = &'a HrdGap>,
    vmu: impl IntoIterator<Item = &'a VmuGap>,
) -> Vec<ItemCount> {
    let hrd = hrd
        .into_iter()
        .map(|g| ("hrd", g.channel.clone(), &g.gap));
    let vmu = vmu
        .into_iter()
        .map(|g| ("vmu", g.source.to_string(), &g.gap));

    let mut totals: BTreeMap<(DateTime<Utc>, &str, String), (i64, i64)> = BTreeMap::new();
    for (label, origin, gap) in hrd.chain(vmu) {
        let entry = totals
            .entry((start_of_day(gap.detected_at), label, origin))
            .or_default();
        entry.0 += 1;
        entry.1 += (gap.range_end - gap.range_start).num_seconds();
    }

    totals
        .into_iter()
        .map(|((day, label, origin), (count, duration))| ItemCount {
            label: label.to_string(),
            origin,
            day,
            count,
            duration,
        })
        .collect()
}

/// Daily history row totals per stage name, ordered by day and name.
pub fn tally_stages(rows: impl IntoIterator<Item = (DateTime<Utc>, String)>) -> Vec<StageCount> {
    let mut totals: BTreeMap<(DateTime<Utc>, String), i64> = BTreeMap::new();
    for (timestamp, status) in rows {
        *totals.entry((start_of_day(timestamp), status)).or_default() += 1;
    }
    totals
        .into_iter()
        .map(|((day, status), count)| StageCount { status, day, count })
        .collect()
}
