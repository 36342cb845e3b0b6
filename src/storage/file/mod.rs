//! Flat-file storage over tab-separated exports.
//!
//! Each entity lives in `<dir>/<name>.csv`: tab-delimited, first row is a
//! header and is skipped, fields are addressed by position. Timestamps use
//! `YYYY-MM-DD HH:MM:SS` (UTC) or RFC3339. The backend is read-only:
//! every mutation, gap detail, the replay workflow and the per-stage
//! statistics report `NotImplemented`.
//!
//! | file            | columns                                                                 |
//! |-----------------|-------------------------------------------------------------------------|
//! | `hrdgap.csv`    | id, time, dtstart, first, dtend, last, channel, [replay, corrupted, completed] |
//! | `vmugap.csv`    | id, time, dtstart, first, dtend, last, source, record, [replay, corrupted, completed] |
//! | `replay.csv`    | id, time, dtstart, dtend, priority, comment, status, automatic, [cancellable] |
//! | `variables.csv` | id, name, value, [allowed (comma-separated), hazardous]                 |

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use csv::StringRecord;
use tracing::debug;

use super::helpers::{parse_optional_timestamp, parse_timestamp, start_of_day, tally_items};
use crate::interfaces::{
    ConfigStore, GapStore, ReplayStore, Result, StatsStore, StoreError,
};
use crate::model::{
    ChannelInfo, Gap, HrdGap, ItemCount, Listing, Period, RecordInfo, Replay, SourceInfo, StatusInfo,
    Summary, Variable, VmuGap, Workflow,
};
use crate::query::Selection;

const HRD_FILE: &str = "hrdgap";
const VMU_FILE: &str = "vmugap";
const REPLAY_FILE: &str = "replay";
const VARIABLE_FILE: &str = "variables";

/// Read-only store over a directory of tab-separated files.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open a store rooted at `dir`, which must be an existing directory.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let meta = std::fs::metadata(dir)?;
        if !meta.is_dir() {
            return Err(StoreError::Internal(format!(
                "{}: not a directory",
                dir.display()
            )));
        }
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    /// Parse every data row of `<name>.csv` with `parse`.
    async fn read<T, F>(&self, name: &'static str, parse: F) -> Result<Vec<T>>
    where
        T: Send + 'static,
        F: Fn(&Row<'_>) -> Result<T> + Send + 'static,
    {
        let path = self.dir.join(format!("{name}.csv"));
        debug!(target: "gapkeeper::storage", scope = name, path = %path.display(), "reading file");

        tokio::task::spawn_blocking(move || -> Result<Vec<T>> {
            let mut reader = csv::ReaderBuilder::new()
                .delimiter(b'\t')
                .has_headers(true)
                .flexible(true)
                .from_path(&path)?;

            let mut items = Vec::new();
            for (index, record) in reader.records().enumerate() {
                let record = record?;
                // Line 1 is the header.
                items.push(parse(&Row {
                    file: name,
                    line: index + 2,
                    record: &record,
                })?);
            }
            Ok(items)
        })
        .await
        .map_err(|e| StoreError::Internal(format!("file reader task failed: {e}")))?
    }
}

/// One data row with its position, for error messages.
struct Row<'a> {
    file: &'static str,
    line: usize,
    record: &'a StringRecord,
}

impl Row<'_> {
    fn invalid(&self, column: usize, what: impl std::fmt::Display) -> StoreError {
        StoreError::Serialization(format!(
            "{}.csv line {} column {}: {what}",
            self.file,
            self.line,
            column + 1
        ))
    }

    fn text(&self, column: usize) -> Result<&str> {
        self.record
            .get(column)
            .ok_or_else(|| self.invalid(column, "missing field"))
    }

    fn optional(&self, column: usize) -> &str {
        self.record.get(column).unwrap_or("").trim()
    }

    fn number<N: FromStr>(&self, column: usize) -> Result<N> {
        let raw = self.text(column)?.trim();
        raw.parse()
            .map_err(|_| self.invalid(column, format!("invalid number {raw:?}")))
    }

    fn time(&self, column: usize) -> Result<DateTime<Utc>> {
        parse_timestamp(self.text(column)?).map_err(|e| self.invalid(column, e))
    }

    fn optional_time(&self, column: usize) -> Result<Option<DateTime<Utc>>> {
        parse_optional_timestamp(self.optional(column)).map_err(|e| self.invalid(column, e))
    }

    fn flag(&self, column: usize, default: bool) -> Result<bool> {
        match self.optional(column) {
            "" => Ok(default),
            "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
            "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
            other => Err(self.invalid(column, format!("invalid boolean {other:?}"))),
        }
    }

    fn optional_number(&self, column: usize) -> Result<Option<i64>> {
        match self.optional(column) {
            "" => Ok(None),
            _ => self.number(column).map(Some),
        }
    }

    /// Columns 0..=5 are shared by both gap files; `tail` is where the
    /// optional replay/corrupted/completed columns start.
    fn gap(&self, tail: usize) -> Result<Gap> {
        Ok(Gap {
            id: self.number(0)?,
            detected_at: self.time(1)?,
            range_start: self.time(2)?,
            first_sequence: self.number(3)?,
            range_end: self.time(4)?,
            last_sequence: self.number(5)?,
            replay_id: self.optional_number(tail)?,
            corrupted: self.flag(tail + 1, false)?,
            completed: self.flag(tail + 2, false)?,
        })
    }
}

fn hrd_gap(row: &Row<'_>) -> Result<HrdGap> {
    Ok(HrdGap {
        gap: row.gap(7)?,
        channel: row.text(6)?.to_string(),
    })
}

fn vmu_gap(row: &Row<'_>) -> Result<VmuGap> {
    Ok(VmuGap {
        gap: row.gap(8)?,
        source: row.number(6)?,
        record_phase: row.text(7)?.to_string(),
    })
}

/// Flat files carry no workflow; a replay is cancellable unless the file
/// says otherwise or its status reads "cancelled".
fn replay(row: &Row<'_>) -> Result<Replay> {
    let status = row.text(6)?.to_string();
    let cancellable = row.flag(8, status != "cancelled")?;
    Ok(Replay {
        id: row.number(0)?,
        registered_at: row.time(1)?,
        period: Period::new(row.optional_time(2)?, row.optional_time(3)?),
        priority: row.number(4)?,
        comment: row.text(5)?.to_string(),
        status,
        automatic: row.flag(7, false)?,
        cancellable,
        corrupted: 0,
        missing: 0,
    })
}

fn variable(row: &Row<'_>) -> Result<Variable> {
    let allowed_range = row
        .optional(3)
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
        .collect();
    Ok(Variable {
        id: row.number(0)?,
        name: row.text(1)?.to_string(),
        value: row.text(2)?.to_string(),
        allowed_range,
        hazardous: row.flag(4, false)?,
    })
}

fn tally<K: Ord>(keys: impl IntoIterator<Item = K>) -> BTreeMap<K, i64> {
    let mut counts = BTreeMap::new();
    for key in keys {
        *counts.entry(key).or_insert(0) += 1;
    }
    counts
}

#[async_trait]
impl GapStore for FileStore {
    async fn list_hrd_gaps(&self, selection: &Selection) -> Result<Listing<HrdGap>> {
        let gaps = self.read(HRD_FILE, hrd_gap).await?;
        let (total, data) = selection.apply(&gaps);
        Ok(Listing::new(total, data))
    }

    async fn list_vmu_gaps(&self, selection: &Selection) -> Result<Listing<VmuGap>> {
        let gaps = self.read(VMU_FILE, vmu_gap).await?;
        let (total, data) = selection.apply(&gaps);
        Ok(Listing::new(total, data))
    }

    async fn list_channels(&self) -> Result<Vec<ChannelInfo>> {
        let gaps = self.read(HRD_FILE, hrd_gap).await?;
        Ok(tally(gaps.into_iter().map(|g| g.channel))
            .into_iter()
            .map(|(channel, count)| ChannelInfo { channel, count })
            .collect())
    }

    async fn list_sources(&self) -> Result<Vec<SourceInfo>> {
        let gaps = self.read(VMU_FILE, vmu_gap).await?;
        Ok(tally(gaps.into_iter().map(|g| g.source))
            .into_iter()
            .map(|(source, count)| SourceInfo { source, count })
            .collect())
    }

    async fn list_records(&self) -> Result<Vec<RecordInfo>> {
        let gaps = self.read(VMU_FILE, vmu_gap).await?;
        Ok(tally(gaps.into_iter().map(|g| g.record_phase))
            .into_iter()
            .map(|(record, count)| RecordInfo { record, count })
            .collect())
    }
}

#[async_trait]
impl ReplayStore for FileStore {
    async fn list_replays(&self, selection: &Selection) -> Result<Listing<Replay>> {
        let replays = self.read(REPLAY_FILE, replay).await?;
        let (total, data) = selection.apply(&replays);
        Ok(Listing::new(total, data))
    }

    async fn fetch_replay(&self, id: i64) -> Result<Replay> {
        self.read(REPLAY_FILE, replay)
            .await?
            .into_iter()
            .find(|r| r.id == id)
            .ok_or(StoreError::Empty)
    }

    async fn workflow(&self) -> Result<Workflow> {
        Err(StoreError::NotImplemented("replay workflow"))
    }

    /// Status names found in the replay file, alphabetically. Flat files
    /// carry no stage ids or ordinals, so both are reported as zero.
    async fn list_status_info(&self) -> Result<Vec<StatusInfo>> {
        let replays = self.read(REPLAY_FILE, replay).await?;
        Ok(tally(replays.into_iter().map(|r| r.status))
            .into_iter()
            .map(|(name, count)| StatusInfo {
                id: 0,
                name,
                workflow: 0,
                count,
            })
            .collect())
    }
}

#[async_trait]
impl ConfigStore for FileStore {
    async fn list_variables(&self) -> Result<Vec<Variable>> {
        self.read(VARIABLE_FILE, variable).await
    }

    async fn fetch_variable(&self, id: i64) -> Result<Variable> {
        self.read(VARIABLE_FILE, variable)
            .await?
            .into_iter()
            .find(|v| v.id == id)
            .ok_or(StoreError::Empty)
    }
}

#[async_trait]
impl StatsStore for FileStore {
    async fn summary(&self) -> Result<Summary> {
        let today = start_of_day(Utc::now());

        let requests = self.read(REPLAY_FILE, replay).await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "replay count failed, reporting zero");
            Vec::new()
        });
        let hrd = self.read(HRD_FILE, hrd_gap).await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "hrd gap count failed, reporting zero");
            Vec::new()
        });
        let vmu = self.read(VMU_FILE, vmu_gap).await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "vmu gap count failed, reporting zero");
            Vec::new()
        });

        let count = |n: usize| n as i64;
        let pending: Vec<&Replay> = requests.iter().filter(|r| r.cancellable).collect();
        Ok(Summary {
            requests: count(requests.iter().filter(|r| r.registered_at >= today).count()),
            pending: count(pending.len()),
            pending_time: pending.iter().filter_map(|r| r.period.seconds()).sum(),
            hrd: count(hrd.iter().filter(|g| g.gap.detected_at >= today).count()),
            vmu: count(vmu.iter().filter(|g| g.gap.detected_at >= today).count()),
        })
    }

    async fn item_counts(&self, since: DateTime<Utc>) -> Result<Vec<ItemCount>> {
        let hrd = self.read(HRD_FILE, hrd_gap).await?;
        let vmu = self.read(VMU_FILE, vmu_gap).await?;
        Ok(tally_items(
            hrd.iter().filter(|g| g.gap.detected_at >= since),
            vmu.iter().filter(|g| g.gap.detected_at >= since),
        ))
    }
}
