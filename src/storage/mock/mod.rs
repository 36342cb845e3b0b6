//! In-memory storage for tests and local development.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::default_stages;
use super::helpers::{start_of_day, tally_items, tally_stages};
use crate::interfaces::{
    ConfigStore, GapStore, ReplayStore, Result, StatsStore, StoreError,
};
use crate::model::{
    ChannelInfo, HrdGap, ItemCount, Listing, Period, RecordInfo, Replay, ReplayDraft, SourceInfo,
    Stage, StageCount, StatusEntry, StatusInfo, Summary, Variable, VmuGap, Workflow,
};
use crate::query::Selection;

/// A replay as registered, before projection.
struct ReplayRow {
    id: i64,
    registered_at: DateTime<Utc>,
    period: Period,
    priority: i64,
    comment: String,
    automatic: bool,
}

/// One status history row with its insertion id.
struct JobRow {
    id: i64,
    entry: StatusEntry,
}

#[derive(Default)]
struct State {
    stages: Vec<Stage>,
    replays: BTreeMap<i64, ReplayRow>,
    jobs: Vec<JobRow>,
    hrd: Vec<HrdGap>,
    vmu: Vec<VmuGap>,
    variables: BTreeMap<i64, Variable>,
    next_replay: i64,
    next_job: i64,
    next_variable: i64,
}

impl State {
    fn ordinal(&self, stage_id: i64) -> Option<i64> {
        self.stages
            .iter()
            .find(|s| s.id == stage_id)
            .map(|s| s.workflow)
    }

    fn max_ordinal(&self) -> Option<i64> {
        self.stages.iter().map(|s| s.workflow).max()
    }

    /// Highest ordinal first, then latest timestamp, then latest insert.
    fn current_job(&self, replay_id: i64) -> Option<&JobRow> {
        self.jobs
            .iter()
            .filter(|j| j.entry.replay_id == replay_id)
            .max_by_key(|j| (self.ordinal(j.entry.status_id), j.entry.timestamp, j.id))
    }

    fn project(&self, row: &ReplayRow) -> Replay {
        let current = self.current_job(row.id);
        let status = current
            .and_then(|j| self.stages.iter().find(|s| s.id == j.entry.status_id))
            .map(|s| s.name.clone())
            .unwrap_or_default();
        let cancellable = match (current.and_then(|j| self.ordinal(j.entry.status_id)), self.max_ordinal()) {
            (Some(ordinal), Some(max)) => ordinal < max,
            _ => false,
        };

        let linked = self
            .hrd
            .iter()
            .map(|g| &g.gap)
            .chain(self.vmu.iter().map(|g| &g.gap))
            .filter(|g| g.replay_id == Some(row.id));
        let (corrupted, missing) = linked.fold((0, 0), |(c, m), g| {
            (c + i64::from(g.corrupted), m + i64::from(!g.completed))
        });

        Replay {
            id: row.id,
            registered_at: row.registered_at,
            period: row.period,
            priority: row.priority,
            comment: row.comment.clone(),
            status,
            automatic: row.automatic,
            cancellable,
            corrupted,
            missing,
        }
    }

    fn require_replay(&self, id: i64) -> Result<&ReplayRow> {
        self.replays
            .get(&id)
            .ok_or_else(|| StoreError::NotFound(format!("replay {id}")))
    }

    fn push_job(&mut self, replay_id: i64, stage: &Stage, text: &str) {
        self.next_job += 1;
        self.jobs.push(JobRow {
            id: self.next_job,
            entry: StatusEntry {
                timestamp: Utc::now(),
                replay_id,
                status_id: stage.id,
                text: text.to_string(),
            },
        });
    }
}

/// Store backed by process memory.
///
/// Every mutation runs under one write lock, so each call is atomic.
pub struct MemoryStore {
    state: RwLock<State>,
    fail_on_write: RwLock<bool>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Empty store seeded with the default workflow stages.
    pub fn new() -> Self {
        Self::with_stages(default_stages())
    }

    pub fn with_stages(stages: Vec<Stage>) -> Self {
        Self {
            state: RwLock::new(State {
                stages,
                ..Default::default()
            }),
            fail_on_write: RwLock::new(false),
        }
    }

    /// Make every subsequent mutation fail before touching state.
    pub async fn set_fail_on_write(&self, fail: bool) {
        *self.fail_on_write.write().await = fail;
    }

    pub async fn add_hrd_gap(&self, gap: HrdGap) {
        self.state.write().await.hrd.push(gap);
    }

    pub async fn add_vmu_gap(&self, gap: VmuGap) {
        self.state.write().await.vmu.push(gap);
    }

    pub async fn replay_count(&self) -> usize {
        self.state.read().await.replays.len()
    }

    pub async fn history_count(&self) -> usize {
        self.state.read().await.jobs.len()
    }

    async fn check_writable(&self) -> Result<()> {
        if *self.fail_on_write.read().await {
            return Err(StoreError::Internal("write failure injected".to_string()));
        }
        Ok(())
    }
}

fn count_by<K: Ord, T>(items: &[T], key: impl Fn(&T) -> K) -> BTreeMap<K, i64> {
    let mut counts = BTreeMap::new();
    for item in items {
        *counts.entry(key(item)).or_insert(0) += 1;
    }
    counts
}

#[async_trait]
impl GapStore for MemoryStore {
    async fn list_hrd_gaps(&self, selection: &Selection) -> Result<Listing<HrdGap>> {
        let state = self.state.read().await;
        let (total, data) = selection.apply(&state.hrd);
        Ok(Listing::new(total, data))
    }

    async fn fetch_hrd_gap(&self, id: i64) -> Result<HrdGap> {
        let state = self.state.read().await;
        state
            .hrd
            .iter()
            .find(|g| g.gap.id == id)
            .cloned()
            .ok_or(StoreError::Empty)
    }

    async fn list_vmu_gaps(&self, selection: &Selection) -> Result<Listing<VmuGap>> {
        let state = self.state.read().await;
        let (total, data) = selection.apply(&state.vmu);
        Ok(Listing::new(total, data))
    }

    async fn fetch_vmu_gap(&self, id: i64) -> Result<VmuGap> {
        let state = self.state.read().await;
        state
            .vmu
            .iter()
            .find(|g| g.gap.id == id)
            .cloned()
            .ok_or(StoreError::Empty)
    }

    async fn list_channels(&self) -> Result<Vec<ChannelInfo>> {
        let state = self.state.read().await;
        Ok(count_by(&state.hrd, |g| g.channel.clone())
            .into_iter()
            .map(|(channel, count)| ChannelInfo { channel, count })
            .collect())
    }

    async fn list_sources(&self) -> Result<Vec<SourceInfo>> {
        let state = self.state.read().await;
        Ok(count_by(&state.vmu, |g| g.source)
            .into_iter()
            .map(|(source, count)| SourceInfo { source, count })
            .collect())
    }

    async fn list_records(&self) -> Result<Vec<RecordInfo>> {
        let state = self.state.read().await;
        Ok(count_by(&state.vmu, |g| g.record_phase.clone())
            .into_iter()
            .map(|(record, count)| RecordInfo { record, count })
            .collect())
    }
}

#[async_trait]
impl ReplayStore for MemoryStore {
    async fn list_replays(&self, selection: &Selection) -> Result<Listing<Replay>> {
        let state = self.state.read().await;
        let projections: Vec<Replay> = state.replays.values().map(|r| state.project(r)).collect();
        let (total, data) = selection.apply(&projections);
        Ok(Listing::new(total, data))
    }

    async fn fetch_replay(&self, id: i64) -> Result<Replay> {
        let state = self.state.read().await;
        state
            .replays
            .get(&id)
            .map(|r| state.project(r))
            .ok_or(StoreError::Empty)
    }

    async fn workflow(&self) -> Result<Workflow> {
        let state = self.state.read().await;
        Workflow::new(state.stages.clone())
            .ok_or_else(|| StoreError::Internal("no workflow stages defined".to_string()))
    }

    async fn list_status_info(&self) -> Result<Vec<StatusInfo>> {
        let state = self.state.read().await;
        let counts = count_by(&state.jobs, |j| j.entry.status_id);
        let mut infos: Vec<StatusInfo> = state
            .stages
            .iter()
            .map(|s| StatusInfo {
                id: s.id,
                name: s.name.clone(),
                workflow: s.workflow,
                count: counts.get(&s.id).copied().unwrap_or(0),
            })
            .collect();
        infos.sort_by_key(|s| (s.workflow, s.id));
        Ok(infos)
    }

    async fn status_history(&self, id: i64) -> Result<Vec<StatusEntry>> {
        let state = self.state.read().await;
        state.require_replay(id)?;
        let mut rows: Vec<&JobRow> = state.jobs.iter().filter(|j| j.entry.replay_id == id).collect();
        rows.sort_by_key(|j| (j.entry.timestamp, j.id));
        Ok(rows.into_iter().map(|j| j.entry.clone()).collect())
    }

    async fn current_status(&self, id: i64) -> Result<Option<StatusEntry>> {
        let state = self.state.read().await;
        state.require_replay(id)?;
        Ok(state.current_job(id).map(|j| j.entry.clone()))
    }

    async fn insert_replay(&self, draft: &ReplayDraft, initial: &Stage) -> Result<i64> {
        self.check_writable().await?;
        let mut state = self.state.write().await;
        if state.ordinal(initial.id).is_none() {
            return Err(StoreError::Internal(format!("unknown stage {}", initial.id)));
        }

        state.next_replay += 1;
        let id = state.next_replay;
        state.replays.insert(
            id,
            ReplayRow {
                id,
                registered_at: Utc::now(),
                period: draft.period,
                priority: draft.priority,
                comment: draft.comment.clone(),
                automatic: draft.automatic,
            },
        );
        state.push_job(id, initial, &draft.comment);
        Ok(id)
    }

    async fn append_status(&self, id: i64, stage: &Stage, text: &str) -> Result<bool> {
        self.check_writable().await?;
        let mut state = self.state.write().await;
        state.require_replay(id)?;

        let current = state
            .current_job(id)
            .and_then(|j| state.ordinal(j.entry.status_id));
        if current == Some(stage.workflow) {
            return Ok(false);
        }
        state.push_job(id, stage, text);
        Ok(true)
    }

    async fn update_priority(&self, id: i64, priority: i64) -> Result<()> {
        self.check_writable().await?;
        let mut state = self.state.write().await;
        let row = state
            .replays
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("replay {id}")))?;
        row.priority = priority;
        Ok(())
    }
}

#[async_trait]
impl ConfigStore for MemoryStore {
    async fn list_variables(&self) -> Result<Vec<Variable>> {
        Ok(self.state.read().await.variables.values().cloned().collect())
    }

    async fn fetch_variable(&self, id: i64) -> Result<Variable> {
        self.state
            .read()
            .await
            .variables
            .get(&id)
            .cloned()
            .ok_or(StoreError::Empty)
    }

    async fn update_variable(&self, id: i64, value: &str) -> Result<()> {
        self.check_writable().await?;
        let mut state = self.state.write().await;
        let variable = state
            .variables
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("variable {id}")))?;
        variable.value = value.to_string();
        Ok(())
    }

    async fn insert_variable(&self, variable: &Variable) -> Result<i64> {
        self.check_writable().await?;
        let mut state = self.state.write().await;
        state.next_variable += 1;
        let id = state.next_variable;
        state.variables.insert(
            id,
            Variable {
                id,
                ..variable.clone()
            },
        );
        Ok(id)
    }
}

#[async_trait]
impl StatsStore for MemoryStore {
    async fn summary(&self) -> Result<Summary> {
        let state = self.state.read().await;
        let today = start_of_day(Utc::now());
        let count = |n: usize| n as i64;
        let pending: Vec<Replay> = state
            .replays
            .values()
            .map(|r| state.project(r))
            .filter(|r| r.cancellable)
            .collect();

        Ok(Summary {
            requests: count(
                state
                    .replays
                    .values()
                    .filter(|r| r.registered_at >= today)
                    .count(),
            ),
            pending: count(pending.len()),
            pending_time: pending.iter().filter_map(|r| r.period.seconds()).sum(),
            hrd: count(state.hrd.iter().filter(|g| g.gap.detected_at >= today).count()),
            vmu: count(state.vmu.iter().filter(|g| g.gap.detected_at >= today).count()),
        })
    }

    async fn item_counts(&self, since: DateTime<Utc>) -> Result<Vec<ItemCount>> {
        let state = self.state.read().await;
        Ok(tally_items(
            state.hrd.iter().filter(|g| g.gap.detected_at >= since),
            state.vmu.iter().filter(|g| g.gap.detected_at >= since),
        ))
    }

    async fn stage_counts(&self, since: DateTime<Utc>) -> Result<Vec<StageCount>> {
        let state = self.state.read().await;
        let rows = state
            .jobs
            .iter()
            .filter(|j| j.entry.timestamp >= since)
            .filter_map(|j| {
                state
                    .stages
                    .iter()
                    .find(|s| s.id == j.entry.status_id)
                    .map(|s| (j.entry.timestamp, s.name.clone()))
            });
        Ok(tally_stages(rows))
    }
}

#[cfg(test)]
mod tests;
