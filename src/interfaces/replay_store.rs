//! Replay storage interface.

use async_trait::async_trait;

use super::error::{Result, StoreError};
use crate::model::{Listing, Replay, ReplayDraft, Stage, StatusEntry, StatusInfo, Workflow};
use crate::query::Selection;

/// Persistence primitives for replay requests and their status history.
///
/// The state machine itself lives in `ReplayLifecycle`; stores only
/// guarantee that each mutating call is atomic. Backends that cannot write
/// keep the default implementations, which report `NotImplemented`.
#[async_trait]
pub trait ReplayStore: Send + Sync {
    /// Count and fetch one page of replay projections.
    async fn list_replays(&self, selection: &Selection) -> Result<Listing<Replay>>;

    /// Fetch the projection of one replay. `Empty` if it does not exist.
    async fn fetch_replay(&self, _id: i64) -> Result<Replay> {
        Err(StoreError::NotImplemented("replay detail"))
    }

    /// Every workflow stage, ordered by ordinal.
    async fn workflow(&self) -> Result<Workflow>;

    /// Workflow stages with the number of history rows at each.
    async fn list_status_info(&self) -> Result<Vec<StatusInfo>>;

    /// Status history of a replay, oldest first.
    async fn status_history(&self, _id: i64) -> Result<Vec<StatusEntry>> {
        Err(StoreError::NotImplemented("replay status history"))
    }

    /// Current status of a replay: the history row with the highest
    /// workflow ordinal, latest timestamp first on ties. `None` when the
    /// replay has no history yet, `NotFound` when the replay does not exist.
    async fn current_status(&self, _id: i64) -> Result<Option<StatusEntry>> {
        Err(StoreError::NotImplemented("replay status"))
    }

    /// Insert a replay and its first history row at `initial` in one
    /// transaction. Returns the generated identity.
    async fn insert_replay(&self, _draft: &ReplayDraft, _initial: &Stage) -> Result<i64> {
        Err(StoreError::NotImplemented("replay registration"))
    }

    /// Append a history row at `stage` unless the replay's current status
    /// already has the same workflow ordinal. Returns whether a row was
    /// written. `NotFound` if the replay does not exist.
    async fn append_status(&self, _id: i64, _stage: &Stage, _text: &str) -> Result<bool> {
        Err(StoreError::NotImplemented("replay status update"))
    }

    /// Set the priority of a replay. `NotFound` if it does not exist.
    async fn update_priority(&self, _id: i64, _priority: i64) -> Result<()> {
        Err(StoreError::NotImplemented("replay priority update"))
    }
}
