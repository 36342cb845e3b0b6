//! Replay request lifecycle.
//!
//! A replay starts at the workflow stage with the lowest ordinal and can be
//! cancelled, which appends a history row at the highest ordinal. Priority
//! can change at any time and never touches the status history.

use std::sync::Arc;

use tracing::{info, warn};

use crate::interfaces::{ReplayStore, Result, StoreError};
use crate::model::{Listing, Replay, ReplayDraft, StatusEntry, StatusInfo};
use crate::query::{Criteria, OrderPolicy, Scope, Selection};

/// Enforces the replay state machine on top of a [`ReplayStore`].
pub struct ReplayLifecycle<S: ReplayStore + ?Sized> {
    store: Arc<S>,
    policy: OrderPolicy,
}

impl<S: ReplayStore + ?Sized> Clone for ReplayLifecycle<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            policy: self.policy.clone(),
        }
    }
}

impl<S: ReplayStore + ?Sized> ReplayLifecycle<S> {
    pub fn new(store: Arc<S>, policy: OrderPolicy) -> Self {
        Self { store, policy }
    }

    /// Count and fetch the replays matching `criteria`.
    pub async fn list(&self, criteria: &Criteria) -> Result<Listing<Replay>> {
        let selection = Selection::new(criteria, Scope::Replay, &self.policy)?;
        self.store.list_replays(&selection).await
    }

    /// Fetch one replay. Backends without detail support report
    /// `NotImplemented`.
    pub async fn detail(&self, id: i64) -> Result<Replay> {
        self.store.fetch_replay(id).await
    }

    pub async fn history(&self, id: i64) -> Result<Vec<StatusEntry>> {
        self.store.status_history(id).await
    }

    pub async fn statuses(&self) -> Result<Vec<StatusInfo>> {
        self.store.list_status_info().await
    }

    /// Register a new replay at the initial workflow stage.
    pub async fn register(&self, draft: &ReplayDraft) -> Result<Replay> {
        if !draft.period.is_valid() {
            return Err(StoreError::Query("invalid period".to_string()));
        }
        let workflow = self.store.workflow().await?;
        let initial = workflow.initial();

        let id = self.store.insert_replay(draft, initial).await?;
        info!(replay_id = id, status = %initial.name, "replay registered");

        self.store.fetch_replay(id).await
    }

    /// Cancel a replay unless it is already cancelled.
    pub async fn cancel(&self, id: i64, comment: &str) -> Result<Replay> {
        let workflow = self.store.workflow().await?;
        let cancelled = workflow.cancelled();

        let current = self.store.current_status(id).await?;
        if current.is_some_and(|s| workflow.is_terminal(s.status_id)) {
            warn!(replay_id = id, "cancellation rejected: already cancelled");
            return Err(already_cancelled());
        }

        // The store re-checks under its own transaction; a concurrent
        // cancellation that won the race surfaces here.
        if !self.store.append_status(id, cancelled, comment).await? {
            warn!(replay_id = id, "cancellation rejected: cancelled concurrently");
            return Err(already_cancelled());
        }
        info!(replay_id = id, "replay cancelled");

        self.store.fetch_replay(id).await
    }

    /// Change the priority of a replay.
    pub async fn update_priority(&self, id: i64, priority: i64) -> Result<Replay> {
        self.store.update_priority(id, priority).await?;
        info!(replay_id = id, priority, "replay priority updated");

        self.store.fetch_replay(id).await
    }
}

fn already_cancelled() -> StoreError {
    StoreError::Query("replay job already cancelled".to_string())
}
