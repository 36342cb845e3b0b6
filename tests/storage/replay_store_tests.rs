//! ReplayStore interface tests.
//!
//! These tests verify the contract of the ReplayStore trait, both directly
//! and through the replay lifecycle built on top of it. Every test creates
//! its own replays, so they can run in any order against one store.

use std::sync::Arc;

use gapkeeper::interfaces::{ReplayStore, StatsStore, StoreError};
use gapkeeper::model::{Period, ReplayDraft, Stage};
use gapkeeper::query::{Criteria, OrderDirection, OrderPolicy, Scope, Selection};
use gapkeeper::services::ReplayLifecycle;

use super::{at, select};

/// Create a test draft covering the first hours of 2024-03-01.
pub fn make_draft(comment: &str) -> ReplayDraft {
    ReplayDraft {
        period: Period::between(at(1, 0), at(1, 6)),
        priority: 1,
        comment: comment.to_string(),
        automatic: false,
    }
}

fn lifecycle<S: ReplayStore>(store: &Arc<S>) -> ReplayLifecycle<S> {
    ReplayLifecycle::new(Arc::clone(store), OrderPolicy::default())
}

async fn replay_total<S: ReplayStore>(store: &S) -> i64 {
    store
        .list_replays(&Selection::all(Scope::Replay, &OrderPolicy::default()))
        .await
        .expect("list should succeed")
        .total
}

async fn history_total<S: ReplayStore>(store: &S) -> i64 {
    store
        .list_status_info()
        .await
        .expect("status info should load")
        .iter()
        .map(|s| s.count)
        .sum()
}

// =============================================================================
// Workflow
// =============================================================================

pub async fn test_workflow_extremes<S: ReplayStore>(store: &Arc<S>) {
    let workflow = store.workflow().await.expect("workflow should load");
    assert_eq!(workflow.initial().name, "pending");
    assert_eq!(workflow.cancelled().name, "cancelled");
    assert!(workflow.initial().workflow < workflow.cancelled().workflow);
}

// =============================================================================
// Register
// =============================================================================

pub async fn test_register_starts_at_initial<S: ReplayStore>(store: &Arc<S>) {
    let replay = lifecycle(store)
        .register(&make_draft("register"))
        .await
        .expect("register should succeed");

    assert_eq!(replay.status, "pending");
    assert!(replay.cancellable);
    assert_eq!(replay.comment, "register");
    assert_eq!(replay.period, Period::between(at(1, 0), at(1, 6)));
    assert_eq!(replay.corrupted, 0);
    assert_eq!(replay.missing, 0);

    let history = store
        .status_history(replay.id)
        .await
        .expect("history should load");
    assert_eq!(history.len(), 1, "exactly one initial status row");
    assert_eq!(history[0].replay_id, replay.id);
}

pub async fn test_register_invalid_period_writes_nothing<S: ReplayStore>(store: &Arc<S>) {
    let before = replay_total(store.as_ref()).await;

    let mut draft = make_draft("inverted");
    draft.period = Period::between(at(2, 0), at(1, 0));
    let err = lifecycle(store).register(&draft).await.unwrap_err();
    assert!(matches!(err, StoreError::Query(_)), "got {err:?}");

    assert_eq!(replay_total(store.as_ref()).await, before);
}

pub async fn test_register_is_atomic<S: ReplayStore>(store: &Arc<S>) {
    let replays = replay_total(store.as_ref()).await;
    let history = history_total(store.as_ref()).await;

    let unknown = Stage {
        id: 999,
        name: "unknown".into(),
        workflow: 1,
    };
    assert!(store
        .insert_replay(&make_draft("orphan"), &unknown)
        .await
        .is_err());

    assert_eq!(replay_total(store.as_ref()).await, replays, "no replay row left behind");
    assert_eq!(history_total(store.as_ref()).await, history, "no status row left behind");
}

// =============================================================================
// Cancel
// =============================================================================

pub async fn test_cancel_appends_terminal_status<S: ReplayStore>(store: &Arc<S>) {
    let lifecycle = lifecycle(store);
    let replay = lifecycle
        .register(&make_draft("to cancel"))
        .await
        .expect("register should succeed");

    let cancelled = lifecycle
        .cancel(replay.id, "operator cancelled")
        .await
        .expect("cancel should succeed");
    assert_eq!(cancelled.status, "cancelled");
    assert!(!cancelled.cancellable);

    let current = store
        .current_status(replay.id)
        .await
        .expect("status should load")
        .expect("replay has history");
    assert_eq!(current.text, "operator cancelled");

    let detail = lifecycle.detail(replay.id).await.expect("detail should load");
    assert_eq!(detail.status, "cancelled");
}

pub async fn test_double_cancel_rejected<S: ReplayStore>(store: &Arc<S>) {
    let lifecycle = lifecycle(store);
    let replay = lifecycle
        .register(&make_draft("double cancel"))
        .await
        .expect("register should succeed");
    lifecycle
        .cancel(replay.id, "first")
        .await
        .expect("first cancel should succeed");

    let err = lifecycle.cancel(replay.id, "second").await.unwrap_err();
    assert!(
        matches!(&err, StoreError::Query(msg) if msg == "replay job already cancelled"),
        "got {err:?}"
    );

    let history = store
        .status_history(replay.id)
        .await
        .expect("history should load");
    assert_eq!(history.len(), 2, "no row appended by the rejected cancel");
}

pub async fn test_append_same_ordinal_is_noop<S: ReplayStore>(store: &Arc<S>) {
    let workflow = store.workflow().await.expect("workflow should load");
    let replay = lifecycle(store)
        .register(&make_draft("same ordinal"))
        .await
        .expect("register should succeed");

    let cancelled = workflow.cancelled();
    assert!(store
        .append_status(replay.id, cancelled, "once")
        .await
        .expect("append should succeed"));
    assert!(!store
        .append_status(replay.id, cancelled, "twice")
        .await
        .expect("append should succeed"));
}

// =============================================================================
// Priority
// =============================================================================

pub async fn test_update_priority_round_trip<S: ReplayStore>(store: &Arc<S>) {
    let lifecycle = lifecycle(store);
    let replay = lifecycle
        .register(&make_draft("priority"))
        .await
        .expect("register should succeed");

    let updated = lifecycle
        .update_priority(replay.id, 42)
        .await
        .expect("update should succeed");
    assert_eq!(updated.priority, 42);
    assert_eq!(updated.status, "pending", "priority never touches status");

    let detail = store.fetch_replay(replay.id).await.expect("fetch should succeed");
    assert_eq!(detail.priority, 42);
}

// =============================================================================
// Missing replays
// =============================================================================

pub async fn test_missing_replay<S: ReplayStore>(store: &Arc<S>) {
    let missing = 999_999;
    let workflow = store.workflow().await.expect("workflow should load");

    assert!(matches!(
        store.fetch_replay(missing).await,
        Err(StoreError::Empty)
    ));
    assert!(matches!(
        store.update_priority(missing, 1).await,
        Err(StoreError::NotFound(_))
    ));
    assert!(matches!(
        store.append_status(missing, workflow.cancelled(), "").await,
        Err(StoreError::NotFound(_))
    ));
    assert!(matches!(
        store.status_history(missing).await,
        Err(StoreError::NotFound(_))
    ));
    assert!(matches!(
        lifecycle(store).cancel(missing, "").await,
        Err(StoreError::NotFound(_))
    ));
}

// =============================================================================
// Listing
// =============================================================================

pub async fn test_list_by_status<S: ReplayStore>(store: &Arc<S>) {
    let lifecycle = lifecycle(store);
    let kept = lifecycle
        .register(&make_draft("kept"))
        .await
        .expect("register should succeed");
    let dropped = lifecycle
        .register(&make_draft("dropped"))
        .await
        .expect("register should succeed");
    lifecycle
        .cancel(dropped.id, "")
        .await
        .expect("cancel should succeed");

    let criteria = Criteria {
        status: "cancelled".into(),
        order_field: "id".into(),
        order_direction: OrderDirection::Asc,
        ..Default::default()
    };
    let listing = store
        .list_replays(&select(criteria, Scope::Replay))
        .await
        .expect("list should succeed");

    let ids: Vec<i64> = listing.data.iter().map(|r| r.id).collect();
    assert!(ids.contains(&dropped.id));
    assert!(!ids.contains(&kept.id));
    assert!(listing.data.iter().all(|r| r.status == "cancelled"));
    assert!(ids.windows(2).all(|w| w[0] < w[1]), "ascending by id");
    assert_eq!(listing.total, ids.len() as i64);
}

pub async fn test_list_pagination<S: ReplayStore>(store: &Arc<S>) {
    let lifecycle = lifecycle(store);
    for n in 0..3 {
        lifecycle
            .register(&make_draft(&format!("page {n}")))
            .await
            .expect("register should succeed");
    }
    let total = replay_total(store.as_ref()).await;

    let criteria = Criteria {
        limit: 2,
        page_index: 0,
        ..Default::default()
    };
    let listing = store
        .list_replays(&select(criteria, Scope::Replay))
        .await
        .expect("list should succeed");
    assert_eq!(listing.total, total);
    assert_eq!(listing.data.len(), 2);
    assert!(listing.data[0].registered_at >= listing.data[1].registered_at);
}

pub async fn test_status_info_counts<S: ReplayStore>(store: &Arc<S>) {
    let before = store.list_status_info().await.expect("status info should load");
    lifecycle(store)
        .register(&make_draft("status info"))
        .await
        .expect("register should succeed");
    let after = store.list_status_info().await.expect("status info should load");

    assert_eq!(before.len(), after.len());
    assert_eq!(after[0].name, "pending");
    assert_eq!(after[0].count, before[0].count + 1);
    assert!(after.windows(2).all(|w| w[0].workflow <= w[1].workflow));
}

pub async fn test_summary_counts_today<S: ReplayStore + StatsStore>(store: &Arc<S>) {
    let before = store.summary().await.expect("summary should load");
    lifecycle(store)
        .register(&make_draft("summary"))
        .await
        .expect("register should succeed");
    let after = store.summary().await.expect("summary should load");

    assert_eq!(after.requests, before.requests + 1);
    assert_eq!(after.pending, before.pending + 1);
    assert_eq!(after.pending_time, before.pending_time + 6 * 3600);
}

pub async fn test_stage_counts_today<S: ReplayStore + StatsStore>(store: &Arc<S>) {
    let today = gapkeeper::storage::helpers::start_of_day(chrono::Utc::now());
    let pending = |counts: &[gapkeeper::model::StageCount]| {
        counts
            .iter()
            .filter(|c| c.status == "pending" && c.day == today)
            .map(|c| c.count)
            .sum::<i64>()
    };

    let before = store.stage_counts(today).await.expect("stage counts should load");
    lifecycle(store)
        .register(&make_draft("stage counts"))
        .await
        .expect("register should succeed");
    let after = store.stage_counts(today).await.expect("stage counts should load");

    assert_eq!(pending(&after), pending(&before) + 1);
    assert!(after.iter().all(|c| c.day >= today));
}

/// Run all ReplayStore tests against an `Arc`-wrapped store.
#[macro_export]
macro_rules! run_replay_store_tests {
    ($store:expr) => {
        use $crate::storage::replay_store_tests::*;

        test_workflow_extremes($store).await;
        println!("  test_workflow_extremes: PASSED");

        test_register_starts_at_initial($store).await;
        println!("  test_register_starts_at_initial: PASSED");

        test_register_invalid_period_writes_nothing($store).await;
        println!("  test_register_invalid_period_writes_nothing: PASSED");

        test_register_is_atomic($store).await;
        println!("  test_register_is_atomic: PASSED");

        test_cancel_appends_terminal_status($store).await;
        println!("  test_cancel_appends_terminal_status: PASSED");

        test_double_cancel_rejected($store).await;
        println!("  test_double_cancel_rejected: PASSED");

        test_append_same_ordinal_is_noop($store).await;
        println!("  test_append_same_ordinal_is_noop: PASSED");

        test_update_priority_round_trip($store).await;
        println!("  test_update_priority_round_trip: PASSED");

        test_missing_replay($store).await;
        println!("  test_missing_replay: PASSED");

        test_list_by_status($store).await;
        println!("  test_list_by_status: PASSED");

        test_list_pagination($store).await;
        println!("  test_list_pagination: PASSED");

        test_status_info_counts($store).await;
        println!("  test_status_info_counts: PASSED");

        test_summary_counts_today($store).await;
        println!("  test_summary_counts_today: PASSED");

        test_stage_counts_today($store).await;
        println!("  test_stage_counts_today: PASSED");
    };
}
