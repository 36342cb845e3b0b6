use chrono::TimeZone;

use super::*;
use crate::model::Gap;
use crate::query::{Criteria, OrderPolicy, Scope};

fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap()
}

fn gap(id: i64, replay_id: Option<i64>, corrupted: bool, completed: bool) -> Gap {
    Gap {
        id,
        detected_at: at(id as u32),
        range_start: at(0),
        first_sequence: 0,
        range_end: at(1),
        last_sequence: 100,
        replay_id,
        corrupted,
        completed,
    }
}

fn draft() -> ReplayDraft {
    ReplayDraft {
        period: Period::between(at(0), at(1)),
        priority: 1,
        comment: "test".into(),
        automatic: true,
    }
}

#[tokio::test]
async fn test_projection_counts_linked_gaps() {
    let store = MemoryStore::new();
    let workflow = store.workflow().await.unwrap();
    let id = store.insert_replay(&draft(), workflow.initial()).await.unwrap();

    store
        .add_hrd_gap(HrdGap {
            gap: gap(1, Some(id), true, false),
            channel: "vc1".into(),
        })
        .await;
    store
        .add_vmu_gap(VmuGap {
            gap: gap(2, Some(id), false, true),
            source: 3,
            record_phase: "science".into(),
        })
        .await;
    store
        .add_hrd_gap(HrdGap {
            gap: gap(3, None, true, false),
            channel: "vc1".into(),
        })
        .await;

    let replay = store.fetch_replay(id).await.unwrap();
    assert_eq!(replay.corrupted, 1);
    assert_eq!(replay.missing, 1);
    assert!(replay.automatic);
}

#[tokio::test]
async fn test_status_info_counts_history_rows() {
    let store = MemoryStore::new();
    let workflow = store.workflow().await.unwrap();
    let a = store.insert_replay(&draft(), workflow.initial()).await.unwrap();
    store.insert_replay(&draft(), workflow.initial()).await.unwrap();
    store.append_status(a, workflow.cancelled(), "stop").await.unwrap();

    let infos = store.list_status_info().await.unwrap();
    assert_eq!(infos.len(), workflow.stages().len());
    assert_eq!(infos.first().unwrap().count, 2);
    assert_eq!(infos.last().unwrap().count, 1);
    assert!(infos[1..infos.len() - 1].iter().all(|s| s.count == 0));
}

#[tokio::test]
async fn test_append_same_ordinal_is_noop() {
    let store = MemoryStore::new();
    let workflow = store.workflow().await.unwrap();
    let id = store.insert_replay(&draft(), workflow.initial()).await.unwrap();

    assert!(!store.append_status(id, workflow.initial(), "again").await.unwrap());
    assert_eq!(store.history_count().await, 1);
}

#[tokio::test]
async fn test_failed_write_leaves_priority_untouched() {
    let store = MemoryStore::new();
    let workflow = store.workflow().await.unwrap();
    let id = store.insert_replay(&draft(), workflow.initial()).await.unwrap();

    store.set_fail_on_write(true).await;
    assert!(store.update_priority(id, 9).await.is_err());
    assert_eq!(store.fetch_replay(id).await.unwrap().priority, 1);
}

#[tokio::test]
async fn test_list_hrd_applies_selection() {
    let store = MemoryStore::new();
    for id in 1..=4 {
        store
            .add_hrd_gap(HrdGap {
                gap: gap(id, None, id == 2, false),
                channel: if id % 2 == 0 { "vc2" } else { "vc1" }.into(),
            })
            .await;
    }

    let selection =
        Selection::new(&Criteria::default(), Scope::HrdGap, &OrderPolicy::default()).unwrap();
    let listing = store.list_hrd_gaps(&selection).await.unwrap();
    assert_eq!(listing.total, 3);
    let ids: Vec<i64> = listing.data.iter().map(|g| g.gap.id).collect();
    assert_eq!(ids, vec![4, 3, 1]);

    let channels = store.list_channels().await.unwrap();
    assert_eq!(
        channels,
        vec![
            ChannelInfo { channel: "vc1".into(), count: 2 },
            ChannelInfo { channel: "vc2".into(), count: 2 },
        ]
    );
}

#[tokio::test]
async fn test_summary_counts_today_and_open_replays() {
    let store = MemoryStore::new();
    let workflow = store.workflow().await.unwrap();
    let a = store.insert_replay(&draft(), workflow.initial()).await.unwrap();
    store.insert_replay(&draft(), workflow.initial()).await.unwrap();
    store.append_status(a, workflow.cancelled(), "").await.unwrap();

    let mut recent = gap(1, None, false, false);
    recent.detected_at = Utc::now();
    store
        .add_vmu_gap(VmuGap {
            gap: recent,
            source: 1,
            record_phase: "hk".into(),
        })
        .await;
    store
        .add_hrd_gap(HrdGap {
            gap: gap(2, None, false, false),
            channel: "vc1".into(),
        })
        .await;

    let summary = store.summary().await.unwrap();
    assert_eq!(summary.requests, 2);
    assert_eq!(summary.pending, 1);
    assert_eq!(summary.pending_time, 3600);
    assert_eq!(summary.hrd, 0);
    assert_eq!(summary.vmu, 1);
}

#[tokio::test]
async fn test_insert_with_unknown_stage_leaves_no_trace() {
    let store = MemoryStore::new();
    let bogus = Stage {
        id: 999,
        name: "bogus".into(),
        workflow: 1,
    };

    assert!(store.insert_replay(&draft(), &bogus).await.is_err());
    assert_eq!(store.history_count().await, 0);
    let all = Selection::new(&Criteria::default(), Scope::Replay, &OrderPolicy::default()).unwrap();
    assert_eq!(store.list_replays(&all).await.unwrap().total, 0);
}

#[tokio::test]
async fn test_item_counts_respect_window() {
    let store = MemoryStore::new();
    for id in 1..=3 {
        store
            .add_hrd_gap(HrdGap {
                gap: gap(id, None, false, false),
                channel: "vc1".into(),
            })
            .await;
    }

    let counts = store.item_counts(at(2)).await.unwrap();
    assert_eq!(counts.len(), 1);
    assert_eq!(counts[0].count, 2);
    assert_eq!(counts[0].duration, 2 * 3600);

    assert!(store.item_counts(at(4)).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_stage_counts_name_each_stage() {
    let store = MemoryStore::new();
    let workflow = store.workflow().await.unwrap();
    let a = store.insert_replay(&draft(), workflow.initial()).await.unwrap();
    store.insert_replay(&draft(), workflow.initial()).await.unwrap();
    store.append_status(a, workflow.cancelled(), "").await.unwrap();

    let since = start_of_day(Utc::now());
    let counts = store.stage_counts(since).await.unwrap();
    let by_status: Vec<(&str, i64)> = counts.iter().map(|c| (c.status.as_str(), c.count)).collect();
    assert_eq!(by_status, vec![("cancelled", 1), ("pending", 2)]);

    let tomorrow = since + chrono::TimeDelta::days(1);
    assert!(store.stage_counts(tomorrow).await.unwrap().is_empty());
}
