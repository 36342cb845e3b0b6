//! GapStore interface tests.
//!
//! These tests verify the contract of the GapStore trait against the
//! fixture gaps from `super::hrd_gaps` and `super::vmu_gaps`.

use gapkeeper::interfaces::{GapStore, StatsStore, StoreError};
use gapkeeper::model::{ChannelInfo, Period, RecordInfo, SourceInfo};
use gapkeeper::query::{Criteria, OrderDirection, Scope};

use super::{at, everything, select};

fn hrd_ids(listing: &gapkeeper::model::Listing<gapkeeper::model::HrdGap>) -> Vec<i64> {
    listing.data.iter().map(|g| g.gap.id).collect()
}

fn vmu_ids(listing: &gapkeeper::model::Listing<gapkeeper::model::VmuGap>) -> Vec<i64> {
    listing.data.iter().map(|g| g.gap.id).collect()
}

// =============================================================================
// HRD listings
// =============================================================================

pub async fn test_hrd_defaults_exclude_flagged<S: GapStore>(store: &S) {
    let listing = store
        .list_hrd_gaps(&select(Criteria::default(), Scope::HrdGap))
        .await
        .expect("list should succeed");

    assert_eq!(listing.total, 3);
    assert_eq!(hrd_ids(&listing), vec![5, 4, 1], "newest first by default");
}

pub async fn test_hrd_flags_admit_everything<S: GapStore>(store: &S) {
    let listing = store
        .list_hrd_gaps(&select(everything(), Scope::HrdGap))
        .await
        .expect("list should succeed");

    assert_eq!(listing.total, 5);
    assert_eq!(listing.data.len(), 5);
}

pub async fn test_hrd_channel_and_period<S: GapStore>(store: &S) {
    let criteria = Criteria {
        period: Period::between(at(1, 2), at(1, 23)),
        channel: "vc1".into(),
        ..everything()
    };
    let listing = store
        .list_hrd_gaps(&select(criteria, Scope::HrdGap))
        .await
        .expect("list should succeed");

    assert_eq!(hrd_ids(&listing), vec![4, 3]);
    assert!(listing.data.iter().all(|g| g.channel == "vc1"));
}

pub async fn test_hrd_only_end_bound<S: GapStore>(store: &S) {
    let criteria = Criteria {
        period: Period::new(None, Some(at(1, 2))),
        ..everything()
    };
    let listing = store
        .list_hrd_gaps(&select(criteria, Scope::HrdGap))
        .await
        .expect("list should succeed");

    // Inclusive upper bound.
    assert_eq!(hrd_ids(&listing), vec![2, 1]);
}

pub async fn test_hrd_only_start_bound<S: GapStore>(store: &S) {
    let criteria = Criteria {
        period: Period::new(Some(at(1, 4)), None),
        ..everything()
    };
    let listing = store
        .list_hrd_gaps(&select(criteria, Scope::HrdGap))
        .await
        .expect("list should succeed");

    assert_eq!(hrd_ids(&listing), vec![5, 4]);
}

pub async fn test_hrd_pagination<S: GapStore>(store: &S) {
    let criteria = Criteria {
        order_field: "id".into(),
        order_direction: OrderDirection::Asc,
        limit: 2,
        page_index: 1,
        ..everything()
    };
    let listing = store
        .list_hrd_gaps(&select(criteria, Scope::HrdGap))
        .await
        .expect("list should succeed");

    assert_eq!(listing.total, 5, "total ignores paging");
    assert_eq!(hrd_ids(&listing), vec![3, 4]);
}

pub async fn test_hrd_gap_fields<S: GapStore>(store: &S) {
    let gap = store.fetch_hrd_gap(3).await.expect("fetch should succeed");
    assert_eq!(gap.channel, "vc1");
    assert_eq!(gap.gap.detected_at, at(1, 3));
    assert_eq!(gap.gap.first_sequence, 300);
    assert_eq!(gap.gap.last_sequence, 350);
    assert!(gap.gap.completed);
    assert!(!gap.gap.corrupted);
    assert_eq!(gap.gap.replay_id, None);
}

pub async fn test_hrd_gap_missing<S: GapStore>(store: &S) {
    let err = store.fetch_hrd_gap(999).await.unwrap_err();
    assert!(matches!(err, StoreError::Empty), "got {err:?}");
}

pub async fn test_channels<S: GapStore>(store: &S) {
    let channels = store.list_channels().await.expect("list should succeed");
    assert_eq!(
        channels,
        vec![
            ChannelInfo { channel: "vc1".into(), count: 3 },
            ChannelInfo { channel: "vc2".into(), count: 2 },
        ]
    );
}

// =============================================================================
// VMU listings
// =============================================================================

pub async fn test_vmu_record_filter<S: GapStore>(store: &S) {
    let criteria = Criteria {
        record: "science".into(),
        corrupted: true,
        ..Default::default()
    };
    let listing = store
        .list_vmu_gaps(&select(criteria, Scope::VmuGap))
        .await
        .expect("list should succeed");

    assert_eq!(vmu_ids(&listing), vec![3, 1]);
    assert!(listing.data.iter().all(|g| g.record_phase == "science"));
}

pub async fn test_vmu_source_filter<S: GapStore>(store: &S) {
    let criteria = Criteria {
        source: "3".into(),
        ..Default::default()
    };
    let listing = store
        .list_vmu_gaps(&select(criteria, Scope::VmuGap))
        .await
        .expect("list should succeed");

    // Gap 3 also has source 3 but is corrupted.
    assert_eq!(vmu_ids(&listing), vec![4, 1]);
}

pub async fn test_vmu_gap_fields<S: GapStore>(store: &S) {
    let gap = store.fetch_vmu_gap(2).await.expect("fetch should succeed");
    assert_eq!(gap.source, 4);
    assert_eq!(gap.record_phase, "hk");

    let err = store.fetch_vmu_gap(999).await.unwrap_err();
    assert!(matches!(err, StoreError::Empty), "got {err:?}");
}

pub async fn test_sources_and_records<S: GapStore>(store: &S) {
    let sources = store.list_sources().await.expect("list should succeed");
    assert_eq!(
        sources,
        vec![
            SourceInfo { source: 3, count: 3 },
            SourceInfo { source: 4, count: 1 },
        ]
    );

    let records = store.list_records().await.expect("list should succeed");
    assert_eq!(
        records,
        vec![
            RecordInfo { record: "hk".into(), count: 2 },
            RecordInfo { record: "science".into(), count: 2 },
        ]
    );
}

// =============================================================================
// Statistics
// =============================================================================

pub async fn test_item_counts_per_day<S: StatsStore>(store: &S) {
    let counts = store
        .item_counts(at(1, 0))
        .await
        .expect("item counts should load");
    let rows: Vec<(u32, &str, &str, i64, i64)> = counts
        .iter()
        .map(|c| {
            use chrono::Datelike;
            (c.day.day(), c.label.as_str(), c.origin.as_str(), c.count, c.duration)
        })
        .collect();
    assert_eq!(
        rows,
        vec![
            (1, "hrd", "vc1", 3, 1800),
            (1, "hrd", "vc2", 1, 600),
            (1, "vmu", "3", 3, 1800),
            (1, "vmu", "4", 1, 600),
            (2, "hrd", "vc2", 1, 600),
        ]
    );

    let later = store
        .item_counts(at(2, 0))
        .await
        .expect("item counts should load");
    assert_eq!(later.len(), 1);
    assert_eq!(later[0].day, at(2, 0));
}

/// Run all GapStore tests against a store seeded with the fixture gaps.
#[macro_export]
macro_rules! run_gap_store_tests {
    ($store:expr) => {
        use $crate::storage::gap_store_tests::*;

        test_hrd_defaults_exclude_flagged($store).await;
        println!("  test_hrd_defaults_exclude_flagged: PASSED");

        test_hrd_flags_admit_everything($store).await;
        println!("  test_hrd_flags_admit_everything: PASSED");

        test_hrd_channel_and_period($store).await;
        println!("  test_hrd_channel_and_period: PASSED");

        test_hrd_only_end_bound($store).await;
        println!("  test_hrd_only_end_bound: PASSED");

        test_hrd_only_start_bound($store).await;
        println!("  test_hrd_only_start_bound: PASSED");

        test_hrd_pagination($store).await;
        println!("  test_hrd_pagination: PASSED");

        test_hrd_gap_fields($store).await;
        println!("  test_hrd_gap_fields: PASSED");

        test_hrd_gap_missing($store).await;
        println!("  test_hrd_gap_missing: PASSED");

        test_channels($store).await;
        println!("  test_channels: PASSED");

        test_vmu_record_filter($store).await;
        println!("  test_vmu_record_filter: PASSED");

        test_vmu_source_filter($store).await;
        println!("  test_vmu_source_filter: PASSED");

        test_vmu_gap_fields($store).await;
        println!("  test_vmu_gap_fields: PASSED");

        test_sources_and_records($store).await;
        println!("  test_sources_and_records: PASSED");

        test_item_counts_per_day($store).await;
        println!("  test_item_counts_per_day: PASSED");
    };
}
