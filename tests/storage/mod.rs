//! Shared storage integration tests.
//!
//! Tests the GapStore, ReplayStore, ConfigStore and StatsStore interfaces
//! against all implementations. Each backend test binary seeds the fixture
//! gaps below, then runs these test functions through the `run_*_tests!`
//! macros.

#![allow(dead_code)]

pub mod config_store_tests;
pub mod gap_store_tests;
pub mod replay_store_tests;

use chrono::{DateTime, TimeZone, Utc};

use gapkeeper::model::{Gap, HrdGap, VmuGap};
use gapkeeper::query::{Criteria, OrderPolicy, Scope, Selection};

/// 2024-03-`day` at `hour`:00 UTC.
pub fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
}

fn gap(id: i64, detected_at: DateTime<Utc>, corrupted: bool, completed: bool) -> Gap {
    Gap {
        id,
        detected_at,
        range_start: detected_at - chrono::Duration::minutes(30),
        first_sequence: id * 100,
        range_end: detected_at - chrono::Duration::minutes(20),
        last_sequence: id * 100 + 50,
        replay_id: None,
        corrupted,
        completed,
    }
}

/// HRD fixture: ids 1, 4 and 5 are neither corrupted nor completed.
pub fn hrd_gaps() -> Vec<HrdGap> {
    [
        (1, at(1, 1), false, false, "vc1"),
        (2, at(1, 2), true, false, "vc2"),
        (3, at(1, 3), false, true, "vc1"),
        (4, at(1, 4), false, false, "vc1"),
        (5, at(2, 5), false, false, "vc2"),
    ]
    .into_iter()
    .map(|(id, t, corrupted, completed, channel)| HrdGap {
        gap: gap(id, t, corrupted, completed),
        channel: channel.to_string(),
    })
    .collect()
}

/// VMU fixture: id 3 is the only corrupted gap.
pub fn vmu_gaps() -> Vec<VmuGap> {
    [
        (1, at(1, 1), false, 3, "science"),
        (2, at(1, 2), false, 4, "hk"),
        (3, at(1, 3), true, 3, "science"),
        (4, at(1, 4), false, 3, "hk"),
    ]
    .into_iter()
    .map(|(id, t, corrupted, source, phase)| VmuGap {
        gap: gap(id, t, corrupted, false),
        source,
        record_phase: phase.to_string(),
    })
    .collect()
}

pub fn select(criteria: Criteria, scope: Scope) -> Selection {
    Selection::new(&criteria, scope, &OrderPolicy::default()).expect("valid selection")
}

/// Criteria admitting corrupted and completed records.
pub fn everything() -> Criteria {
    Criteria {
        corrupted: true,
        completed: true,
        ..Default::default()
    }
}
