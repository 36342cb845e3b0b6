//! Database schema definitions using sea-query.
//!
//! These define the table and column identifiers for type-safe query building.
//! The DDL itself lives in `migrations/{sqlite,postgres}`.

use sea_query::Iden;

/// Replay requests as registered.
#[derive(Iden)]
pub enum Replay {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "timestamp"]
    Timestamp,
    #[iden = "startdate"]
    Startdate,
    #[iden = "enddate"]
    Enddate,
    #[iden = "priority"]
    Priority,
    #[iden = "comment"]
    Comment,
    #[iden = "automatic"]
    Automatic,
}

/// Projection of `replay` with derived status and gap counters.
#[derive(Iden)]
pub enum ReplayList {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "timestamp"]
    Timestamp,
    #[iden = "startdate"]
    Startdate,
    #[iden = "enddate"]
    Enddate,
    #[iden = "priority"]
    Priority,
    #[iden = "comment"]
    Comment,
    #[iden = "status"]
    Status,
    #[iden = "automatic"]
    Automatic,
    #[iden = "cancellable"]
    Cancellable,
    #[iden = "corrupted"]
    Corrupted,
    #[iden = "missing"]
    Missing,
}

/// Append-only status history.
#[derive(Iden)]
pub enum ReplayJob {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "timestamp"]
    Timestamp,
    #[iden = "replay_id"]
    ReplayId,
    #[iden = "replay_status_id"]
    ReplayStatusId,
    #[iden = "text"]
    Text,
}

/// Workflow stages.
#[derive(Iden)]
pub enum ReplayStatus {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "name"]
    Name,
    #[iden = "workflow"]
    Workflow,
}

/// Columns shared by `hrd_packet_gap` and `vmu_packet_gap`.
#[derive(Clone, Copy, Iden)]
pub enum PacketGap {
    #[iden = "hrd_packet_gap"]
    Hrd,
    #[iden = "vmu_packet_gap"]
    Vmu,
    #[iden = "id"]
    Id,
    #[iden = "timestamp"]
    Timestamp,
    #[iden = "last_timestamp"]
    LastTimestamp,
    #[iden = "last_sequence_count"]
    LastSequenceCount,
    #[iden = "next_timestamp"]
    NextTimestamp,
    #[iden = "next_sequence_count"]
    NextSequenceCount,
    #[iden = "replay_id"]
    ReplayId,
    #[iden = "corrupted"]
    Corrupted,
    #[iden = "completed"]
    Completed,
    #[iden = "channel"]
    Channel,
    #[iden = "source"]
    Source,
    #[iden = "phase"]
    Phase,
}

/// Configuration variables.
#[derive(Iden)]
pub enum Variable {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "name"]
    Name,
    #[iden = "value"]
    Value,
    #[iden = "allowed"]
    Allowed,
    #[iden = "hazardous"]
    Hazardous,
}
