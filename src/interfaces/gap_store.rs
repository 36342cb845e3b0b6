//! Gap storage interface.

use async_trait::async_trait;

use super::error::{Result, StoreError};
use crate::model::{ChannelInfo, HrdGap, Listing, RecordInfo, SourceInfo, VmuGap};
use crate::query::Selection;

/// Read access to detected HRD and VMU gaps.
///
/// Implementations:
/// - `SqlStore`: SQLite / PostgreSQL
/// - `FileStore`: tab-separated exports
/// - `MemoryStore`: in-memory, for tests
#[async_trait]
pub trait GapStore: Send + Sync {
    /// Count and fetch one page of HRD gaps.
    async fn list_hrd_gaps(&self, selection: &Selection) -> Result<Listing<HrdGap>>;

    async fn fetch_hrd_gap(&self, _id: i64) -> Result<HrdGap> {
        Err(StoreError::NotImplemented("hrd gap detail"))
    }

    /// Count and fetch one page of VMU gaps.
    async fn list_vmu_gaps(&self, selection: &Selection) -> Result<Listing<VmuGap>>;

    async fn fetch_vmu_gap(&self, _id: i64) -> Result<VmuGap> {
        Err(StoreError::NotImplemented("vmu gap detail"))
    }

    /// HRD channels with their gap totals.
    async fn list_channels(&self) -> Result<Vec<ChannelInfo>>;

    /// VMU sources with their gap totals.
    async fn list_sources(&self) -> Result<Vec<SourceInfo>>;

    /// VMU record phases with their gap totals.
    async fn list_records(&self) -> Result<Vec<RecordInfo>>;
}
