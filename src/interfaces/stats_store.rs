//! Auxiliary statistics interface.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::error::{Result, StoreError};
use crate::model::{ItemCount, StageCount, Summary};

#[async_trait]
pub trait StatsStore: Send + Sync {
    /// Today's activity counters.
    ///
    /// Individual counters fall back to zero when their query fails; this
    /// is the only place a storage failure is not propagated.
    async fn summary(&self) -> Result<Summary>;

    /// Gaps detected since `since`, per day and origin.
    async fn item_counts(&self, _since: DateTime<Utc>) -> Result<Vec<ItemCount>> {
        Err(StoreError::NotImplemented("item statistics"))
    }

    /// Status history rows recorded since `since`, per day and stage.
    async fn stage_counts(&self, _since: DateTime<Utc>) -> Result<Vec<StageCount>> {
        Err(StoreError::NotImplemented("replay statistics"))
    }
}
