//! Abstract interfaces for gapkeeper components.
//!
//! These traits define the contracts for:
//! - Gap storage (HRD / VMU listings and details)
//! - Replay storage (projections, status history, atomic mutations)
//! - Configuration variables
//! - Auxiliary statistics
//!
//! Backends implement all four and are used through [`Store`].

pub mod config_store;
pub mod error;
pub mod gap_store;
pub mod replay_store;
pub mod stats_store;

pub use config_store::ConfigStore;
pub use error::{ErrorKind, Result, StoreError};
pub use gap_store::GapStore;
pub use replay_store::ReplayStore;
pub use stats_store::StatsStore;

/// Umbrella capability implemented by every storage backend.
pub trait Store: GapStore + ReplayStore + ConfigStore + StatsStore {}

impl<T> Store for T where T: GapStore + ReplayStore + ConfigStore + StatsStore {}
