//! Gapkeeper - telemetry gap tracking and replay requests
//!
//! REST backend over detected HRD/VMU packet gaps and the replay requests
//! that reacquire the missing data. List requests are turned into typed
//! criteria, predicates and orderings by [`query`]; replay mutations go
//! through [`services::ReplayLifecycle`]; records live in one of the
//! [`storage`] backends chosen at startup.

pub mod api;
pub mod config;
pub mod interfaces;
pub mod model;
pub mod query;
pub mod services;
pub mod storage;
pub mod utils;
