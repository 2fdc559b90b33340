//! Data access for the oddsgap backtester.
//!
//! This crate provides:
//! - A `PostgreSQL` snapshot store for raw per-event probability/quote rows
//! - Event metadata queries (schedule, realized winner)
//! - A [`StoreTimelineProvider`] that aligns fetched rows on the fly and
//!   plugs into the grid-search orchestrator

pub mod models;
pub mod provider;
pub mod store;

pub use models::{EventRecord, SnapshotRecord};
pub use provider::StoreTimelineProvider;
pub use store::SnapshotStore;
