//! Snapshot alignment for the oddsgap backtester.
//!
//! Converts heterogeneous per-event rows (a forecast probability plus up to
//! two market-side quote sets) into one normalized, time-ordered
//! [`EventTimeline`] per event, ready for the trade simulator.

pub mod aligner;
pub mod row;
pub mod timeline;

pub use aligner::{AlignmentStats, SnapshotAligner};
pub use row::{EventMeta, SnapshotRow};
pub use timeline::{AlignedPoint, EventTimeline};
