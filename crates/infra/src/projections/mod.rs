//! Read model builders.
//!
//! Projections are:
//! - **Deterministic**: the same event sequence always yields the same state
//! - **Rebuildable**: they can be reconstructed from the event log at any time

pub mod locker;
pub mod replay;

pub use locker::{ExpiryCounting, LockerProjector, ProjectorConfig};
pub use replay::{RebuildReport, VerificationReport, rebuild, verify};
