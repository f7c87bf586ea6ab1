//! Locker domain: the four aggregates maintained by the projector.
//!
//! - `Locker` — per-locker counters + deterministic state hash
//! - `Compartment` — degraded/faulty flags and the single active reservation
//! - `Reservation` — one-directional status machine
//! - `Fault` — a reported fault, cleared at most once

pub mod compartment;
pub mod fault;
pub mod locker;
pub mod reservation;

pub use compartment::{Compartment, DegradedTransition};
pub use fault::{Fault, FaultSummary};
pub use locker::{Locker, state_hash};
pub use reservation::{Reservation, ReservationStatus};

/// Default severity at or above which an active fault degrades its compartment.
pub const DEFAULT_DEGRADE_THRESHOLD: i64 = 3;
