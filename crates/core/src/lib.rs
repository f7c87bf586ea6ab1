//! `lockstream-core` — domain foundation building blocks.
//!
//! Identifiers, the domain error model and the `Entity` trait shared by the
//! locker aggregates. No infrastructure concerns live here.

pub mod entity;
pub mod error;
pub mod id;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{CompartmentId, CompartmentKey, EventId, LockerId, ReservationId};
