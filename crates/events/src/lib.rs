//! Locker domain events.
//!
//! - `Event`: the canonical, immutable record admitted into the event log
//! - `RawEvent`: the wire shape, whose type tag is still an unchecked string
//! - `LockerEvent`: an event's payload decoded into one typed variant per tag

pub mod event;
pub mod locker_event;
pub mod payload;

pub use event::{Event, EventType, RawEvent};
pub use locker_event::LockerEvent;
pub use payload::Payload;
