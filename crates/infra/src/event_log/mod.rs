//! Append-only event log boundary.
//!
//! The log is the source of truth: read models are disposable and can always
//! be rebuilt by replaying it.

pub mod in_memory;
pub mod jsonl;
pub mod r#trait;

pub use in_memory::InMemoryEventLog;
pub use jsonl::JsonlEventLog;
pub use r#trait::{EventLog, EventLogError, LoggedEvent};
