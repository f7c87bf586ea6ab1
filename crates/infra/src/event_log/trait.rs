use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use lockstream_core::EventId;
use lockstream_events::Event;

/// An admitted event together with its position in the log.
///
/// ## Sequence Numbers
///
/// Sequence numbers are assigned by the log at admission and are:
/// - **1-based and gap-free**: the n-th admitted event has sequence `n`
/// - **Global**: one sequence for the whole log, not per locker
/// - **Immutable**: a record never moves
///
/// Rebuild replays records in ascending sequence order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggedEvent {
    pub sequence_number: u64,
    pub event: Event,
}

/// Event log operation error.
///
/// These are **infrastructure errors**. A duplicate identifier is not an
/// error: `add_if_absent` reports it by returning `false`.
#[derive(Debug, Error)]
pub enum EventLogError {
    #[error("event log I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize event {event_id}: {reason}")]
    Serialize { event_id: EventId, reason: String },

    #[error("corrupt event log record at line {line}: {reason}")]
    Corrupt { line: usize, reason: String },

    #[error("event log lock poisoned")]
    Poisoned,
}

/// Append-only, deduplicating event log.
///
/// ## Admission
///
/// `add_if_absent()` admits an event exactly once per identifier. Identifier
/// equality alone defines duplication: a second event with a known id is
/// ignored even if its payload differs. Admission is durable once `Ok(true)`
/// is returned.
///
/// ## Iteration
///
/// `read_all()` yields every admitted record in original append order. It is
/// used by rebuild only; live ingestion never reads the log back.
///
/// ## Failure
///
/// Storage failures are fatal and propagate. There is no partial-write
/// recovery, and admission is not atomic with projection.
pub trait EventLog: Send + Sync {
    /// Record `event` unless an event with the same id was admitted before.
    fn add_if_absent(&self, event: &Event) -> Result<bool, EventLogError>;

    /// All admitted records in append order.
    fn read_all(&self) -> Result<Vec<LoggedEvent>, EventLogError>;

    fn contains(&self, event_id: &EventId) -> Result<bool, EventLogError>;

    fn len(&self) -> Result<usize, EventLogError>;

    fn is_empty(&self) -> Result<bool, EventLogError> {
        Ok(self.len()? == 0)
    }
}

impl<L> EventLog for Arc<L>
where
    L: EventLog + ?Sized,
{
    fn add_if_absent(&self, event: &Event) -> Result<bool, EventLogError> {
        (**self).add_if_absent(event)
    }

    fn read_all(&self) -> Result<Vec<LoggedEvent>, EventLogError> {
        (**self).read_all()
    }

    fn contains(&self, event_id: &EventId) -> Result<bool, EventLogError> {
        (**self).contains(event_id)
    }

    fn len(&self) -> Result<usize, EventLogError> {
        (**self).len()
    }
}
