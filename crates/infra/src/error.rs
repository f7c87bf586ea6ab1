//! Engine-level error taxonomy.

use thiserror::Error;

use lockstream_core::DomainError;

use crate::event_log::EventLogError;
use crate::read_model::StoreError;

pub type EngineResult<T> = Result<T, EngineError>;

/// Any failure surfaced by ingestion, projection, rebuild or queries.
///
/// Domain errors pass through unchanged so callers can map them to transport
/// responses with `kind()`.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("event log error: {0}")]
    EventLog(#[from] EventLogError),

    #[error("read model store error: {0}")]
    Store(#[from] StoreError),
}

/// Coarse classification for callers.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed event or missing precondition (HTTP 422).
    Validation,
    /// Well-formed event rejected by the state machine (HTTP 409).
    RuleViolation,
    /// Queried record does not exist (HTTP 404).
    NotFound,
    /// Event type outside the supported set; fatal (HTTP 500).
    Unsupported,
    /// Event log or read model failure; fatal (HTTP 500).
    Storage,
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Domain(DomainError::Validation(_)) => ErrorKind::Validation,
            Self::Domain(DomainError::RuleViolation(_)) => ErrorKind::RuleViolation,
            Self::Domain(DomainError::NotFound { .. }) => ErrorKind::NotFound,
            Self::Domain(DomainError::UnsupportedEventType(_)) => ErrorKind::Unsupported,
            Self::EventLog(_) | Self::Store(_) => ErrorKind::Storage,
        }
    }

    /// Rejections that leave no trace in the read model and may be skipped
    /// during replay.
    pub fn is_rejection(&self) -> bool {
        matches!(self.kind(), ErrorKind::Validation | ErrorKind::RuleViolation)
    }
}
