//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures. Storage and
/// I/O failures belong to the infrastructure error types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// The event is structurally unusable: a required payload field is
    /// missing, empty or of the wrong kind, or it references a resource whose
    /// existence is a precondition (unregistered compartment, unknown
    /// reservation).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The event is well-formed but the current state machine rejects it.
    #[error("domain rule violated: {0}")]
    RuleViolation(String),

    /// An event type outside the supported set reached the engine.
    ///
    /// This is an integration bug upstream and aborts the operation.
    #[error("unsupported event type: {0}")]
    UnsupportedEventType(String),

    /// A queried read-model record does not exist.
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn rule(msg: impl Into<String>) -> Self {
        Self::RuleViolation(msg.into())
    }

    pub fn unsupported(event_type: impl Into<String>) -> Self {
        Self::UnsupportedEventType(event_type.into())
    }

    pub fn not_found(entity: &'static str, key: impl core::fmt::Display) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn is_rule_violation(&self) -> bool {
        matches!(self, Self::RuleViolation(_))
    }
}
