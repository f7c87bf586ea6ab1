//! Strongly-typed identifiers used across the domain.
//!
//! Every identifier is an opaque, caller-supplied string. Construction through
//! `parse` rejects empty values; `new` is for values already known to be valid
//! (storage rows, tests).

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Globally unique identifier of a logged event.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

/// Identifier of a parcel locker (aggregate root).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LockerId(String);

/// Identifier of a compartment, unique within its locker.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompartmentId(String);

/// Identifier of a reservation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReservationId(String);

macro_rules! impl_string_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Parse a caller-supplied identifier, rejecting empty strings.
            pub fn parse(value: impl Into<String>) -> Result<Self, DomainError> {
                let value = value.into();
                if value.is_empty() {
                    return Err(DomainError::validation(format!(
                        "{} must be a non-empty string",
                        $name
                    )));
                }
                Ok(Self(value))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $t {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<$t> for String {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl AsRef<str> for $t {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

impl_string_newtype!(EventId, "event_id");
impl_string_newtype!(LockerId, "locker_id");
impl_string_newtype!(CompartmentId, "compartment_id");
impl_string_newtype!(ReservationId, "reservation_id");

/// Composite key of a compartment: compartment ids are only unique per locker.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CompartmentKey {
    pub locker_id: LockerId,
    pub compartment_id: CompartmentId,
}

impl CompartmentKey {
    pub fn new(locker_id: LockerId, compartment_id: CompartmentId) -> Self {
        Self {
            locker_id,
            compartment_id,
        }
    }
}

impl core::fmt::Display for CompartmentKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}/{}", self.locker_id, self.compartment_id)
    }
}
