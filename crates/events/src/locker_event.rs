use lockstream_core::{CompartmentId, DomainResult, EventId, ReservationId};

use crate::event::{Event, EventType};
use crate::payload::Payload;

/// An event payload decoded into the variant selected by its type tag.
///
/// Decoding performs the shared validation step: every required field is
/// present, non-empty and of the right kind. Referential checks (does the
/// compartment exist?) belong to the projector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockerEvent {
    CompartmentRegistered {
        compartment_id: CompartmentId,
    },
    ReservationCreated {
        reservation_id: ReservationId,
        compartment_id: CompartmentId,
    },
    ParcelDeposited {
        reservation_id: ReservationId,
        /// Optional cross-check against the reservation's compartment.
        compartment_id: Option<CompartmentId>,
    },
    ParcelPickedUp {
        reservation_id: ReservationId,
        compartment_id: Option<CompartmentId>,
    },
    ReservationExpired {
        reservation_id: ReservationId,
    },
    FaultReported {
        compartment_id: CompartmentId,
        severity: i64,
    },
    FaultCleared {
        compartment_id: CompartmentId,
        fault_event_id: EventId,
    },
}

impl LockerEvent {
    pub fn decode(event_type: EventType, payload: &Payload) -> DomainResult<Self> {
        let decoded = match event_type {
            EventType::CompartmentRegistered => Self::CompartmentRegistered {
                compartment_id: payload.require_str("compartment_id")?.into(),
            },
            EventType::ReservationCreated => Self::ReservationCreated {
                reservation_id: payload.require_str("reservation_id")?.into(),
                compartment_id: payload.require_str("compartment_id")?.into(),
            },
            EventType::ParcelDeposited => Self::ParcelDeposited {
                reservation_id: payload.require_str("reservation_id")?.into(),
                compartment_id: payload.optional_str("compartment_id")?.map(Into::into),
            },
            EventType::ParcelPickedUp => Self::ParcelPickedUp {
                reservation_id: payload.require_str("reservation_id")?.into(),
                compartment_id: payload.optional_str("compartment_id")?.map(Into::into),
            },
            EventType::ReservationExpired => Self::ReservationExpired {
                reservation_id: payload.require_str("reservation_id")?.into(),
            },
            EventType::FaultReported => Self::FaultReported {
                compartment_id: payload.require_str("compartment_id")?.into(),
                severity: payload.require_int("severity")?,
            },
            EventType::FaultCleared => Self::FaultCleared {
                compartment_id: payload.require_str("compartment_id")?.into(),
                fault_event_id: payload.require_str("fault_event_id")?.into(),
            },
        };
        Ok(decoded)
    }

    pub fn event_type(&self) -> EventType {
        match self {
            Self::CompartmentRegistered { .. } => EventType::CompartmentRegistered,
            Self::ReservationCreated { .. } => EventType::ReservationCreated,
            Self::ParcelDeposited { .. } => EventType::ParcelDeposited,
            Self::ParcelPickedUp { .. } => EventType::ParcelPickedUp,
            Self::ReservationExpired { .. } => EventType::ReservationExpired,
            Self::FaultReported { .. } => EventType::FaultReported,
            Self::FaultCleared { .. } => EventType::FaultCleared,
        }
    }
}

impl TryFrom<&Event> for LockerEvent {
    type Error = lockstream_core::DomainError;

    fn try_from(event: &Event) -> Result<Self, Self::Error> {
        Self::decode(event.event_type(), event.payload())
    }
}
