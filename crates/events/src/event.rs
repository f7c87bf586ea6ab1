use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lockstream_core::{DomainError, EventId, LockerId};

use crate::payload::Payload;

/// The closed set of event types the projector understands.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    CompartmentRegistered,
    ReservationCreated,
    ParcelDeposited,
    ParcelPickedUp,
    ReservationExpired,
    FaultReported,
    FaultCleared,
}

impl EventType {
    pub const ALL: [EventType; 7] = [
        EventType::CompartmentRegistered,
        EventType::ReservationCreated,
        EventType::ParcelDeposited,
        EventType::ParcelPickedUp,
        EventType::ReservationExpired,
        EventType::FaultReported,
        EventType::FaultCleared,
    ];

    /// Stable wire tag (e.g. "ReservationCreated").
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CompartmentRegistered => "CompartmentRegistered",
            Self::ReservationCreated => "ReservationCreated",
            Self::ParcelDeposited => "ParcelDeposited",
            Self::ParcelPickedUp => "ParcelPickedUp",
            Self::ReservationExpired => "ReservationExpired",
            Self::FaultReported => "FaultReported",
            Self::FaultCleared => "FaultCleared",
        }
    }
}

impl core::fmt::Display for EventType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| DomainError::unsupported(s))
    }
}

/// A domain event as admitted into the log.
///
/// Events are facts: once constructed they are never mutated. The JSON form is
/// the canonical wire shape:
///
/// ```json
/// { "event_id": "…", "occurred_at": "2024-01-01T00:00:00Z", "locker_id": "…",
///   "type": "ReservationCreated", "payload": { … } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    event_id: EventId,
    occurred_at: DateTime<Utc>,
    locker_id: LockerId,
    #[serde(rename = "type")]
    event_type: EventType,
    #[serde(default)]
    payload: Payload,
}

impl Event {
    pub fn new(
        event_id: EventId,
        occurred_at: DateTime<Utc>,
        locker_id: LockerId,
        event_type: EventType,
        payload: Payload,
    ) -> Self {
        Self {
            event_id,
            occurred_at,
            locker_id,
            event_type,
            payload,
        }
    }

    pub fn event_id(&self) -> &EventId {
        &self.event_id
    }

    /// Business time. Recorded for consumers; the projector never reads it.
    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn locker_id(&self) -> &LockerId {
        &self.locker_id
    }

    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }
}

/// The wire shape of an event before its type tag has been checked.
///
/// Transport adapters deserialize into this and convert with `TryFrom`; an
/// unknown tag surfaces as `DomainError::UnsupportedEventType`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    pub event_id: String,
    pub occurred_at: DateTime<Utc>,
    pub locker_id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub payload: Payload,
}

impl TryFrom<RawEvent> for Event {
    type Error = DomainError;

    fn try_from(raw: RawEvent) -> Result<Self, Self::Error> {
        let event_type = raw.event_type.parse::<EventType>()?;
        Ok(Event::new(
            EventId::parse(raw.event_id)?,
            raw.occurred_at,
            LockerId::parse(raw.locker_id)?,
            event_type,
            raw.payload,
        ))
    }
}
