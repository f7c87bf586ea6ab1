//! Event builders shared by unit and integration tests.

use chrono::{DateTime, TimeZone, Utc};

use lockstream_events::{Event, EventType, Payload};

pub fn at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().unwrap()
}

pub fn event(event_id: &str, locker_id: &str, event_type: EventType, payload: Payload) -> Event {
    Event::new(event_id.into(), at(), locker_id.into(), event_type, payload)
}

pub fn registered(event_id: &str, locker_id: &str, compartment_id: &str) -> Event {
    event(
        event_id,
        locker_id,
        EventType::CompartmentRegistered,
        Payload::new().with("compartment_id", compartment_id),
    )
}

pub fn reservation_created(
    event_id: &str,
    locker_id: &str,
    compartment_id: &str,
    reservation_id: &str,
) -> Event {
    event(
        event_id,
        locker_id,
        EventType::ReservationCreated,
        Payload::new()
            .with("compartment_id", compartment_id)
            .with("reservation_id", reservation_id),
    )
}

pub fn deposited(event_id: &str, locker_id: &str, reservation_id: &str) -> Event {
    event(
        event_id,
        locker_id,
        EventType::ParcelDeposited,
        Payload::new().with("reservation_id", reservation_id),
    )
}

pub fn picked_up(event_id: &str, locker_id: &str, reservation_id: &str) -> Event {
    event(
        event_id,
        locker_id,
        EventType::ParcelPickedUp,
        Payload::new().with("reservation_id", reservation_id),
    )
}

pub fn expired(event_id: &str, locker_id: &str, reservation_id: &str) -> Event {
    event(
        event_id,
        locker_id,
        EventType::ReservationExpired,
        Payload::new().with("reservation_id", reservation_id),
    )
}

pub fn fault_reported(
    event_id: &str,
    locker_id: &str,
    compartment_id: &str,
    severity: i64,
) -> Event {
    event(
        event_id,
        locker_id,
        EventType::FaultReported,
        Payload::new()
            .with("compartment_id", compartment_id)
            .with("severity", severity),
    )
}

pub fn fault_cleared(
    event_id: &str,
    locker_id: &str,
    compartment_id: &str,
    fault_event_id: &str,
) -> Event {
    event(
        event_id,
        locker_id,
        EventType::FaultCleared,
        Payload::new()
            .with("compartment_id", compartment_id)
            .with("fault_event_id", fault_event_id),
    )
}
