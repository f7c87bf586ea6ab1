use serde::Serialize;

use lockstream_core::{CompartmentId, DomainError, DomainResult, Entity, EventId, LockerId};

/// A reported fault, keyed by the id of the `FaultReported` event that opened it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fault {
    fault_event_id: EventId,
    locker_id: LockerId,
    compartment_id: CompartmentId,
    severity: i64,
    cleared: bool,
    cleared_by_event_id: Option<EventId>,
}

impl Fault {
    /// A freshly reported (active) fault.
    pub fn reported(
        fault_event_id: EventId,
        locker_id: LockerId,
        compartment_id: CompartmentId,
        severity: i64,
    ) -> Self {
        Self {
            fault_event_id,
            locker_id,
            compartment_id,
            severity,
            cleared: false,
            cleared_by_event_id: None,
        }
    }

    /// Rehydrate a persisted row (storage adapters only).
    pub fn restore(
        fault_event_id: EventId,
        locker_id: LockerId,
        compartment_id: CompartmentId,
        severity: i64,
        cleared_by_event_id: Option<EventId>,
    ) -> Self {
        Self {
            fault_event_id,
            locker_id,
            compartment_id,
            severity,
            cleared: cleared_by_event_id.is_some(),
            cleared_by_event_id,
        }
    }

    pub fn fault_event_id(&self) -> &EventId {
        &self.fault_event_id
    }

    pub fn locker_id(&self) -> &LockerId {
        &self.locker_id
    }

    pub fn compartment_id(&self) -> &CompartmentId {
        &self.compartment_id
    }

    pub fn severity(&self) -> i64 {
        self.severity
    }

    pub fn is_cleared(&self) -> bool {
        self.cleared
    }

    pub fn cleared_by_event_id(&self) -> Option<&EventId> {
        self.cleared_by_event_id.as_ref()
    }

    pub fn belongs_to(&self, locker_id: &LockerId, compartment_id: &CompartmentId) -> bool {
        &self.locker_id == locker_id && &self.compartment_id == compartment_id
    }

    /// Clear the fault. A fault can be cleared at most once.
    pub fn clear(&mut self, cleared_by_event_id: EventId) -> DomainResult<()> {
        if self.cleared {
            return Err(DomainError::rule(format!(
                "fault {} is already cleared",
                self.fault_event_id
            )));
        }
        self.cleared = true;
        self.cleared_by_event_id = Some(cleared_by_event_id);
        Ok(())
    }
}

impl Entity for Fault {
    type Id = EventId;

    fn id(&self) -> &Self::Id {
        &self.fault_event_id
    }
}

/// Aggregate view over the currently unresolved faults of one compartment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FaultSummary {
    pub active: usize,
    pub max_severity: Option<i64>,
}

impl FaultSummary {
    /// Summarise the uncleared faults among `faults`; cleared ones are ignored.
    pub fn from_faults<'a>(faults: impl IntoIterator<Item = &'a Fault>) -> Self {
        faults
            .into_iter()
            .filter(|f| !f.is_cleared())
            .fold(Self::default(), |acc, f| Self {
                active: acc.active + 1,
                max_severity: Some(acc.max_severity.map_or(f.severity, |m| m.max(f.severity))),
            })
    }

    pub fn is_faulty(&self) -> bool {
        self.active > 0
    }

    pub fn is_degrading(&self, threshold: i64) -> bool {
        self.max_severity.is_some_and(|s| s >= threshold)
    }
}
