use serde::Serialize;

use lockstream_core::{
    CompartmentId, CompartmentKey, DomainError, DomainResult, Entity, LockerId, ReservationId,
};

use crate::fault::FaultSummary;

/// Outcome of recomputing a compartment's flags from its fault summary.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DegradedTransition {
    Unchanged,
    /// `degraded` flipped false → true.
    BecameDegraded,
    /// `degraded` flipped true → false.
    Recovered,
}

/// A compartment of a locker.
///
/// `faulty` and `degraded` have no setters: they are only ever derived from the
/// compartment's unresolved faults through `apply_fault_summary`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Compartment {
    #[serde(flatten)]
    key: CompartmentKey,
    degraded: bool,
    faulty: bool,
    active_reservation_id: Option<ReservationId>,
}

impl Compartment {
    /// A newly registered compartment: healthy, free.
    pub fn registered(locker_id: LockerId, compartment_id: CompartmentId) -> Self {
        Self {
            key: CompartmentKey::new(locker_id, compartment_id),
            degraded: false,
            faulty: false,
            active_reservation_id: None,
        }
    }

    /// Rehydrate a persisted row (storage adapters only).
    pub fn restore(
        key: CompartmentKey,
        degraded: bool,
        faulty: bool,
        active_reservation_id: Option<ReservationId>,
    ) -> Self {
        Self {
            key,
            degraded,
            faulty,
            active_reservation_id,
        }
    }

    pub fn key(&self) -> &CompartmentKey {
        &self.key
    }

    pub fn locker_id(&self) -> &LockerId {
        &self.key.locker_id
    }

    pub fn compartment_id(&self) -> &CompartmentId {
        &self.key.compartment_id
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn is_faulty(&self) -> bool {
        self.faulty
    }

    pub fn active_reservation_id(&self) -> Option<&ReservationId> {
        self.active_reservation_id.as_ref()
    }

    /// Bind a reservation to this compartment.
    pub fn assign_reservation(&mut self, reservation_id: ReservationId) -> DomainResult<()> {
        if self.degraded {
            return Err(DomainError::rule(format!(
                "cannot assign reservation {reservation_id} to degraded compartment {}",
                self.key
            )));
        }
        if let Some(current) = &self.active_reservation_id {
            return Err(DomainError::rule(format!(
                "compartment {} already has active reservation {current}",
                self.key
            )));
        }
        self.active_reservation_id = Some(reservation_id);
        Ok(())
    }

    /// Release the compartment if `reservation_id` is the one holding it.
    ///
    /// Returns whether the pointer was cleared.
    pub fn release_reservation(&mut self, reservation_id: &ReservationId) -> bool {
        if self.active_reservation_id.as_ref() == Some(reservation_id) {
            self.active_reservation_id = None;
            true
        } else {
            false
        }
    }

    /// Recompute `faulty`/`degraded` from the full set of unresolved faults.
    pub fn apply_fault_summary(
        &mut self,
        summary: FaultSummary,
        degrade_threshold: i64,
    ) -> DegradedTransition {
        let was_degraded = self.degraded;
        self.faulty = summary.is_faulty();
        self.degraded = summary.is_degrading(degrade_threshold);

        match (was_degraded, self.degraded) {
            (false, true) => DegradedTransition::BecameDegraded,
            (true, false) => DegradedTransition::Recovered,
            _ => DegradedTransition::Unchanged,
        }
    }
}

impl Entity for Compartment {
    type Id = CompartmentKey;

    fn id(&self) -> &Self::Id {
        &self.key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compartment() -> Compartment {
        Compartment::registered("L1".into(), "C1".into())
    }

    fn summary(active: usize, max_severity: Option<i64>) -> FaultSummary {
        FaultSummary {
            active,
            max_severity,
        }
    }

    #[test]
    fn only_one_active_reservation() {
        let mut c = compartment();
        c.assign_reservation("R1".into()).unwrap();
        let err = c.assign_reservation("R2".into()).unwrap_err();
        assert!(err.is_rule_violation());
        assert_eq!(c.active_reservation_id().map(ReservationId::as_str), Some("R1"));
    }

    #[test]
    fn degraded_compartment_rejects_reservations() {
        let mut c = compartment();
        assert_eq!(
            c.apply_fault_summary(summary(1, Some(3)), 3),
            DegradedTransition::BecameDegraded
        );
        assert!(c.assign_reservation("R1".into()).unwrap_err().is_rule_violation());
        assert!(c.active_reservation_id().is_none());
    }

    #[test]
    fn release_only_matches_the_holder() {
        let mut c = compartment();
        c.assign_reservation("R1".into()).unwrap();
        assert!(!c.release_reservation(&"R2".into()));
        assert!(c.release_reservation(&"R1".into()));
        assert!(c.active_reservation_id().is_none());
    }

    #[test]
    fn flags_follow_the_summary() {
        let mut c = compartment();
        assert_eq!(
            c.apply_fault_summary(summary(1, Some(2)), 3),
            DegradedTransition::Unchanged
        );
        assert!(c.is_faulty());
        assert!(!c.is_degraded());

        assert_eq!(
            c.apply_fault_summary(summary(2, Some(5)), 3),
            DegradedTransition::BecameDegraded
        );
        assert_eq!(
            c.apply_fault_summary(summary(1, Some(4)), 3),
            DegradedTransition::Unchanged
        );
        assert_eq!(
            c.apply_fault_summary(summary(0, None), 3),
            DegradedTransition::Recovered
        );
        assert!(!c.is_faulty());
    }
}
