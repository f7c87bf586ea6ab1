//! Locker projector: applies one event to the locker read models.
//!
//! The projector is a pure function of (current read model, event). Live
//! ingestion and rebuild both go through `LockerProjector::project`, so an
//! incremental derivation and a full replay of the same log always agree.

use lockstream_core::{CompartmentId, CompartmentKey, DomainError, EventId, LockerId, ReservationId};
use lockstream_events::{Event, LockerEvent};
use lockstream_lockers::{
    Compartment, DEFAULT_DEGRADE_THRESHOLD, DegradedTransition, Fault, Locker, Reservation,
};

use crate::error::EngineResult;
use crate::read_model::{ReadModelStore, Repositories, UnitOfWork};

/// How `ReservationExpired` adjusts `Locker.active_reservations`.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum ExpiryCounting {
    /// Decrement only when a known reservation leaves an active status.
    #[default]
    ActiveOnly,
    /// Decrement on every expiry event, known reservation or not (floored at
    /// zero). Kept for parity with logs produced under that rule.
    Unconditional,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ProjectorConfig {
    /// A compartment is degraded while an uncleared fault has at least this
    /// severity.
    pub degrade_threshold: i64,
    pub expiry_counting: ExpiryCounting,
}

impl Default for ProjectorConfig {
    fn default() -> Self {
        Self {
            degrade_threshold: DEFAULT_DEGRADE_THRESHOLD,
            expiry_counting: ExpiryCounting::default(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LockerProjector {
    config: ProjectorConfig,
}

impl LockerProjector {
    pub fn new(config: ProjectorConfig) -> Self {
        Self { config }
    }

    /// Project `event` into `store` as one atomic unit of work.
    ///
    /// On error nothing is written.
    pub fn project<S>(&self, store: &S, event: &Event) -> EngineResult<()>
    where
        S: ReadModelStore + ?Sized,
    {
        let mut uow = UnitOfWork::new(store);
        self.apply(&mut uow, event)?;
        uow.commit()?;
        Ok(())
    }

    /// Run the handler for `event` against `repos`.
    ///
    /// Writes reach `repos` as they are made; use `project` for all-or-nothing
    /// semantics.
    pub fn apply<R>(&self, repos: &mut R, event: &Event) -> EngineResult<()>
    where
        R: Repositories + ?Sized,
    {
        let decoded = LockerEvent::try_from(event)?;
        tracing::debug!(
            event_id = %event.event_id(),
            locker_id = %event.locker_id(),
            event_type = %event.event_type(),
            "projecting event"
        );

        match decoded {
            LockerEvent::CompartmentRegistered { compartment_id } => {
                self.compartment_registered(repos, event, compartment_id)
            }
            LockerEvent::ReservationCreated {
                reservation_id,
                compartment_id,
            } => self.reservation_created(repos, event, reservation_id, compartment_id),
            LockerEvent::ParcelDeposited {
                reservation_id,
                compartment_id,
            } => self.parcel_deposited(repos, event, &reservation_id, compartment_id.as_ref()),
            LockerEvent::ParcelPickedUp {
                reservation_id,
                compartment_id,
            } => self.parcel_picked_up(repos, event, &reservation_id, compartment_id.as_ref()),
            LockerEvent::ReservationExpired { reservation_id } => {
                self.reservation_expired(repos, event, &reservation_id)
            }
            LockerEvent::FaultReported {
                compartment_id,
                severity,
            } => self.fault_reported(repos, event, compartment_id, severity),
            LockerEvent::FaultCleared {
                compartment_id,
                fault_event_id,
            } => self.fault_cleared(repos, event, compartment_id, &fault_event_id),
        }
    }

    fn compartment_registered<R: Repositories + ?Sized>(
        &self,
        repos: &mut R,
        event: &Event,
        compartment_id: CompartmentId,
    ) -> EngineResult<()> {
        let key = CompartmentKey::new(event.locker_id().clone(), compartment_id);
        if repos.get_compartment(&key)?.is_some() {
            return Err(
                DomainError::rule(format!("compartment {key} is already registered")).into(),
            );
        }

        let mut locker = load_locker(repos, event.locker_id())?;
        locker.compartment_registered();

        repos.upsert_compartment(Compartment::registered(key.locker_id, key.compartment_id))?;
        repos.upsert_locker(locker)?;
        Ok(())
    }

    fn reservation_created<R: Repositories + ?Sized>(
        &self,
        repos: &mut R,
        event: &Event,
        reservation_id: ReservationId,
        compartment_id: CompartmentId,
    ) -> EngineResult<()> {
        let key = CompartmentKey::new(event.locker_id().clone(), compartment_id);
        let mut compartment = require_compartment(repos, &key)?;

        if repos.get_reservation(&reservation_id)?.is_some() {
            return Err(
                DomainError::rule(format!("reservation {reservation_id} already exists")).into(),
            );
        }

        compartment.assign_reservation(reservation_id.clone())?;

        let mut locker = load_locker(repos, event.locker_id())?;
        locker.reservation_opened();

        repos.upsert_reservation(Reservation::created(
            reservation_id,
            key.locker_id,
            key.compartment_id,
        ))?;
        repos.upsert_compartment(compartment)?;
        repos.upsert_locker(locker)?;
        Ok(())
    }

    fn parcel_deposited<R: Repositories + ?Sized>(
        &self,
        repos: &mut R,
        event: &Event,
        reservation_id: &ReservationId,
        compartment_id: Option<&CompartmentId>,
    ) -> EngineResult<()> {
        let mut reservation = require_reservation(repos, event, reservation_id, compartment_id)?;
        reservation.deposit()?;
        repos.upsert_reservation(reservation)?;
        Ok(())
    }

    fn parcel_picked_up<R: Repositories + ?Sized>(
        &self,
        repos: &mut R,
        event: &Event,
        reservation_id: &ReservationId,
        compartment_id: Option<&CompartmentId>,
    ) -> EngineResult<()> {
        let mut reservation = require_reservation(repos, event, reservation_id, compartment_id)?;
        reservation.pick_up()?;

        release_compartment(repos, &reservation)?;

        let mut locker = load_locker(repos, reservation.locker_id())?;
        locker.reservation_closed();

        repos.upsert_reservation(reservation)?;
        repos.upsert_locker(locker)?;
        Ok(())
    }

    fn reservation_expired<R: Repositories + ?Sized>(
        &self,
        repos: &mut R,
        event: &Event,
        reservation_id: &ReservationId,
    ) -> EngineResult<()> {
        let unconditional = self.config.expiry_counting == ExpiryCounting::Unconditional;

        let Some(mut reservation) = repos.get_reservation(reservation_id)? else {
            tracing::debug!(%reservation_id, "expiry for unknown reservation ignored");
            if unconditional {
                close_one_reservation(repos, event.locker_id())?;
            }
            return Ok(());
        };
        ensure_same_locker(event, &reservation)?;

        let was_active = reservation.status().is_active();
        if reservation.expire() {
            release_compartment(repos, &reservation)?;
            repos.upsert_reservation(reservation.clone())?;
        } else {
            tracing::debug!(
                %reservation_id,
                status = %reservation.status(),
                "expiry for terminal reservation ignored"
            );
        }

        if was_active || unconditional {
            close_one_reservation(repos, reservation.locker_id())?;
        }
        Ok(())
    }

    fn fault_reported<R: Repositories + ?Sized>(
        &self,
        repos: &mut R,
        event: &Event,
        compartment_id: CompartmentId,
        severity: i64,
    ) -> EngineResult<()> {
        let key = CompartmentKey::new(event.locker_id().clone(), compartment_id);
        let compartment = require_compartment(repos, &key)?;

        repos.upsert_fault(Fault::reported(
            event.event_id().clone(),
            key.locker_id.clone(),
            key.compartment_id.clone(),
            severity,
        ))?;

        self.refresh_fault_flags(repos, compartment)
    }

    fn fault_cleared<R: Repositories + ?Sized>(
        &self,
        repos: &mut R,
        event: &Event,
        compartment_id: CompartmentId,
        fault_event_id: &EventId,
    ) -> EngineResult<()> {
        let key = CompartmentKey::new(event.locker_id().clone(), compartment_id);
        let compartment = require_compartment(repos, &key)?;

        let mut fault = repos
            .get_fault(fault_event_id)?
            .ok_or_else(|| DomainError::rule(format!("fault {fault_event_id} does not exist")))?;

        if !fault.belongs_to(&key.locker_id, &key.compartment_id) {
            return Err(DomainError::rule(format!(
                "fault {fault_event_id} was not reported for compartment {key}"
            ))
            .into());
        }

        fault.clear(event.event_id().clone())?;
        repos.upsert_fault(fault)?;

        self.refresh_fault_flags(repos, compartment)
    }

    /// Recompute the compartment's flags from its unresolved faults and keep
    /// the locker's degraded counter in step.
    fn refresh_fault_flags<R: Repositories + ?Sized>(
        &self,
        repos: &mut R,
        mut compartment: Compartment,
    ) -> EngineResult<()> {
        let summary = repos.active_fault_summary(compartment.key())?;
        let transition = compartment.apply_fault_summary(summary, self.config.degrade_threshold);

        if transition != DegradedTransition::Unchanged {
            let mut locker = load_locker(repos, compartment.locker_id())?;
            match transition {
                DegradedTransition::BecameDegraded => locker.compartment_degraded(),
                DegradedTransition::Recovered => locker.compartment_recovered(),
                DegradedTransition::Unchanged => {}
            }
            tracing::debug!(
                compartment = %compartment.key(),
                degraded = compartment.is_degraded(),
                "compartment degraded flag changed"
            );
            repos.upsert_locker(locker)?;
        }

        repos.upsert_compartment(compartment)?;
        Ok(())
    }
}

fn load_locker<R: Repositories + ?Sized>(repos: &R, locker_id: &LockerId) -> EngineResult<Locker> {
    Ok(repos
        .get_locker(locker_id)?
        .unwrap_or_else(|| Locker::new(locker_id.clone())))
}

fn require_compartment<R: Repositories + ?Sized>(
    repos: &R,
    key: &CompartmentKey,
) -> EngineResult<Compartment> {
    repos
        .get_compartment(key)?
        .ok_or_else(|| {
            DomainError::validation(format!("compartment {key} is not registered")).into()
        })
}

/// Load a reservation referenced by a deposit or pickup and cross-check the
/// event against it.
fn require_reservation<R: Repositories + ?Sized>(
    repos: &R,
    event: &Event,
    reservation_id: &ReservationId,
    compartment_id: Option<&CompartmentId>,
) -> EngineResult<Reservation> {
    let reservation = repos
        .get_reservation(reservation_id)?
        .ok_or_else(|| {
            DomainError::validation(format!("reservation {reservation_id} does not exist"))
        })?;

    if let Some(compartment_id) = compartment_id {
        if compartment_id != reservation.compartment_id() {
            return Err(DomainError::validation(format!(
                "compartment mismatch for reservation {reservation_id}: \
                 expected {}, got {compartment_id}",
                reservation.compartment_id()
            ))
            .into());
        }
    }

    ensure_same_locker(event, &reservation)?;
    Ok(reservation)
}

fn ensure_same_locker(event: &Event, reservation: &Reservation) -> EngineResult<()> {
    if event.locker_id() != reservation.locker_id() {
        return Err(DomainError::validation(format!(
            "reservation {} belongs to locker {}, not {}",
            reservation.reservation_id(),
            reservation.locker_id(),
            event.locker_id()
        ))
        .into());
    }
    Ok(())
}

fn release_compartment<R: Repositories + ?Sized>(
    repos: &mut R,
    reservation: &Reservation,
) -> EngineResult<()> {
    let key = CompartmentKey::new(
        reservation.locker_id().clone(),
        reservation.compartment_id().clone(),
    );
    if let Some(mut compartment) = repos.get_compartment(&key)? {
        if compartment.release_reservation(reservation.reservation_id()) {
            repos.upsert_compartment(compartment)?;
        }
    }
    Ok(())
}

fn close_one_reservation<R: Repositories + ?Sized>(
    repos: &mut R,
    locker_id: &LockerId,
) -> EngineResult<()> {
    let mut locker = load_locker(repos, locker_id)?;
    locker.reservation_closed();
    repos.upsert_locker(locker)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EngineError, ErrorKind};
    use crate::read_model::{InMemoryReadModelStore, ReadModelSnapshot};
    use crate::test_support::*;
    use lockstream_events::{EventType, Payload};
    use lockstream_lockers::{ReservationStatus, state_hash};

    fn projector() -> LockerProjector {
        LockerProjector::default()
    }

    fn run(store: &InMemoryReadModelStore, events: &[Event]) {
        let p = projector();
        for e in events {
            p.project(store, e).unwrap();
        }
    }

    fn locker(store: &InMemoryReadModelStore, id: &str) -> Locker {
        store.get_locker(&id.into()).unwrap().unwrap()
    }

    fn compartment(store: &InMemoryReadModelStore, l: &str, c: &str) -> Compartment {
        store
            .get_compartment(&CompartmentKey::new(l.into(), c.into()))
            .unwrap()
            .unwrap()
    }

    fn status(store: &InMemoryReadModelStore, r: &str) -> ReservationStatus {
        store.get_reservation(&r.into()).unwrap().unwrap().status()
    }

    fn kind(result: EngineResult<()>) -> ErrorKind {
        result.unwrap_err().kind()
    }

    #[test]
    fn registration_counts_compartments_and_hashes_the_locker() {
        let store = InMemoryReadModelStore::new();
        run(&store, &[registered("E1", "L1", "C1"), registered("E2", "L1", "C2")]);

        let l = locker(&store, "L1");
        assert_eq!(l.compartments(), 2);
        assert_eq!(l.state_hash(), state_hash(&"L1".into(), 2, 0, 0));

        let c = compartment(&store, "L1", "C2");
        assert!(!c.is_degraded() && !c.is_faulty());
        assert_eq!(c.active_reservation_id(), None);
    }

    #[test]
    fn reregistering_a_compartment_is_rejected() {
        let store = InMemoryReadModelStore::new();
        run(&store, &[registered("E1", "L1", "C1")]);

        let err = kind(projector().project(&store, &registered("E2", "L1", "C1")));
        assert_eq!(err, ErrorKind::RuleViolation);
        assert_eq!(locker(&store, "L1").compartments(), 1);
    }

    #[test]
    fn same_compartment_id_on_two_lockers_is_two_compartments() {
        let store = InMemoryReadModelStore::new();
        run(&store, &[registered("E1", "L1", "C1"), registered("E2", "L2", "C1")]);
        assert_eq!(locker(&store, "L1").compartments(), 1);
        assert_eq!(locker(&store, "L2").compartments(), 1);
    }

    #[test]
    fn reservation_lifecycle_through_pickup() {
        let store = InMemoryReadModelStore::new();
        run(
            &store,
            &[
                registered("E1", "L1", "C1"),
                reservation_created("E2", "L1", "C1", "R1"),
            ],
        );
        assert_eq!(locker(&store, "L1").active_reservations(), 1);
        assert_eq!(
            compartment(&store, "L1", "C1").active_reservation_id(),
            Some(&ReservationId::from("R1"))
        );

        run(&store, &[deposited("E3", "L1", "R1")]);
        assert_eq!(status(&store, "R1"), ReservationStatus::Deposited);

        run(&store, &[picked_up("E4", "L1", "R1")]);
        assert_eq!(status(&store, "R1"), ReservationStatus::PickedUp);
        assert_eq!(compartment(&store, "L1", "C1").active_reservation_id(), None);

        let l = locker(&store, "L1");
        assert_eq!(l.active_reservations(), 0);
        assert_eq!(
            l.state_hash(),
            "06a0aa6ad96e455558d3094c91a9e3b001b6bd4d7e66b7d5098d9c189020399a"
        );
    }

    #[test]
    fn reservation_requires_a_registered_compartment() {
        let store = InMemoryReadModelStore::new();
        let err = kind(projector().project(&store, &reservation_created("E1", "L1", "C1", "R1")));
        assert_eq!(err, ErrorKind::Validation);
        assert_eq!(store.snapshot().unwrap(), ReadModelSnapshot::default());
    }

    #[test]
    fn occupied_compartment_rejects_a_second_reservation() {
        let store = InMemoryReadModelStore::new();
        run(
            &store,
            &[
                registered("E1", "L1", "C1"),
                reservation_created("E2", "L1", "C1", "R1"),
            ],
        );
        let err = kind(projector().project(&store, &reservation_created("E3", "L1", "C1", "R2")));
        assert_eq!(err, ErrorKind::RuleViolation);
        assert!(store.get_reservation(&"R2".into()).unwrap().is_none());
        assert_eq!(locker(&store, "L1").active_reservations(), 1);
    }

    #[test]
    fn reused_reservation_id_is_rejected() {
        let store = InMemoryReadModelStore::new();
        run(
            &store,
            &[
                registered("E1", "L1", "C1"),
                registered("E2", "L1", "C2"),
                reservation_created("E3", "L1", "C1", "R1"),
            ],
        );
        let err = kind(projector().project(&store, &reservation_created("E4", "L1", "C2", "R1")));
        assert_eq!(err, ErrorKind::RuleViolation);
        assert_eq!(compartment(&store, "L1", "C2").active_reservation_id(), None);
    }

    #[test]
    fn expired_reservation_cannot_be_deposited_or_picked_up() {
        let store = InMemoryReadModelStore::new();
        run(
            &store,
            &[
                registered("E1", "L1", "C1"),
                reservation_created("E2", "L1", "C1", "R1"),
                expired("E3", "L1", "R1"),
            ],
        );
        assert_eq!(status(&store, "R1"), ReservationStatus::Expired);
        assert_eq!(locker(&store, "L1").active_reservations(), 0);
        assert_eq!(compartment(&store, "L1", "C1").active_reservation_id(), None);

        let p = projector();
        assert_eq!(kind(p.project(&store, &deposited("E4", "L1", "R1"))), ErrorKind::RuleViolation);

        let err = p.project(&store, &picked_up("E5", "L1", "R1")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RuleViolation);
        assert!(err.to_string().contains("expired"));
        assert_eq!(status(&store, "R1"), ReservationStatus::Expired);
    }

    #[test]
    fn pickup_before_deposit_is_a_rule_violation() {
        let store = InMemoryReadModelStore::new();
        run(
            &store,
            &[
                registered("E1", "L1", "C1"),
                reservation_created("E2", "L1", "C1", "R1"),
            ],
        );
        assert_eq!(
            kind(projector().project(&store, &picked_up("E3", "L1", "R1"))),
            ErrorKind::RuleViolation
        );
        assert_eq!(status(&store, "R1"), ReservationStatus::Created);
    }

    #[test]
    fn deposit_for_unknown_reservation_is_a_validation_error() {
        let store = InMemoryReadModelStore::new();
        assert_eq!(
            kind(projector().project(&store, &deposited("E1", "L1", "R404"))),
            ErrorKind::Validation
        );
    }

    #[test]
    fn compartment_and_locker_mismatches_are_validation_errors() {
        let store = InMemoryReadModelStore::new();
        run(
            &store,
            &[
                registered("E1", "L1", "C1"),
                reservation_created("E2", "L1", "C1", "R1"),
            ],
        );
        let p = projector();

        let wrong_compartment = event(
            "E3",
            "L1",
            EventType::ParcelDeposited,
            Payload::new().with("reservation_id", "R1").with("compartment_id", "C9"),
        );
        assert_eq!(kind(p.project(&store, &wrong_compartment)), ErrorKind::Validation);

        assert_eq!(kind(p.project(&store, &deposited("E4", "L2", "R1"))), ErrorKind::Validation);

        let matching = event(
            "E5",
            "L1",
            EventType::ParcelDeposited,
            Payload::new().with("reservation_id", "R1").with("compartment_id", "C1"),
        );
        p.project(&store, &matching).unwrap();
        assert_eq!(status(&store, "R1"), ReservationStatus::Deposited);
    }

    #[test]
    fn expiry_of_unknown_reservation_is_tolerated() {
        let store = InMemoryReadModelStore::new();
        run(&store, &[registered("E1", "L1", "C1"), expired("E2", "L1", "R404")]);
        assert_eq!(locker(&store, "L1").active_reservations(), 0);
        assert!(store.get_reservation(&"R404".into()).unwrap().is_none());
    }

    #[test]
    fn expiry_from_another_locker_is_rejected_in_both_counting_modes() {
        for counting in [ExpiryCounting::ActiveOnly, ExpiryCounting::Unconditional] {
            let store = InMemoryReadModelStore::new();
            let p = LockerProjector::new(ProjectorConfig {
                expiry_counting: counting,
                ..ProjectorConfig::default()
            });
            for e in [
                registered("E1", "L1", "C1"),
                registered("E2", "L2", "C1"),
                reservation_created("E3", "L1", "C1", "R1"),
            ] {
                p.project(&store, &e).unwrap();
            }
            let before = store.snapshot().unwrap();

            assert_eq!(
                kind(p.project(&store, &expired("E4", "L2", "R1"))),
                ErrorKind::Validation
            );
            assert_eq!(store.snapshot().unwrap(), before);
            assert_eq!(status(&store, "R1"), ReservationStatus::Created);
            assert_eq!(locker(&store, "L1").active_reservations(), 1);
        }
    }

    #[test]
    fn expiry_after_pickup_leaves_state_unchanged() {
        let store = InMemoryReadModelStore::new();
        run(
            &store,
            &[
                registered("E1", "L1", "C1"),
                registered("E2", "L1", "C2"),
                reservation_created("E3", "L1", "C1", "R1"),
                deposited("E4", "L1", "R1"),
                picked_up("E5", "L1", "R1"),
                reservation_created("E6", "L1", "C2", "R2"),
            ],
        );
        let before = store.snapshot().unwrap();

        run(&store, &[expired("E7", "L1", "R1")]);

        assert_eq!(store.snapshot().unwrap(), before);
        assert_eq!(status(&store, "R1"), ReservationStatus::PickedUp);
        assert_eq!(locker(&store, "L1").active_reservations(), 1);
    }

    #[test]
    fn unconditional_expiry_counting_always_decrements_with_a_floor() {
        let store = InMemoryReadModelStore::new();
        let p = LockerProjector::new(ProjectorConfig {
            expiry_counting: ExpiryCounting::Unconditional,
            ..ProjectorConfig::default()
        });
        for e in [
            registered("E1", "L1", "C1"),
            registered("E2", "L1", "C2"),
            reservation_created("E3", "L1", "C1", "R1"),
            reservation_created("E4", "L1", "C2", "R2"),
            expired("E5", "L1", "R404"),
        ] {
            p.project(&store, &e).unwrap();
        }
        assert_eq!(locker(&store, "L1").active_reservations(), 1);

        for e in [expired("E6", "L1", "R1"), expired("E7", "L1", "R1")] {
            p.project(&store, &e).unwrap();
        }
        let l = locker(&store, "L1");
        assert_eq!(l.active_reservations(), 0);
        assert!(l.hash_is_consistent());
    }

    #[test]
    fn fault_report_and_clear_scenario() {
        let store = InMemoryReadModelStore::new();
        run(
            &store,
            &[
                registered("E1", "L1", "C1"),
                fault_reported("E2", "L1", "C1", 4),
            ],
        );

        let c = compartment(&store, "L1", "C1");
        assert!(c.is_faulty() && c.is_degraded());
        assert_eq!(locker(&store, "L1").degraded_compartments(), 1);

        let p = projector();
        assert_eq!(
            kind(p.project(&store, &reservation_created("E3", "L1", "C1", "R1"))),
            ErrorKind::RuleViolation
        );

        p.project(&store, &fault_cleared("E4", "L1", "C1", "E2")).unwrap();
        let c = compartment(&store, "L1", "C1");
        assert!(!c.is_faulty() && !c.is_degraded());
        assert_eq!(locker(&store, "L1").degraded_compartments(), 0);

        let fault = store.get_fault(&"E2".into()).unwrap().unwrap();
        assert_eq!(fault.cleared_by_event_id(), Some(&EventId::from("E4")));

        assert_eq!(
            kind(p.project(&store, &fault_cleared("E5", "L1", "C1", "E2"))),
            ErrorKind::RuleViolation
        );
    }

    #[test]
    fn low_severity_faults_mark_faulty_but_not_degraded() {
        let store = InMemoryReadModelStore::new();
        run(
            &store,
            &[
                registered("E1", "L1", "C1"),
                fault_reported("E2", "L1", "C1", 2),
            ],
        );
        let c = compartment(&store, "L1", "C1");
        assert!(c.is_faulty());
        assert!(!c.is_degraded());
        assert_eq!(locker(&store, "L1").degraded_compartments(), 0);

        run(&store, &[reservation_created("E3", "L1", "C1", "R1")]);
        assert_eq!(status(&store, "R1"), ReservationStatus::Created);
    }

    #[test]
    fn compartment_stays_degraded_until_every_severe_fault_clears() {
        let store = InMemoryReadModelStore::new();
        run(
            &store,
            &[
                registered("E1", "L1", "C1"),
                fault_reported("F1", "L1", "C1", 3),
                fault_reported("F2", "L1", "C1", 5),
                fault_reported("F3", "L1", "C1", 1),
            ],
        );
        assert_eq!(locker(&store, "L1").degraded_compartments(), 1);

        run(&store, &[fault_cleared("X1", "L1", "C1", "F2")]);
        assert!(compartment(&store, "L1", "C1").is_degraded());

        run(&store, &[fault_cleared("X2", "L1", "C1", "F1")]);
        let c = compartment(&store, "L1", "C1");
        assert!(!c.is_degraded());
        assert!(c.is_faulty());
        assert_eq!(locker(&store, "L1").degraded_compartments(), 0);
    }

    #[test]
    fn threshold_is_configurable() {
        let store = InMemoryReadModelStore::new();
        let p = LockerProjector::new(ProjectorConfig {
            degrade_threshold: 5,
            ..ProjectorConfig::default()
        });
        p.project(&store, &registered("E1", "L1", "C1")).unwrap();
        p.project(&store, &fault_reported("E2", "L1", "C1", 4)).unwrap();
        assert!(!compartment(&store, "L1", "C1").is_degraded());
        p.project(&store, &fault_reported("E3", "L1", "C1", 5)).unwrap();
        assert!(compartment(&store, "L1", "C1").is_degraded());
    }

    #[test]
    fn clearing_a_fault_of_another_compartment_is_rejected() {
        let store = InMemoryReadModelStore::new();
        run(
            &store,
            &[
                registered("E1", "L1", "C1"),
                registered("E2", "L1", "C2"),
                fault_reported("F1", "L1", "C1", 4),
            ],
        );
        let p = projector();
        assert_eq!(
            kind(p.project(&store, &fault_cleared("X1", "L1", "C2", "F1"))),
            ErrorKind::RuleViolation
        );
        assert_eq!(
            kind(p.project(&store, &fault_cleared("X2", "L1", "C1", "F404"))),
            ErrorKind::RuleViolation
        );
        assert_eq!(
            kind(p.project(&store, &fault_cleared("X3", "L1", "C9", "F1"))),
            ErrorKind::Validation
        );
        assert!(!store.get_fault(&"F1".into()).unwrap().unwrap().is_cleared());
    }

    #[test]
    fn fault_on_unregistered_compartment_is_a_validation_error() {
        let store = InMemoryReadModelStore::new();
        assert_eq!(
            kind(projector().project(&store, &fault_reported("F1", "L1", "C1", 4))),
            ErrorKind::Validation
        );
        assert!(store.get_fault(&"F1".into()).unwrap().is_none());
    }

    #[test]
    fn malformed_payloads_are_validation_errors() {
        let store = InMemoryReadModelStore::new();
        run(&store, &[registered("E1", "L1", "C1")]);
        let p = projector();

        let cases = [
            event("E2", "L1", EventType::CompartmentRegistered, Payload::new()),
            event(
                "E3",
                "L1",
                EventType::CompartmentRegistered,
                Payload::new().with("compartment_id", ""),
            ),
            event(
                "E4",
                "L1",
                EventType::FaultReported,
                Payload::new().with("compartment_id", "C1").with("severity", 4.5),
            ),
            event(
                "E5",
                "L1",
                EventType::FaultReported,
                Payload::new().with("compartment_id", "C1").with("severity", true),
            ),
        ];
        for e in &cases {
            let err = p.project(&store, e).unwrap_err();
            assert!(
                matches!(err, EngineError::Domain(DomainError::Validation(_))),
                "{}: {err}",
                e.event_id()
            );
        }
        assert_eq!(locker(&store, "L1").compartments(), 1);
    }

    #[test]
    fn failed_handler_leaves_every_aggregate_untouched() {
        let store = InMemoryReadModelStore::new();
        run(
            &store,
            &[
                registered("E1", "L1", "C1"),
                fault_reported("F1", "L1", "C1", 4),
            ],
        );
        let before = store.snapshot().unwrap();

        let p = projector();
        let _ = p.project(&store, &reservation_created("E2", "L1", "C1", "R1"));
        let _ = p.project(&store, &registered("E3", "L1", "C1"));
        let _ = p.project(&store, &fault_cleared("E4", "L1", "C1", "F404"));

        assert_eq!(store.snapshot().unwrap(), before);
    }

    #[test]
    fn every_written_locker_carries_a_consistent_hash() {
        let store = InMemoryReadModelStore::new();
        run(
            &store,
            &[
                registered("E1", "L1", "C1"),
                registered("E2", "L1", "C2"),
                reservation_created("E3", "L1", "C1", "R1"),
                fault_reported("F1", "L1", "C2", 5),
                deposited("E4", "L1", "R1"),
                expired("E5", "L1", "R1"),
                fault_cleared("X1", "L1", "C2", "F1"),
            ],
        );
        for l in store.list_lockers().unwrap() {
            assert!(l.hash_is_consistent(), "{}", l.locker_id());
        }
    }
}
