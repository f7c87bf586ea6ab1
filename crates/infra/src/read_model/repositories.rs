//! Aggregate repository ports.
//!
//! The projector reaches persisted state only through these four traits.
//! Reads take `&self`; writes take `&mut self` because implementations stage
//! them (see `UnitOfWork`).

use lockstream_core::{CompartmentKey, EventId, LockerId, ReservationId};
use lockstream_lockers::{Compartment, Fault, FaultSummary, Locker, Reservation};

use super::r#trait::StoreResult;

pub trait LockerRepository {
    fn get_locker(&self, locker_id: &LockerId) -> StoreResult<Option<Locker>>;

    fn upsert_locker(&mut self, locker: Locker) -> StoreResult<()>;
}

pub trait CompartmentRepository {
    fn get_compartment(&self, key: &CompartmentKey) -> StoreResult<Option<Compartment>>;

    fn upsert_compartment(&mut self, compartment: Compartment) -> StoreResult<()>;
}

pub trait ReservationRepository {
    fn get_reservation(&self, reservation_id: &ReservationId) -> StoreResult<Option<Reservation>>;

    fn upsert_reservation(&mut self, reservation: Reservation) -> StoreResult<()>;
}

pub trait FaultRepository {
    fn get_fault(&self, fault_event_id: &EventId) -> StoreResult<Option<Fault>>;

    fn upsert_fault(&mut self, fault: Fault) -> StoreResult<()>;

    fn compartment_faults(&self, key: &CompartmentKey) -> StoreResult<Vec<Fault>>;

    /// Count and maximum severity of the compartment's uncleared faults.
    fn active_fault_summary(&self, key: &CompartmentKey) -> StoreResult<FaultSummary> {
        Ok(FaultSummary::from_faults(&self.compartment_faults(key)?))
    }
}

/// All four ports together; what a projector handler needs.
pub trait Repositories:
    LockerRepository + CompartmentRepository + ReservationRepository + FaultRepository
{
}

impl<T> Repositories for T where
    T: LockerRepository + CompartmentRepository + ReservationRepository + FaultRepository + ?Sized
{
}
