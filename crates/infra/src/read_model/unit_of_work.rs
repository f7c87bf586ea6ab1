use std::collections::BTreeMap;

use lockstream_core::{CompartmentKey, Entity, EventId, LockerId, ReservationId};
use lockstream_lockers::{Compartment, Fault, Locker, Reservation};

use super::repositories::{
    CompartmentRepository, FaultRepository, LockerRepository, ReservationRepository,
};
use super::r#trait::{ChangeSet, ReadModelStore, StoreResult};

/// Staged writes of one projected event over a read model store.
///
/// Reads see staged writes first (read-your-writes) and fall through to the
/// store otherwise. Nothing reaches the store until `commit()`; dropping the
/// unit of work discards every staged write.
pub struct UnitOfWork<'a, S: ReadModelStore + ?Sized> {
    store: &'a S,
    changes: ChangeSet,
}

impl<'a, S: ReadModelStore + ?Sized> UnitOfWork<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            changes: ChangeSet::default(),
        }
    }

    pub fn changes(&self) -> &ChangeSet {
        &self.changes
    }

    /// Apply every staged write atomically.
    pub fn commit(self) -> StoreResult<()> {
        if self.changes.is_empty() {
            return Ok(());
        }
        self.store.commit(self.changes)
    }
}

/// Stage `entity` under its own id, replacing any earlier staged version.
fn stage<E: Entity>(table: &mut BTreeMap<E::Id, E>, entity: E) {
    table.insert(entity.id().clone(), entity);
}

impl<S: ReadModelStore + ?Sized> LockerRepository for UnitOfWork<'_, S> {
    fn get_locker(&self, locker_id: &LockerId) -> StoreResult<Option<Locker>> {
        match self.changes.lockers.get(locker_id) {
            Some(staged) => Ok(Some(staged.clone())),
            None => self.store.get_locker(locker_id),
        }
    }

    fn upsert_locker(&mut self, locker: Locker) -> StoreResult<()> {
        stage(&mut self.changes.lockers, locker);
        Ok(())
    }
}

impl<S: ReadModelStore + ?Sized> CompartmentRepository for UnitOfWork<'_, S> {
    fn get_compartment(&self, key: &CompartmentKey) -> StoreResult<Option<Compartment>> {
        match self.changes.compartments.get(key) {
            Some(staged) => Ok(Some(staged.clone())),
            None => self.store.get_compartment(key),
        }
    }

    fn upsert_compartment(&mut self, compartment: Compartment) -> StoreResult<()> {
        stage(&mut self.changes.compartments, compartment);
        Ok(())
    }
}

impl<S: ReadModelStore + ?Sized> ReservationRepository for UnitOfWork<'_, S> {
    fn get_reservation(&self, reservation_id: &ReservationId) -> StoreResult<Option<Reservation>> {
        match self.changes.reservations.get(reservation_id) {
            Some(staged) => Ok(Some(staged.clone())),
            None => self.store.get_reservation(reservation_id),
        }
    }

    fn upsert_reservation(&mut self, reservation: Reservation) -> StoreResult<()> {
        stage(&mut self.changes.reservations, reservation);
        Ok(())
    }
}

impl<S: ReadModelStore + ?Sized> FaultRepository for UnitOfWork<'_, S> {
    fn get_fault(&self, fault_event_id: &EventId) -> StoreResult<Option<Fault>> {
        match self.changes.faults.get(fault_event_id) {
            Some(staged) => Ok(Some(staged.clone())),
            None => self.store.get_fault(fault_event_id),
        }
    }

    fn upsert_fault(&mut self, fault: Fault) -> StoreResult<()> {
        stage(&mut self.changes.faults, fault);
        Ok(())
    }

    fn compartment_faults(&self, key: &CompartmentKey) -> StoreResult<Vec<Fault>> {
        let mut merged: BTreeMap<EventId, Fault> = self
            .store
            .compartment_faults(key)?
            .into_iter()
            .map(|f| (f.fault_event_id().clone(), f))
            .collect();

        // A fault never moves between compartments, so staged rows only
        // replace or extend what the store already holds for this key.
        for staged in self.changes.faults.values() {
            if staged.belongs_to(&key.locker_id, &key.compartment_id) {
                merged.insert(staged.fault_event_id().clone(), staged.clone());
            }
        }

        Ok(merged.into_values().collect())
    }
}
