use std::collections::BTreeMap;
use std::sync::RwLock;

use lockstream_core::{CompartmentKey, EventId, LockerId, ReservationId};
use lockstream_lockers::{Compartment, Fault, Locker, Reservation};

use super::r#trait::{ChangeSet, ReadModelSnapshot, ReadModelStore, StoreError, StoreResult};

#[derive(Debug, Default)]
struct Tables {
    lockers: BTreeMap<LockerId, Locker>,
    compartments: BTreeMap<CompartmentKey, Compartment>,
    reservations: BTreeMap<ReservationId, Reservation>,
    faults: BTreeMap<EventId, Fault>,
}

/// In-memory read model store for tests/dev.
///
/// A commit is applied inside one write-lock critical section.
#[derive(Debug, Default)]
pub struct InMemoryReadModelStore {
    inner: RwLock<Tables>,
}

impl InMemoryReadModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read<T>(&self, f: impl FnOnce(&Tables) -> T) -> StoreResult<T> {
        let tables = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(f(&tables))
    }
}

impl ReadModelStore for InMemoryReadModelStore {
    fn get_locker(&self, locker_id: &LockerId) -> StoreResult<Option<Locker>> {
        self.read(|t| t.lockers.get(locker_id).cloned())
    }

    fn get_compartment(&self, key: &CompartmentKey) -> StoreResult<Option<Compartment>> {
        self.read(|t| t.compartments.get(key).cloned())
    }

    fn get_reservation(&self, reservation_id: &ReservationId) -> StoreResult<Option<Reservation>> {
        self.read(|t| t.reservations.get(reservation_id).cloned())
    }

    fn get_fault(&self, fault_event_id: &EventId) -> StoreResult<Option<Fault>> {
        self.read(|t| t.faults.get(fault_event_id).cloned())
    }

    fn compartment_faults(&self, key: &CompartmentKey) -> StoreResult<Vec<Fault>> {
        self.read(|t| {
            t.faults
                .values()
                .filter(|f| f.belongs_to(&key.locker_id, &key.compartment_id))
                .cloned()
                .collect()
        })
    }

    fn list_lockers(&self) -> StoreResult<Vec<Locker>> {
        self.read(|t| t.lockers.values().cloned().collect())
    }

    fn snapshot(&self) -> StoreResult<ReadModelSnapshot> {
        self.read(|t| ReadModelSnapshot {
            lockers: t.lockers.values().cloned().collect(),
            compartments: t.compartments.values().cloned().collect(),
            reservations: t.reservations.values().cloned().collect(),
            faults: t.faults.values().cloned().collect(),
        })
    }

    fn commit(&self, changes: ChangeSet) -> StoreResult<()> {
        let mut tables = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        tables.lockers.extend(changes.lockers);
        tables.compartments.extend(changes.compartments);
        tables.reservations.extend(changes.reservations);
        tables.faults.extend(changes.faults);
        Ok(())
    }

    fn reset(&self) -> StoreResult<()> {
        let mut tables = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        *tables = Tables::default();
        Ok(())
    }
}
