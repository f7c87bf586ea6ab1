use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;

use lockstream_core::{CompartmentKey, EventId, LockerId, ReservationId};
use lockstream_lockers::{Compartment, Fault, Locker, Reservation};

/// Read model storage error.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("cannot encode {table} row: {reason}")]
    Encode { table: &'static str, reason: String },

    #[error("cannot decode {table} row: {reason}")]
    Decode { table: &'static str, reason: String },

    #[error("failed to start storage runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("read model lock poisoned")]
    Poisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Writes staged by one projected event, keyed like the underlying tables.
///
/// Applying a change set is an upsert per entry; nothing is ever deleted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub lockers: BTreeMap<LockerId, Locker>,
    pub compartments: BTreeMap<CompartmentKey, Compartment>,
    pub reservations: BTreeMap<ReservationId, Reservation>,
    pub faults: BTreeMap<EventId, Fault>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn len(&self) -> usize {
        self.lockers.len() + self.compartments.len() + self.reservations.len() + self.faults.len()
    }
}

/// Every row of every table, each ordered by key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadModelSnapshot {
    pub lockers: Vec<Locker>,
    pub compartments: Vec<Compartment>,
    pub reservations: Vec<Reservation>,
    pub faults: Vec<Fault>,
}

/// Disposable read model storage.
///
/// ## Atomicity
///
/// `commit()` applies a whole `ChangeSet` or nothing. Readers never observe a
/// partially applied change set.
///
/// ## Rebuild
///
/// `reset()` empties every table. The event log is the source of truth; the
/// read model can always be recomputed from it.
pub trait ReadModelStore: Send + Sync {
    fn get_locker(&self, locker_id: &LockerId) -> StoreResult<Option<Locker>>;

    fn get_compartment(&self, key: &CompartmentKey) -> StoreResult<Option<Compartment>>;

    fn get_reservation(&self, reservation_id: &ReservationId) -> StoreResult<Option<Reservation>>;

    fn get_fault(&self, fault_event_id: &EventId) -> StoreResult<Option<Fault>>;

    /// All faults (cleared or not) recorded against one compartment.
    fn compartment_faults(&self, key: &CompartmentKey) -> StoreResult<Vec<Fault>>;

    fn list_lockers(&self) -> StoreResult<Vec<Locker>>;

    fn snapshot(&self) -> StoreResult<ReadModelSnapshot>;

    fn commit(&self, changes: ChangeSet) -> StoreResult<()>;

    fn reset(&self) -> StoreResult<()>;
}

impl<S> ReadModelStore for Arc<S>
where
    S: ReadModelStore + ?Sized,
{
    fn get_locker(&self, locker_id: &LockerId) -> StoreResult<Option<Locker>> {
        (**self).get_locker(locker_id)
    }

    fn get_compartment(&self, key: &CompartmentKey) -> StoreResult<Option<Compartment>> {
        (**self).get_compartment(key)
    }

    fn get_reservation(&self, reservation_id: &ReservationId) -> StoreResult<Option<Reservation>> {
        (**self).get_reservation(reservation_id)
    }

    fn get_fault(&self, fault_event_id: &EventId) -> StoreResult<Option<Fault>> {
        (**self).get_fault(fault_event_id)
    }

    fn compartment_faults(&self, key: &CompartmentKey) -> StoreResult<Vec<Fault>> {
        (**self).compartment_faults(key)
    }

    fn list_lockers(&self) -> StoreResult<Vec<Locker>> {
        (**self).list_lockers()
    }

    fn snapshot(&self) -> StoreResult<ReadModelSnapshot> {
        (**self).snapshot()
    }

    fn commit(&self, changes: ChangeSet) -> StoreResult<()> {
        (**self).commit(changes)
    }

    fn reset(&self) -> StoreResult<()> {
        (**self).reset()
    }
}
