//! Read model storage: repository ports, unit of work and store backends.
//!
//! Read models are disposable. Deleting them and replaying the event log
//! must always reproduce the same state.

pub mod in_memory;
pub mod repositories;
pub mod sqlite;
pub mod r#trait;
pub mod unit_of_work;

pub use in_memory::InMemoryReadModelStore;
pub use repositories::{
    CompartmentRepository, FaultRepository, LockerRepository, Repositories, ReservationRepository,
};
pub use sqlite::SqliteReadModelStore;
pub use r#trait::{ChangeSet, ReadModelSnapshot, ReadModelStore, StoreError, StoreResult};
pub use unit_of_work::UnitOfWork;
