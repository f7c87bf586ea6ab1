//! Engine facade: admission, projection, rebuild and queries.

use std::sync::Mutex;

use serde::Serialize;
use tracing::instrument;

use lockstream_core::{CompartmentId, CompartmentKey, DomainError, EventId, LockerId, ReservationId};
use lockstream_events::{Event, RawEvent};
use lockstream_lockers::{Compartment, Fault, Locker, Reservation};

use crate::error::EngineResult;
use crate::event_log::EventLog;
use crate::projections::{self, LockerProjector, ProjectorConfig, RebuildReport, VerificationReport};
use crate::read_model::{ReadModelStore, StoreError};

/// Result of `ingest`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IngestOutcome {
    /// `false` when the event id was already in the log; nothing changed.
    pub accepted: bool,
}

/// Event ingestion and projection engine.
///
/// ## Ordering
///
/// `ingest` admits the event into the log first and projects it second.
/// A projection error propagates to the caller but the event stays in the
/// log; rebuild rejects it the same way again.
///
/// ## Concurrency
///
/// One writer at a time: `ingest`, `rebuild` and `verify` are serialised.
/// Queries read the store directly and see pre- or post-event state.
pub struct LockstreamEngine<L, S> {
    log: L,
    store: S,
    projector: LockerProjector,
    writer: Mutex<()>,
}

impl<L, S> LockstreamEngine<L, S>
where
    L: EventLog,
    S: ReadModelStore,
{
    pub fn new(log: L, store: S, config: ProjectorConfig) -> Self {
        Self {
            log,
            store,
            projector: LockerProjector::new(config),
            writer: Mutex::new(()),
        }
    }

    pub fn log(&self) -> &L {
        &self.log
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn projector(&self) -> &LockerProjector {
        &self.projector
    }

    #[instrument(skip_all, fields(event_id = %event.event_id(), event_type = %event.event_type()))]
    pub fn ingest(&self, event: &Event) -> EngineResult<IngestOutcome> {
        let _writer = self.writer.lock().map_err(|_| StoreError::Poisoned)?;

        if !self.log.add_if_absent(event)? {
            tracing::debug!("duplicate event ignored");
            return Ok(IngestOutcome { accepted: false });
        }

        if let Err(e) = self.projector.project(&self.store, event) {
            tracing::warn!(error = %e, kind = ?e.kind(), "event logged but rejected by projector");
            return Err(e);
        }

        tracing::debug!("event ingested");
        Ok(IngestOutcome { accepted: true })
    }

    /// Ingest an event still in wire form; an unknown type tag fails before
    /// anything is logged.
    pub fn ingest_raw(&self, raw: RawEvent) -> EngineResult<IngestOutcome> {
        let event = Event::try_from(raw)?;
        self.ingest(&event)
    }

    #[instrument(skip_all)]
    pub fn rebuild(&self) -> EngineResult<RebuildReport> {
        let _writer = self.writer.lock().map_err(|_| StoreError::Poisoned)?;
        projections::rebuild(&self.log, &self.store, &self.projector)
    }

    #[instrument(skip_all)]
    pub fn verify(&self) -> EngineResult<VerificationReport> {
        let _writer = self.writer.lock().map_err(|_| StoreError::Poisoned)?;
        projections::verify(&self.log, &self.store, &self.projector)
    }

    pub fn locker_summary(&self, locker_id: &LockerId) -> EngineResult<Locker> {
        self.store
            .get_locker(locker_id)?
            .ok_or_else(|| DomainError::not_found("locker", locker_id).into())
    }

    pub fn compartment_status(
        &self,
        locker_id: &LockerId,
        compartment_id: &CompartmentId,
    ) -> EngineResult<Compartment> {
        let key = CompartmentKey::new(locker_id.clone(), compartment_id.clone());
        self.store
            .get_compartment(&key)?
            .ok_or_else(|| DomainError::not_found("compartment", &key).into())
    }

    pub fn reservation_status(&self, reservation_id: &ReservationId) -> EngineResult<Reservation> {
        self.store
            .get_reservation(reservation_id)?
            .ok_or_else(|| DomainError::not_found("reservation", reservation_id).into())
    }

    pub fn fault(&self, fault_event_id: &EventId) -> EngineResult<Fault> {
        self.store
            .get_fault(fault_event_id)?
            .ok_or_else(|| DomainError::not_found("fault", fault_event_id).into())
    }
}
