//! Rebuild and verification of read models from the event log.
//!
//! Rebuild discards every read model and feeds the whole log, in append
//! order, through the same projector live ingestion uses. Admission is
//! bypassed: the records are already in the log.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use lockstream_core::LockerId;

use crate::error::EngineResult;
use crate::event_log::{EventLog, LoggedEvent};
use crate::projections::locker::LockerProjector;
use crate::read_model::{InMemoryReadModelStore, ReadModelStore};

/// Outcome of a rebuild.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RebuildReport {
    /// Records fed to the projector.
    pub replayed_events: u64,
    /// Records the projector rejected (validation or rule violation).
    pub rejected_events: u64,
}

/// Outcome of comparing the live read model with a fresh replay.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerificationReport {
    pub checked_lockers: usize,
    /// Lockers whose counters or hash differ, or that exist on one side only.
    pub mismatched_lockers: Vec<LockerId>,
    /// Every table, not just lockers, equals the replayed state.
    pub read_model_matches: bool,
}

impl VerificationReport {
    pub fn is_consistent(&self) -> bool {
        self.mismatched_lockers.is_empty() && self.read_model_matches
    }
}

/// Reset `store` and replay the whole log into it.
///
/// Records rejected with a validation or rule error were rejected the same
/// way when first ingested and left no trace, so they are skipped. Any other
/// error aborts the rebuild and leaves `store` partially rebuilt.
pub fn rebuild<L, S>(log: &L, store: &S, projector: &LockerProjector) -> EngineResult<RebuildReport>
where
    L: EventLog + ?Sized,
    S: ReadModelStore + ?Sized,
{
    let records = log.read_all()?;
    tracing::info!(phase = "clearing", total_events = records.len(), "rebuilding read models");
    store.reset()?;

    let report = replay(&records, store, projector)?;
    tracing::info!(
        phase = "complete",
        replayed_events = report.replayed_events,
        rejected_events = report.rejected_events,
        "read models rebuilt"
    );
    Ok(report)
}

/// Replay the log into a scratch store and compare it with `store`.
///
/// `store` is only read.
pub fn verify<L, S>(
    log: &L,
    store: &S,
    projector: &LockerProjector,
) -> EngineResult<VerificationReport>
where
    L: EventLog + ?Sized,
    S: ReadModelStore + ?Sized,
{
    let scratch = InMemoryReadModelStore::new();
    replay(&log.read_all()?, &scratch, projector)?;

    let expected: BTreeMap<LockerId, _> = scratch
        .list_lockers()?
        .into_iter()
        .map(|l| (l.locker_id().clone(), l))
        .collect();
    let actual: BTreeMap<LockerId, _> = store
        .list_lockers()?
        .into_iter()
        .map(|l| (l.locker_id().clone(), l))
        .collect();

    let ids: BTreeSet<&LockerId> = expected.keys().chain(actual.keys()).collect();
    let mismatched_lockers: Vec<LockerId> = ids
        .iter()
        .filter(|id| expected.get(**id) != actual.get(**id))
        .map(|id| (*id).clone())
        .collect();

    let report = VerificationReport {
        checked_lockers: ids.len(),
        read_model_matches: scratch.snapshot()? == store.snapshot()?,
        mismatched_lockers,
    };

    if report.is_consistent() {
        tracing::info!(checked_lockers = report.checked_lockers, "read models verified");
    } else {
        tracing::warn!(
            checked_lockers = report.checked_lockers,
            mismatched = ?report.mismatched_lockers,
            read_model_matches = report.read_model_matches,
            "read models diverge from the event log"
        );
    }
    Ok(report)
}

fn replay<S>(
    records: &[LoggedEvent],
    store: &S,
    projector: &LockerProjector,
) -> EngineResult<RebuildReport>
where
    S: ReadModelStore + ?Sized,
{
    let mut report = RebuildReport::default();

    for record in records {
        report.replayed_events += 1;
        match projector.project(store, &record.event) {
            Ok(()) => {}
            Err(e) if e.is_rejection() => {
                report.rejected_events += 1;
                tracing::warn!(
                    sequence_number = record.sequence_number,
                    event_id = %record.event.event_id(),
                    error = %e,
                    "skipping rejected event during replay"
                );
            }
            Err(e) => {
                tracing::error!(
                    sequence_number = record.sequence_number,
                    event_id = %record.event.event_id(),
                    "replay aborted: {e}"
                );
                return Err(e);
            }
        }
    }

    Ok(report)
}
