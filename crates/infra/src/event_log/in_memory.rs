use std::collections::HashSet;
use std::sync::RwLock;

use lockstream_core::EventId;
use lockstream_events::Event;

use super::r#trait::{EventLog, EventLogError, LoggedEvent};

#[derive(Debug, Default)]
struct Inner {
    records: Vec<Event>,
    index: HashSet<EventId>,
}

/// In-memory append-only event log.
///
/// Intended for tests/dev. Not durable.
#[derive(Debug, Default)]
pub struct InMemoryEventLog {
    inner: RwLock<Inner>,
}

impl InMemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventLog for InMemoryEventLog {
    fn add_if_absent(&self, event: &Event) -> Result<bool, EventLogError> {
        let mut inner = self.inner.write().map_err(|_| EventLogError::Poisoned)?;

        if !inner.index.insert(event.event_id().clone()) {
            return Ok(false);
        }
        inner.records.push(event.clone());
        Ok(true)
    }

    fn read_all(&self) -> Result<Vec<LoggedEvent>, EventLogError> {
        let inner = self.inner.read().map_err(|_| EventLogError::Poisoned)?;

        Ok(inner
            .records
            .iter()
            .zip(1u64..)
            .map(|(event, sequence_number)| LoggedEvent {
                sequence_number,
                event: event.clone(),
            })
            .collect())
    }

    fn contains(&self, event_id: &EventId) -> Result<bool, EventLogError> {
        let inner = self.inner.read().map_err(|_| EventLogError::Poisoned)?;
        Ok(inner.index.contains(event_id))
    }

    fn len(&self) -> Result<usize, EventLogError> {
        let inner = self.inner.read().map_err(|_| EventLogError::Poisoned)?;
        Ok(inner.records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::registered;

    #[test]
    fn duplicate_ids_are_ignored_even_with_different_payloads() {
        let log = InMemoryEventLog::new();
        assert!(log.add_if_absent(&registered("E1", "L1", "C1")).unwrap());
        assert!(!log.add_if_absent(&registered("E1", "L1", "C999")).unwrap());

        let all = log.read_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(
            all[0].event.payload().require_str("compartment_id").unwrap(),
            "C1"
        );
    }

    #[test]
    fn read_all_preserves_append_order_with_sequence_numbers() {
        let log = InMemoryEventLog::new();
        for (i, id) in ["E3", "E1", "E2"].into_iter().enumerate() {
            log.add_if_absent(&registered(id, "L1", &format!("C{i}"))).unwrap();
        }

        let ids: Vec<_> = log
            .read_all()
            .unwrap()
            .into_iter()
            .map(|r| (r.sequence_number, r.event.event_id().to_string()))
            .collect();
        assert_eq!(
            ids,
            vec![(1, "E3".to_string()), (2, "E1".to_string()), (3, "E2".to_string())]
        );
        assert_eq!(log.len().unwrap(), 3);
        assert!(log.contains(&"E2".into()).unwrap());
        assert!(!log.contains(&"E4".into()).unwrap());
    }

    #[test]
    fn empty_log_reports_empty() {
        let log = InMemoryEventLog::new();
        assert!(log.is_empty().unwrap());
        assert!(log.read_all().unwrap().is_empty());
    }
}
