//! File-backed event log (JSON Lines).
//!
//! Each admitted event is written as one line in the canonical wire shape.
//! The file is only ever appended to; the id index is rebuilt from the file
//! when the log is opened.
//!
//! ## Durability
//!
//! `add_if_absent` flushes and `sync_data`s the file before returning
//! `Ok(true)`. A torn final line (crash mid-write) is reported as
//! `EventLogError::Corrupt` on the next open; it is not repaired.

use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::instrument;

use lockstream_core::EventId;
use lockstream_events::{Event, RawEvent};

use super::r#trait::{EventLog, EventLogError, LoggedEvent};

#[derive(Debug)]
struct Appender {
    file: File,
    index: HashSet<EventId>,
}

/// Durable append-only event log backed by a JSONL file.
#[derive(Debug)]
pub struct JsonlEventLog {
    path: PathBuf,
    appender: Mutex<Appender>,
}

impl JsonlEventLog {
    /// Open (or create) the log at `path`, creating parent directories.
    #[instrument(skip_all, fields(path = %path.as_ref().display()), err)]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, EventLogError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        let records = read_lines(&path)?;
        let mut index = HashSet::with_capacity(records.len());
        for (line, record) in &records {
            if !index.insert(record.event.event_id().clone()) {
                return Err(EventLogError::Corrupt {
                    line: *line,
                    reason: format!("duplicate event_id {}", record.event.event_id()),
                });
            }
        }

        tracing::debug!(records = records.len(), "event log opened");

        Ok(Self {
            path,
            appender: Mutex::new(Appender { file, index }),
        })
    }
}

impl EventLog for JsonlEventLog {
    #[instrument(skip_all, fields(event_id = %event.event_id()), err)]
    fn add_if_absent(&self, event: &Event) -> Result<bool, EventLogError> {
        let mut appender = self.appender.lock().map_err(|_| EventLogError::Poisoned)?;

        if appender.index.contains(event.event_id()) {
            tracing::debug!("duplicate event id, not admitted");
            return Ok(false);
        }

        let mut line = serde_json::to_string(event).map_err(|e| EventLogError::Serialize {
            event_id: event.event_id().clone(),
            reason: e.to_string(),
        })?;
        line.push('\n');

        appender.file.write_all(line.as_bytes())?;
        appender.file.flush()?;
        appender.file.sync_data()?;

        appender.index.insert(event.event_id().clone());
        Ok(true)
    }

    fn read_all(&self) -> Result<Vec<LoggedEvent>, EventLogError> {
        // Hold the appender lock so a concurrent append is never half-read.
        let _appender = self.appender.lock().map_err(|_| EventLogError::Poisoned)?;
        Ok(read_lines(&self.path)?
            .into_iter()
            .map(|(_, record)| record)
            .collect())
    }

    fn contains(&self, event_id: &EventId) -> Result<bool, EventLogError> {
        let appender = self.appender.lock().map_err(|_| EventLogError::Poisoned)?;
        Ok(appender.index.contains(event_id))
    }

    fn len(&self) -> Result<usize, EventLogError> {
        let appender = self.appender.lock().map_err(|_| EventLogError::Poisoned)?;
        Ok(appender.index.len())
    }
}

/// Decode every non-blank line of the file, in order, paired with its
/// 1-based line number in the file.
fn read_lines(path: &Path) -> Result<Vec<(usize, LoggedEvent)>, EventLogError> {
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = idx + 1;
        if line.trim().is_empty() {
            continue;
        }

        let raw: RawEvent = serde_json::from_str(&line).map_err(|e| EventLogError::Corrupt {
            line: line_no,
            reason: e.to_string(),
        })?;
        let event = Event::try_from(raw).map_err(|e| EventLogError::Corrupt {
            line: line_no,
            reason: e.to_string(),
        })?;

        let sequence_number = records.len() as u64 + 1;
        records.push((line_no, LoggedEvent { sequence_number, event }));
    }

    Ok(records)
}
