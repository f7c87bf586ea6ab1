//! Line-oriented adapter: wire events in on one stream, one JSON result
//! line out per event.

use std::io::{BufRead, Write};

use anyhow::Context;
use serde::Serialize;

use lockstream_events::RawEvent;
use lockstream_infra::event_log::{EventLog, JsonlEventLog};
use lockstream_infra::read_model::{ReadModelStore, SqliteReadModelStore};
use lockstream_infra::{EngineConfig, EngineError, ErrorKind, LockstreamEngine};

pub type Engine = LockstreamEngine<JsonlEventLog, SqliteReadModelStore>;

/// Open the durable log and the read model store named by `config`, and
/// rebuild the read model if asked to.
pub fn open_engine(config: &EngineConfig) -> anyhow::Result<Engine> {
    let log = JsonlEventLog::open(&config.event_log_path).with_context(|| {
        format!("failed to open event log at {}", config.event_log_path.display())
    })?;
    let store = SqliteReadModelStore::connect(&config.database_url)
        .with_context(|| format!("failed to open read model store {}", config.database_url))?;

    let engine = LockstreamEngine::new(log, store, config.projector);

    if config.rebuild_on_start {
        let report = engine.rebuild().context("rebuild on start failed")?;
        tracing::info!(
            replayed_events = report.replayed_events,
            rejected_events = report.rejected_events,
            "read model rebuilt on start"
        );
    }

    Ok(engine)
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Accepted,
    Duplicate,
    Rejected,
    /// The line is not a well-formed wire event.
    Invalid,
}

/// One output line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub accepted: u64,
    pub duplicates: u64,
    pub rejected: u64,
    pub invalid: u64,
}

fn kind_name(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Validation => "validation",
        ErrorKind::RuleViolation => "rule_violation",
        ErrorKind::NotFound => "not_found",
        ErrorKind::Unsupported => "unsupported",
        ErrorKind::Storage => "storage",
    }
}

/// Ingest one line. Only fatal errors (unsupported type, storage) are
/// returned as `Err`; rejections become a response.
pub fn ingest_line<L, S>(
    engine: &LockstreamEngine<L, S>,
    line: &str,
) -> Result<IngestResponse, EngineError>
where
    L: EventLog,
    S: ReadModelStore,
{
    let raw: RawEvent = match serde_json::from_str(line) {
        Ok(raw) => raw,
        Err(e) => {
            return Ok(IngestResponse {
                event_id: None,
                status: Status::Invalid,
                kind: Some(kind_name(ErrorKind::Validation)),
                error: Some(e.to_string()),
            });
        }
    };
    let event_id = Some(raw.event_id.clone());

    match engine.ingest_raw(raw) {
        Ok(outcome) => Ok(IngestResponse {
            event_id,
            status: if outcome.accepted {
                Status::Accepted
            } else {
                Status::Duplicate
            },
            kind: None,
            error: None,
        }),
        Err(e) if e.is_rejection() => Ok(IngestResponse {
            event_id,
            status: Status::Rejected,
            kind: Some(kind_name(e.kind())),
            error: Some(e.to_string()),
        }),
        Err(e) => Err(e),
    }
}

/// Ingest every non-blank line of `input`, writing one response per line.
///
/// Stops at the first fatal error.
pub fn run_ingest<L, S>(
    engine: &LockstreamEngine<L, S>,
    input: impl BufRead,
    mut output: impl Write,
) -> anyhow::Result<IngestStats>
where
    L: EventLog,
    S: ReadModelStore,
{
    let mut stats = IngestStats::default();

    for (idx, line) in input.lines().enumerate() {
        let line = line.context("failed to read input")?;
        if line.trim().is_empty() {
            continue;
        }

        let response = ingest_line(engine, &line)
            .with_context(|| format!("fatal error on input line {}", idx + 1))?;
        match response.status {
            Status::Accepted => stats.accepted += 1,
            Status::Duplicate => stats.duplicates += 1,
            Status::Rejected => stats.rejected += 1,
            Status::Invalid => stats.invalid += 1,
        }

        serde_json::to_writer(&mut output, &response)?;
        output.write_all(b"\n")?;
        output.flush()?;
    }

    Ok(stats)
}
