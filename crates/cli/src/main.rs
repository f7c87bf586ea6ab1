use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::Context;

use lockstream_infra::EngineConfig;

const USAGE: &str = "usage: lockstream [ingest|rebuild|verify]";

fn main() -> anyhow::Result<ExitCode> {
    lockstream_observability::init();

    let command = std::env::args().nth(1).unwrap_or_else(|| "ingest".to_string());
    if !matches!(command.as_str(), "ingest" | "rebuild" | "verify") {
        eprintln!("{USAGE}");
        return Ok(ExitCode::from(2));
    }

    let mut config = EngineConfig::from_env().context("invalid configuration")?;
    // `rebuild` does its own rebuild; `verify` must see the store as it is.
    if command != "ingest" {
        config.rebuild_on_start = false;
    }
    tracing::info!(
        command = %command,
        event_log = %config.event_log_path.display(),
        database_url = %config.database_url,
        "starting lockstream"
    );

    let engine = lockstream_cli::open_engine(&config)?;
    let stdout = io::stdout();

    match command.as_str() {
        "rebuild" => {
            let report = engine.rebuild()?;
            let mut out = stdout.lock();
            serde_json::to_writer(&mut out, &report)?;
            writeln!(out)?;
        }
        "verify" => {
            let report = engine.verify()?;
            let mut out = stdout.lock();
            serde_json::to_writer(&mut out, &report)?;
            writeln!(out)?;
            if !report.is_consistent() {
                return Ok(ExitCode::FAILURE);
            }
        }
        _ => {
            let stats = lockstream_cli::run_ingest(&engine, io::stdin().lock(), stdout.lock())?;
            tracing::info!(
                accepted = stats.accepted,
                duplicates = stats.duplicates,
                rejected = stats.rejected,
                invalid = stats.invalid,
                "input exhausted"
            );
        }
    }

    Ok(ExitCode::SUCCESS)
}
