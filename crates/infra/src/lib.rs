//! Infrastructure layer: event log, read model stores, projection, engine.

pub mod config;
pub mod engine;
pub mod error;
pub mod event_log;
pub mod projections;
pub mod read_model;

pub use config::{ConfigError, EngineConfig};
pub use engine::{IngestOutcome, LockstreamEngine};
pub use error::{EngineError, EngineResult, ErrorKind};

#[cfg(test)]
mod test_support;
