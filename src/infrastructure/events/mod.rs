//! Event Sink Implementations
//!
//! Provides concrete implementations of DeployEventSink:
//! - JsonEventSink: NDJSON output for scripts and CI
//! - ConsoleEventSink: Human-readable progress through `tracing`

mod console;
mod json;

pub use console::ConsoleEventSink;
pub use json::{event_to_json, JsonEventSink};
