//! Observability for the replica set orchestrator
//!
//! - Structured JSON-line logging
//! - Reconfiguration counters
//! - Typed lifecycle events
//! - Explicit API call records
//!
//! Observability is read-only: a failure to log or emit never changes the
//! outcome of an operation.
//!
//! # Usage
//!
//! ```ignore
//! use replset::observability::{log_event_with_fields, Event};
//!
//! log_event_with_fields(Event::ReconfigSucceeded, &[("version", "5")]);
//! ```

mod api_call;
mod events;
mod logger;
mod metrics;

pub use api_call::{ApiCall, ApiCallSink, LogApiCallSink, MemoryApiCallSink};
pub use events::Event;
pub use logger::{Logger, Severity, LOG_LEVEL_ENV};
pub use metrics::{MetricsSnapshot, ReconfigMetrics};

/// Log an event at its own severity
pub fn log_event(event: Event) {
    Logger::log(event.severity(), event.as_str(), &[]);
}

/// Log an event at its own severity with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_event() {
        log_event(Event::ConfigRead);
        log_event(Event::PsaComplete);
    }

    #[test]
    fn test_log_event_with_fields() {
        log_event_with_fields(Event::ReconfigRetry, &[("attempt", "2"), ("error", "x")]);
    }
}
