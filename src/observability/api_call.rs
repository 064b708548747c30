//! API call records
//!
//! Every public orchestrator operation reports itself to an `ApiCallSink`
//! before doing any work. The call is made explicitly at the top of each
//! operation; nothing wraps methods behind the caller's back.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::logger::Logger;

/// One invocation of a public orchestrator method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiCall {
    pub id: Uuid,
    pub at: DateTime<Utc>,
    /// Emitting class, `ReplicaSet` for the orchestrator.
    pub class: String,
    pub method: String,
    /// Arguments as passed by the caller.
    pub arguments: Value,
}

impl ApiCall {
    pub fn new(class: impl Into<String>, method: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            at: Utc::now(),
            class: class.into(),
            method: method.into(),
            arguments,
        }
    }
}

/// Receiver of API call records.
///
/// Emission must never fail the operation being recorded.
pub trait ApiCallSink: Send + Sync {
    fn emit(&self, call: ApiCall);
}

/// Sink that writes each call to the structured log at TRACE.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogApiCallSink;

impl ApiCallSink for LogApiCallSink {
    fn emit(&self, call: ApiCall) {
        let id = call.id.to_string();
        let arguments = call.arguments.to_string();
        Logger::trace(
            "REPLSET_API_CALL",
            &[
                ("id", &id),
                ("class", &call.class),
                ("method", &call.method),
                ("arguments", &arguments),
            ],
        );
    }
}

/// In-memory sink for tests and embedding.
#[derive(Debug, Default, Clone)]
pub struct MemoryApiCallSink {
    calls: Arc<Mutex<Vec<ApiCall>>>,
}

impl MemoryApiCallSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Method names in emission order.
    pub fn methods(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.method).collect()
    }

    pub fn len(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ApiCallSink for MemoryApiCallSink {
    fn emit(&self, call: ApiCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}
