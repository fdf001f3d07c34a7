//! Fire-and-forget audit records for settings changes.

use std::sync::{Mutex, PoisonError};

/// Receives one record per audited change.
pub trait AuditLog: Send + Sync {
    /// Records that `actor` (if known) caused `message`.
    fn record(&self, actor: Option<&str>, message: &str);
}

/// Emits audit records as `tracing` events with target `audit`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAudit;

impl AuditLog for TracingAudit {
    fn record(&self, actor: Option<&str>, message: &str) {
        tracing::info!(target: "audit", actor = actor.unwrap_or("system"), "{message}");
    }
}

/// Keeps audit records in memory.
#[derive(Debug, Default)]
pub struct RecordingAudit {
    records: Mutex<Vec<String>>,
}

impl RecordingAudit {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the messages recorded so far, oldest first.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl AuditLog for RecordingAudit {
    fn record(&self, _actor: Option<&str>, message: &str) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.to_string());
    }
}
