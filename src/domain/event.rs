//! State transition events
//!
//! The supervisor emits one event per state transition. Emission is fire and
//! forget: a lost event never affects job correctness, so the sink returns
//! nothing and the supervisor logs (not propagates) anything going wrong.

use serde::{Deserialize, Serialize};

use crate::domain::job::JobState;
use crate::id::now_ms;

/// One state transition of one job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionEvent {
    pub job_id: String,
    pub from_state: JobState,
    pub to_state: JobState,
    pub attempt: u32,
    pub timestamp: i64,
}

impl TransitionEvent {
    pub fn new(job_id: impl Into<String>, from: JobState, to: JobState, attempt: u32) -> Self {
        Self {
            job_id: job_id.into(),
            from_state: from,
            to_state: to,
            attempt,
            timestamp: now_ms(),
        }
    }
}

/// Progress/status collaborator interface
pub trait EventSink: Send + Sync {
    /// Deliver one event; infallible by contract (drop on error internally)
    fn emit(&self, event: TransitionEvent);
}

/// Sink that logs transitions and keeps nothing
pub struct LogEventSink;

impl EventSink for LogEventSink {
    fn emit(&self, event: TransitionEvent) {
        log::info!(
            "job {} transition {} -> {} (attempt {})",
            event.job_id,
            event.from_state,
            event.to_state,
            event.attempt
        );
    }
}

/// Sink that records events in memory, for tests and the CLI status view
#[derive(Default)]
pub struct MemoryEventSink {
    events: std::sync::Mutex<Vec<TransitionEvent>>,
}

impl MemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TransitionEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl EventSink for MemoryEventSink {
    fn emit(&self, event: TransitionEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
