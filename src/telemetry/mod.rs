//! Iteration telemetry for the refinement pipeline
//!
//! Stages report one event per refinement iteration through an injectable
//! hook. The collector buffers events and keeps running counters for display
//! after a run; hooks must never block the loop.

use std::sync::{Arc, Mutex};

/// One refinement iteration, as seen by observers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IterationEvent {
    /// Stage id, 1-based
    pub stage: u8,

    /// Iteration number within the stage's loop, 1-based
    pub iteration: usize,

    /// Validation errors recorded for this iteration (0 on success)
    pub error_count: usize,
}

/// Structured observability hook invoked once per refinement iteration
pub trait ProgressHook: Send + Sync {
    fn on_iteration(&self, event: IterationEvent);
}

/// Hook that discards all events
pub struct NullProgressHook;

impl ProgressHook for NullProgressHook {
    fn on_iteration(&self, _event: IterationEvent) {}
}

/// Aggregate statistics over a run
#[derive(Debug, Clone, Default)]
pub struct TelemetryStats {
    pub iterations: usize,
    pub failed_iterations: usize,
    pub validation_errors: usize,
}

/// Event collector for pipeline runs
#[derive(Clone)]
pub struct TelemetryCollector {
    events: Arc<Mutex<Vec<IterationEvent>>>,
    stats: Arc<Mutex<TelemetryStats>>,
}

impl TelemetryCollector {
    /// Create a new collector
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
            stats: Arc::new(Mutex::new(TelemetryStats::default())),
        }
    }

    /// Get current statistics
    pub fn stats(&self) -> TelemetryStats {
        self.stats.lock().unwrap().clone()
    }

    /// Get event count
    pub fn event_count(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    /// Get recent events (last n)
    pub fn recent_events(&self, n: usize) -> Vec<IterationEvent> {
        let events = self.events.lock().unwrap();
        let start = events.len().saturating_sub(n);
        events[start..].to_vec()
    }

    /// Total iterations recorded for one stage
    pub fn iterations_for_stage(&self, stage: u8) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.stage == stage)
            .count()
    }
}

impl ProgressHook for TelemetryCollector {
    fn on_iteration(&self, event: IterationEvent) {
        {
            let mut stats = self.stats.lock().unwrap();
            stats.iterations += 1;
            if event.error_count > 0 {
                stats.failed_iterations += 1;
            }
            stats.validation_errors += event.error_count;
        }

        self.events.lock().unwrap().push(event);
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new()
    }
}
