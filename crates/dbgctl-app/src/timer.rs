//! Single-slot operation timer reporting to an analytics sink

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use serde_json::json;

use crate::analytics::{AnalyticsEvent, AnalyticsSink};
use dbgctl_core::prelude::*;

/// Operation name used for debugger startup timing
pub const START_DEBUGGING_TIMER: &str = "debugger:start-debugging";

/// Failure reason recorded for a timer replaced by a newer `begin`
pub const SUPERSEDED_REASON: &str = "superseded";

#[derive(Debug)]
struct ActiveTimer {
    name: String,
    started: Instant,
}

/// Tracks at most one timed operation.
#[derive(Debug)]
pub struct TimerTracker {
    sink: Arc<dyn AnalyticsSink>,
    active: Mutex<Option<ActiveTimer>>,
}

impl TimerTracker {
    pub fn new(sink: Arc<dyn AnalyticsSink>) -> Self {
        Self {
            sink,
            active: Mutex::new(None),
        }
    }

    /// Start timing `name`.
    ///
    /// A timer that is still running is recorded as failed first.
    pub fn begin(&self, name: &str) {
        let stale = self.lock().replace(ActiveTimer {
            name: name.to_string(),
            started: Instant::now(),
        });
        if let Some(stale) = stale {
            warn!(
                "Timer {} started while {} was still running",
                name, stale.name
            );
            self.record(stale, Some(SUPERSEDED_REASON));
        }
    }

    /// Record success of the active operation. No-op without one.
    pub fn end(&self) {
        let timer = self.lock().take();
        if let Some(timer) = timer {
            self.record(timer, None);
        }
    }

    /// Record failure of the active operation. No-op without one.
    pub fn fail(&self, error: &str) {
        let timer = self.lock().take();
        if let Some(timer) = timer {
            self.record(timer, Some(error));
        }
    }

    pub fn is_active(&self) -> bool {
        self.lock().is_some()
    }

    pub fn active_name(&self) -> Option<String> {
        self.lock().as_ref().map(|t| t.name.clone())
    }

    fn record(&self, timer: ActiveTimer, error: Option<&str>) {
        let duration_ms = timer.started.elapsed().as_millis() as u64;
        let data = match error {
            None => json!({ "duration_ms": duration_ms, "status": "success" }),
            Some(error) => json!({
                "duration_ms": duration_ms,
                "status": "failure",
                "error": error,
            }),
        };
        debug!("Timer {} finished: {}", timer.name, data);
        self.sink.track(&AnalyticsEvent::new(timer.name, data));
    }

    fn lock(&self) -> MutexGuard<'_, Option<ActiveTimer>> {
        self.active.lock().unwrap_or_else(|e| e.into_inner())
    }
}
