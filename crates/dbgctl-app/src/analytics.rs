//! Analytics event sinks
//!
//! The controller reports session milestones (`debugger-start`,
//! `debugger-start-fail`, `debugger-stop`) and timer results through an
//! [`AnalyticsSink`] injected at construction.

use std::fmt;
use std::sync::Mutex;

use chrono::{DateTime, Local};
use serde::Serialize;
use serde_json::{json, Value};

use dbgctl_core::prelude::*;

pub const DEBUGGER_START: &str = "debugger-start";
pub const DEBUGGER_START_FAIL: &str = "debugger-start-fail";
pub const DEBUGGER_STOP: &str = "debugger-stop";

/// A named analytics event with a JSON object payload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsEvent {
    pub name: String,
    pub data: Value,
    pub timestamp: DateTime<Local>,
}

impl AnalyticsEvent {
    pub fn new(name: impl Into<String>, data: Value) -> Self {
        Self {
            name: name.into(),
            data,
            timestamp: Local::now(),
        }
    }

    /// An event with an empty payload
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(name, json!({}))
    }

    /// Look up a string field of the payload
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }
}

/// Destination for analytics events.
///
/// The controller may call `track` while committing a session transition, so
/// implementations must not call back into the controller.
pub trait AnalyticsSink: Send + Sync + fmt::Debug {
    fn track(&self, event: &AnalyticsEvent);
}

/// Writes events to the log as structured tracing fields
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAnalytics;

impl AnalyticsSink for TracingAnalytics {
    fn track(&self, event: &AnalyticsEvent) {
        info!(
            target: "dbgctl::analytics",
            event = %event.name,
            data = %event.data,
            "analytics event"
        );
    }
}

/// Drops every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAnalytics;

impl AnalyticsSink for NullAnalytics {
    fn track(&self, _event: &AnalyticsEvent) {}
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct RecordingAnalytics {
    events: Mutex<Vec<AnalyticsEvent>>,
}

impl RecordingAnalytics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AnalyticsEvent> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Names of the recorded events, in order
    pub fn names(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|e| e.name.clone())
            .collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|e| e.name == name)
            .count()
    }

    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

impl AnalyticsSink for RecordingAnalytics {
    fn track(&self, event: &AnalyticsEvent) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event.clone());
    }
}
