//! Headless mode - NDJSON event output
//!
//! The `dbgctl` binary has no UI. It reports session changes as structured
//! JSON events on stdout so scripts and editor hosts can follow the debugger
//! lifecycle without parsing log text.
//!
//! # Event Format
//!
//! Events are output as NDJSON (newline-delimited JSON), one event per line.
//! Each event has an "event" field indicating its type, along with event-specific data.
//!
//! # Example Output
//!
//! ```json
//! {"event":"mode_changed","mode":"starting","timestamp":1704700001000}
//! {"event":"socket_changed","socket":"ws://127.0.0.1:9229/3f1c","timestamp":1704700002000}
//! {"event":"start_finished","outcome":"running","error":null,"timestamp":1704700003000}
//! ```

pub mod runner;

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::io::{self, Write};
use tracing::error;

use dbgctl_app::{AnalyticsEvent, DebuggerSnapshot, StartOutcome, WorkspaceCommand};
use dbgctl_core::DebuggerMode;

/// Events emitted in headless mode
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HeadlessEvent {
    /// Runner is reading commands
    Ready { version: String, timestamp: i64 },

    /// Session phase changed
    ModeChanged { mode: DebuggerMode, timestamp: i64 },

    /// Websocket endpoint set or cleared
    SocketChanged {
        socket: Option<String>,
        timestamp: i64,
    },

    /// Store error set (`message`) or cleared (`null`)
    Error {
        message: Option<String>,
        timestamp: i64,
    },

    /// Analytics event reported by the controller
    Analytics {
        name: String,
        data: Value,
        timestamp: i64,
    },

    /// Known connections recomputed
    Connections {
        connections: Vec<String>,
        timestamp: i64,
    },

    /// Workspace command requested by the controller
    WorkspaceCommand {
        command: WorkspaceCommand,
        timestamp: i64,
    },

    /// Reply to the `status` command
    Status {
        #[serde(flatten)]
        snapshot: DebuggerSnapshot,
        timestamp: i64,
    },

    /// A `start` command resolved
    StartFinished {
        outcome: String,
        error: Option<String>,
        timestamp: i64,
    },
}

impl HeadlessEvent {
    /// Emit this event to stdout as JSON
    pub fn emit(&self) {
        let json = match serde_json::to_string(self) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize headless event: {}", e);
                return;
            }
        };

        let mut stdout = io::stdout().lock();
        if let Err(e) = writeln!(stdout, "{}", json) {
            error!("Failed to write headless event to stdout: {}", e);
            return;
        }

        if let Err(e) = stdout.flush() {
            error!("Failed to flush headless stdout: {}", e);
        }
    }

    /// Get current timestamp in milliseconds
    fn now() -> i64 {
        Utc::now().timestamp_millis()
    }

    // ─────────────────────────────────────────────────────────
    // Convenience constructors
    // ─────────────────────────────────────────────────────────

    pub fn ready() -> Self {
        Self::Ready {
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: Self::now(),
        }
    }

    pub fn mode_changed(mode: DebuggerMode) -> Self {
        Self::ModeChanged {
            mode,
            timestamp: Self::now(),
        }
    }

    pub fn socket_changed(socket: Option<String>) -> Self {
        Self::SocketChanged {
            socket,
            timestamp: Self::now(),
        }
    }

    pub fn error(message: Option<String>) -> Self {
        Self::Error {
            message,
            timestamp: Self::now(),
        }
    }

    pub fn analytics(event: &AnalyticsEvent) -> Self {
        Self::Analytics {
            name: event.name.clone(),
            data: event.data.clone(),
            timestamp: event.timestamp.timestamp_millis(),
        }
    }

    pub fn connections(connections: Vec<String>) -> Self {
        Self::Connections {
            connections,
            timestamp: Self::now(),
        }
    }

    pub fn workspace_command(command: WorkspaceCommand) -> Self {
        Self::WorkspaceCommand {
            command,
            timestamp: Self::now(),
        }
    }

    pub fn status(snapshot: DebuggerSnapshot) -> Self {
        Self::Status {
            snapshot,
            timestamp: Self::now(),
        }
    }

    pub fn start_finished(outcome: &StartOutcome) -> Self {
        let error = match outcome {
            StartOutcome::Failed(message) => Some(message.clone()),
            StartOutcome::Running | StartOutcome::Superseded => None,
        };
        Self::StartFinished {
            outcome: outcome.as_str().to_string(),
            error,
            timestamp: Self::now(),
        }
    }
}
