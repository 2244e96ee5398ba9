//! Core domain types for the debugger session

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Phase of the debugger session.
///
/// Sessions move through `Stopped → Starting → Running → Stopping → Stopped`.
/// Exactly one value is current at any time and it is owned by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebuggerMode {
    /// No session; no debugger instance is owned
    #[default]
    Stopped,
    /// Adapter launching or handshake in progress
    Starting,
    /// Websocket endpoint known; debuggee attached
    Running,
    /// Teardown in progress
    Stopping,
}

impl DebuggerMode {
    /// Lowercase label, also used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
        }
    }

    /// True for every mode that holds or is acquiring a debugger instance
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Starting | Self::Running)
    }
}

impl fmt::Display for DebuggerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a debugger instance once it is owned by the store.
///
/// Stale session-end notifications are detected by comparing ids, never by
/// comparing instance contents.
pub type InstanceId = u64;

static INSTANCE_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Generate a new unique instance ID
pub fn next_instance_id() -> InstanceId {
    INSTANCE_ID_COUNTER.fetch_add(1, Ordering::SeqCst)
}
