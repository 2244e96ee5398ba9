//! dbgctl-app - Debugger session state and orchestration
//!
//! This crate implements the session controller ([`DebuggerActions`]) on top of
//! an observable, reducer-driven store ([`DebuggerStore`]), together with the
//! loader-breakpoint gate, service/provider registries, analytics and timer
//! bookkeeping, workspace commands, known connections and configuration loading.

pub mod action;
pub mod actions;
pub mod analytics;
pub mod config;
pub mod connections;
pub mod gate;
pub mod registry;
pub mod store;
pub mod timer;
pub mod workspace;

// Re-export primary types
pub use action::{ActiveInstance, DebuggerAction};
pub use actions::{ControllerOptions, DebuggerActions, StartOutcome, START_FAILURE_PREFIX};
pub use analytics::{
    AnalyticsEvent, AnalyticsSink, NullAnalytics, RecordingAnalytics, TracingAnalytics,
};
pub use config::Settings;
pub use connections::{compute_connections, ProjectPaths, StaticProjectPaths, LOCAL_CONNECTION};
pub use gate::{GateWaiter, LoaderBreakpointGate};
pub use registry::Registries;
pub use store::{reduce, DebuggerSnapshot, DebuggerState, DebuggerStore};
pub use timer::TimerTracker;
pub use workspace::WorkspaceCommand;
