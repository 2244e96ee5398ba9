//! # dbgctl-core - Core Domain Types
//!
//! Foundation crate for the debugger session controller. Provides domain types,
//! error handling, adapter capability traits, disposables and remote URI helpers.
//!
//! This crate has **zero internal dependencies** -- it only depends on external
//! crates (serde, thiserror, tracing, futures-util, url, dirs).
//!
//! ## Public API
//!
//! ### Domain Types (`types`)
//! - [`DebuggerMode`] - Session phase (Stopped, Starting, Running, Stopping)
//! - [`InstanceId`] - Identity tag for an owned debugger instance
//!
//! ### Adapter Capabilities (`capability`)
//! - [`ProcessInfo`] - Something that can launch a debuggee and hand back an instance
//! - [`DebuggerInstance`] - A live debug target with a websocket endpoint
//! - [`DebuggerService`], [`DebuggerProvider`], [`EvaluationExpressionProvider`] -
//!   opaque registry payloads
//!
//! ### Disposables (`disposable`)
//! - [`Subscription`] - A single release callback, run at most once
//! - [`CompositeDisposable`] - A bag of subscriptions disposed together
//!
//! ### Events (`events`)
//! - [`AdapterEvent`] - Output/exit events from a debug adapter child process
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Custom error enum grouped by layer
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//!
//! ### Remote URIs (`remote_uri`)
//! - [`RemoteUri`] - Parsed `nuclide://host:port/path` project path
//!
//! ## Prelude
//!
//! Import commonly used types with:
//! ```rust
//! use dbgctl_core::prelude::*;
//! ```

pub mod capability;
pub mod disposable;
pub mod error;
pub mod events;
pub mod logging;
pub mod remote_uri;
pub mod types;

/// Prelude for common imports used throughout all dbgctl crates
pub mod prelude {
    pub use super::error::{Error, Result};
    pub use tracing::{debug, error, info, instrument, trace, warn};
}

// Re-export commonly used types at crate root for convenience
pub use capability::{
    same_arc, DebuggerInstance, DebuggerProvider, DebuggerService, EvaluationExpressionProvider,
    ProcessInfo, SessionEndHandler,
};
pub use disposable::{CompositeDisposable, Subscription};
pub use error::{Error, Result};
pub use events::AdapterEvent;
pub use remote_uri::{create_remote_uri, is_remote, parse_remote_uri, RemoteUri, REMOTE_SCHEME};
pub use types::{next_instance_id, DebuggerMode, InstanceId};
