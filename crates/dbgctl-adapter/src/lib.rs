//! # dbgctl-adapter - Debug Adapter Process Management
//!
//! Launches command-line debug adapters (a debuggee started under an inspector,
//! e.g. `node --inspect-brk=0 app.js`), watches their output for the websocket
//! endpoint and exposes them through the capability traits in [`dbgctl_core`].
//!
//! ## Public API
//!
//! ### Launching
//! - [`AdapterCommand`] - Program, arguments, working directory and environment
//! - [`CommandProcessInfo`] - [`dbgctl_core::ProcessInfo`] that spawns an [`AdapterCommand`]
//!
//! ### Process Management
//! - [`AdapterProcess`] - Child process with stdio readers and a graceful shutdown
//! - [`ProcessDebuggerInstance`] - [`dbgctl_core::DebuggerInstance`] backed by an [`AdapterProcess`]
//!
//! ### Address Discovery
//! - [`extract_websocket_address()`] - Find a `ws://` / `wss://` endpoint in an output line
//! - [`validate_websocket_address()`] - Check that an address is a usable websocket URL

pub mod address;
pub mod command;
pub mod instance;
pub mod launcher;
pub mod process;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_utils;

pub use address::{extract_websocket_address, validate_websocket_address};
pub use command::AdapterCommand;
pub use instance::ProcessDebuggerInstance;
pub use launcher::{CommandProcessInfo, DEFAULT_SHUTDOWN_TIMEOUT};
pub use process::AdapterProcess;
