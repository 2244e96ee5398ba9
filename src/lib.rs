//! dbgctl - Headless debugger session controller
//!
//! The binary wires the session controller from `dbgctl-app` to the process
//! adapter from `dbgctl-adapter` and exposes it as an NDJSON line protocol.

pub mod headless;

pub use headless::runner::run_headless;
pub use headless::HeadlessEvent;
