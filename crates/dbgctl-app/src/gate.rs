//! Loader-breakpoint gate
//!
//! A debuggee launched with `--inspect-brk`-style flags stops on its first
//! line. The debugger front-end reports when that breakpoint has been resumed;
//! the start sequence waits for it before it completes.
//!
//! The gate is one-shot: once resumed it stays open. Each debugger instance
//! gets a fresh gate, and dropping a gate wakes any remaining waiters with
//! [`Error::GateClosed`].

use tokio::sync::watch;

use dbgctl_core::prelude::*;

#[derive(Debug)]
pub struct LoaderBreakpointGate {
    resumed: watch::Sender<bool>,
}

impl Default for LoaderBreakpointGate {
    fn default() -> Self {
        Self::new()
    }
}

impl LoaderBreakpointGate {
    pub fn new() -> Self {
        let (resumed, _) = watch::channel(false);
        Self { resumed }
    }

    /// Open the gate. Repeated calls do nothing.
    pub fn resume(&self) {
        self.resumed.send_replace(true);
    }

    pub fn is_resumed(&self) -> bool {
        *self.resumed.borrow()
    }

    /// A future-like handle that completes once the gate opens
    pub fn waiter(&self) -> GateWaiter {
        GateWaiter {
            resumed: self.resumed.subscribe(),
        }
    }
}

/// Waits on one particular [`LoaderBreakpointGate`]
#[derive(Debug)]
pub struct GateWaiter {
    resumed: watch::Receiver<bool>,
}

impl GateWaiter {
    /// Resolve when the gate opens, or fail if it is replaced first
    pub async fn wait(mut self) -> Result<()> {
        self.resumed
            .wait_for(|resumed| *resumed)
            .await
            .map(|_| ())
            .map_err(|_| Error::GateClosed)
    }
}
