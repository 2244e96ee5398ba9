//! A debugger instance backed by an adapter child process
//!
//! The instance owns the [`AdapterProcess`] and a monitor task. The monitor
//! watches the process output for the inspector's websocket address and fires
//! the registered session-end handlers once the process exits.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt};
use tokio::sync::{mpsc, watch};

use dbgctl_core::prelude::*;
use dbgctl_core::{AdapterEvent, DebuggerInstance, SessionEndHandler, Subscription};

use crate::address::extract_websocket_address;
use crate::command::AdapterCommand;
use crate::process::AdapterProcess;

/// Capacity of the adapter event channel
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// What the monitor has learned about the adapter so far
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct AdapterStatus {
    /// First websocket address seen in the output
    address: Option<String>,
    /// `Some(code)` once the process has exited
    exited: Option<Option<i32>>,
}

#[derive(Default)]
struct SessionEndHandlers {
    next_id: u64,
    handlers: BTreeMap<u64, SessionEndHandler>,
    fired: bool,
}

type SharedHandlers = Arc<Mutex<SessionEndHandlers>>;

fn lock(handlers: &SharedHandlers) -> MutexGuard<'_, SessionEndHandlers> {
    handlers.lock().unwrap_or_else(|e| e.into_inner())
}

/// Debugger instance driving a command-line debug adapter.
pub struct ProcessDebuggerInstance {
    /// `None` once disposed
    process: Mutex<Option<AdapterProcess>>,
    status: watch::Receiver<AdapterStatus>,
    handlers: SharedHandlers,
    shutdown_timeout: Duration,
}

impl fmt::Debug for ProcessDebuggerInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessDebuggerInstance")
            .field("pid", &self.pid())
            .field("status", &*self.status.borrow())
            .finish()
    }
}

impl ProcessDebuggerInstance {
    /// Spawn the adapter and start monitoring its output.
    pub async fn spawn(command: &AdapterCommand, shutdown_timeout: Duration) -> Result<Arc<Self>> {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let process = AdapterProcess::spawn(command, event_tx).await?;

        let (status_tx, status_rx) = watch::channel(AdapterStatus::default());
        let handlers = SharedHandlers::default();

        tokio::spawn(Self::monitor(event_rx, status_tx, Arc::clone(&handlers)));

        Ok(Arc::new(Self {
            process: Mutex::new(Some(process)),
            status: status_rx,
            handlers,
            shutdown_timeout,
        }))
    }

    /// Background task: consumes adapter events until every sender is gone.
    async fn monitor(
        mut events: mpsc::Receiver<AdapterEvent>,
        status: watch::Sender<AdapterStatus>,
        handlers: SharedHandlers,
    ) {
        while let Some(event) = events.recv().await {
            match event {
                AdapterEvent::Stdout(line) | AdapterEvent::Stderr(line) => {
                    debug!("adapter: {}", line);
                    if status.borrow().address.is_some() {
                        continue;
                    }
                    if let Some(address) = extract_websocket_address(&line) {
                        info!("Debug adapter reported websocket address: {}", address);
                        status.send_modify(|s| s.address = Some(address));
                    }
                }
                AdapterEvent::Exited { code } => {
                    status.send_modify(|s| s.exited = Some(code));
                    Self::fire_session_end(&handlers);
                }
            }
        }

        // Channel closed without an exit event; treat the session as over
        if status.borrow().exited.is_none() {
            status.send_modify(|s| s.exited = Some(None));
            Self::fire_session_end(&handlers);
        }
        debug!("Adapter monitor finished");
    }

    fn fire_session_end(handlers: &SharedHandlers) {
        let fired = {
            let mut state = lock(handlers);
            if state.fired {
                return;
            }
            state.fired = true;
            std::mem::take(&mut state.handlers)
        };
        info!("Debugger session ended, notifying {} handler(s)", fired.len());
        for handler in fired.into_values() {
            handler();
        }
    }

    /// Adapter process ID, while the process is owned
    pub fn pid(&self) -> Option<u32> {
        self.process
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .and_then(AdapterProcess::id)
    }

    pub fn is_disposed(&self) -> bool {
        self.process
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_none()
    }

    /// True once the adapter process has exited
    pub fn has_exited(&self) -> bool {
        self.status.borrow().exited.is_some()
    }
}

impl DebuggerInstance for ProcessDebuggerInstance {
    fn websocket_address(&self) -> BoxFuture<'_, Result<String>> {
        let mut status = self.status.clone();
        async move {
            let (address, exited) = {
                let current = status
                    .wait_for(|s| s.address.is_some() || s.exited.is_some())
                    .await
                    .map_err(|_| Error::handshake("adapter monitor stopped"))?;
                (current.address.clone(), current.exited)
            };
            match (address, exited) {
                (Some(address), _) => Ok(address),
                (None, Some(code)) => Err(Error::handshake(format!(
                    "debug adapter exited with code {:?} before reporting a websocket address",
                    code
                ))),
                (None, None) => Err(Error::handshake("no websocket address reported")),
            }
        }
        .boxed()
    }

    fn on_session_end(&self, handler: SessionEndHandler) -> Option<Subscription> {
        let id = {
            let mut state = lock(&self.handlers);
            if !state.fired {
                let id = state.next_id;
                state.next_id += 1;
                state.handlers.insert(id, handler);
                Some(id)
            } else {
                drop(state);
                handler();
                None
            }
        };

        let subscription = match id {
            Some(id) => {
                let handlers = Arc::clone(&self.handlers);
                Subscription::new(move || {
                    lock(&handlers).handlers.remove(&id);
                })
            }
            None => Subscription::empty(),
        };
        Some(subscription)
    }

    fn dispose(&self) -> Result<()> {
        let process = self
            .process
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        let Some(mut process) = process else {
            debug!("Debugger instance already disposed");
            return Ok(());
        };

        info!("Disposing debugger instance (pid {:?})", process.id());
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let grace = self.shutdown_timeout;
                handle.spawn(async move {
                    if let Err(e) = process.shutdown(grace).await {
                        warn!("Debug adapter shutdown failed: {}", e);
                    }
                });
            }
            Err(_) => process.kill(),
        }
        Ok(())
    }
}
