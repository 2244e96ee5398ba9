//! Test utilities for adapter-driven code
//!
//! Provides scriptable in-memory [`ProcessInfo`] and [`DebuggerInstance`]
//! implementations so session logic can be tested without spawning processes.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use futures_util::future::{BoxFuture, FutureExt};
use tokio::sync::{oneshot, watch};

use dbgctl_core::prelude::*;
use dbgctl_core::{DebuggerInstance, ProcessInfo, SessionEndHandler, Subscription};

/// Outcome of the handshake, once decided
type AddressOutcome = Option<std::result::Result<String, String>>;

#[derive(Default)]
struct FakeHandlers {
    next_id: u64,
    handlers: BTreeMap<u64, SessionEndHandler>,
}

/// In-memory debugger instance.
///
/// The websocket address stays pending until [`FakeInstance::resolve_address`]
/// or [`FakeInstance::fail_handshake`] is called (or the instance was built
/// with [`FakeInstance::ready`]).
pub struct FakeInstance {
    address: watch::Sender<AddressOutcome>,
    handlers: Arc<Mutex<FakeHandlers>>,
    dispose_count: AtomicUsize,
    dispose_error: Option<String>,
}

impl fmt::Debug for FakeInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FakeInstance")
            .field("address", &*self.address.borrow())
            .field("dispose_count", &self.dispose_count())
            .finish()
    }
}

impl FakeInstance {
    /// An instance whose handshake has not completed yet
    pub fn pending() -> Arc<Self> {
        Arc::new(Self::build(None, None))
    }

    /// An instance that reports `address` immediately
    pub fn ready(address: &str) -> Arc<Self> {
        Arc::new(Self::build(Some(Ok(address.to_string())), None))
    }

    /// An instance whose `dispose()` returns an error
    pub fn failing_dispose(address: &str, message: &str) -> Arc<Self> {
        Arc::new(Self::build(
            Some(Ok(address.to_string())),
            Some(message.to_string()),
        ))
    }

    fn build(address: AddressOutcome, dispose_error: Option<String>) -> Self {
        let (address, _) = watch::channel(address);
        Self {
            address,
            handlers: Arc::default(),
            dispose_count: AtomicUsize::new(0),
            dispose_error,
        }
    }

    /// Complete the handshake with `address`
    pub fn resolve_address(&self, address: &str) {
        self.address.send_replace(Some(Ok(address.to_string())));
    }

    /// Complete the handshake with an error
    pub fn fail_handshake(&self, message: &str) {
        self.address.send_replace(Some(Err(message.to_string())));
    }

    /// Simulate the debuggee ending its own session.
    ///
    /// Handlers are invoked outside the internal lock.
    pub fn fire_session_end(&self) {
        let handlers = std::mem::take(&mut self.lock_handlers().handlers);
        for handler in handlers.into_values() {
            handler();
        }
    }

    /// Number of session-end handlers still registered
    pub fn handler_count(&self) -> usize {
        self.lock_handlers().handlers.len()
    }

    pub fn dispose_count(&self) -> usize {
        self.dispose_count.load(Ordering::SeqCst)
    }

    fn lock_handlers(&self) -> MutexGuard<'_, FakeHandlers> {
        self.handlers.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl DebuggerInstance for FakeInstance {
    fn websocket_address(&self) -> BoxFuture<'_, Result<String>> {
        let mut rx = self.address.subscribe();
        async move {
            let outcome = rx
                .wait_for(Option::is_some)
                .await
                .map_err(|_| Error::handshake("fake instance dropped"))?
                .clone();
            match outcome {
                Some(Ok(address)) => Ok(address),
                Some(Err(message)) => Err(Error::handshake(message)),
                None => Err(Error::handshake("no address")),
            }
        }
        .boxed()
    }

    fn on_session_end(&self, handler: SessionEndHandler) -> Option<Subscription> {
        let id = {
            let mut state = self.lock_handlers();
            let id = state.next_id;
            state.next_id += 1;
            state.handlers.insert(id, handler);
            id
        };
        let handlers = Arc::clone(&self.handlers);
        Some(Subscription::new(move || {
            handlers
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .handlers
                .remove(&id);
        }))
    }

    fn dispose(&self) -> Result<()> {
        self.dispose_count.fetch_add(1, Ordering::SeqCst);
        match &self.dispose_error {
            Some(message) => Err(Error::disposal(message.clone())),
            None => Ok(()),
        }
    }
}

/// Scriptable launch target.
///
/// Every `debug()` call hands out the same [`FakeInstance`], unless the target
/// was built to fail. A gated target holds `debug()` until the paired
/// [`oneshot::Sender`] fires (or is dropped).
pub struct FakeProcessInfo {
    service_name: String,
    instance: Arc<FakeInstance>,
    debug_error: Option<String>,
    gate: Mutex<Option<oneshot::Receiver<()>>>,
    debug_calls: AtomicUsize,
}

impl fmt::Debug for FakeProcessInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FakeProcessInfo")
            .field("service_name", &self.service_name)
            .field("debug_calls", &self.debug_calls())
            .finish()
    }
}

impl FakeProcessInfo {
    /// A target whose `debug()` resolves to `instance` immediately
    pub fn new(service_name: &str, instance: Arc<FakeInstance>) -> Self {
        Self {
            service_name: service_name.to_string(),
            instance,
            debug_error: None,
            gate: Mutex::new(None),
            debug_calls: AtomicUsize::new(0),
        }
    }

    /// A target whose `debug()` fails with `message`
    pub fn failing(service_name: &str, message: &str) -> Self {
        let mut info = Self::new(service_name, FakeInstance::pending());
        info.debug_error = Some(message.to_string());
        info
    }

    /// A target whose first `debug()` waits for the returned sender
    pub fn gated(service_name: &str, instance: Arc<FakeInstance>) -> (Self, oneshot::Sender<()>) {
        let (tx, rx) = oneshot::channel();
        let info = Self::new(service_name, instance);
        *info.gate.lock().unwrap_or_else(|e| e.into_inner()) = Some(rx);
        (info, tx)
    }

    pub fn instance(&self) -> Arc<FakeInstance> {
        Arc::clone(&self.instance)
    }

    pub fn debug_calls(&self) -> usize {
        self.debug_calls.load(Ordering::SeqCst)
    }
}

impl ProcessInfo for FakeProcessInfo {
    fn service_name(&self) -> &str {
        &self.service_name
    }

    fn debug(&self) -> BoxFuture<'_, Result<Arc<dyn DebuggerInstance>>> {
        self.debug_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.gate.lock().unwrap_or_else(|e| e.into_inner()).take();
        async move {
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            if let Some(message) = &self.debug_error {
                return Err(Error::adapter(message.clone()));
            }
            Ok(Arc::clone(&self.instance) as Arc<dyn DebuggerInstance>)
        }
        .boxed()
    }
}
