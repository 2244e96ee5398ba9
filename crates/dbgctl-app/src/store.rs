//! Debugger store
//!
//! Holds the debugger session state and the registries. State is changed only
//! by dispatching a [`DebuggerAction`], which is folded into the state by the
//! pure [`reduce`] function and then published to observers.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tokio::sync::{broadcast, watch};

use crate::action::{ActiveInstance, DebuggerAction};
use crate::gate::{GateWaiter, LoaderBreakpointGate};
use crate::registry::Registries;
use dbgctl_core::prelude::*;
use dbgctl_core::{
    DebuggerMode, DebuggerProvider, DebuggerService, EvaluationExpressionProvider, InstanceId,
};

/// Capacity of the action broadcast channel
const ACTION_CHANNEL_CAPACITY: usize = 256;

/// Complete store state
#[derive(Debug, Default)]
pub struct DebuggerState {
    pub mode: DebuggerMode,
    pub instance: Option<ActiveInstance>,
    pub process_socket: Option<String>,
    pub error: Option<String>,
    pub registries: Registries,
    pub connections: Vec<String>,
    pub loader_breakpoint_gate: LoaderBreakpointGate,
}

/// Fold one action into the state.
pub fn reduce(state: &mut DebuggerState, action: DebuggerAction) {
    match action {
        DebuggerAction::DebuggerModeChange(mode) => {
            state.mode = mode;
        }
        DebuggerAction::SetDebuggerInstance(instance) => {
            state.instance = instance;
            // Dropping the previous gate wakes its waiters with GateClosed
            state.loader_breakpoint_gate = LoaderBreakpointGate::new();
        }
        DebuggerAction::SetProcessSocket(socket) => {
            state.process_socket = socket;
        }
        DebuggerAction::SetError(error) => {
            state.error = error;
        }
        DebuggerAction::LoaderBreakpointResumed => {
            state.loader_breakpoint_gate.resume();
        }
        DebuggerAction::AddService(service) => {
            state.registries.add_service(service);
        }
        DebuggerAction::RemoveService(service) => {
            state.registries.remove_service(&service);
        }
        DebuggerAction::AddDebuggerProvider(provider) => {
            state.registries.add_debugger_provider(provider);
        }
        DebuggerAction::RemoveDebuggerProvider(provider) => {
            state.registries.remove_debugger_provider(&provider);
        }
        DebuggerAction::AddEvaluationExpressionProvider(provider) => {
            state.registries.add_evaluation_expression_provider(provider);
        }
        DebuggerAction::RemoveEvaluationExpressionProvider(provider) => {
            state
                .registries
                .remove_evaluation_expression_provider(&provider);
        }
        DebuggerAction::UpdateConnections(connections) => {
            state.connections = connections;
        }
    }
}

/// Serializable view of the store, used for status reporting
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DebuggerSnapshot {
    pub mode: DebuggerMode,
    pub instance_id: Option<InstanceId>,
    pub process_socket: Option<String>,
    pub error: Option<String>,
    pub connections: Vec<String>,
    pub services: Vec<String>,
    pub debugger_providers: Vec<String>,
    pub evaluation_expression_providers: Vec<String>,
    pub loader_breakpoint_resumed: bool,
}

/// Observable debugger state container.
///
/// Actions are reduced and published under one lock, so observers see them
/// in reduction order.
pub struct DebuggerStore {
    state: Mutex<DebuggerState>,
    actions: broadcast::Sender<DebuggerAction>,
    mode: watch::Sender<DebuggerMode>,
}

impl std::fmt::Debug for DebuggerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebuggerStore")
            .field("state", &*self.lock())
            .finish()
    }
}

impl Default for DebuggerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DebuggerStore {
    pub fn new() -> Self {
        let (actions, _) = broadcast::channel(ACTION_CHANNEL_CAPACITY);
        let (mode, _) = watch::channel(DebuggerMode::default());
        Self {
            state: Mutex::new(DebuggerState::default()),
            actions,
            mode,
        }
    }

    /// Reduce `action` into the state and publish it
    pub fn dispatch(&self, action: DebuggerAction) {
        trace!("dispatch {}", action.action_type());
        let published = (self.actions.receiver_count() > 0).then(|| action.clone());

        let mut state = self.lock();
        reduce(&mut state, action);

        let mode = state.mode;
        self.mode.send_if_modified(|current| {
            let changed = *current != mode;
            *current = mode;
            changed
        });
        if let Some(action) = published {
            let _ = self.actions.send(action);
        }
    }

    fn lock(&self) -> MutexGuard<'_, DebuggerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ─────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────

    pub fn debugger_mode(&self) -> DebuggerMode {
        self.lock().mode
    }

    pub fn debugger_instance(&self) -> Option<ActiveInstance> {
        self.lock().instance.clone()
    }

    pub fn process_socket(&self) -> Option<String> {
        self.lock().process_socket.clone()
    }

    pub fn error(&self) -> Option<String> {
        self.lock().error.clone()
    }

    pub fn services(&self) -> BTreeMap<String, Arc<dyn DebuggerService>> {
        self.lock().registries.services.clone()
    }

    pub fn service(&self, name: &str) -> Option<Arc<dyn DebuggerService>> {
        self.lock().registries.services.get(name).cloned()
    }

    pub fn debugger_providers(&self) -> Vec<Arc<dyn DebuggerProvider>> {
        self.lock().registries.debugger_providers.clone()
    }

    pub fn evaluation_expression_providers(&self) -> Vec<Arc<dyn EvaluationExpressionProvider>> {
        self.lock().registries.evaluation_expression_providers.clone()
    }

    pub fn connections(&self) -> Vec<String> {
        self.lock().connections.clone()
    }

    /// Waiter for the current session's loader-breakpoint gate
    pub fn loader_breakpoint_gate(&self) -> GateWaiter {
        self.lock().loader_breakpoint_gate.waiter()
    }

    pub fn snapshot(&self) -> DebuggerSnapshot {
        let state = self.lock();
        let registries = &state.registries;
        DebuggerSnapshot {
            mode: state.mode,
            instance_id: state.instance.as_ref().map(|i| i.id),
            process_socket: state.process_socket.clone(),
            error: state.error.clone(),
            connections: state.connections.clone(),
            services: registries.services.keys().cloned().collect(),
            debugger_providers: registries
                .debugger_providers
                .iter()
                .map(|p| p.name().to_string())
                .collect(),
            evaluation_expression_providers: registries
                .evaluation_expression_providers
                .iter()
                .map(|p| p.name().to_string())
                .collect(),
            loader_breakpoint_resumed: state.loader_breakpoint_gate.is_resumed(),
        }
    }

    // ─────────────────────────────────────────────────────────
    // Observation
    // ─────────────────────────────────────────────────────────

    /// Every action dispatched after this call
    pub fn subscribe_actions(&self) -> broadcast::Receiver<DebuggerAction> {
        self.actions.subscribe()
    }

    pub fn watch_mode(&self) -> watch::Receiver<DebuggerMode> {
        self.mode.subscribe()
    }
}
