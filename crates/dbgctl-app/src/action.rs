//! Store actions
//!
//! Every mutation of the debugger store is expressed as a [`DebuggerAction`].

use std::sync::Arc;

use serde_json::{json, Value};

use dbgctl_core::{
    next_instance_id, DebuggerInstance, DebuggerMode, DebuggerProvider, DebuggerService,
    EvaluationExpressionProvider, InstanceId,
};

/// A debugger instance owned by the store, tagged with its identity
#[derive(Debug, Clone)]
pub struct ActiveInstance {
    pub id: InstanceId,
    pub instance: Arc<dyn DebuggerInstance>,
}

impl ActiveInstance {
    /// Tag an instance with a fresh id
    pub fn new(instance: Arc<dyn DebuggerInstance>) -> Self {
        Self {
            id: next_instance_id(),
            instance,
        }
    }
}

/// All actions understood by the debugger store
#[derive(Debug, Clone)]
pub enum DebuggerAction {
    // ─────────────────────────────────────────────────────────
    // Session
    // ─────────────────────────────────────────────────────────
    DebuggerModeChange(DebuggerMode),

    /// Replaces the instance and starts a new loader-breakpoint gate
    SetDebuggerInstance(Option<ActiveInstance>),

    SetProcessSocket(Option<String>),

    SetError(Option<String>),

    /// The front-end resumed the debuggee's loader breakpoint
    LoaderBreakpointResumed,

    // ─────────────────────────────────────────────────────────
    // Registries
    // ─────────────────────────────────────────────────────────
    AddService(Arc<dyn DebuggerService>),
    RemoveService(Arc<dyn DebuggerService>),
    AddDebuggerProvider(Arc<dyn DebuggerProvider>),
    RemoveDebuggerProvider(Arc<dyn DebuggerProvider>),
    AddEvaluationExpressionProvider(Arc<dyn EvaluationExpressionProvider>),
    RemoveEvaluationExpressionProvider(Arc<dyn EvaluationExpressionProvider>),

    // ─────────────────────────────────────────────────────────
    // Connections
    // ─────────────────────────────────────────────────────────
    UpdateConnections(Vec<String>),
}

impl DebuggerAction {
    /// Stable action identifier
    pub fn action_type(&self) -> &'static str {
        match self {
            Self::DebuggerModeChange(_) => "DEBUGGER_MODE_CHANGE",
            Self::SetDebuggerInstance(_) => "SET_DEBUGGER_INSTANCE",
            Self::SetProcessSocket(_) => "SET_PROCESS_SOCKET",
            Self::SetError(_) => "SET_ERROR",
            Self::LoaderBreakpointResumed => "LOADER_BREAKPOINT_RESUMED",
            Self::AddService(_) => "ADD_SERVICE",
            Self::RemoveService(_) => "REMOVE_SERVICE",
            Self::AddDebuggerProvider(_) => "ADD_DEBUGGER_PROVIDER",
            Self::RemoveDebuggerProvider(_) => "REMOVE_DEBUGGER_PROVIDER",
            Self::AddEvaluationExpressionProvider(_) => "ADD_EVALUATION_EXPRESSION_PROVIDER",
            Self::RemoveEvaluationExpressionProvider(_) => "REMOVE_EVALUATION_EXPRESSION_PROVIDER",
            Self::UpdateConnections(_) => "UPDATE_CONNECTIONS",
        }
    }

    /// Observer payload. Capability objects are represented by name or id.
    pub fn data(&self) -> Value {
        match self {
            Self::DebuggerModeChange(mode) => json!(mode),
            Self::SetDebuggerInstance(instance) => json!(instance.as_ref().map(|i| i.id)),
            Self::SetProcessSocket(socket) => json!(socket),
            Self::SetError(error) => json!(error),
            Self::LoaderBreakpointResumed => Value::Null,
            Self::AddService(service) | Self::RemoveService(service) => json!(service.name()),
            Self::AddDebuggerProvider(provider) | Self::RemoveDebuggerProvider(provider) => {
                json!(provider.name())
            }
            Self::AddEvaluationExpressionProvider(provider)
            | Self::RemoveEvaluationExpressionProvider(provider) => json!({
                "name": provider.name(),
                "selector": provider.selector(),
            }),
            Self::UpdateConnections(connections) => json!(connections),
        }
    }

    /// `{ "actionType": ..., "data": ... }`
    pub fn to_json(&self) -> Value {
        json!({
            "actionType": self.action_type(),
            "data": self.data(),
        })
    }
}
