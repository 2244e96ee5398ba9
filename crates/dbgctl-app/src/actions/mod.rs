//! Debugger session controller
//!
//! [`DebuggerActions`] drives the session state machine
//! (`Stopped → Starting → Running → Stopping → Stopped`) by dispatching actions
//! to the [`DebuggerStore`]. It is a cheap `Clone` handle; overlapping calls are
//! resolved with a session generation counter:
//!
//! - every start and every effective stop advances the generation;
//! - a start re-checks its generation after each suspension point and never
//!   touches the store once it has been superseded;
//! - an instance resolved by a superseded start is disposed immediately.
//!
//! State transitions are committed under a transition lock that is never held
//! across an `.await`. A stop holds it for its whole teardown, and a session
//! end reported from inside `dispose()` is absorbed by the in-progress stop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use serde_json::json;
use tokio::sync::broadcast;

use crate::action::{ActiveInstance, DebuggerAction};
use crate::analytics::{
    AnalyticsEvent, AnalyticsSink, DEBUGGER_START, DEBUGGER_START_FAIL, DEBUGGER_STOP,
};
use crate::connections::{compute_connections, ProjectPaths};
use crate::store::DebuggerStore;
use crate::timer::{TimerTracker, START_DEBUGGING_TIMER};
use crate::workspace::WorkspaceCommand;
use dbgctl_core::prelude::*;
use dbgctl_core::{
    CompositeDisposable, DebuggerMode, DebuggerProvider, DebuggerService,
    EvaluationExpressionProvider, InstanceId, ProcessInfo, SessionEndHandler, Subscription,
};

#[cfg(test)]
mod tests;

/// Capacity of the workspace command channel
const COMMAND_CHANNEL_CAPACITY: usize = 32;

/// Prefix of the error recorded when a start fails
pub const START_FAILURE_PREFIX: &str = "Failed to start debugger process: ";

/// Result of [`DebuggerActions::start_debugging`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// Handshake done and loader breakpoint resumed; mode is `Running`
    Running,
    /// The start failed; mode is `Stopped` and the store error holds the message
    Failed(String),
    /// An explicit stop or a newer start overtook this start, or the
    /// controller was already disposed
    Superseded,
}

impl StartOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Failed(_) => "failed",
            Self::Superseded => "superseded",
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }
}

/// Controller behavior switches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerOptions {
    /// Send `console:show` when a session starts
    pub show_console_on_start: bool,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            show_console_on_start: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopCause {
    /// `stop_debugging()` or a failed start
    Explicit,
    /// A new start tearing down the previous session; leaves the timer alone
    Restart,
    /// The instance with this id reported the end of its session
    SessionEnded(InstanceId),
}

/// Session bookkeeping guarded by the transition lock
#[derive(Debug, Default)]
struct Transition {
    generation: u64,
    /// Session-end subscription of the current instance
    subscription: Option<Subscription>,
    /// Instance whose own session end caused the latest stop
    ended_by: Option<InstanceId>,
}

impl Transition {
    fn advance(&mut self) -> u64 {
        self.generation += 1;
        self.ended_by = None;
        self.generation
    }
}

/// How a start stands after one of its suspension points
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Standing {
    Current,
    /// Stopped by the session end of the start's own instance, nothing since
    EndedBySelf,
    Superseded,
}

/// Per-call bookkeeping of a start
#[derive(Debug)]
struct Attempt {
    generation: u64,
    instance_id: Option<InstanceId>,
}

/// Resets the stopping flag when the teardown scope ends
struct StoppingGuard<'a>(&'a AtomicBool);

impl Drop for StoppingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

struct Inner {
    store: Arc<DebuggerStore>,
    analytics: Arc<dyn AnalyticsSink>,
    timer: TimerTracker,
    project_paths: Arc<dyn ProjectPaths>,
    commands: broadcast::Sender<WorkspaceCommand>,
    options: ControllerOptions,
    transition: Mutex<Transition>,
    stopping: AtomicBool,
    disposables: CompositeDisposable,
}

/// Debugger session controller
#[derive(Clone)]
pub struct DebuggerActions {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for DebuggerActions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebuggerActions")
            .field("mode", &self.inner.store.debugger_mode())
            .field("generation", &self.lock_transition().generation)
            .finish()
    }
}

impl DebuggerActions {
    pub fn new(
        store: Arc<DebuggerStore>,
        analytics: Arc<dyn AnalyticsSink>,
        project_paths: Arc<dyn ProjectPaths>,
    ) -> Self {
        Self::with_options(store, analytics, project_paths, ControllerOptions::default())
    }

    pub fn with_options(
        store: Arc<DebuggerStore>,
        analytics: Arc<dyn AnalyticsSink>,
        project_paths: Arc<dyn ProjectPaths>,
        options: ControllerOptions,
    ) -> Self {
        let (commands, _) = broadcast::channel(COMMAND_CHANNEL_CAPACITY);
        let inner = Arc::new_cyclic(|weak: &Weak<Inner>| {
            let disposables = CompositeDisposable::new();
            // Disposing the controller releases the current session-end subscription
            let weak = weak.clone();
            disposables.add(Subscription::new(move || {
                if let Some(inner) = weak.upgrade() {
                    let subscription = inner
                        .transition
                        .lock()
                        .unwrap_or_else(|e| e.into_inner())
                        .subscription
                        .take();
                    drop(subscription);
                }
            }));

            Inner {
                timer: TimerTracker::new(Arc::clone(&analytics)),
                store,
                analytics,
                project_paths,
                commands,
                options,
                transition: Mutex::new(Transition::default()),
                stopping: AtomicBool::new(false),
                disposables,
            }
        });
        Self { inner }
    }

    pub fn store(&self) -> &Arc<DebuggerStore> {
        &self.inner.store
    }

    /// Workspace commands sent after this call
    pub fn subscribe_commands(&self) -> broadcast::Receiver<WorkspaceCommand> {
        self.inner.commands.subscribe()
    }

    // ─────────────────────────────────────────────────────────
    // Session lifecycle
    // ─────────────────────────────────────────────────────────

    /// Start a debugging session for `info`, stopping any existing one.
    ///
    /// Resolves once the debuggee has passed its loader breakpoint, the start
    /// fails, or the start is overtaken. Never returns an error: failures are
    /// recorded in the store.
    pub async fn start_debugging(&self, info: Arc<dyn ProcessInfo>) -> StartOutcome {
        if self.is_disposed() {
            warn!("Ignoring start_debugging on a disposed controller");
            return StartOutcome::Superseded;
        }
        let service_name = info.service_name().to_string();
        info!("Starting debugger for service {}", service_name);

        self.track(AnalyticsEvent::new(
            DEBUGGER_START,
            json!({ "serviceName": service_name }),
        ));
        self.inner.timer.begin(START_DEBUGGING_TIMER);

        self.stop_session(StopCause::Restart);

        let generation = {
            let mut transition = self.lock_transition();
            let generation = transition.advance();
            self.set_error(None);
            if self.inner.options.show_console_on_start {
                self.send_command(WorkspaceCommand::ShowConsole);
            }
            self.set_mode(DebuggerMode::Starting);
            self.send_command(WorkspaceCommand::ShowDebugger);
            generation
        };

        let mut attempt = Attempt {
            generation,
            instance_id: None,
        };
        match self.run_session(info.as_ref(), &mut attempt).await {
            Ok(outcome) => outcome,
            Err(e) => self.fail_start(&attempt, &service_name, e),
        }
    }

    async fn run_session(&self, info: &dyn ProcessInfo, attempt: &mut Attempt) -> Result<StartOutcome> {
        let instance = info.debug().await?;

        let active = ActiveInstance::new(instance);
        let committed = {
            let transition = self.lock_transition();
            let current = transition.generation == attempt.generation;
            if current {
                self.dispatch(DebuggerAction::SetDebuggerInstance(Some(active.clone())));
            }
            current
        };
        if !committed {
            info!("Start was superseded, disposing late debugger instance");
            if let Err(e) = active.instance.dispose() {
                warn!("Failed to dispose superseded debugger instance: {}", e);
            }
            return Ok(StartOutcome::Superseded);
        }
        attempt.instance_id = Some(active.id);
        debug!("Debugger instance {} attached", active.id);

        self.watch_session_end(&active, attempt.generation);

        let socket = active.instance.websocket_address().await?;

        let waiter = {
            let transition = self.lock_transition();
            match self.standing_locked(&transition, attempt) {
                Standing::Current => {
                    self.inner.timer.end();
                    info!("Debugger connected at {}", socket);
                    self.dispatch(DebuggerAction::SetProcessSocket(Some(socket)));
                    self.set_mode(DebuggerMode::Running);
                    Ok(self.inner.store.loader_breakpoint_gate())
                }
                standing => Err(standing),
            }
        };
        let waiter = match waiter {
            Ok(waiter) => waiter,
            Err(Standing::EndedBySelf) => return Err(Error::SessionEnded),
            Err(_) => {
                debug!("Start superseded during handshake");
                return Ok(StartOutcome::Superseded);
            }
        };

        let resumed = waiter.wait().await;
        match (resumed, self.standing(attempt)) {
            (Ok(()), Standing::Current) => {
                info!("Loader breakpoint resumed");
                Ok(StartOutcome::Running)
            }
            (_, Standing::EndedBySelf) => Err(Error::SessionEnded),
            (_, _) => {
                debug!("Start superseded before the loader breakpoint resumed");
                Ok(StartOutcome::Superseded)
            }
        }
    }

    /// Subscribe to the instance's own session end, scoped to this session
    fn watch_session_end(&self, active: &ActiveInstance, generation: u64) {
        let weak = Arc::downgrade(&self.inner);
        let id = active.id;
        let handler: SessionEndHandler = Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                DebuggerActions { inner }.handle_session_end(id);
            }
        });

        // May invoke the handler right away; no lock is held here
        let subscription = active.instance.on_session_end(handler);

        let stale = {
            let mut transition = self.lock_transition();
            // A disposed controller no longer releases what it holds
            if transition.generation == generation && !self.is_disposed() {
                std::mem::replace(&mut transition.subscription, subscription)
            } else {
                subscription
            }
        };
        drop(stale);
    }

    fn handle_session_end(&self, id: InstanceId) {
        let current = self.inner.store.debugger_instance().map(|a| a.id);
        if current == Some(id) {
            info!("Debugger session {} ended", id);
            self.stop_session(StopCause::SessionEnded(id));
        } else {
            debug!("Ignoring session end of stale debugger instance {}", id);
        }
    }

    fn fail_start(&self, attempt: &Attempt, service_name: &str, error: Error) -> StartOutcome {
        let message = format!("{}{}", START_FAILURE_PREFIX, error);
        let recorded = {
            let transition = self.lock_transition();
            let standing = self.standing_locked(&transition, attempt);
            if standing != Standing::Superseded {
                self.inner.timer.fail(&error.to_string());
                self.track(AnalyticsEvent::new(
                    DEBUGGER_START_FAIL,
                    json!({ "serviceName": service_name, "error": error.to_string() }),
                ));
                self.set_error(Some(message.clone()));
            }
            standing != Standing::Superseded
        };
        if !recorded {
            debug!("Superseded start failed: {}", error);
            return StartOutcome::Superseded;
        }

        self.stop_session(StopCause::Explicit);
        StartOutcome::Failed(message)
    }

    fn standing(&self, attempt: &Attempt) -> Standing {
        let transition = self.lock_transition();
        self.standing_locked(&transition, attempt)
    }

    fn standing_locked(&self, transition: &Transition, attempt: &Attempt) -> Standing {
        if transition.generation == attempt.generation {
            Standing::Current
        } else if transition.generation == attempt.generation + 1
            && attempt.instance_id.is_some()
            && transition.ended_by == attempt.instance_id
        {
            Standing::EndedBySelf
        } else {
            Standing::Superseded
        }
    }

    /// Stop the current session. Safe to call in any mode.
    ///
    /// Returns without effect while a stop is in progress, or when there is
    /// no session at all.
    pub fn stop_debugging(&self) {
        self.stop_session(StopCause::Explicit);
    }

    fn stop_session(&self, cause: StopCause) {
        if self.inner.stopping.load(Ordering::SeqCst) {
            debug!("Stop already in progress");
            return;
        }

        let was_starting = {
            let mut transition = self.lock_transition();
            let store = &self.inner.store;
            let mode = store.debugger_mode();
            if mode == DebuggerMode::Stopping {
                return;
            }
            let active = store.debugger_instance();
            if mode == DebuggerMode::Stopped && active.is_none() {
                trace!("Debugger already stopped");
                return;
            }
            if let StopCause::SessionEnded(id) = cause {
                if active.as_ref().map(|a| a.id) != Some(id) {
                    debug!("Ignoring session end of stale debugger instance {}", id);
                    return;
                }
            }

            self.inner.stopping.store(true, Ordering::SeqCst);
            let _stopping = StoppingGuard(&self.inner.stopping);
            transition.advance();
            if let StopCause::SessionEnded(id) = cause {
                transition.ended_by = Some(id);
            }

            info!("Stopping debugger ({:?})", cause);
            self.set_mode(DebuggerMode::Stopping);

            drop(transition.subscription.take());
            if let Some(active) = active {
                if let Err(e) = active.instance.dispose() {
                    warn!("Failed to dispose debugger instance {}: {}", active.id, e);
                }
                self.dispatch(DebuggerAction::SetDebuggerInstance(None));
            }
            self.dispatch(DebuggerAction::SetProcessSocket(None));
            self.set_mode(DebuggerMode::Stopped);
            mode == DebuggerMode::Starting
        };

        self.track(AnalyticsEvent::named(DEBUGGER_STOP));
        match cause {
            StopCause::Restart => {}
            // The handshake never completed
            StopCause::SessionEnded(_) if was_starting => {
                self.inner.timer.fail(&Error::SessionEnded.to_string());
            }
            StopCause::Explicit | StopCause::SessionEnded(_) => self.inner.timer.end(),
        }
        self.send_command(WorkspaceCommand::HideDebugger);
    }

    // ─────────────────────────────────────────────────────────
    // Store mutations
    // ─────────────────────────────────────────────────────────

    /// Record (or clear) the user-visible error
    pub fn set_error(&self, error: Option<String>) {
        if let Some(message) = &error {
            error!("{}", message);
        }
        self.dispatch(DebuggerAction::SetError(error));
    }

    /// Override the websocket address, bypassing the handshake
    pub fn force_process_socket(&self, socket: Option<String>) {
        debug!("Forcing process socket to {:?}", socket);
        self.dispatch(DebuggerAction::SetProcessSocket(socket));
    }

    /// Report that the debuggee's loader breakpoint has been resumed
    pub fn resume_loader_breakpoint(&self) {
        self.dispatch(DebuggerAction::LoaderBreakpointResumed);
    }

    pub fn add_service(&self, service: Arc<dyn DebuggerService>) {
        self.dispatch(DebuggerAction::AddService(service));
    }

    pub fn remove_service(&self, service: Arc<dyn DebuggerService>) {
        self.dispatch(DebuggerAction::RemoveService(service));
    }

    pub fn add_debugger_provider(&self, provider: Arc<dyn DebuggerProvider>) {
        self.dispatch(DebuggerAction::AddDebuggerProvider(provider));
    }

    pub fn remove_debugger_provider(&self, provider: Arc<dyn DebuggerProvider>) {
        self.dispatch(DebuggerAction::RemoveDebuggerProvider(provider));
    }

    pub fn add_evaluation_expression_provider(
        &self,
        provider: Arc<dyn EvaluationExpressionProvider>,
    ) {
        self.dispatch(DebuggerAction::AddEvaluationExpressionProvider(provider));
    }

    pub fn remove_evaluation_expression_provider(
        &self,
        provider: Arc<dyn EvaluationExpressionProvider>,
    ) {
        self.dispatch(DebuggerAction::RemoveEvaluationExpressionProvider(provider));
    }

    /// Recompute the connection list from the open project paths
    pub fn update_connections(&self) -> Vec<String> {
        let connections = compute_connections(&self.inner.project_paths.project_paths());
        debug!("Connections: {:?}", connections);
        self.dispatch(DebuggerAction::UpdateConnections(connections.clone()));
        connections
    }

    // ─────────────────────────────────────────────────────────
    // Teardown
    // ─────────────────────────────────────────────────────────

    /// Tie a subscription's lifetime to the controller
    pub fn add_disposable(&self, subscription: Subscription) {
        self.inner.disposables.add(subscription);
    }

    /// End any in-flight timer and release held subscriptions. Idempotent.
    ///
    /// Does not stop a running session. Later starts are refused with
    /// [`StartOutcome::Superseded`].
    pub fn dispose(&self) {
        if self.inner.disposables.is_disposed() {
            return;
        }
        debug!("Disposing debugger controller");
        self.inner.timer.end();
        self.inner.disposables.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposables.is_disposed()
    }

    // ─────────────────────────────────────────────────────────
    // Helpers
    // ─────────────────────────────────────────────────────────

    fn dispatch(&self, action: DebuggerAction) {
        self.inner.store.dispatch(action);
    }

    fn set_mode(&self, mode: DebuggerMode) {
        debug!("Debugger mode -> {}", mode);
        self.dispatch(DebuggerAction::DebuggerModeChange(mode));
    }

    fn track(&self, event: AnalyticsEvent) {
        self.inner.analytics.track(&event);
    }

    fn send_command(&self, command: WorkspaceCommand) {
        trace!("Workspace command {}", command);
        // No subscribers is fine
        let _ = self.inner.commands.send(command);
    }

    fn lock_transition(&self) -> MutexGuard<'_, Transition> {
        self.inner
            .transition
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }
}
