//! Tests for the debugger session controller

use std::sync::atomic::AtomicUsize;
use std::time::Duration;

use dbgctl_adapter::test_utils::{FakeInstance, FakeProcessInfo};
use dbgctl_core::{same_arc, DebuggerInstance};
use tokio::task::JoinHandle;

use super::*;
use crate::analytics::RecordingAnalytics;
use crate::connections::{StaticProjectPaths, LOCAL_CONNECTION};
use crate::timer::SUPERSEDED_REASON;

const WAIT: Duration = Duration::from_secs(2);

struct Harness {
    actions: DebuggerActions,
    store: Arc<DebuggerStore>,
    analytics: Arc<RecordingAnalytics>,
    paths: Arc<StaticProjectPaths>,
    commands: broadcast::Receiver<WorkspaceCommand>,
}

fn harness_with(options: ControllerOptions) -> Harness {
    let store = Arc::new(DebuggerStore::new());
    let analytics = Arc::new(RecordingAnalytics::new());
    let paths = Arc::new(StaticProjectPaths::default());
    let actions = DebuggerActions::with_options(
        store.clone(),
        analytics.clone(),
        paths.clone(),
        options,
    );
    let commands = actions.subscribe_commands();
    Harness {
        actions,
        store,
        analytics,
        paths,
        commands,
    }
}

fn harness() -> Harness {
    harness_with(ControllerOptions::default())
}

fn spawn_start(actions: &DebuggerActions, info: FakeProcessInfo) -> JoinHandle<StartOutcome> {
    let actions = actions.clone();
    let info: Arc<dyn ProcessInfo> = Arc::new(info);
    tokio::spawn(async move { actions.start_debugging(info).await })
}

async fn wait_for_mode(store: &DebuggerStore, mode: DebuggerMode) {
    let mut rx = store.watch_mode();
    tokio::time::timeout(WAIT, rx.wait_for(|m| *m == mode))
        .await
        .expect("timed out waiting for mode")
        .expect("mode channel closed");
}

async fn eventually(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(WAIT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

async fn outcome_of(handle: JoinHandle<StartOutcome>) -> StartOutcome {
    tokio::time::timeout(WAIT, handle)
        .await
        .expect("start did not finish")
        .expect("start task panicked")
}

fn drain(rx: &mut broadcast::Receiver<WorkspaceCommand>) -> Vec<WorkspaceCommand> {
    let mut commands = Vec::new();
    while let Ok(command) = rx.try_recv() {
        commands.push(command);
    }
    commands
}

fn holds(store: &DebuggerStore, instance: &Arc<FakeInstance>) -> bool {
    let expected: Arc<dyn DebuggerInstance> = instance.clone();
    store
        .debugger_instance()
        .is_some_and(|active| same_arc(&active.instance, &expected))
}

fn timer_statuses(h: &Harness) -> Vec<Option<String>> {
    h.analytics
        .events()
        .iter()
        .filter(|e| e.name == START_DEBUGGING_TIMER)
        .map(|e| e.str_field("status").map(str::to_string))
        .collect()
}

/// Start a session on `instance` and bring it to `Running` with the loader
/// breakpoint resumed.
async fn run_session(h: &Harness, instance: &Arc<FakeInstance>) {
    let start = spawn_start(&h.actions, FakeProcessInfo::new("node", instance.clone()));
    eventually(|| {
        holds(&h.store, instance) && h.store.debugger_mode() == DebuggerMode::Running
    })
    .await;
    h.actions.resume_loader_breakpoint();
    assert_eq!(outcome_of(start).await, StartOutcome::Running);
}

// ─────────────────────────────────────────────────────────
// Start
// ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_start_reaches_running_after_loader_breakpoint() {
    let mut h = harness();
    let instance = FakeInstance::ready("ws://localhost:9000");
    let start = spawn_start(&h.actions, FakeProcessInfo::new("node", instance.clone()));

    wait_for_mode(&h.store, DebuggerMode::Running).await;
    assert_eq!(h.store.process_socket().as_deref(), Some("ws://localhost:9000"));
    tokio::task::yield_now().await;
    assert!(!start.is_finished(), "start must wait for the loader breakpoint");

    h.actions.resume_loader_breakpoint();

    assert_eq!(outcome_of(start).await, StartOutcome::Running);
    assert_eq!(h.store.debugger_mode(), DebuggerMode::Running);
    assert_eq!(h.store.error(), None);
    assert!(holds(&h.store, &instance));
    assert_eq!(instance.dispose_count(), 0);

    let events = h.analytics.events();
    assert_eq!(events[0].name, DEBUGGER_START);
    assert_eq!(events[0].str_field("serviceName"), Some("node"));
    assert_eq!(events[1].name, START_DEBUGGING_TIMER);
    assert_eq!(events[1].str_field("status"), Some("success"));
    assert_eq!(h.analytics.count(DEBUGGER_STOP), 0);

    assert_eq!(
        drain(&mut h.commands),
        vec![WorkspaceCommand::ShowConsole, WorkspaceCommand::ShowDebugger]
    );
}

#[tokio::test]
async fn test_start_publishes_actions_in_order() {
    let h = harness();
    let mut actions = h.store.subscribe_actions();

    run_session(&h, &FakeInstance::ready("ws://localhost:9000")).await;

    let mut types = Vec::new();
    while let Ok(action) = actions.try_recv() {
        types.push(action.action_type());
    }
    assert_eq!(
        types,
        vec![
            "SET_ERROR",
            "DEBUGGER_MODE_CHANGE",
            "SET_DEBUGGER_INSTANCE",
            "SET_PROCESS_SOCKET",
            "DEBUGGER_MODE_CHANGE",
            "LOADER_BREAKPOINT_RESUMED",
        ]
    );
}

#[tokio::test]
async fn test_start_without_console() {
    let mut h = harness_with(ControllerOptions {
        show_console_on_start: false,
    });

    run_session(&h, &FakeInstance::ready("ws://localhost:9000")).await;

    assert_eq!(drain(&mut h.commands), vec![WorkspaceCommand::ShowDebugger]);
}

#[tokio::test]
async fn test_adapter_failure_stops_and_records_error() {
    let h = harness();
    let info: Arc<dyn ProcessInfo> = Arc::new(FakeProcessInfo::failing("node", "adapter crashed"));

    let outcome = h.actions.start_debugging(info).await;

    let message = match outcome {
        StartOutcome::Failed(message) => message,
        other => panic!("expected failure, got {:?}", other),
    };
    assert!(message.starts_with(START_FAILURE_PREFIX));
    assert!(message.contains("adapter crashed"));
    assert_eq!(h.store.debugger_mode(), DebuggerMode::Stopped);
    assert_eq!(h.store.error(), Some(message));
    assert!(h.store.debugger_instance().is_none());

    assert_eq!(h.analytics.count(DEBUGGER_START_FAIL), 1);
    let timer = h
        .analytics
        .events()
        .into_iter()
        .find(|e| e.name == START_DEBUGGING_TIMER)
        .expect("timer event");
    assert_eq!(timer.str_field("status"), Some("failure"));
}

#[tokio::test]
async fn test_handshake_failure_disposes_instance() {
    let h = harness();
    let instance = FakeInstance::pending();
    let start = spawn_start(&h.actions, FakeProcessInfo::new("node", instance.clone()));
    eventually(|| holds(&h.store, &instance)).await;

    instance.fail_handshake("connection refused");

    let outcome = outcome_of(start).await;
    assert!(matches!(outcome, StartOutcome::Failed(ref m) if m.contains("connection refused")));
    assert_eq!(h.store.debugger_mode(), DebuggerMode::Stopped);
    assert!(h.store.debugger_instance().is_none());
    assert!(h.store.process_socket().is_none());
    assert_eq!(instance.dispose_count(), 1);
    assert_eq!(instance.handler_count(), 0);
}

#[tokio::test]
async fn test_new_start_clears_previous_error() {
    let h = harness();
    let failing: Arc<dyn ProcessInfo> = Arc::new(FakeProcessInfo::failing("node", "boom"));
    h.actions.start_debugging(failing).await;
    assert!(h.store.error().is_some());

    run_session(&h, &FakeInstance::ready("ws://localhost:9000")).await;

    assert_eq!(h.store.error(), None);
    assert_eq!(h.store.debugger_mode(), DebuggerMode::Running);
}

// ─────────────────────────────────────────────────────────
// Stop
// ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_stop_when_stopped_is_noop() {
    let mut h = harness();
    let mut actions = h.store.subscribe_actions();

    h.actions.stop_debugging();
    h.actions.stop_debugging();

    assert_eq!(h.store.debugger_mode(), DebuggerMode::Stopped);
    assert!(h.analytics.events().is_empty());
    assert!(drain(&mut h.commands).is_empty());
    assert!(actions.try_recv().is_err());
}

#[tokio::test]
async fn test_stop_running_session() {
    let mut h = harness();
    let instance = FakeInstance::ready("ws://localhost:9000");
    run_session(&h, &instance).await;
    drain(&mut h.commands);

    h.actions.stop_debugging();

    assert_eq!(h.store.debugger_mode(), DebuggerMode::Stopped);
    assert!(h.store.debugger_instance().is_none());
    assert!(h.store.process_socket().is_none());
    assert_eq!(instance.dispose_count(), 1);
    assert_eq!(instance.handler_count(), 0);
    assert_eq!(h.analytics.count(DEBUGGER_STOP), 1);
    assert_eq!(drain(&mut h.commands), vec![WorkspaceCommand::HideDebugger]);

    h.actions.stop_debugging();
    assert_eq!(instance.dispose_count(), 1);
    assert_eq!(h.analytics.count(DEBUGGER_STOP), 1);
}

#[tokio::test]
async fn test_stop_before_loader_breakpoint_supersedes_start() {
    let h = harness();
    let instance = FakeInstance::ready("ws://localhost:9000");
    let start = spawn_start(&h.actions, FakeProcessInfo::new("node", instance.clone()));
    wait_for_mode(&h.store, DebuggerMode::Running).await;

    h.actions.stop_debugging();

    assert_eq!(outcome_of(start).await, StartOutcome::Superseded);
    assert_eq!(h.store.debugger_mode(), DebuggerMode::Stopped);
    assert_eq!(h.store.error(), None);
    assert_eq!(instance.dispose_count(), 1);
}

#[tokio::test]
async fn test_dispose_failure_still_clears_instance() {
    let h = harness();
    let instance = FakeInstance::failing_dispose("ws://localhost:9000", "already gone");
    run_session(&h, &instance).await;

    h.actions.stop_debugging();

    assert_eq!(instance.dispose_count(), 1);
    assert!(h.store.debugger_instance().is_none());
    assert_eq!(h.store.debugger_mode(), DebuggerMode::Stopped);
}

#[tokio::test]
async fn test_stop_ends_start_timer() {
    let h = harness();
    let instance = FakeInstance::pending();
    let start = spawn_start(&h.actions, FakeProcessInfo::new("node", instance.clone()));
    eventually(|| holds(&h.store, &instance)).await;

    h.actions.stop_debugging();
    instance.fail_handshake("disposed");

    assert_eq!(outcome_of(start).await, StartOutcome::Superseded);
    assert_eq!(h.analytics.count(START_DEBUGGING_TIMER), 1);
    assert_eq!(h.analytics.count(DEBUGGER_START_FAIL), 0);
    assert_eq!(h.store.error(), None);
}

// ─────────────────────────────────────────────────────────
// Session end
// ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_session_end_of_active_instance_stops() {
    let h = harness();
    let instance = FakeInstance::ready("ws://localhost:9000");
    run_session(&h, &instance).await;

    instance.fire_session_end();

    assert_eq!(h.store.debugger_mode(), DebuggerMode::Stopped);
    assert!(h.store.debugger_instance().is_none());
    assert_eq!(instance.dispose_count(), 1);
    assert_eq!(h.analytics.count(DEBUGGER_STOP), 1);
}

#[tokio::test]
async fn test_stale_session_end_is_ignored() {
    let h = harness();
    let first = FakeInstance::ready("ws://localhost:9000");
    let second = FakeInstance::ready("ws://localhost:9001");
    run_session(&h, &first).await;
    let stale_id = h.store.debugger_instance().map(|a| a.id).unwrap();
    run_session(&h, &second).await;

    first.fire_session_end();
    h.actions.handle_session_end(stale_id);

    assert_eq!(h.store.debugger_mode(), DebuggerMode::Running);
    assert!(holds(&h.store, &second));
    assert_eq!(second.dispose_count(), 0);
    assert_eq!(first.dispose_count(), 1);
}

#[tokio::test]
async fn test_session_end_during_handshake_reports_failure() {
    let h = harness();
    let instance = FakeInstance::pending();
    let start = spawn_start(&h.actions, FakeProcessInfo::new("node", instance.clone()));
    eventually(|| holds(&h.store, &instance)).await;

    instance.fire_session_end();
    assert_eq!(h.store.debugger_mode(), DebuggerMode::Stopped);
    instance.fail_handshake("debuggee exited");

    let outcome = outcome_of(start).await;
    assert!(matches!(outcome, StartOutcome::Failed(ref m) if m.contains("debuggee exited")));
    assert_eq!(h.store.debugger_mode(), DebuggerMode::Stopped);
    assert!(h.store.error().is_some());
    assert_eq!(h.analytics.count(DEBUGGER_START_FAIL), 1);
    assert_eq!(instance.dispose_count(), 1);
    assert_eq!(timer_statuses(&h), vec![Some("failure".to_string())]);
}

#[tokio::test]
async fn test_session_end_before_loader_breakpoint_fails_start() {
    let h = harness();
    let instance = FakeInstance::ready("ws://localhost:9000");
    let start = spawn_start(&h.actions, FakeProcessInfo::new("node", instance.clone()));
    wait_for_mode(&h.store, DebuggerMode::Running).await;

    instance.fire_session_end();

    let outcome = outcome_of(start).await;
    let StartOutcome::Failed(message) = outcome else {
        panic!("expected failure, got {:?}", outcome);
    };
    assert!(message.contains("loader breakpoint"));
    assert_eq!(h.store.debugger_mode(), DebuggerMode::Stopped);
    assert_eq!(h.store.error(), Some(message));
    assert_eq!(h.analytics.count(DEBUGGER_START_FAIL), 1);
    // The handshake itself had completed
    assert_eq!(timer_statuses(&h), vec![Some("success".to_string())]);
}

#[tokio::test]
async fn test_session_end_then_late_address_fails_start() {
    let h = harness();
    let instance = FakeInstance::pending();
    let start = spawn_start(&h.actions, FakeProcessInfo::new("node", instance.clone()));
    eventually(|| holds(&h.store, &instance)).await;

    instance.fire_session_end();
    instance.resolve_address("ws://localhost:9000");

    let outcome = outcome_of(start).await;
    assert!(matches!(outcome, StartOutcome::Failed(ref m) if m.contains("session ended")));
    assert_eq!(h.store.debugger_mode(), DebuggerMode::Stopped);
    assert!(h.store.error().is_some());
    assert!(h.store.process_socket().is_none());
    assert_eq!(h.analytics.count(DEBUGGER_START_FAIL), 1);
    assert_eq!(timer_statuses(&h), vec![Some("failure".to_string())]);
}

// ─────────────────────────────────────────────────────────
// Overlapping sessions
// ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_overlapping_starts_keep_only_latest_instance() {
    let h = harness();
    let late = FakeInstance::ready("ws://localhost:9000");
    let (slow_info, release) = FakeProcessInfo::gated("slow", late.clone());
    let slow_info = Arc::new(slow_info);
    let slow = {
        let actions = h.actions.clone();
        let info: Arc<dyn ProcessInfo> = slow_info.clone();
        tokio::spawn(async move { actions.start_debugging(info).await })
    };
    eventually(|| slow_info.debug_calls() == 1).await;

    let current = FakeInstance::ready("ws://localhost:9001");
    let fast = spawn_start(&h.actions, FakeProcessInfo::new("fast", current.clone()));
    wait_for_mode(&h.store, DebuggerMode::Running).await;

    release.send(()).unwrap();
    assert_eq!(outcome_of(slow).await, StartOutcome::Superseded);

    assert_eq!(late.dispose_count(), 1);
    assert_eq!(late.handler_count(), 0);
    assert!(holds(&h.store, &current));
    assert_eq!(h.store.process_socket().as_deref(), Some("ws://localhost:9001"));
    assert_eq!(h.store.debugger_mode(), DebuggerMode::Running);

    h.actions.resume_loader_breakpoint();
    assert_eq!(outcome_of(fast).await, StartOutcome::Running);
    assert_eq!(current.dispose_count(), 0);
}

#[tokio::test]
async fn test_restart_disposes_previous_instance() {
    let h = harness();
    let first = FakeInstance::ready("ws://localhost:9000");
    let second = FakeInstance::ready("ws://localhost:9001");
    run_session(&h, &first).await;

    run_session(&h, &second).await;

    assert_eq!(first.dispose_count(), 1);
    assert_eq!(first.handler_count(), 0);
    assert_eq!(second.dispose_count(), 0);
    assert!(holds(&h.store, &second));
    assert_eq!(h.analytics.count(DEBUGGER_STOP), 1);
    // Each start's timer is reported once, as a success
    assert_eq!(h.analytics.count(START_DEBUGGING_TIMER), 2);
    assert!(h
        .analytics
        .events()
        .iter()
        .all(|e| e.str_field("error") != Some(SUPERSEDED_REASON)));
}

#[tokio::test]
async fn test_start_during_pending_start_flushes_timer() {
    let h = harness();
    let (slow_info, release) = FakeProcessInfo::gated("slow", FakeInstance::pending());
    let slow = spawn_start(&h.actions, slow_info);
    eventually(|| h.store.debugger_mode() == DebuggerMode::Starting).await;

    run_session(&h, &FakeInstance::ready("ws://localhost:9001")).await;
    drop(release);

    assert_eq!(outcome_of(slow).await, StartOutcome::Superseded);
    let superseded = h
        .analytics
        .events()
        .into_iter()
        .filter(|e| e.str_field("error") == Some(SUPERSEDED_REASON))
        .count();
    assert_eq!(superseded, 1);
}

// ─────────────────────────────────────────────────────────
// Store mutations
// ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_update_connections() {
    let h = harness();
    h.paths.set(vec![
        "nuclide://dev.example.com:9090/home/me/a".to_string(),
        "/home/me/local".to_string(),
        "nuclide://dev.example.com:9090/home/me/b".to_string(),
        "nuclide://build.example.com:9090/src".to_string(),
    ]);

    let connections = h.actions.update_connections();

    assert_eq!(
        connections,
        vec![
            "nuclide://dev.example.com:9090/",
            "nuclide://build.example.com:9090/",
            LOCAL_CONNECTION,
        ]
    );
    assert_eq!(h.store.connections(), connections);
    assert_eq!(
        connections.iter().filter(|c| *c == LOCAL_CONNECTION).count(),
        1
    );
}

#[tokio::test]
async fn test_update_connections_without_paths() {
    let h = harness();
    assert_eq!(h.actions.update_connections(), vec![LOCAL_CONNECTION]);
}

#[tokio::test]
async fn test_set_error_and_force_socket() {
    let h = harness();

    h.actions.set_error(Some("bad things".to_string()));
    h.actions.force_process_socket(Some("ws://127.0.0.1:1234".to_string()));

    assert_eq!(h.store.error().as_deref(), Some("bad things"));
    assert_eq!(h.store.process_socket().as_deref(), Some("ws://127.0.0.1:1234"));

    h.actions.set_error(None);
    h.actions.force_process_socket(None);
    assert_eq!(h.store.error(), None);
    assert_eq!(h.store.process_socket(), None);
}

#[tokio::test]
async fn test_registry_mutations() {
    #[derive(Debug)]
    struct Js;

    impl DebuggerService for Js {
        fn name(&self) -> &str {
            "js"
        }
    }

    impl EvaluationExpressionProvider for Js {
        fn name(&self) -> &str {
            "js"
        }

        fn selector(&self) -> &str {
            "source.js"
        }
    }

    let h = harness();
    let service: Arc<dyn DebuggerService> = Arc::new(Js);
    let provider: Arc<dyn EvaluationExpressionProvider> = Arc::new(Js);

    h.actions.add_service(service.clone());
    h.actions.add_evaluation_expression_provider(provider.clone());
    h.actions.add_evaluation_expression_provider(provider.clone());

    assert!(h.store.service("js").is_some());
    assert_eq!(h.store.evaluation_expression_providers().len(), 1);

    h.actions.remove_service(service);
    h.actions.remove_evaluation_expression_provider(provider);

    assert!(h.store.services().is_empty());
    assert!(h.store.evaluation_expression_providers().is_empty());
}

// ─────────────────────────────────────────────────────────
// Dispose
// ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_dispose_twice_releases_once() {
    let h = harness();
    let released = Arc::new(AtomicUsize::new(0));
    let counter = released.clone();
    h.actions.add_disposable(Subscription::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    }));

    h.actions.dispose();
    h.actions.dispose();

    assert_eq!(released.load(Ordering::SeqCst), 1);
    assert!(h.actions.is_disposed());
}

#[tokio::test]
async fn test_dispose_releases_session_subscription() {
    let h = harness();
    let instance = FakeInstance::ready("ws://localhost:9000");
    run_session(&h, &instance).await;
    assert_eq!(instance.handler_count(), 1);

    h.actions.dispose();

    assert_eq!(instance.handler_count(), 0);
    // Dispose leaves the session itself alone
    assert_eq!(h.store.debugger_mode(), DebuggerMode::Running);
}

#[tokio::test]
async fn test_dispose_ends_inflight_timer() {
    let h = harness();
    let (info, _release) = FakeProcessInfo::gated("node", FakeInstance::pending());
    let _start = spawn_start(&h.actions, info);
    eventually(|| h.store.debugger_mode() == DebuggerMode::Starting).await;

    h.actions.dispose();

    assert_eq!(h.analytics.count(START_DEBUGGING_TIMER), 1);
}

#[tokio::test]
async fn test_start_after_dispose_is_refused() {
    let h = harness();
    h.actions.dispose();
    let instance = FakeInstance::ready("ws://localhost:9000");
    let info = FakeProcessInfo::new("node", instance.clone());
    let calls = Arc::new(info);

    let outcome = h.actions.start_debugging(calls.clone()).await;

    assert_eq!(outcome, StartOutcome::Superseded);
    assert_eq!(calls.debug_calls(), 0);
    assert_eq!(h.store.debugger_mode(), DebuggerMode::Stopped);
    assert!(h.analytics.events().is_empty());
}

#[tokio::test]
async fn test_dispose_during_start_drops_new_subscription() {
    let h = harness();
    let instance = FakeInstance::ready("ws://localhost:9000");
    let (info, release) = FakeProcessInfo::gated("node", instance.clone());
    let start = spawn_start(&h.actions, info);
    eventually(|| h.store.debugger_mode() == DebuggerMode::Starting).await;

    h.actions.dispose();
    release.send(()).unwrap();
    wait_for_mode(&h.store, DebuggerMode::Running).await;

    assert_eq!(instance.handler_count(), 0);
    start.abort();
}
