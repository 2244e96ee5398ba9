//! Headless mode runner - main event loop without UI
//!
//! Reads line commands from stdin, drives the session controller and emits
//! NDJSON events for every store change, workspace command and analytics
//! event.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

use dbgctl_app::{
    AnalyticsEvent, AnalyticsSink, ControllerOptions, DebuggerAction, DebuggerActions,
    DebuggerStore, NullAnalytics, Settings, StartOutcome, StaticProjectPaths, TracingAnalytics,
    WorkspaceCommand,
};
use dbgctl_core::prelude::*;
use dbgctl_core::ProcessInfo;

use super::HeadlessEvent;

/// Capacity of the stdin command channel
const COMMAND_CHANNEL_CAPACITY: usize = 16;

/// A line command read from stdin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadlessCommand {
    Start,
    Stop,
    Resume,
    Connections,
    Status,
    Quit,
}

impl HeadlessCommand {
    /// Parse one trimmed stdin line
    pub fn parse(line: &str) -> Option<Self> {
        match line {
            "start" | "s" => Some(Self::Start),
            "stop" | "x" => Some(Self::Stop),
            "resume" | "c" => Some(Self::Resume),
            "connections" => Some(Self::Connections),
            "status" => Some(Self::Status),
            "quit" | "q" => Some(Self::Quit),
            _ => None,
        }
    }
}

/// Writes analytics events to stdout as `analytics` lines and to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadlessAnalytics;

impl AnalyticsSink for HeadlessAnalytics {
    fn track(&self, event: &AnalyticsEvent) {
        TracingAnalytics.track(event);
        HeadlessEvent::analytics(event).emit();
    }
}

/// Map a store action to the event reported for it, if any
pub fn event_for_action(action: &DebuggerAction) -> Option<HeadlessEvent> {
    match action {
        DebuggerAction::DebuggerModeChange(mode) => Some(HeadlessEvent::mode_changed(*mode)),
        DebuggerAction::SetProcessSocket(socket) => {
            Some(HeadlessEvent::socket_changed(socket.clone()))
        }
        DebuggerAction::SetError(message) => Some(HeadlessEvent::error(message.clone())),
        DebuggerAction::UpdateConnections(connections) => {
            Some(HeadlessEvent::connections(connections.clone()))
        }
        DebuggerAction::SetDebuggerInstance(_)
        | DebuggerAction::LoaderBreakpointResumed
        | DebuggerAction::AddService(_)
        | DebuggerAction::RemoveService(_)
        | DebuggerAction::AddDebuggerProvider(_)
        | DebuggerAction::RemoveDebuggerProvider(_)
        | DebuggerAction::AddEvaluationExpressionProvider(_)
        | DebuggerAction::RemoveEvaluationExpressionProvider(_) => None,
    }
}

/// Build the controller described by `settings`
pub fn build_controller(
    settings: &Settings,
    project_paths: Arc<StaticProjectPaths>,
) -> DebuggerActions {
    let analytics: Arc<dyn AnalyticsSink> = if settings.analytics.enabled {
        Arc::new(HeadlessAnalytics)
    } else {
        Arc::new(NullAnalytics)
    };
    let options = ControllerOptions {
        show_console_on_start: settings.session.show_console_on_start,
    };
    DebuggerActions::with_options(
        Arc::new(DebuggerStore::new()),
        analytics,
        project_paths,
        options,
    )
}

/// Run in headless mode until `quit`, stdin EOF or a termination signal
pub async fn run_headless(settings: Settings, project_paths: Arc<StaticProjectPaths>) -> Result<()> {
    info!("═══════════════════════════════════════════════════════");
    info!("dbgctl starting in HEADLESS mode");
    info!(
        "Adapter: {} ({} {})",
        settings.adapter.service_name,
        settings.adapter.command,
        settings.adapter.args.join(" ")
    );
    info!("═══════════════════════════════════════════════════════");

    let controller = build_controller(&settings, project_paths);
    let process_info: Arc<dyn ProcessInfo> = Arc::new(settings.adapter.to_process_info());

    let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
    let stdin_tx = cmd_tx.clone();
    std::thread::spawn(move || {
        spawn_stdin_reader_blocking(stdin_tx);
    });
    spawn_signal_handler(cmd_tx);

    HeadlessEvent::ready().emit();

    let result = headless_event_loop(&controller, process_info, cmd_rx).await;

    controller.dispose();
    info!("dbgctl headless mode exiting");
    result
}

/// Main headless event loop
async fn headless_event_loop(
    controller: &DebuggerActions,
    process_info: Arc<dyn ProcessInfo>,
    mut cmd_rx: mpsc::Receiver<HeadlessCommand>,
) -> Result<()> {
    let mut actions = controller.store().subscribe_actions();
    let mut commands = controller.subscribe_commands();
    let (outcome_tx, mut outcome_rx) = mpsc::unbounded_channel::<StartOutcome>();
    let mut starts = tokio::task::JoinSet::new();

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => match cmd {
                Some(HeadlessCommand::Quit) | None => {
                    info!("Quit requested");
                    break;
                }
                Some(HeadlessCommand::Start) => {
                    let controller = controller.clone();
                    let info = Arc::clone(&process_info);
                    let outcome_tx = outcome_tx.clone();
                    starts.spawn(async move {
                        let outcome = controller.start_debugging(info).await;
                        let _ = outcome_tx.send(outcome);
                    });
                }
                Some(cmd) => handle_command(controller, cmd),
            },
            Some(outcome) = outcome_rx.recv() => {
                HeadlessEvent::start_finished(&outcome).emit();
            }
            action = actions.recv() => {
                if !forward_action(action) {
                    break;
                }
            }
            command = commands.recv() => {
                if !forward_command(command) {
                    break;
                }
            }
            Some(joined) = starts.join_next(), if !starts.is_empty() => {
                if let Err(e) = joined {
                    error!("Start task failed: {}", e);
                }
            }
        }
    }

    controller.stop_debugging();
    // Starts still waiting on an adapter are abandoned
    starts.shutdown().await;

    while let Ok(action) = actions.try_recv() {
        if let Some(event) = event_for_action(&action) {
            event.emit();
        }
    }
    while let Ok(command) = commands.try_recv() {
        HeadlessEvent::workspace_command(command).emit();
    }
    while let Ok(outcome) = outcome_rx.try_recv() {
        HeadlessEvent::start_finished(&outcome).emit();
    }

    Ok(())
}

/// Handle a command that completes synchronously
fn handle_command(controller: &DebuggerActions, cmd: HeadlessCommand) {
    debug!("Headless command: {:?}", cmd);
    match cmd {
        HeadlessCommand::Stop => controller.stop_debugging(),
        HeadlessCommand::Resume => controller.resume_loader_breakpoint(),
        HeadlessCommand::Connections => {
            controller.update_connections();
        }
        HeadlessCommand::Status => HeadlessEvent::status(controller.store().snapshot()).emit(),
        HeadlessCommand::Start | HeadlessCommand::Quit => {}
    }
}

/// Emit the event for a received action. Returns false once the store is gone.
fn forward_action(action: std::result::Result<DebuggerAction, broadcast::error::RecvError>) -> bool {
    match action {
        Ok(action) => {
            if let Some(event) = event_for_action(&action) {
                event.emit();
            }
            true
        }
        Err(broadcast::error::RecvError::Lagged(skipped)) => {
            warn!("Headless output skipped {} store actions", skipped);
            true
        }
        Err(broadcast::error::RecvError::Closed) => false,
    }
}

fn forward_command(
    command: std::result::Result<WorkspaceCommand, broadcast::error::RecvError>,
) -> bool {
    match command {
        Ok(command) => {
            HeadlessEvent::workspace_command(command).emit();
            true
        }
        Err(broadcast::error::RecvError::Lagged(skipped)) => {
            warn!("Headless output skipped {} workspace commands", skipped);
            true
        }
        Err(broadcast::error::RecvError::Closed) => false,
    }
}

/// Spawn stdin reader that sends commands to the command channel (blocking version)
fn spawn_stdin_reader_blocking(cmd_tx: mpsc::Sender<HeadlessCommand>) {
    use std::io::BufRead;

    let stdin = std::io::stdin();
    let reader = stdin.lock();

    for line in reader.lines() {
        match line {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                match HeadlessCommand::parse(trimmed) {
                    Some(cmd) => {
                        info!("Stdin: {:?} requested", cmd);
                        if cmd_tx.blocking_send(cmd).is_err() || cmd == HeadlessCommand::Quit {
                            break;
                        }
                    }
                    None => warn!("Unknown stdin command: {}", trimmed),
                }
            }
            Err(e) => {
                error!("Failed to read stdin: {}", e);
                break;
            }
        }
    }

    info!("Stdin reader exiting");
}

/// Spawn a task that listens for OS signals and sends a quit command
fn spawn_signal_handler(cmd_tx: mpsc::Sender<HeadlessCommand>) {
    tokio::spawn(async move {
        if let Err(e) = wait_for_signal().await {
            error!("Signal handler error: {}", e);
            return;
        }

        info!("Shutdown signal received");
        let _ = cmd_tx.send(HeadlessCommand::Quit).await;
    });
}

/// Wait for a termination signal
async fn wait_for_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::select! {
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
        }

        Ok(())
    }

    #[cfg(windows)]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl+C");
        Ok(())
    }
}
