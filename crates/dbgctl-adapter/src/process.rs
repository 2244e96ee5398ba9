//! Debug adapter process management

use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{mpsc, oneshot, Notify};

use super::command::AdapterCommand;
use dbgctl_core::events::AdapterEvent;
use dbgctl_core::prelude::*;

/// Manages a debug adapter child process.
///
/// The `Child` handle is moved into a dedicated `wait_for_exit` background task that
/// calls `child.wait()`, so the real exit code is emitted as
/// `AdapterEvent::Exited { code: Some(N) }`.
///
/// `AdapterProcess` retains a kill channel ([`kill_tx`]) to request a force-kill, an
/// atomic flag ([`exited`]) for synchronous `has_exited()` checks, and a [`Notify`]
/// handle so `shutdown()` can await exit without holding a lock across `.await`.
pub struct AdapterProcess {
    /// Held open while the adapter runs; dropped to close the child's stdin.
    stdin: Option<ChildStdin>,
    /// Process ID for logging
    pid: Option<u32>,
    /// One-shot sender that tells the wait task to force-kill the process.
    /// Consumed on first use (or on drop).
    kill_tx: Option<oneshot::Sender<()>>,
    /// Set to `true` by the wait task once the child has exited.
    exited: Arc<AtomicBool>,
    /// Notified by the wait task immediately after the child exits.
    exit_notify: Arc<Notify>,
}

impl std::fmt::Debug for AdapterProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterProcess")
            .field("pid", &self.pid)
            .field("exited", &self.has_exited())
            .finish()
    }
}

impl AdapterProcess {
    /// Spawn the adapter command.
    ///
    /// Output lines and the final exit are sent to `event_tx`.
    pub async fn spawn(command: &AdapterCommand, event_tx: mpsc::Sender<AdapterEvent>) -> Result<Self> {
        command.check_cwd()?;
        let program = command.resolve_program()?;

        info!("Spawning debug adapter: {}", command.display());

        let mut cmd = Command::new(&program);
        cmd.args(&command.args)
            .envs(&command.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &command.cwd {
            cmd.current_dir(cwd);
        }

        let child = cmd.spawn().map_err(|e| Error::AdapterSpawn {
            reason: format!("{}: {}", program.display(), e),
        })?;

        Self::attach(child, event_tx)
    }

    /// Wire up stdio and the wait task for an already spawned child.
    fn attach(mut child: Child, event_tx: mpsc::Sender<AdapterEvent>) -> Result<Self> {
        let pid = child.id();
        info!("Debug adapter started with PID: {:?}", pid);

        let missing = |stream: &str| Error::AdapterSpawn {
            reason: format!("{} was not captured", stream),
        };

        let stdin = child.stdin.take().ok_or_else(|| missing("stdin"))?;

        // The stdout reader never emits Exited; that is the wait task's job
        let stdout = child.stdout.take().ok_or_else(|| missing("stdout"))?;
        tokio::spawn(Self::stdout_reader(stdout, event_tx.clone()));

        let stderr = child.stderr.take().ok_or_else(|| missing("stderr"))?;
        tokio::spawn(Self::stderr_reader(stderr, event_tx.clone()));

        let exited = Arc::new(AtomicBool::new(false));
        let exit_notify = Arc::new(Notify::new());

        // AdapterProcess holds the sender, the wait task holds the receiver.
        let (kill_tx, kill_rx) = oneshot::channel::<()>();

        tokio::spawn(Self::wait_for_exit(
            child,
            kill_rx,
            event_tx,
            Arc::clone(&exited),
            Arc::clone(&exit_notify),
        ));

        Ok(Self {
            stdin: Some(stdin),
            pid,
            kill_tx: Some(kill_tx),
            exited,
            exit_notify,
        })
    }

    /// Background task: owns `child`, waits for it to exit, emits `AdapterEvent::Exited`.
    ///
    /// Two ways the task can end:
    /// 1. The process exits on its own and `child.wait()` resolves.
    /// 2. `kill_rx` fires, so the child is killed first and then reaped.
    async fn wait_for_exit(
        mut child: Child,
        kill_rx: oneshot::Receiver<()>,
        event_tx: mpsc::Sender<AdapterEvent>,
        exited: Arc<AtomicBool>,
        exit_notify: Arc<Notify>,
    ) {
        let code: Option<i32> = tokio::select! {
            result = child.wait() => {
                match result {
                    Ok(status) => {
                        info!("Debug adapter exited with status: {:?}", status);
                        status.code()
                    }
                    Err(e) => {
                        error!("Error waiting for debug adapter: {}", e);
                        None
                    }
                }
            }
            _ = kill_rx => {
                info!("Kill signal received, force-killing debug adapter");
                if let Err(e) = child.kill().await {
                    error!("Failed to kill debug adapter: {}", e);
                }
                match child.wait().await {
                    Ok(status) => {
                        info!("Debug adapter killed, exit status: {:?}", status);
                        status.code()
                    }
                    Err(e) => {
                        error!("Error waiting after kill: {}", e);
                        None
                    }
                }
            }
        };

        // `has_exited()` must be true before anyone observes the event
        exited.store(true, Ordering::Release);
        exit_notify.notify_waiters();

        debug!("Sending AdapterEvent::Exited {{ code: {:?} }}", code);
        let _ = event_tx.send(AdapterEvent::Exited { code }).await;
    }

    async fn stdout_reader(stdout: tokio::process::ChildStdout, tx: mpsc::Sender<AdapterEvent>) {
        let mut reader = BufReader::new(stdout).lines();

        while let Ok(Some(line)) = reader.next_line().await {
            trace!("stdout: {}", line);

            if tx.send(AdapterEvent::Stdout(line)).await.is_err() {
                debug!("stdout channel closed");
                break;
            }
        }

        debug!("stdout reader finished");
    }

    async fn stderr_reader(stderr: tokio::process::ChildStderr, tx: mpsc::Sender<AdapterEvent>) {
        let mut reader = BufReader::new(stderr).lines();

        while let Ok(Some(line)) = reader.next_line().await {
            trace!("stderr: {}", line);

            if tx.send(AdapterEvent::Stderr(line)).await.is_err() {
                debug!("stderr channel closed");
                break;
            }
        }

        debug!("stderr reader finished");
    }

    /// Gracefully shut the adapter down.
    ///
    /// 1. Early exit if the process is already dead
    /// 2. Close stdin so well-behaved runtimes exit on their own
    /// 3. Wait up to `grace` for the exit notification
    /// 4. Force-kill if the grace period runs out
    pub async fn shutdown(&mut self, grace: Duration) -> Result<()> {
        if self.has_exited() {
            info!("Debug adapter already exited, skipping shutdown");
            return Ok(());
        }

        info!("Initiating debug adapter shutdown");
        drop(self.stdin.take());

        // Create the `notified()` future BEFORE the final `has_exited()` check
        // so a notification between the check and the await cannot be missed.
        let notified = self.exit_notify.notified();
        if self.has_exited() {
            info!("Debug adapter exited gracefully");
            return Ok(());
        }

        match tokio::time::timeout(grace, notified).await {
            Ok(()) => {
                info!("Debug adapter exited gracefully");
                Ok(())
            }
            Err(_) => {
                warn!("Timeout waiting for graceful exit, force killing");
                self.kill();
                Ok(())
            }
        }
    }

    /// Force kill the process by signalling the wait task.
    ///
    /// Safe to call repeatedly; only the first call sends the signal.
    pub fn kill(&mut self) {
        if let Some(tx) = self.kill_tx.take() {
            debug!("Force killing debug adapter via kill channel");
            // The wait task may have already exited naturally.
            let _ = tx.send(());
        }
    }

    /// Non-blocking check backed by an atomic flag set by the wait task.
    pub fn has_exited(&self) -> bool {
        self.exited.load(Ordering::Acquire)
    }

    pub fn is_running(&self) -> bool {
        !self.has_exited()
    }

    /// Get the process ID
    pub fn id(&self) -> Option<u32> {
        self.pid
    }
}

impl Drop for AdapterProcess {
    fn drop(&mut self) {
        if !self.has_exited() {
            warn!("AdapterProcess dropped while process may still be running");
            self.kill();
        }
        // kill_on_drop(true) on the Child is the final safety net
        debug!("AdapterProcess dropped");
    }
}
