//! Launch targets backed by a command-line debug adapter

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt};

use dbgctl_core::prelude::*;
use dbgctl_core::{DebuggerInstance, ProcessInfo};

use crate::command::AdapterCommand;
use crate::instance::ProcessDebuggerInstance;

/// Default grace period between closing the adapter's stdin and killing it
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(2000);

/// A [`ProcessInfo`] that spawns an adapter command on every `debug()` call.
#[derive(Debug, Clone)]
pub struct CommandProcessInfo {
    service_name: String,
    command: AdapterCommand,
    shutdown_timeout: Duration,
}

impl CommandProcessInfo {
    pub fn new(service_name: impl Into<String>, command: AdapterCommand) -> Self {
        Self {
            service_name: service_name.into(),
            command,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    pub fn command(&self) -> &AdapterCommand {
        &self.command
    }
}

impl ProcessInfo for CommandProcessInfo {
    fn service_name(&self) -> &str {
        &self.service_name
    }

    fn debug(&self) -> BoxFuture<'_, Result<Arc<dyn DebuggerInstance>>> {
        async move {
            debug!(service = %self.service_name, "Launching {}", self.command.display());
            let instance = ProcessDebuggerInstance::spawn(&self.command, self.shutdown_timeout).await?;
            Ok(instance as Arc<dyn DebuggerInstance>)
        }
        .boxed()
    }
}
