//! Events produced by a debug adapter child process

/// Raw output and lifecycle events from an adapter process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterEvent {
    /// A line written to stdout
    Stdout(String),
    /// A line written to stderr
    Stderr(String),
    /// The process exited (code is `None` when killed by a signal)
    Exited { code: Option<i32> },
}

impl AdapterEvent {
    /// The output line carried by this event, if any
    pub fn line(&self) -> Option<&str> {
        match self {
            Self::Stdout(line) | Self::Stderr(line) => Some(line),
            Self::Exited { .. } => None,
        }
    }

    pub fn is_exit(&self) -> bool {
        matches!(self, Self::Exited { .. })
    }
}
