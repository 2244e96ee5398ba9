//! Workspace commands requested by the controller
//!
//! The controller never renders anything itself; it asks the host to show or
//! hide panels by publishing these commands.

use std::fmt;

use serde::{Serialize, Serializer};

/// A command for the hosting workspace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkspaceCommand {
    ShowConsole,
    ShowDebugger,
    HideDebugger,
}

impl WorkspaceCommand {
    /// Command identifier as understood by the host
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ShowConsole => "console:show",
            Self::ShowDebugger => "debugger:show",
            Self::HideDebugger => "debugger:hide",
        }
    }
}

impl fmt::Display for WorkspaceCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for WorkspaceCommand {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
