//! Application error types with rich context

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Application error types organized by layer/domain
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Common/Infrastructure Errors
    // ─────────────────────────────────────────────────────────────
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ─────────────────────────────────────────────────────────────
    // Debug Adapter Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Debug adapter command not found: {command}")]
    AdapterNotFound { command: String },

    #[error("Failed to spawn debug adapter: {reason}")]
    AdapterSpawn { reason: String },

    #[error("Debug adapter error: {message}")]
    Adapter { message: String },

    #[error("Debugger handshake failed: {message}")]
    Handshake { message: String },

    #[error("Invalid websocket address: {address}")]
    InvalidAddress { address: String },

    #[error("Failed to dispose debugger instance: {message}")]
    Disposal { message: String },

    // ─────────────────────────────────────────────────────────────
    // Session Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Loader breakpoint gate closed before resume")]
    GateClosed,

    #[error("Debugger session ended before the loader breakpoint was resumed")]
    SessionEnded,

    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid configuration: {message}")]
    ConfigInvalid { message: String },

    #[error("Invalid remote URI: {uri}")]
    InvalidRemoteUri { uri: String },
}

// ─────────────────────────────────────────────────────────────────
// Convenience Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn adapter(message: impl Into<String>) -> Self {
        Self::Adapter {
            message: message.into(),
        }
    }

    pub fn adapter_not_found(command: impl Into<String>) -> Self {
        Self::AdapterNotFound {
            command: command.into(),
        }
    }

    pub fn handshake(message: impl Into<String>) -> Self {
        Self::Handshake {
            message: message.into(),
        }
    }

    pub fn invalid_address(address: impl Into<String>) -> Self {
        Self::InvalidAddress {
            address: address.into(),
        }
    }

    pub fn disposal(message: impl Into<String>) -> Self {
        Self::Disposal {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            message: message.into(),
        }
    }

    pub fn invalid_remote_uri(uri: impl Into<String>) -> Self {
        Self::InvalidRemoteUri { uri: uri.into() }
    }
}
