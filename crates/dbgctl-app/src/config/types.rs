//! Configuration types for dbgctl
//!
//! Defines:
//! - `Settings` - Settings loaded from `.dbgctl/config.toml`
//! - One sub-type per config section

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use dbgctl_adapter::{AdapterCommand, CommandProcessInfo};

/// Application settings (.dbgctl/config.toml)
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub adapter: AdapterSettings,

    #[serde(default)]
    pub analytics: AnalyticsSettings,

    #[serde(default)]
    pub session: SessionSettings,

    #[serde(default)]
    pub connections: ConnectionSettings,
}

/// Debug adapter launch settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AdapterSettings {
    /// Name reported in analytics events
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Program to launch under the inspector
    #[serde(default = "default_command")]
    pub command: String,

    #[serde(default = "default_args")]
    pub args: Vec<String>,

    /// Working directory (defaults to the current directory)
    #[serde(default)]
    pub cwd: Option<PathBuf>,

    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Grace period before the adapter is force-killed on stop
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,
}

impl Default for AdapterSettings {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            command: default_command(),
            args: default_args(),
            cwd: None,
            env: BTreeMap::new(),
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
        }
    }
}

fn default_service_name() -> String {
    "node".to_string()
}

fn default_command() -> String {
    "node".to_string()
}

fn default_args() -> Vec<String> {
    vec!["--inspect-brk=0".to_string(), "index.js".to_string()]
}

fn default_shutdown_timeout_ms() -> u64 {
    2000
}

impl AdapterSettings {
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    pub fn to_command(&self) -> AdapterCommand {
        let mut command = AdapterCommand::new(&self.command).args(self.args.iter().cloned());
        if let Some(cwd) = &self.cwd {
            command = command.cwd(cwd);
        }
        for (key, value) in &self.env {
            command = command.env(key, value);
        }
        command
    }

    /// Build the launch target for `start_debugging`
    pub fn to_process_info(&self) -> CommandProcessInfo {
        CommandProcessInfo::new(&self.service_name, self.to_command())
            .with_shutdown_timeout(self.shutdown_timeout())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AnalyticsSettings {
    /// Emit analytics events (to the log and the headless event stream)
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for AnalyticsSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SessionSettings {
    /// Request the console panel when a session starts
    #[serde(default = "default_true")]
    pub show_console_on_start: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            show_console_on_start: true,
        }
    }
}

/// Project paths offered to `update_connections`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ConnectionSettings {
    /// Local paths or `nuclide://host:port/path` remote paths
    #[serde(default)]
    pub project_paths: Vec<String>,
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_default() {
        let settings = Settings::default();
        assert_eq!(settings.adapter.command, "node");
        assert_eq!(settings.adapter.shutdown_timeout_ms, 2000);
        assert!(settings.analytics.enabled);
        assert!(settings.session.show_console_on_start);
        assert!(settings.connections.project_paths.is_empty());
    }

    #[test]
    fn test_partial_section_keeps_defaults() {
        let settings: Settings = toml::from_str(
            r#"
[adapter]
command = "deno"
"#,
        )
        .unwrap();

        assert_eq!(settings.adapter.command, "deno");
        assert_eq!(settings.adapter.service_name, "node");
        assert_eq!(settings.adapter.args, default_args());
    }

    #[test]
    fn test_to_command() {
        let settings = AdapterSettings {
            command: "python3".to_string(),
            args: vec!["-m".to_string(), "debugpy".to_string()],
            cwd: Some(PathBuf::from("/tmp")),
            env: BTreeMap::from([("A".to_string(), "1".to_string())]),
            ..Default::default()
        };

        let command = settings.to_command();

        assert_eq!(command.display(), "python3 -m debugpy");
        assert_eq!(command.cwd, Some(PathBuf::from("/tmp")));
        assert_eq!(command.env.get("A").map(String::as_str), Some("1"));
    }

    #[test]
    fn test_to_process_info() {
        use dbgctl_core::ProcessInfo;

        let settings = AdapterSettings {
            service_name: "php".to_string(),
            ..Default::default()
        };
        let info = settings.to_process_info();

        assert_eq!(info.service_name(), "php");
        assert_eq!(info.command().program, "node");
    }
}
