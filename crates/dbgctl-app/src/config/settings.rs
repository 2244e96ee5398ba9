//! Settings parser for .dbgctl/config.toml

use super::types::Settings;
use dbgctl_core::prelude::*;
use std::path::{Path, PathBuf};

const CONFIG_FILENAME: &str = "config.toml";
const DBGCTL_DIR: &str = ".dbgctl";

/// Default location of the config file for a project
pub fn config_path(project_path: &Path) -> PathBuf {
    project_path.join(DBGCTL_DIR).join(CONFIG_FILENAME)
}

/// Load settings from `<project>/.dbgctl/config.toml`.
///
/// Returns default settings if the file doesn't exist or is invalid.
pub fn load_settings(project_path: &Path) -> Settings {
    load_settings_from(&config_path(project_path))
}

/// Load settings from an explicit config file path
pub fn load_settings_from(config_path: &Path) -> Settings {
    if !config_path.exists() {
        debug!("No config file at {:?}, using defaults", config_path);
        return Settings::default();
    }

    match std::fs::read_to_string(config_path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(settings) => {
                debug!("Loaded settings from {:?}", config_path);
                settings
            }
            Err(e) => {
                warn!("Failed to parse {:?}: {}", config_path, e);
                Settings::default()
            }
        },
        Err(e) => {
            warn!("Failed to read {:?}: {}", config_path, e);
            Settings::default()
        }
    }
}

/// Create a commented default config file in the .dbgctl/ directory.
///
/// An existing config file is left untouched.
pub fn init_config_dir(project_path: &Path) -> Result<()> {
    let dbgctl_dir = project_path.join(DBGCTL_DIR);

    if !dbgctl_dir.exists() {
        std::fs::create_dir_all(&dbgctl_dir)
            .map_err(|e| Error::config(format!("Failed to create .dbgctl dir: {}", e)))?;
    }

    let config_path = dbgctl_dir.join(CONFIG_FILENAME);
    if !config_path.exists() {
        let default_content = r#"# dbgctl Configuration

[adapter]
service_name = "node"              # Reported in analytics events
command = "node"                   # Program launched under the inspector
args = ["--inspect-brk=0", "index.js"]
# cwd = "."                        # Defaults to the current directory
shutdown_timeout_ms = 2000         # Grace period before force-kill on stop

[adapter.env]
# NODE_ENV = "development"

[analytics]
enabled = true

[session]
show_console_on_start = true

[connections]
# Remote paths look like "nuclide://host:9090/path/to/project"
project_paths = []
"#;
        std::fs::write(&config_path, default_content)
            .map_err(|e| Error::config(format!("Failed to write config.toml: {}", e)))?;
        info!("Created default config at {:?}", config_path);
    }

    Ok(())
}
