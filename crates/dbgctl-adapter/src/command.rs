//! Debug adapter command line description

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use dbgctl_core::prelude::*;

/// A command that launches a debuggee under an inspector,
/// e.g. `node --inspect-brk=0 server.js`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdapterCommand {
    /// Program name (looked up on `PATH`) or path to the executable
    pub program: String,
    pub args: Vec<String>,
    /// Working directory; inherits the current one when `None`
    pub cwd: Option<PathBuf>,
    /// Extra environment variables
    pub env: BTreeMap<String, String>,
}

impl AdapterCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Resolve the program to an executable path.
    ///
    /// Bare names are searched on `PATH` (relative to `cwd` when set).
    pub fn resolve_program(&self) -> Result<PathBuf> {
        if self.program.trim().is_empty() {
            return Err(Error::config_invalid("adapter command is empty"));
        }
        let resolved = match &self.cwd {
            Some(cwd) => which::which_in(&self.program, std::env::var_os("PATH"), cwd),
            None => which::which(&self.program),
        };
        resolved.map_err(|e| {
            debug!("Failed to resolve adapter program {}: {}", self.program, e);
            Error::adapter_not_found(&self.program)
        })
    }

    /// Validate the working directory, if one is configured
    pub fn check_cwd(&self) -> Result<()> {
        match &self.cwd {
            Some(cwd) if !Path::new(cwd).is_dir() => Err(Error::config_invalid(format!(
                "adapter working directory does not exist: {}",
                cwd.display()
            ))),
            _ => Ok(()),
        }
    }

    /// Shell-like rendering for logs
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let cmd = AdapterCommand::new("node")
            .arg("--inspect-brk=0")
            .args(["server.js", "--port", "8080"])
            .env("NODE_ENV", "development");

        assert_eq!(cmd.program, "node");
        assert_eq!(cmd.args.len(), 4);
        assert_eq!(cmd.env.get("NODE_ENV").map(String::as_str), Some("development"));
        assert_eq!(cmd.display(), "node --inspect-brk=0 server.js --port 8080");
    }

    #[test]
    fn test_resolve_missing_program() {
        let cmd = AdapterCommand::new("definitely-not-a-real-debug-adapter-binary");
        assert!(matches!(
            cmd.resolve_program(),
            Err(Error::AdapterNotFound { .. })
        ));
    }

    #[test]
    fn test_resolve_empty_program() {
        assert!(matches!(
            AdapterCommand::new("  ").resolve_program(),
            Err(Error::ConfigInvalid { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_sh() {
        assert!(AdapterCommand::new("sh").resolve_program().is_ok());
    }

    #[test]
    fn test_check_cwd() {
        let temp = tempfile::tempdir().unwrap();
        assert!(AdapterCommand::new("sh").cwd(temp.path()).check_cwd().is_ok());
        assert!(AdapterCommand::new("sh")
            .cwd(temp.path().join("missing"))
            .check_cwd()
            .is_err());
    }
}
