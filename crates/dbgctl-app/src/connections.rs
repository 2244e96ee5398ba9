//! Known debugger connections
//!
//! A connection is either a remote server root (`nuclide://host:port/`) hosting
//! one of the open project paths, or the local machine.

use std::fmt;
use std::sync::RwLock;

use dbgctl_core::prelude::*;
use dbgctl_core::{is_remote, parse_remote_uri};

/// Connection entry for the local machine; always last
pub const LOCAL_CONNECTION: &str = "local";

/// Source of the currently open project paths
pub trait ProjectPaths: Send + Sync + fmt::Debug {
    fn project_paths(&self) -> Vec<String>;
}

/// A fixed (but replaceable) list of project paths
#[derive(Debug, Default)]
pub struct StaticProjectPaths {
    paths: RwLock<Vec<String>>,
}

impl StaticProjectPaths {
    pub fn new(paths: Vec<String>) -> Self {
        Self {
            paths: RwLock::new(paths),
        }
    }

    pub fn set(&self, paths: Vec<String>) {
        *self.paths.write().unwrap_or_else(|e| e.into_inner()) = paths;
    }
}

impl ProjectPaths for StaticProjectPaths {
    fn project_paths(&self) -> Vec<String> {
        self.paths.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

/// Compute the connection list for a set of project paths.
///
/// Remote paths are reduced to their server root, duplicates keep their first
/// position, and [`LOCAL_CONNECTION`] is appended.
pub fn compute_connections<S: AsRef<str>>(paths: &[S]) -> Vec<String> {
    let mut connections: Vec<String> = Vec::new();
    for path in paths.iter().map(AsRef::as_ref).filter(|p| is_remote(p)) {
        match parse_remote_uri(path) {
            Ok(uri) => {
                let root = uri.connection_root();
                if !connections.contains(&root) {
                    connections.push(root);
                }
            }
            Err(e) => warn!("Ignoring project path {}: {}", path, e),
        }
    }
    connections.push(LOCAL_CONNECTION.to_string());
    connections
}
