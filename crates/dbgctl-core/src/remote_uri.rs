//! Remote project path helpers
//!
//! Remote project roots are addressed as `nuclide://<hostname>:<port>/<path>`.
//! Anything else is a local path.

use url::Url;

use crate::error::{Error, Result};

/// URI scheme for remote project paths
pub const REMOTE_SCHEME: &str = "nuclide";

/// A parsed remote project path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteUri {
    pub hostname: String,
    pub port: u16,
    pub path: String,
}

impl RemoteUri {
    /// The connection root for this path (`nuclide://host:port/`)
    pub fn connection_root(&self) -> String {
        create_remote_uri(&self.hostname, self.port, "/")
    }
}

/// Check whether a project path refers to a remote host
pub fn is_remote(path: &str) -> bool {
    path.starts_with("nuclide://")
}

/// Parse a `nuclide://host:port/path` URI
pub fn parse_remote_uri(uri: &str) -> Result<RemoteUri> {
    if !is_remote(uri) {
        return Err(Error::invalid_remote_uri(uri));
    }
    let parsed = Url::parse(uri).map_err(|_| Error::invalid_remote_uri(uri))?;

    let hostname = parsed
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| Error::invalid_remote_uri(uri))?
        .to_string();
    let port = parsed.port().ok_or_else(|| Error::invalid_remote_uri(uri))?;
    let path = match parsed.path() {
        "" => "/".to_string(),
        p => p.to_string(),
    };

    Ok(RemoteUri {
        hostname,
        port,
        path,
    })
}

/// Build a remote URI from its parts
pub fn create_remote_uri(hostname: &str, port: u16, path: &str) -> String {
    format!("{}://{}:{}{}", REMOTE_SCHEME, hostname, port, path)
}
