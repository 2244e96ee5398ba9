//! Websocket address discovery from adapter output
//!
//! Debuggee runtimes announce their inspector endpoint on stdout or stderr,
//! e.g. `Debugger listening on ws://127.0.0.1:9229/6c1b...`.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use dbgctl_core::prelude::*;

static WS_ADDRESS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"wss?://[^\s"'<>]+"#).expect("Invalid websocket address regex")
});

/// Find the first valid websocket URL in an output line.
pub fn extract_websocket_address(line: &str) -> Option<String> {
    WS_ADDRESS_PATTERN
        .find_iter(line)
        .map(|m| m.as_str().trim_end_matches(['.', ',', ')', ']']))
        .find(|candidate| validate_websocket_address(candidate).is_ok())
        .map(str::to_string)
}

/// Check that an address is an absolute `ws://` or `wss://` URL with a host.
pub fn validate_websocket_address(address: &str) -> Result<Url> {
    let url = Url::parse(address).map_err(|_| Error::invalid_address(address))?;
    match url.scheme() {
        "ws" | "wss" if url.host_str().is_some_and(|h| !h.is_empty()) => Ok(url),
        _ => Err(Error::invalid_address(address)),
    }
}
