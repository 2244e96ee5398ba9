//! Capability traits supplied by debug adapters
//!
//! The controller treats adapters as opaque capability sets. These traits are
//! object-safe (futures are boxed) so a single controller can drive instances
//! produced by unrelated adapter implementations.

use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::disposable::Subscription;
use crate::error::Result;

/// Callback fired when a debugger instance's own session ends
/// (debuggee exited, adapter crashed, remote side hung up).
pub type SessionEndHandler = Box<dyn Fn() + Send + Sync>;

/// A launchable debug target.
pub trait ProcessInfo: Send + Sync + fmt::Debug {
    /// Name of the service that produced this target, reported in analytics
    fn service_name(&self) -> &str;

    /// Launch (or attach to) the debuggee and hand back a live instance.
    fn debug(&self) -> BoxFuture<'_, Result<Arc<dyn DebuggerInstance>>>;
}

/// A live debug target.
pub trait DebuggerInstance: Send + Sync + fmt::Debug {
    /// Resolve the websocket endpoint of the remote debug protocol.
    ///
    /// Completes the handshake; there is no timeout.
    fn websocket_address(&self) -> BoxFuture<'_, Result<String>>;

    /// Register a handler fired once when the instance's session ends.
    ///
    /// Instances that cannot report session end return `None`.
    fn on_session_end(&self, _handler: SessionEndHandler) -> Option<Subscription> {
        None
    }

    /// Release the instance (kill the debuggee, close connections).
    fn dispose(&self) -> Result<()>;
}

/// Protocol service registered by a debugger backend
pub trait DebuggerService: Send + Sync + fmt::Debug {
    /// Service identifier; the registry is keyed by it
    fn name(&self) -> &str;
}

/// Provider of launch/attach targets for a language or runtime
pub trait DebuggerProvider: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;
}

/// Provider of the expression under the cursor for datatip evaluation
pub trait EvaluationExpressionProvider: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Grammar scopes this provider applies to (e.g. `source.js, source.ts`)
    fn selector(&self) -> &str;
}

/// Pointer identity for registry payloads.
///
/// Registry entries are compared by identity only, never by content.
pub fn same_arc<T: ?Sized>(a: &Arc<T>, b: &Arc<T>) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct NamedProvider(&'static str);

    impl DebuggerProvider for NamedProvider {
        fn name(&self) -> &str {
            self.0
        }
    }

    #[test]
    fn test_same_arc_is_identity_not_equality() {
        let a: Arc<dyn DebuggerProvider> = Arc::new(NamedProvider("node"));
        let b: Arc<dyn DebuggerProvider> = Arc::new(NamedProvider("node"));
        let a2 = a.clone();

        assert!(same_arc(&a, &a2));
        assert!(!same_arc(&a, &b));
    }
}
