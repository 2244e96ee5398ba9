//! Disposable subscriptions
//!
//! A [`Subscription`] wraps a release callback that runs at most once, either
//! through an explicit [`Subscription::dispose`] or when it is dropped.
//! [`CompositeDisposable`] collects subscriptions and releases them together.

use std::fmt;
use std::sync::Mutex;

type ReleaseFn = Box<dyn FnOnce() + Send>;

/// A handle that releases a registration exactly once.
#[must_use = "dropping a Subscription releases it immediately"]
pub struct Subscription {
    release: Option<ReleaseFn>,
}

impl Subscription {
    /// Create a subscription from a release callback
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// A subscription with nothing to release
    pub fn empty() -> Self {
        Self { release: None }
    }

    /// Release now. Subsequent calls (and the eventual drop) do nothing.
    pub fn dispose(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }

    /// True once the release callback has run (or if there never was one)
    pub fn is_disposed(&self) -> bool {
        self.release.is_none()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// A set of subscriptions disposed together.
///
/// Once disposed, any subscription added afterwards is released immediately.
#[derive(Debug, Default)]
pub struct CompositeDisposable {
    inner: Mutex<CompositeState>,
}

#[derive(Debug, Default)]
struct CompositeState {
    items: Vec<Subscription>,
    disposed: bool,
}

impl CompositeDisposable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscription to the set
    pub fn add(&self, mut subscription: Subscription) {
        let mut state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if state.disposed {
            drop(state);
            subscription.dispose();
            return;
        }
        state.items.push(subscription);
    }

    /// Number of subscriptions still held
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .items
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).disposed
    }

    /// Dispose every held subscription. Idempotent.
    ///
    /// Release callbacks run after the internal lock is released, so a
    /// callback may safely touch this set again.
    pub fn dispose(&self) {
        let items = {
            let mut state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            if state.disposed {
                return;
            }
            state.disposed = true;
            std::mem::take(&mut state.items)
        };
        for mut item in items {
            item.dispose();
        }
    }
}
