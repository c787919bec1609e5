//! Cooperative cancellation: single-fire tokens and the process-wide registry.
//!
//! The side that fires a cancellation (the host runtime) and the side that
//! observes it (a handler task) run on different execution contexts. The
//! registry decouples them: the firing side only holds an opaque
//! [`CancelId`], looks the token up under the registry mutex and fires it;
//! the handler holds the token itself and observes the flag without ever
//! touching the mutex. The mutex covers membership only, so registry
//! contention cannot slow a handler's hot path.
//!
//! # Example
//!
//! ```
//! use scopekit::cancel::CancellationRegistry;
//!
//! let token = CancellationRegistry::create();
//! assert!(!token.is_cancelled());
//!
//! CancellationRegistry::fire(token.id());
//! assert!(token.is_cancelled());
//!
//! CancellationRegistry::release(token.id());
//! // Firing a released id is a benign no-op.
//! CancellationRegistry::fire(token.id());
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use tokio::sync::Notify;

/// Opaque identity of a registered cancellation token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CancelId(u64);

struct TokenInner {
    id: CancelId,
    signalled: AtomicBool,
    notify: Notify,
}

/// A single-fire cancellation signal for one in-flight request.
///
/// Firing is at-most-once-effective; observation is idempotent and
/// lock-free. Cancellation is cooperative: handlers are expected to check
/// [`is_cancelled`](Self::is_cancelled) during long-running work, or race
/// their own work against [`cancelled`](Self::cancelled).
#[derive(Clone)]
pub struct CancellationToken {
    inner: Arc<TokenInner>,
}

impl CancellationToken {
    fn new(id: CancelId) -> Self {
        Self {
            inner: Arc::new(TokenInner {
                id,
                signalled: AtomicBool::new(false),
                notify: Notify::new(),
            }),
        }
    }

    /// The registry identity of this token.
    pub fn id(&self) -> CancelId {
        self.inner.id
    }

    /// Whether this token has been fired. Cheap; safe to call on every
    /// iteration of a result loop.
    pub fn is_cancelled(&self) -> bool {
        self.inner.signalled.load(Ordering::Acquire)
    }

    /// Resolves once the token fires. Use with `tokio::select!` to abandon
    /// long-running work promptly:
    ///
    /// ```ignore
    /// tokio::select! {
    ///     _ = cancel.cancelled() => return Ok(()),
    ///     results = fetch_upstream(query) => { /* push results */ }
    /// }
    /// ```
    pub async fn cancelled(&self) {
        // Re-check after registering interest so a fire between the flag
        // load and notified() cannot be missed.
        loop {
            if self.is_cancelled() {
                return;
            }
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }

    /// Set the signalled flag and wake any waiters. Repeat fires are no-ops.
    fn fire(&self) {
        if !self.inner.signalled.swap(true, Ordering::AcqRel) {
            self.inner.notify.notify_waiters();
        }
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("id", &self.inner.id)
            .field("signalled", &self.is_cancelled())
            .finish()
    }
}

/// Process-wide table of live cancellation tokens.
///
/// All mutation goes through [`create`](Self::create),
/// [`fire`](Self::fire) and [`release`](Self::release); the raw map is
/// never exposed. Observation goes through the token itself.
pub struct CancellationRegistry;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn table() -> &'static Mutex<HashMap<CancelId, CancellationToken>> {
    static TABLE: OnceLock<Mutex<HashMap<CancelId, CancellationToken>>> = OnceLock::new();
    TABLE.get_or_init(|| Mutex::new(HashMap::new()))
}

fn lock_table() -> std::sync::MutexGuard<'static, HashMap<CancelId, CancellationToken>> {
    // A panic while holding this lock only happens on handler tasks the
    // dispatcher already isolates; keep the registry usable afterwards.
    table().lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl CancellationRegistry {
    /// Allocate a new single-fire token under a fresh unique identity and
    /// register it.
    pub fn create() -> CancellationToken {
        let id = CancelId(NEXT_ID.fetch_add(1, Ordering::Relaxed));
        let token = CancellationToken::new(id);
        lock_table().insert(id, token.clone());
        token
    }

    /// Fire the token registered under `id`.
    ///
    /// Firing a stale identity (already released) is a benign no-op: the
    /// firing side cannot know, race-free, whether the request already
    /// finished.
    pub fn fire(id: CancelId) {
        // Clone out of the map so the actual fire happens outside the lock.
        let token = lock_table().get(&id).cloned();
        match token {
            Some(token) => token.fire(),
            None => tracing::debug!(?id, "cancellation fired for released identity"),
        }
    }

    /// Remove the entry for `id`. Idempotent; releasing an unknown identity
    /// is a no-op.
    pub fn release(id: CancelId) {
        lock_table().remove(&id);
    }
}
