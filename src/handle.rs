//! Shared ownership wrapper for resources that cross the host boundary.
//!
//! Replies, categories and filter groups are backed by resources the host
//! runtime also holds a reference to. [`SharedHandle`] gives them explicit
//! reference counting with a release hook that runs exactly once when the
//! last alias drops, instead of relying on collector timing.
//!
//! # Example
//!
//! ```
//! use scopekit::handle::SharedHandle;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! let released = Arc::new(AtomicUsize::new(0));
//! let counter = released.clone();
//! {
//!     let handle = SharedHandle::with_release(42u32, move |_| {
//!         counter.fetch_add(1, Ordering::SeqCst);
//!     });
//!     let alias = handle.clone();
//!     assert_eq!(*alias, 42);
//! }
//! assert_eq!(released.load(Ordering::SeqCst), 1);
//! ```

use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

type ReleaseFn<T> = Box<dyn Fn(&T) + Send + Sync>;

struct Shared<T> {
    value: T,
    released: AtomicBool,
    release: Option<ReleaseFn<T>>,
}

impl<T> Shared<T> {
    /// Run the release hook if it has not run yet.
    fn release(&self) {
        if self.released.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(release) = &self.release {
            release(&self.value);
        }
    }
}

impl<T> Drop for Shared<T> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Reference-counted ownership of an externally managed resource.
///
/// Multiple handles may alias the same resource; the release hook runs when
/// the last alias drops, or earlier via [`release_now`](Self::release_now).
/// Either way it runs exactly once, even if both paths trigger.
///
/// Callers must finish all use of a handle (including any terminal reply
/// call) before dropping the last alias; release never runs concurrently
/// with an in-flight call on the same handle.
pub struct SharedHandle<T> {
    inner: Arc<Shared<T>>,
}

impl<T> SharedHandle<T> {
    /// Wrap a value with no release hook.
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(Shared {
                value,
                released: AtomicBool::new(false),
                release: None,
            }),
        }
    }

    /// Wrap a value with a release hook invoked once on last drop.
    pub fn with_release<F>(value: T, release: F) -> Self
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(Shared {
                value,
                released: AtomicBool::new(false),
                release: Some(Box::new(release)),
            }),
        }
    }

    /// Release the underlying resource now instead of waiting for the last
    /// alias to drop. Idempotent; the drop-triggered release becomes a no-op.
    pub fn release_now(&self) {
        self.inner.release();
    }

    /// Whether the release hook has already run.
    pub fn is_released(&self) -> bool {
        self.inner.released.load(Ordering::Acquire)
    }

    /// Number of live aliases of this resource.
    pub fn alias_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

impl<T> Clone for SharedHandle<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Deref for SharedHandle<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner.value
    }
}

impl<T: fmt::Debug> fmt::Debug for SharedHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedHandle")
            .field("value", &self.inner.value)
            .field("released", &self.is_released())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting_handle() -> (SharedHandle<String>, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let handle = SharedHandle::with_release("resource".to_string(), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (handle, count)
    }

    #[test]
    fn test_release_on_last_drop() {
        let (handle, count) = counting_handle();
        let alias = handle.clone();
        drop(handle);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        drop(alias);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_release_now_is_idempotent() {
        let (handle, count) = counting_handle();
        handle.release_now();
        handle.release_now();
        assert!(handle.is_released());
        drop(handle);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_deref() {
        let handle = SharedHandle::new(vec![1, 2, 3]);
        assert_eq!(handle.len(), 3);
    }

    #[test]
    fn test_no_release_hook() {
        let handle = SharedHandle::new(7u8);
        handle.release_now();
        assert!(handle.is_released());
    }

    #[test]
    fn test_alias_count() {
        let handle = SharedHandle::new(());
        assert_eq!(handle.alias_count(), 1);
        let alias = handle.clone();
        assert_eq!(handle.alias_count(), 2);
        drop(alias);
        assert_eq!(handle.alias_count(), 1);
    }

    #[test]
    fn test_release_once_across_threads() {
        let (handle, count) = counting_handle();
        let mut joins = Vec::new();
        for _ in 0..8 {
            let alias = handle.clone();
            joins.push(std::thread::spawn(move || {
                drop(alias);
            }));
        }
        drop(handle);
        for join in joins {
            join.join().unwrap();
        }
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
