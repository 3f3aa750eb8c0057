//! Opt-in multi-writer guard for a single [`Feed`] (spec.md §5).
//!
//! `Feed` itself assumes single-writer discipline; a multi-threaded
//! embedder that needs to share one feed across threads wraps it here
//! instead of paying locking overhead inside every `Feed` method.

#![allow(clippy::expect_used, reason = "Mutex poisoning should cause a panic")]

use std::sync::{Arc, Mutex, MutexGuard};

use crate::feed::Feed;

/// A `Feed` behind a mutex, clonable and shareable across threads.
///
/// Every accessor takes the lock, runs its closure, and releases it —
/// mirroring `Feed`'s own "acquire per call, never hold between calls"
/// resource discipline one level up.
#[derive(Clone)]
pub struct SharedFeed {
    inner: Arc<Mutex<Feed>>,
}

impl SharedFeed {
    /// Wraps an already-open feed for shared access.
    #[must_use]
    pub fn new(feed: Feed) -> Self {
        Self { inner: Arc::new(Mutex::new(feed)) }
    }

    /// Locks the feed for the duration of `f` and returns its result.
    pub fn with<R>(&self, f: impl FnOnce(&Feed) -> R) -> R {
        let guard = self.lock();
        f(&guard)
    }

    /// Locks the feed mutably for the duration of `f` and returns its
    /// result. Use this for `append`/`append_bytes`/`append_blob`.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut Feed) -> R) -> R {
        let mut guard = self.lock();
        f(&mut guard)
    }

    fn lock(&self) -> MutexGuard<'_, Feed> {
        self.inner.lock().expect("feed mutex poisoned")
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn serializes_appends_across_clones() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("main.log");
        let fid = [6u8; 32];
        let feed = Feed::create(&path, fid).expect("create");
        let shared = SharedFeed::new(feed);
        let other = shared.clone();

        shared.with_mut(|feed| feed.append_bytes([1u8; 48])).expect("append via first handle");
        other.with_mut(|feed| feed.append_bytes([2u8; 48])).expect("append via cloned handle");

        let front_seq = shared.with(Feed::front_seq);
        assert_eq!(front_seq, 2);
    }
}
