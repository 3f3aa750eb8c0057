//! `FeedManager`: a lookup service from feed identifier to feed handle.
//!
//! spec.md §1 treats this as an external collaborator the core only calls
//! to resolve `parent_fid → Feed`. This module defines the trait the core
//! consumes, plus an in-memory reference implementation good enough for
//! tests and simple embedders — mirroring the teacher's pattern of shipping
//! a `MemoryStorage` next to every `Storage` trait.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::Error;
use crate::feed::Feed;

/// Resolves a feed identifier to its `Feed` handle.
pub trait FeedManager {
    /// Opens (or returns a cached handle to) the feed identified by `fid`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownFeed`] if no feed is registered for `fid`, or
    /// whatever [`Error`] opening the underlying file produces.
    fn get_feed(&self, fid: &[u8; 32]) -> Result<Feed, Error>;
}

/// A `FeedManager` backed by an in-memory table of feed file paths.
///
/// Each lookup re-opens the feed from disk (spec.md §5: no persistent
/// handle is retained between calls), so registering a path is cheap and
/// concurrent reads through separate `MemoryFeedManager` clones are safe.
#[derive(Debug, Clone, Default)]
pub struct MemoryFeedManager {
    paths: HashMap<[u8; 32], PathBuf>,
}

impl MemoryFeedManager {
    /// Builds an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the on-disk path for `fid`, overwriting any prior
    /// registration.
    pub fn register(&mut self, fid: [u8; 32], path: impl Into<PathBuf>) {
        self.paths.insert(fid, path.into());
    }
}

impl FeedManager for MemoryFeedManager {
    fn get_feed(&self, fid: &[u8; 32]) -> Result<Feed, Error> {
        let path = self.paths.get(fid).ok_or(Error::UnknownFeed(*fid))?;
        Feed::open(path)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::feed::Feed;

    #[test]
    fn resolves_a_registered_feed() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("main.log");
        let fid = [5u8; 32];
        Feed::create(&path, fid).expect("create");

        let mut manager = MemoryFeedManager::new();
        manager.register(fid, &path);

        let feed = manager.get_feed(&fid).expect("lookup");
        assert_eq!(feed.fid(), fid);
    }

    #[test]
    fn unknown_fid_errors() {
        let manager = MemoryFeedManager::new();
        let err = manager.get_feed(&[9u8; 32]).unwrap_err();
        assert!(matches!(err, Error::UnknownFeed(_)));
    }
}
