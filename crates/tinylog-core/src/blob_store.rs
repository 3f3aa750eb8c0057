//! Content-addressed sidecar store for blob-chain tail frames (spec.md
//! §4.2).
//!
//! Blobs live under `<feed-root>_blobs/<hex[0:2]>/<hex[2:]>`, sharded by the
//! first byte of their signature to bound directory fan-out. Every
//! operation opens, uses and releases its file handle within the call
//! (spec.md §5) — there is no persistent handle held between public calls.

use std::path::{Path, PathBuf};
use std::{fs, io};

use tinylog_proto::Blob;
use tracing::{debug, warn};

use crate::error::Error;

/// A content-addressed blob store rooted at a feed's `_blobs` directory.
#[derive(Debug, Clone)]
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    /// Builds a store rooted directly at `root` (the `_blobs` directory
    /// itself, not a feed file).
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Derives a blob store's root from a feed file's path: strips the last
    /// two path components and appends `_blobs` as a suffix of what remains,
    /// yielding a sibling directory (e.g. `/data/feeds/alice/main.log` ->
    /// `/data/feeds_blobs`), matching spec.md §4.2/§6 and
    /// `original_source/src/feed.py`'s `"/".join(split[:-2]) + "_blobs/"`.
    #[must_use]
    pub fn for_feed_path(feed_path: &Path) -> Self {
        let mut components: Vec<_> = feed_path.components().collect();
        components.truncate(components.len().saturating_sub(2));
        let root: PathBuf = components.iter().collect();
        let mut suffixed = root.into_os_string();
        suffixed.push("_blobs");
        Self::new(PathBuf::from(suffixed))
    }

    fn shard_path(&self, signature: &[u8; 20]) -> PathBuf {
        let hex = hex::encode(signature);
        self.root.join(&hex[0..2]).join(&hex[2..])
    }

    /// Reads the 120-byte blob addressed by `signature`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no blob file exists at the derived
    /// path, or [`Error::Io`] for any other I/O failure.
    pub fn read(&self, signature: &[u8; 20]) -> Result<Blob, Error> {
        let path = self.shard_path(signature);
        let bytes = fs::read(&path).map_err(|err| {
            if err.kind() == io::ErrorKind::NotFound {
                Error::NotFound { signature: hex::encode(signature) }
            } else {
                Error::Io(err)
            }
        })?;
        let frame: [u8; 120] = bytes
            .try_into()
            .map_err(|_| Error::HeaderInvalid { reason: "blob file is not exactly 120 bytes".to_string() })?;
        debug!(signature = %hex::encode(signature), "read blob");
        Ok(Blob::from_bytes(&frame))
    }

    /// Writes every blob in `blobs`, creating shard directories as needed.
    ///
    /// All-or-nothing per blob: if any write fails the store reports
    /// failure immediately without attempting the remaining blobs (spec.md
    /// §4.2). Blobs already written before the failure are left in place —
    /// they are content-addressed and idempotent to rewrite, so a retry of
    /// the whole batch is always safe.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if a shard directory cannot be created or a
    /// blob file cannot be written.
    pub fn write(&self, blobs: &[Blob]) -> Result<(), Error> {
        for blob in blobs {
            let signature = blob.signature();
            let path = self.shard_path(&signature);
            if let Some(dir) = path.parent() {
                fs::create_dir_all(dir)?;
            }
            fs::write(&path, blob.to_bytes()).map_err(|err| {
                warn!(signature = %hex::encode(signature), error = %err, "failed writing blob");
                err
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn round_trips_a_blob() {
        let dir = tempdir().expect("tempdir");
        let store = BlobStore::new(dir.path());
        let blob = Blob { payload: [3u8; 100], next: [0u8; 20] };
        store.write(std::slice::from_ref(&blob)).expect("write");

        let read_back = store.read(&blob.signature()).expect("read");
        assert_eq!(read_back, blob);
    }

    #[test]
    fn missing_blob_is_not_found() {
        let dir = tempdir().expect("tempdir");
        let store = BlobStore::new(dir.path());
        let err = store.read(&[1u8; 20]).unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn shard_path_uses_first_hex_byte() {
        let store = BlobStore::new("/tmp/example_blobs");
        let sig = [0xABu8; 20];
        let path = store.shard_path(&sig);
        assert!(path.starts_with("/tmp/example_blobs/ab"));
    }

    #[test]
    fn derives_root_from_feed_path() {
        // Strips the last two components (the per-feed directory and the
        // file itself) and appends `_blobs` as a suffix of what remains, so
        // the store sits as a sibling of the per-feed directory tree.
        let store = BlobStore::for_feed_path(Path::new("/data/feeds/alice/main.log"));
        assert_eq!(store.root, PathBuf::from("/data/feeds_blobs"));
    }
}
