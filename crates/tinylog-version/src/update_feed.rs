//! The on-disk convention a feed uses to carry version updates (spec.md
//! §6): free functions over `&Feed` rather than inherent methods, since
//! `Feed` lives in `tinylog-core` and the orphan rule forbids adding
//! inherent impls to it from this crate.
//!
//! Layout: the packet at `anchor_seq + 1` is a `plain48` whose first 4
//! bytes are `min_version` (big-endian `u32`) and next 4 are
//! `max_version`. Every packet from `anchor_seq + 2` onward is a
//! `chain20` update blob, indexed by `min_version + offset`.

use tinylog_core::{Error as CoreError, Feed};

use crate::error::Error;

fn version_range_packet(feed: &Feed) -> Result<Option<[u8; 48]>, Error> {
    match feed.get_bytes(i64::from(feed.anchor_seq()) + 1) {
        Ok(Some(payload)) => {
            let mut out = [0u8; 48];
            out.copy_from_slice(&payload);
            Ok(Some(out))
        }
        Ok(None) => Ok(None),
        Err(CoreError::OutOfRange { .. }) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// The lowest version number this feed's update chain carries, or `None`
/// if the feed carries no update chain at all.
///
/// # Errors
///
/// Propagates any I/O failure surfaced while reading the feed.
pub fn get_upd_version(feed: &Feed) -> Result<Option<u32>, Error> {
    Ok(version_range_packet(feed)?.map(|payload| u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]])))
}

/// The highest version number this feed's update chain currently carries,
/// or `None` if the feed carries no update chain at all.
///
/// # Errors
///
/// Propagates any I/O failure surfaced while reading the feed.
pub fn get_current_version_num(feed: &Feed) -> Result<Option<u32>, Error> {
    Ok(version_range_packet(feed)?.map(|payload| u32::from_be_bytes([payload[4], payload[5], payload[6], payload[7]])))
}

/// Fetches the encoded diff blob for `version` from this feed's update
/// chain.
///
/// # Errors
///
/// Returns [`Error::UpdateNotAvailable`] if `version` falls outside this
/// feed's `[min_version, max_version]` range or the indexed packet is
/// absent/unverifiable. Propagates any other I/O failure.
pub fn get_update_blob(feed: &Feed, version: u32) -> Result<Vec<u8>, Error> {
    let min_version = get_upd_version(feed)?.ok_or(Error::UpdateNotAvailable { version })?;
    let max_version = get_current_version_num(feed)?.ok_or(Error::UpdateNotAvailable { version })?;
    if version < min_version || version > max_version {
        return Err(Error::UpdateNotAvailable { version });
    }

    let offset = i64::from(version - min_version);
    let seq = i64::from(feed.anchor_seq()) + 2 + offset;
    match feed.get_bytes(seq) {
        Ok(Some(blob)) => Ok(blob),
        Ok(None) => Err(Error::UpdateNotAvailable { version }),
        Err(CoreError::OutOfRange { .. }) => Err(Error::UpdateNotAvailable { version }),
        Err(err) => Err(err.into()),
    }
}

/// Reads just the 4-byte dependency prefix of `version`'s update blob,
/// without requiring the diff-record remainder to be well-formed. Used by
/// DAG adjacency construction, which only needs the dependency edge.
///
/// # Errors
///
/// See [`get_update_blob`]. Returns [`Error::Decode`] if the blob is
/// shorter than 4 bytes.
pub fn get_update_dependency(feed: &Feed, version: u32) -> Result<u32, Error> {
    let blob = get_update_blob(feed, version)?;
    if blob.len() < 4 {
        return Err(Error::Decode(format!("update blob for version {version} shorter than 4-byte dependency prefix")));
    }
    Ok(u32::from_be_bytes([blob[0], blob[1], blob[2], blob[3]]))
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    fn write_range(feed: &mut Feed, min_version: u32, max_version: u32) {
        let mut payload = [0u8; 48];
        payload[..4].copy_from_slice(&min_version.to_be_bytes());
        payload[4..8].copy_from_slice(&max_version.to_be_bytes());
        feed.append_bytes(payload).expect("append version range packet");
    }

    #[test]
    fn fresh_feed_carries_no_update_chain() {
        let dir = tempdir().expect("tempdir");
        let feed = Feed::create(dir.path().join("f.log"), [1u8; 32]).expect("create");
        assert_eq!(get_upd_version(&feed).expect("get_upd_version"), None);
        assert_eq!(get_current_version_num(&feed).expect("get_current_version_num"), None);
    }

    #[test]
    fn update_blobs_resolve_by_version_offset() {
        let dir = tempdir().expect("tempdir");
        let mut feed = Feed::create(dir.path().join("f.log"), [2u8; 32]).expect("create");
        write_range(&mut feed, 5, 7);

        feed.append_blob(&crate::diff::encode(&[], 0)).expect("append v5 blob");
        feed.append_blob(&crate::diff::encode(&[], 5)).expect("append v6 blob");
        feed.append_blob(&crate::diff::encode(&[], 6)).expect("append v7 blob");

        assert_eq!(get_upd_version(&feed).expect("min"), Some(5));
        assert_eq!(get_current_version_num(&feed).expect("max"), Some(7));
        assert_eq!(get_update_dependency(&feed, 6).expect("dep for v6"), 5);
        assert_eq!(get_update_dependency(&feed, 7).expect("dep for v7"), 6);
        assert!(matches!(get_update_blob(&feed, 8), Err(Error::UpdateNotAvailable { version: 8 })));
    }
}
