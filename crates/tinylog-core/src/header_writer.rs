//! Header-rewrite seam (spec.md §4.3, §9).
//!
//! After an append, the feed header's `front_seq`/`front_mid` fields (the
//! last 24 bytes of the 128-byte header) must be updated on disk. The
//! original micropython source rewrites the whole file because its
//! environment does not support partial in-place writes reliably; a desktop
//! target can instead seek and overwrite just those 24 bytes. Both produce
//! an identical observable result, so the strategy is a small trait rather
//! than a hardcoded branch — mirroring the teacher's `Environment` trait
//! seam for decoupling protocol logic from the surrounding system.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};

use tinylog_proto::{FEED_HEADER_SIZE, FeedHeader};

use crate::error::Error;

/// Offset of the `front_seq`/`front_mid` tail within the 128-byte header.
const FRONT_OFFSET: u64 = 104;
/// Length of the `front_seq`/`front_mid` tail.
const FRONT_LEN: usize = 24;

/// Strategy for persisting an updated header back to a feed file.
pub trait HeaderWriter {
    /// Writes `header`'s current `front_seq`/`front_mid` into `file`,
    /// which is positioned arbitrarily on entry and may be left positioned
    /// arbitrarily on return.
    fn write_front(&self, file: &mut File, header: &FeedHeader) -> Result<(), Error>;
}

/// Seeks to byte 104 and overwrites exactly the 24 trailing header bytes.
/// The default for desktop targets.
#[derive(Debug, Clone, Copy, Default)]
pub struct InPlaceHeaderWriter;

impl HeaderWriter for InPlaceHeaderWriter {
    fn write_front(&self, file: &mut File, header: &FeedHeader) -> Result<(), Error> {
        let bytes = header.to_bytes();
        let tail = &bytes[bytes.len() - FRONT_LEN..];
        file.seek(SeekFrom::Start(FRONT_OFFSET))?;
        file.write_all(tail)?;
        Ok(())
    }
}

/// Reads the whole file into memory, substitutes the header tail bytes, and
/// writes the whole buffer back. Matches the original embedded-environment
/// implementation byte for byte; kept for targets that cannot rely on
/// partial in-place writes.
#[derive(Debug, Clone, Copy, Default)]
pub struct WholeFileHeaderWriter;

impl HeaderWriter for WholeFileHeaderWriter {
    fn write_front(&self, file: &mut File, header: &FeedHeader) -> Result<(), Error> {
        let bytes = header.to_bytes();
        let tail = &bytes[bytes.len() - FRONT_LEN..];

        file.seek(SeekFrom::Start(0))?;
        let mut content = Vec::new();
        file.read_to_end(&mut content)?;
        if content.len() < FEED_HEADER_SIZE {
            return Err(Error::HeaderInvalid { reason: "file shorter than header".to_string() });
        }
        content[FEED_HEADER_SIZE - FRONT_LEN..FEED_HEADER_SIZE].copy_from_slice(tail);

        file.seek(SeekFrom::Start(0))?;
        file.write_all(&content)?;
        file.set_len(content.len() as u64)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read as _;

    use tempfile::NamedTempFile;

    use super::*;

    fn sample_file(header: &FeedHeader) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("tempfile");
        file.write_all(&header.to_bytes()).expect("write header");
        file
    }

    #[test]
    fn in_place_writer_updates_only_the_tail() {
        let header = FeedHeader::new_root([1u8; 32]);
        let mut file = sample_file(&header);
        let updated = header.with_front(2, [9u8; 20]);

        InPlaceHeaderWriter.write_front(file.as_file_mut(), &updated).expect("write");

        let mut content = Vec::new();
        file.as_file_mut().seek(SeekFrom::Start(0)).expect("seek");
        file.as_file_mut().read_to_end(&mut content).expect("read");
        assert_eq!(content, updated.to_bytes());
    }

    #[test]
    fn whole_file_writer_produces_the_same_result() {
        let header = FeedHeader::new_root([1u8; 32]);
        let mut in_place_file = sample_file(&header);
        let mut whole_file = sample_file(&header);
        let updated = header.with_front(5, [3u8; 20]);

        InPlaceHeaderWriter.write_front(in_place_file.as_file_mut(), &updated).expect("write");
        WholeFileHeaderWriter.write_front(whole_file.as_file_mut(), &updated).expect("write");

        let mut a = Vec::new();
        let mut b = Vec::new();
        in_place_file.as_file_mut().seek(SeekFrom::Start(0)).expect("seek");
        in_place_file.as_file_mut().read_to_end(&mut a).expect("read");
        whole_file.as_file_mut().seek(SeekFrom::Start(0)).expect("seek");
        whole_file.as_file_mut().read_to_end(&mut b).expect("read");
        assert_eq!(a, b);
    }
}
