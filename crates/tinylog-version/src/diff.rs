//! Line-level diff codec (C4): a greedy, line-aligned diff generator, its
//! binary encoding, and the apply/reverse operations that replay it.
//!
//! Grounded on `original_source/update_poc/poc/version_util.py`'s diff
//! routine — unlike a classic LCS/Myers diff, this walks both texts once
//! with a one-line lookahead, trading optimality for the O(n·m) simplicity
//! the original favors for small source files.

use tinylog_proto::{from_varint, to_varint};

use crate::error::Error;

/// A single line-level edit: insert or delete `text` at `line_num`
/// (1-based, in the coordinate space of the text being edited at the time
/// this change is applied).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    /// 1-based line number this change applies at.
    pub line_num: u32,
    /// Whether this change inserts or deletes a line.
    pub op: ChangeOp,
    /// The line's text (without its trailing `\n`).
    pub text: String,
}

/// The two edit kinds a [`Change`] can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOp {
    /// Insert `text` at `line_num`.
    Insert,
    /// Delete the line at `line_num` (its text is carried for `reverse`).
    Delete,
}

impl ChangeOp {
    const INSERT_TAG: u8 = b'I';
    const DELETE_TAG: u8 = b'D';

    fn tag(self) -> u8 {
        match self {
            Self::Insert => Self::INSERT_TAG,
            Self::Delete => Self::DELETE_TAG,
        }
    }

    fn from_tag(tag: u8) -> Result<Self, Error> {
        match tag {
            Self::INSERT_TAG => Ok(Self::Insert),
            Self::DELETE_TAG => Ok(Self::Delete),
            other => Err(Error::Decode(format!("unknown change op byte {other:#04x}"))),
        }
    }

    /// `Insert` becomes `Delete` and vice versa, for [`reverse`].
    #[must_use]
    pub fn flipped(self) -> Self {
        match self {
            Self::Insert => Self::Delete,
            Self::Delete => Self::Insert,
        }
    }
}

/// Computes the greedy line-aligned diff that transforms `old` into `new`.
///
/// Splits both texts on `\n` into queues and walks them in lockstep:
/// matching lines advance both queues, a deleted line is one that never
/// reappears later in `new`, and an inserted line is one whose `old`
/// counterpart is still coming up later (so `old` is deferred instead of
/// deleted). Trailing lines left in either queue after the other empties
/// are emitted in order — deletions hold `line_num` steady (each deletion
/// shifts the remaining lines up by one), insertions increment it.
#[must_use]
pub fn compute_changes(old: &str, new: &str) -> Vec<Change> {
    let mut old_queue: Vec<&str> = old.split('\n').collect();
    let mut new_queue: Vec<&str> = new.split('\n').collect();
    old_queue.reverse();
    new_queue.reverse();

    let mut line_num: u32 = 1;
    let mut changes = Vec::new();

    while let (Some(old_l), Some(new_l)) = (old_queue.last().copied(), new_queue.last().copied()) {
        if old_l == new_l {
            old_queue.pop();
            new_queue.pop();
            line_num += 1;
            continue;
        }

        old_queue.pop();
        new_queue.pop();

        if !new_queue.iter().any(|&l| l == old_l) {
            changes.push(Change { line_num, op: ChangeOp::Delete, text: old_l.to_string() });
            new_queue.push(new_l);
        } else {
            old_queue.push(old_l);
            changes.push(Change { line_num, op: ChangeOp::Insert, text: new_l.to_string() });
            line_num += 1;
        }
    }

    while let Some(old_l) = old_queue.pop() {
        changes.push(Change { line_num, op: ChangeOp::Delete, text: old_l.to_string() });
    }
    while let Some(new_l) = new_queue.pop() {
        changes.push(Change { line_num, op: ChangeOp::Insert, text: new_l.to_string() });
        line_num += 1;
    }

    changes
}

/// Encodes `changes` behind a 4-byte big-endian `dependency` version
/// number: `dependency ‖ (varint(len(record)) ‖ record)*`, each record
/// being `varint(line_num) ‖ op_byte ‖ utf8(text)`.
#[must_use]
pub fn encode(changes: &[Change], dependency: u32) -> Vec<u8> {
    let mut out = dependency.to_be_bytes().to_vec();
    for change in changes {
        let mut record = to_varint(u64::from(change.line_num));
        record.push(change.op.tag());
        record.extend_from_slice(change.text.as_bytes());

        out.extend_from_slice(&to_varint(record.len() as u64));
        out.extend_from_slice(&record);
    }
    out
}

/// Decodes a blob produced by [`encode`] back into its change list and
/// dependency version.
///
/// # Errors
///
/// Returns [`Error::Decode`] if the blob is shorter than 4 bytes, a varint
/// is truncated, a record's declared length runs past the end of the
/// blob, or a record's text is not valid UTF-8.
pub fn decode(bytes: &[u8]) -> Result<(Vec<Change>, u32), Error> {
    if bytes.len() < 4 {
        return Err(Error::Decode("blob shorter than the 4-byte dependency prefix".to_string()));
    }
    let dependency = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);

    let mut offset = 4;
    let mut changes = Vec::new();
    while offset < bytes.len() {
        let (record_len, consumed) =
            from_varint(&bytes[offset..]).map_err(|err| Error::Decode(format!("record length varint: {err}")))?;
        offset += consumed;
        let record_len = record_len as usize;
        if offset + record_len > bytes.len() {
            return Err(Error::Decode("record length runs past end of blob".to_string()));
        }
        let record = &bytes[offset..offset + record_len];
        offset += record_len;

        let (line_num, consumed) =
            from_varint(record).map_err(|err| Error::Decode(format!("line number varint: {err}")))?;
        if consumed >= record.len() {
            return Err(Error::Decode("record missing op byte".to_string()));
        }
        let op = ChangeOp::from_tag(record[consumed])?;
        let text = String::from_utf8(record[consumed + 1..].to_vec()).map_err(|err| Error::Decode(err.to_string()))?;

        changes.push(Change { line_num: line_num as u32, op, text });
    }

    Ok((changes, dependency))
}

/// Applies `changes` to `text` in order, returning the transformed text.
///
/// Indices are trusted as produced by [`compute_changes`]; this function
/// performs no bounds checking of its own (spec: the engine trusts the
/// diff generator's own indices).
#[must_use]
pub fn apply(text: &str, changes: &[Change]) -> String {
    let mut lines: Vec<&str> = text.split('\n').collect();
    for change in changes {
        let index = (change.line_num - 1) as usize;
        match change.op {
            ChangeOp::Insert => lines.insert(index, change.text.as_str()),
            ChangeOp::Delete => {
                lines.remove(index);
            }
        }
    }
    lines.join("\n")
}

/// Inverts `changes`: each insert becomes a delete and vice versa, and the
/// list order is reversed so undoing the changes restores the original
/// text when applied to the result of [`apply`].
#[must_use]
pub fn reverse(changes: &[Change]) -> Vec<Change> {
    changes.iter().rev().map(|c| Change { line_num: c.line_num, op: c.op.flipped(), text: c.text.clone() }).collect()
}
