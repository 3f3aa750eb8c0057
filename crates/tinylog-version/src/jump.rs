//! Version transit (C6): composes the change list that carries a text body
//! from one version to another, by walking the BFS shortest path (C5) and
//! classifying it as monotonically increasing, monotonically decreasing, or
//! a V-shaped mixed path through a common ancestor (spec.md §4.6).

use tinylog_core::FeedManager;
use tracing::instrument;

use crate::dag::{VersionTree, shortest_path};
use crate::diff::{Change, reverse};
use crate::error::Error;

/// Composes the ordered [`Change`] list that transitions a text body from
/// `start` to `end`, per `tree`'s dependency graph.
///
/// Returns an empty list if `start == end`. Otherwise finds the BFS
/// shortest path between them and classifies it:
/// - **monotonically increasing**: the path never decreases; every version
///   after `start` is applied forward.
/// - **monotonically decreasing**: the path never increases; every version
///   up to (but not including) `end` is reverted.
/// - **mixed (V-shaped)**: a descending run toward a common ancestor
///   followed by an ascending run toward `end`. The common ancestor itself
///   is never applied nor reverted — reverting down to it and applying up
///   from it are equivalent to "already there".
///
/// # Errors
///
/// Returns [`Error::UpdateNotAvailable`] if `start` or `end` is not known
/// to `tree`, or if no path connects them. Propagates any failure surfaced
/// while fetching or decoding a version's update blob.
#[instrument(skip(tree, manager))]
pub fn jump_versions(tree: &VersionTree, manager: &dyn FeedManager, start: u32, end: u32) -> Result<Vec<Change>, Error> {
    if start == end {
        return Ok(Vec::new());
    }
    if !tree.knows(start) {
        return Err(Error::UpdateNotAvailable { version: start });
    }
    if !tree.knows(end) {
        return Err(Error::UpdateNotAvailable { version: end });
    }

    let path = shortest_path(tree, start, end).ok_or(Error::UpdateNotAvailable { version: end })?;

    // The maximal run of strictly-decreasing neighbors starting at index 0.
    // `pivot` is the last index of that run: 0 if the path is already
    // increasing (no descent at all), `path.len() - 1` if the whole path
    // descends, and the common-ancestor index for a V-shaped mixed path.
    let mut pivot = 0usize;
    while pivot + 1 < path.len() && path[pivot] > path[pivot + 1] {
        pivot += 1;
    }

    let mut changes = Vec::new();
    for &version in &path[..pivot] {
        changes.extend(reverse(&tree.changes_for(manager, version)?));
    }
    for &version in &path[pivot + 1..] {
        changes.extend(tree.changes_for(manager, version)?);
    }

    Ok(changes)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use tempfile::tempdir;

    use super::*;
    use crate::dag::extract_version_tree;
    use crate::diff::{compute_changes, encode};
    use tinylog_core::{Feed, MemoryFeedManager};

    fn write_range(feed: &mut Feed, min_version: u32, max_version: u32) {
        let mut payload = [0u8; 48];
        payload[..4].copy_from_slice(&min_version.to_be_bytes());
        payload[4..8].copy_from_slice(&max_version.to_be_bytes());
        feed.append_bytes(payload).expect("append version range packet");
    }

    /// Builds the S5 fixture: `F1` (fid `[1;32]`) carries versions 1-3 in a
    /// straight line from the synthetic root; `F2` (fid `[2;32]`, parent
    /// `F1`) carries versions 4-6 forked from version 1's text, giving the
    /// `0-1, 1-2, 2-3, 1-4, 4-5, 5-6` adjacency spec.md §8 S5 describes.
    ///
    /// Each version's blob is a real diff against its dependency's actual
    /// text (via `compute_changes`), rather than an arbitrary line edit, so
    /// composing diffs along any path produces the dependency's real text —
    /// exercising the same invariant a real caller's text buffer would see.
    fn s5_fixture() -> (VersionTree, MemoryFeedManager, HashMap<u32, String>) {
        let mut texts = HashMap::new();
        texts.insert(0, String::new());
        texts.insert(1, "a".to_string());
        texts.insert(2, "a\nb".to_string());
        texts.insert(3, "a\nb\nc".to_string());
        texts.insert(4, "a\nX".to_string());
        texts.insert(5, "a\nX\nY".to_string());
        texts.insert(6, "a\nX\nY\nZ".to_string());

        let dir = tempdir().expect("tempdir");
        let f1_fid = [1u8; 32];
        let f2_fid = [2u8; 32];

        let mut f1 = Feed::create(dir.path().join("f1.log"), f1_fid).expect("create f1");
        write_range(&mut f1, 1, 3);
        for (v, dependency) in [(1u32, 0u32), (2, 1), (3, 2)] {
            let changes = compute_changes(&texts[&dependency], &texts[&v]);
            f1.append_blob(&encode(&changes, dependency)).expect("append f1 blob");
        }

        let mut f2 = Feed::create_with_parent(dir.path().join("f2.log"), f2_fid, f1_fid, f1.front_seq())
            .expect("create f2 with f1 as header-level parent");
        write_range(&mut f2, 4, 6);
        // `F2`'s adjacency is `1-4, 4-5, 5-6`: version 4 depends on version
        // 1 (the fork point into `F1`'s chain), not on version 3.
        for (v, dependency) in [(4u32, 1u32), (5, 4), (6, 5)] {
            let changes = compute_changes(&texts[&dependency], &texts[&v]);
            f2.append_blob(&encode(&changes, dependency)).expect("append f2 blob");
        }

        let mut manager = MemoryFeedManager::new();
        manager.register(f1_fid, f1.path());
        manager.register(f2_fid, f2.path());

        let tree = extract_version_tree(f2_fid, &manager).expect("extract tree");
        (tree, manager, texts)
    }

    #[test]
    fn same_version_is_a_no_op() {
        let (tree, manager, _texts) = s5_fixture();
        assert_eq!(jump_versions(&tree, &manager, 4, 4).expect("no-op jump"), Vec::new());
    }

    #[test]
    fn monotonically_increasing_applies_forward_to_the_target_text() {
        let (tree, manager, texts) = s5_fixture();
        let changes = jump_versions(&tree, &manager, 4, 6).expect("jump 4 -> 6");
        assert_eq!(crate::diff::apply(&texts[&4], &changes), texts[&6]);
    }

    #[test]
    fn monotonically_decreasing_reverts_back_to_the_target_text() {
        let (tree, manager, texts) = s5_fixture();
        let changes = jump_versions(&tree, &manager, 6, 4).expect("jump 6 -> 4");
        assert_eq!(crate::diff::apply(&texts[&6], &changes), texts[&4]);
    }

    #[test]
    fn s5_mixed_path_reverts_the_descent_then_applies_the_ascent_skipping_the_pivot() {
        let (tree, manager, texts) = s5_fixture();
        let path = shortest_path(&tree, 3, 6).expect("path exists");
        assert_eq!(path, vec![3, 2, 1, 4, 5, 6]);

        let changes = jump_versions(&tree, &manager, 3, 6).expect("jump 3 -> 6");
        assert_eq!(crate::diff::apply(&texts[&3], &changes), texts[&6]);
    }

    #[test]
    fn jump_then_reverse_jump_round_trips_applied_text() {
        let (tree, manager, texts) = s5_fixture();

        let there = jump_versions(&tree, &manager, 3, 6).expect("jump 3 -> 6");
        let mid = crate::diff::apply(&texts[&3], &there);
        assert_eq!(mid, texts[&6]);

        let back = jump_versions(&tree, &manager, 6, 3).expect("jump 6 -> 3");
        let round_tripped = crate::diff::apply(&mid, &back);
        assert_eq!(round_tripped, texts[&3]);
    }

    #[test]
    fn unknown_version_surfaces_update_not_available() {
        let (tree, manager, _texts) = s5_fixture();
        assert!(matches!(jump_versions(&tree, &manager, 4, 99), Err(Error::UpdateNotAvailable { version: 99 })));
    }
}
