//! The version DAG: which feed holds which version, and how versions
//! depend on each other (spec.md §4.5).

use std::collections::{HashMap, HashSet, VecDeque};

use tinylog_core::{Error as CoreError, Feed, FeedManager};
use tracing::instrument;

use crate::error::Error;
use crate::update_feed::{get_current_version_num, get_update_dependency, get_upd_version};

/// Defense-in-depth bound on how many `get_parent` hops [`extract_version_tree`]
/// will follow before giving up, reusing [`tinylog_core::Error::ParentChainTooLong`]
/// for consistency with the core crate's own parent-chain walk.
const MAX_PARENT_HOPS: usize = 64;

/// A version DAG extracted from one feed's parent chain: which feed holds
/// each version, the dependency edges between versions, and the highest
/// version number seen.
#[derive(Debug, Default)]
pub struct VersionTree {
    /// Undirected adjacency between versions sharing a dependency edge.
    adjacency: HashMap<u32, Vec<u32>>,
    /// Which feed (by id) carries each version's update blob.
    access: HashMap<u32, [u8; 32]>,
    /// The highest version number present anywhere in the tree.
    max_version: u32,
}

impl VersionTree {
    /// The highest version number this tree knows about.
    #[must_use]
    pub fn max_version(&self) -> u32 {
        self.max_version
    }

    /// `true` if `version` is `0` (the root, always known) or was seen
    /// while walking the parent chain.
    #[must_use]
    pub fn knows(&self, version: u32) -> bool {
        version == 0 || self.access.contains_key(&version)
    }

    /// The feed id carrying `version`'s update blob, if known.
    #[must_use]
    pub fn feed_for(&self, version: u32) -> Option<[u8; 32]> {
        self.access.get(&version).copied()
    }

    /// Fetches and decodes the diff `version` carries, via the feed that
    /// owns it according to [`Self::access`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::UpdateNotAvailable`] if no feed is known to carry
    /// `version`, or if the owning feed's `FeedManager` lookup fails.
    /// Propagates [`crate::diff::decode`] failures.
    pub fn changes_for(&self, manager: &dyn FeedManager, version: u32) -> Result<Vec<crate::diff::Change>, Error> {
        let fid = self.feed_for(version).ok_or(Error::UpdateNotAvailable { version })?;
        let feed = manager.get_feed(&fid).map_err(Error::Core)?;
        let blob = crate::update_feed::get_update_blob(&feed, version)?;
        let (changes, _dependency) = crate::diff::decode(&blob)?;
        Ok(changes)
    }
}

/// Walks the parent chain starting at `start_fid`, collecting every
/// version any feed in the chain claims to carry, and the dependency
/// edges between those versions.
///
/// # Errors
///
/// Propagates [`tinylog_core::Error::ParentChainTooLong`] (wrapped in
/// [`Error::Core`]) if the walk exceeds [`MAX_PARENT_HOPS`] hops, or any
/// other failure surfaced while reading a feed in the chain.
#[instrument(skip(manager))]
pub fn extract_version_tree(start_fid: [u8; 32], manager: &dyn FeedManager) -> Result<VersionTree, Error> {
    let mut access: HashMap<u32, [u8; 32]> = HashMap::new();
    let mut max_version = 0u32;

    let mut current_fid = start_fid;
    let mut hops = 0usize;
    loop {
        if hops >= MAX_PARENT_HOPS {
            return Err(CoreError::ParentChainTooLong.into());
        }
        hops += 1;

        let feed = manager.get_feed(&current_fid)?;
        let range = match (get_upd_version(&feed)?, get_current_version_num(&feed)?) {
            (Some(min_version), Some(max_v)) => (min_version, max_v),
            _ => break,
        };

        for version in range.0..=range.1 {
            access.insert(version, current_fid);
            max_version = max_version.max(version);
        }

        match feed.parent_header() {
            Some(parent_fid) => current_fid = parent_fid,
            None => break,
        }
    }

    let mut adjacency: HashMap<u32, Vec<u32>> = HashMap::new();
    for version in 1..=max_version {
        let Some(fid) = access.get(&version).copied() else { continue };
        let feed = manager.get_feed(&fid)?;
        let dependency = get_update_dependency(&feed, version)?;
        adjacency.entry(version).or_default().push(dependency);
        adjacency.entry(dependency).or_default().push(version);
    }

    Ok(VersionTree { adjacency, access, max_version })
}

/// Breadth-first shortest path between `start` and `end` in `tree`'s
/// dependency graph, inclusive of both endpoints. Returns `None` if `end`
/// is unreachable from `start`.
#[must_use]
pub fn shortest_path(tree: &VersionTree, start: u32, end: u32) -> Option<Vec<u32>> {
    if start == end {
        return Some(vec![start]);
    }

    let mut visited: HashSet<u32> = HashSet::from([start]);
    let mut parent: HashMap<u32, u32> = HashMap::new();
    let mut queue: VecDeque<u32> = VecDeque::from([start]);

    while let Some(node) = queue.pop_front() {
        let Some(neighbors) = tree.adjacency.get(&node) else { continue };
        for &next in neighbors {
            if visited.insert(next) {
                parent.insert(next, node);
                if next == end {
                    let mut path = vec![end];
                    let mut cursor = end;
                    while let Some(&prev) = parent.get(&cursor) {
                        path.push(prev);
                        cursor = prev;
                    }
                    path.reverse();
                    return Some(path);
                }
                queue.push_back(next);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::diff::{Change, ChangeOp, encode};
    use tinylog_core::MemoryFeedManager;

    fn write_range(feed: &mut Feed, min_version: u32, max_version: u32) {
        let mut payload = [0u8; 48];
        payload[..4].copy_from_slice(&min_version.to_be_bytes());
        payload[4..8].copy_from_slice(&max_version.to_be_bytes());
        feed.append_bytes(payload).expect("append version range packet");
    }

    #[test]
    fn s5_linear_chain_resolves_shortest_path() {
        let dir = tempdir().expect("tempdir");
        let fid = [21u8; 32];
        let mut feed = Feed::create(dir.path().join("f.log"), fid).expect("create");
        write_range(&mut feed, 1, 6);
        for v in 1..=6u32 {
            let changes = vec![Change { line_num: 1, op: ChangeOp::Insert, text: format!("v{v}") }];
            feed.append_blob(&encode(&changes, v - 1)).expect("append update blob");
        }

        let mut manager = MemoryFeedManager::new();
        manager.register(fid, feed.path());

        let tree = extract_version_tree(fid, &manager).expect("extract");
        assert_eq!(tree.max_version(), 6);

        let path = shortest_path(&tree, 3, 6).expect("path exists");
        assert_eq!(path, vec![3, 4, 5, 6]);
    }
}
