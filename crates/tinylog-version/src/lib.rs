//! Line-diff version engine: the diff codec, the version DAG extracted
//! across a feed's parent chain, and the jump composition that transits a
//! text body between any two versions.
//!
//! Built on `tinylog-core`'s [`tinylog_core::Feed`]/[`tinylog_core::FeedManager`];
//! this crate owns no on-disk format of its own — update blobs are plain
//! `tinylog-proto` packets stored through the feed convention documented on
//! [`update_feed`].

pub mod dag;
pub mod diff;
pub mod error;
pub mod jump;
pub mod update_feed;

pub use dag::{VersionTree, extract_version_tree, shortest_path};
pub use diff::{Change, ChangeOp, apply, compute_changes, decode, encode, reverse};
pub use error::Error;
pub use jump::jump_versions;
pub use update_feed::{get_current_version_num, get_update_blob, get_update_dependency, get_upd_version};
