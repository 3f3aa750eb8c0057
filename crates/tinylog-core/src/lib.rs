//! On-disk feed store: [`Feed`] files, their [`BlobStore`] sidecar, and the
//! [`FeedManager`] lookup trait a multi-feed embedder implements.
//!
//! Single-threaded, blocking I/O; no async runtime and no persistent file
//! handle held between calls. Concurrent writers to the same feed must
//! serialize through [`SharedFeed`] or an equivalent external lock.

pub mod blob_store;
pub mod error;
pub mod feed;
pub mod feed_manager;
pub mod header_writer;
pub mod shared;

pub use blob_store::BlobStore;
pub use error::Error;
pub use feed::{Feed, FeedIter};
pub use feed_manager::{FeedManager, MemoryFeedManager};
pub use header_writer::{HeaderWriter, InPlaceHeaderWriter, WholeFileHeaderWriter};
pub use shared::SharedFeed;
