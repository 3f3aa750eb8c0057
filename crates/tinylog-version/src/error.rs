//! Errors for the diff codec and version DAG/apply engine.

use thiserror::Error;

/// Errors produced by diff decoding, DAG extraction, and version jumps.
#[derive(Error, Debug)]
pub enum Error {
    /// No feed in the walked parent chain claims the requested version, or
    /// the version lies outside the DAG's known range.
    #[error("update for version {version} is not available")]
    UpdateNotAvailable {
        /// The version that could not be resolved.
        version: u32,
    },

    /// An encoded diff blob was malformed (truncated varint, bad UTF-8, or
    /// a record that does not fit in its declared length).
    #[error("malformed diff encoding: {0}")]
    Decode(String),

    /// A failure surfaced by the underlying feed store.
    #[error(transparent)]
    Core(#[from] tinylog_core::Error),
}
