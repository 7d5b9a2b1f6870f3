//! fMP4 encoding error types.

use thiserror::Error;

/// Errors that can occur while encoding a fragment.
///
/// Every variant except [`Fmp4Error::TrackConfig`] indicates a broken
/// encoding invariant: the fragment under construction is unusable and
/// must be discarded. There is no partial output to recover.
#[derive(Error, Debug)]
pub enum Fmp4Error {
    /// Presentation time fell behind decode time by more than the
    /// composition lead compensates for.
    #[error("negative composition offset for sample at dts {dts}: pts {pts} exceeds the reordering compensation window")]
    NegativeCompositionOffset {
        /// Presentation time in track ticks.
        pts: i64,
        /// Decode time in track ticks.
        dts: i64,
    },

    /// A box rewrite produced a different number of bytes than the
    /// region it replaces.
    #[error("box rewrite at offset {offset} changed size: region is {expected} bytes, new serialization is {actual}")]
    RewriteSizeMismatch {
        offset: usize,
        expected: usize,
        actual: usize,
    },

    /// A box rewrite targeted bytes outside the written buffer.
    #[error("box rewrite at offset {offset} lies outside the written buffer")]
    RewriteOutOfBounds { offset: usize },

    /// `end_box` was called with no box open.
    #[error("box end without a matching box start")]
    UnbalancedBoxEnd,

    /// The fragment was finished while boxes were still open.
    #[error("{depth} box(es) left open at end of fragment")]
    UnclosedBoxes { depth: usize },

    /// Track configuration error.
    #[error("track configuration error: {0}")]
    TrackConfig(String),
}

/// Result type alias for fragment encoding operations.
pub type Result<T> = std::result::Result<T, Fmp4Error>;
