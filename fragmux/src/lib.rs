//! # Fragmux
//!
//! Low-latency HLS partial segment generation in fragmented MP4 form.
//!
//! A live ingest pipeline hands encoded video and audio samples to a
//! [`Part`] as they arrive; when the playlist advertises the part, a
//! single finalize call renders it into a self-contained CMAF fragment
//! (`moof` + `mdat`) ready to serve.
//!
//! ## Architecture
//!
//! The library is organized into two crates:
//! - `fragmux-core`: rational time bases, timestamps, and durations
//! - `fragmux-fmp4`: box serialization, fragment tables, and the part
//!   lifecycle
//!
//! This crate re-exports the public surface of both.

// Re-export core time types
pub use fragmux_core::{Duration, Rational, TimeBase, Timestamp};

// Re-export fMP4 types
pub use fragmux_fmp4::{
    render_part, AudioSample, AudioTrackConfig, Fmp4Error, Part, Result, Tracks, VideoSample,
    VideoTrackConfig, DEFAULT_COMPOSITION_LEAD_FRAMES, VIDEO_TIMESCALE,
};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library version string.
pub fn version() -> &'static str {
    VERSION
}
