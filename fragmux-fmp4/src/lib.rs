//! Low-latency fMP4 part generation.
//!
//! This crate renders the partial segments advertised by an LL-HLS
//! media playlist: self-contained CMAF fragments (`moof` + `mdat`)
//! holding a short batch of video and audio samples. Parts accumulate
//! samples as they arrive from the ingest pipeline and are rendered
//! exactly once, at the moment the playlist makes them addressable.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use fragmux_core::{Duration, TimeBase, Timestamp};
//! use fragmux_fmp4::{Part, Tracks, VideoSample};
//!
//! let tracks = Arc::new(Tracks::new(true, false, 0)?);
//! let mut part = Part::new(
//!     tracks,
//!     0,
//!     Timestamp::new(0, TimeBase::MPEG),
//!     Duration::new(3000, TimeBase::MPEG),
//! );
//! part.write_video(VideoSample::new(
//!     Timestamp::new(0, TimeBase::MPEG),
//!     Timestamp::new(0, TimeBase::MPEG),
//!     vec![0x00, 0x00, 0x00, 0x01, 0x65],
//!     true,
//! ));
//! part.finalize()?;
//! assert!(part.content().is_some());
//! # Ok::<(), fragmux_fmp4::Fmp4Error>(())
//! ```

mod boxes;
mod error;
mod fragment;
mod part;
mod sample;
mod track;

pub use error::{Fmp4Error, Result};
pub use fragment::render_part;
pub use part::Part;
pub use sample::{AudioSample, VideoSample};
pub use track::{
    AudioTrackConfig, Tracks, VideoTrackConfig, DEFAULT_COMPOSITION_LEAD_FRAMES, VIDEO_TIMESCALE,
};
