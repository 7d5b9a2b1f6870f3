//! Sample records buffered by a part before rendering.

use fragmux_core::Timestamp;

/// One encoded video access unit.
///
/// The payload is already in length-prefixed AVCC form, ready to be
/// placed in an `mdat` verbatim. Decode and presentation time diverge
/// when the encoder reorders frames; the fragment builder compensates
/// for that with the composition offset.
#[derive(Debug, Clone)]
pub struct VideoSample {
    /// Presentation timestamp.
    pub pts: Timestamp,
    /// Decode timestamp.
    pub dts: Timestamp,
    /// Length-prefixed access unit bytes.
    pub payload: Vec<u8>,
    /// Whether this access unit is a keyframe (IDR).
    pub keyframe: bool,
}

impl VideoSample {
    /// Create a new video sample.
    pub fn new(pts: Timestamp, dts: Timestamp, payload: Vec<u8>, keyframe: bool) -> Self {
        Self {
            pts,
            dts,
            payload,
            keyframe,
        }
    }
}

/// One encoded audio access unit.
///
/// Audio has no decode reordering, so presentation time is the only
/// timestamp.
#[derive(Debug, Clone)]
pub struct AudioSample {
    /// Presentation timestamp.
    pub pts: Timestamp,
    /// Raw access unit bytes.
    pub payload: Vec<u8>,
}

impl AudioSample {
    /// Create a new audio sample.
    pub fn new(pts: Timestamp, payload: Vec<u8>) -> Self {
        Self { pts, payload }
    }
}
