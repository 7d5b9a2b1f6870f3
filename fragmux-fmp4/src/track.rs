//! Track configuration shared by every part of one muxer variant.

use crate::error::{Fmp4Error, Result};
use serde::{Deserialize, Serialize};

/// Tick rate of the video track clock (90 kHz, the MPEG convention).
pub const VIDEO_TIMESCALE: u32 = 90_000;

/// Default number of nominal frame durations added to every composition
/// offset to compensate for decoder reordering latency.
///
/// This is a policy constant, not a protocol requirement: it assumes the
/// encoder never reorders deeper than two frames. Streams from encoders
/// with deeper B-frame pyramids need a larger
/// [`VideoTrackConfig::composition_lead_frames`]; a lead that is too
/// small surfaces as [`Fmp4Error::NegativeCompositionOffset`] rather
/// than silently corrupt timing.
pub const DEFAULT_COMPOSITION_LEAD_FRAMES: u32 = 2;

/// Video track parameters.
///
/// A present video track implies H.264 access units in length-prefixed
/// AVCC form; the clock always runs at [`VIDEO_TIMESCALE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoTrackConfig {
    /// Composition offset lead, in nominal frame durations.
    pub composition_lead_frames: u32,
}

impl Default for VideoTrackConfig {
    fn default() -> Self {
        Self {
            composition_lead_frames: DEFAULT_COMPOSITION_LEAD_FRAMES,
        }
    }
}

/// Audio track parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioTrackConfig {
    /// Sample clock rate in Hz; also the track timescale.
    pub clock_rate: u32,
}

impl AudioTrackConfig {
    /// Create an audio track running at the given clock rate.
    pub fn new(clock_rate: u32) -> Self {
        Self { clock_rate }
    }
}

/// Which tracks a muxer variant carries.
///
/// Modeled as a closed variant rather than a pair of options so the
/// fragment builder and the part assembler can match exhaustively
/// instead of checking for absence at every step. Shared read-only by
/// all parts of one variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tracks {
    /// Video only.
    VideoOnly(VideoTrackConfig),
    /// Audio only; such parts are always independent.
    AudioOnly(AudioTrackConfig),
    /// Video and audio muxed into one fragment.
    Muxed {
        /// Video track parameters.
        video: VideoTrackConfig,
        /// Audio track parameters.
        audio: AudioTrackConfig,
    },
}

impl Tracks {
    /// Build a track set from the ingest pipeline's flat descriptor.
    ///
    /// `audio_clock_rate` is ignored unless `has_audio` is set. Fails
    /// if neither track is present.
    pub fn new(has_video: bool, has_audio: bool, audio_clock_rate: u32) -> Result<Self> {
        match (has_video, has_audio) {
            (true, false) => Ok(Tracks::VideoOnly(VideoTrackConfig::default())),
            (false, true) => Ok(Tracks::AudioOnly(AudioTrackConfig::new(audio_clock_rate))),
            (true, true) => Ok(Tracks::Muxed {
                video: VideoTrackConfig::default(),
                audio: AudioTrackConfig::new(audio_clock_rate),
            }),
            (false, false) => Err(Fmp4Error::TrackConfig(
                "at least one track is required".into(),
            )),
        }
    }

    /// The video track, if present.
    pub fn video(&self) -> Option<&VideoTrackConfig> {
        match self {
            Tracks::VideoOnly(video) | Tracks::Muxed { video, .. } => Some(video),
            Tracks::AudioOnly(_) => None,
        }
    }

    /// The audio track, if present.
    pub fn audio(&self) -> Option<&AudioTrackConfig> {
        match self {
            Tracks::AudioOnly(audio) | Tracks::Muxed { audio, .. } => Some(audio),
            Tracks::VideoOnly(_) => None,
        }
    }

    /// Whether a video track is present.
    pub fn has_video(&self) -> bool {
        self.video().is_some()
    }

    /// Whether an audio track is present.
    pub fn has_audio(&self) -> bool {
        self.audio().is_some()
    }
}
