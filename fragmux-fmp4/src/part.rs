//! Part lifecycle: accumulate samples, finalize once, serve bytes.

use std::io::Cursor;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::Result;
use crate::fragment::{audio_batch_duration, render_part, video_batch_duration};
use crate::sample::{AudioSample, VideoSample};
use crate::track::Tracks;
use fragmux_core::{Duration, Timestamp};

/// Output of a successful finalize. Once this exists the part is
/// immutable.
#[derive(Debug)]
struct Rendered {
    content: Vec<u8>,
    duration: Duration,
}

/// One partial segment under construction.
///
/// A part starts empty, accumulates samples in arrival order, and is
/// finalized exactly once when the playlist advertises it. After
/// finalize the sample buffers are released and only the rendered
/// fragment remains; further writes are rejected.
#[derive(Debug)]
pub struct Part {
    tracks: Arc<Tracks>,
    id: u64,
    start_dts: Timestamp,
    video_default_duration: Duration,
    independent: bool,
    video_samples: Vec<VideoSample>,
    audio_samples: Vec<AudioSample>,
    finalized: bool,
    rendered: Option<Rendered>,
}

impl Part {
    /// Create an empty part.
    ///
    /// `start_dts` is the decode time at which this part begins;
    /// `video_default_duration` is the nominal frame duration used for
    /// the last sample of the batch and for composition lead. Both are
    /// ignored for audio-only track sets.
    pub fn new(
        tracks: Arc<Tracks>,
        id: u64,
        start_dts: Timestamp,
        video_default_duration: Duration,
    ) -> Self {
        // Without video every part starts on a sync boundary.
        let independent = !tracks.has_video();
        Self {
            tracks,
            id,
            start_dts,
            video_default_duration,
            independent,
            video_samples: Vec::new(),
            audio_samples: Vec::new(),
            finalized: false,
            rendered: None,
        }
    }

    /// Part identifier, unique within its segment.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Playlist-facing name of this part.
    pub fn name(&self) -> String {
        format!("part{}", self.id)
    }

    /// Decode time at which this part begins.
    pub fn start_dts(&self) -> Timestamp {
        self.start_dts
    }

    /// Whether the part can be played without data from earlier parts.
    ///
    /// True from the first keyframe written, and always true for
    /// audio-only track sets.
    pub fn is_independent(&self) -> bool {
        self.independent
    }

    /// Buffer one video sample.
    pub fn write_video(&mut self, sample: VideoSample) {
        if self.finalized {
            warn!(part = self.id, "video sample dropped: part already finalized");
            return;
        }
        if sample.keyframe {
            self.independent = true;
        }
        self.video_samples.push(sample);
    }

    /// Buffer one audio sample.
    pub fn write_audio(&mut self, sample: AudioSample) {
        if self.finalized {
            warn!(part = self.id, "audio sample dropped: part already finalized");
            return;
        }
        self.audio_samples.push(sample);
    }

    /// Current duration of the part.
    ///
    /// With a video track this is the sum of video sample durations;
    /// otherwise it is the span of the buffered audio. Frozen at its
    /// finalize-time value once the part is finalized.
    pub fn duration(&self) -> Duration {
        if let Some(rendered) = &self.rendered {
            return rendered.duration;
        }
        if self.tracks.has_video() {
            video_batch_duration(&self.video_samples, self.video_default_duration)
        } else {
            audio_batch_duration(&self.audio_samples)
        }
    }

    /// Render the fragment and release the sample buffers.
    ///
    /// Idempotent: finalizing an already finalized part does nothing.
    /// Finalizing with no buffered samples produces no content; the
    /// caller must then drop the part instead of emitting it. On error
    /// the part keeps its buffers and no content exists.
    pub fn finalize(&mut self) -> Result<()> {
        if self.finalized {
            return Ok(());
        }

        if self.video_samples.is_empty() && self.audio_samples.is_empty() {
            debug!(part = self.id, "empty part finalized without content");
            self.finalized = true;
            return Ok(());
        }

        let duration = self.duration();
        let content = render_part(
            &self.tracks,
            &self.video_samples,
            &self.audio_samples,
            self.start_dts,
            self.video_default_duration,
        )?;

        debug!(
            part = self.id,
            bytes = content.len(),
            video_samples = self.video_samples.len(),
            audio_samples = self.audio_samples.len(),
            independent = self.independent,
            "part finalized"
        );

        self.video_samples = Vec::new();
        self.audio_samples = Vec::new();
        self.finalized = true;
        self.rendered = Some(Rendered { content, duration });
        Ok(())
    }

    /// Whether the part has been finalized.
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Whether any sample has been written into this part.
    pub fn has_content(&self) -> bool {
        self.rendered.is_some()
            || !self.video_samples.is_empty()
            || !self.audio_samples.is_empty()
    }

    /// Rendered fragment bytes, once finalized.
    pub fn content(&self) -> Option<&[u8]> {
        self.rendered.as_ref().map(|r| r.content.as_slice())
    }

    /// Size of the rendered fragment in bytes; zero before finalize.
    pub fn size(&self) -> usize {
        self.rendered.as_ref().map_or(0, |r| r.content.len())
    }

    /// Reader over the rendered fragment, for serving the part body.
    pub fn reader(&self) -> Option<Cursor<&[u8]>> {
        self.content().map(Cursor::new)
    }
}
