//! Fragment table building and part assembly.
//!
//! Turns one part's buffered sample batches into a rendered CMAF
//! fragment: `moof { mfhd, traf... } mdat`. Each present track
//! contributes one `traf` whose run table is written with a zero data
//! offset first and patched once the `mdat` position is known.

use crate::boxes::{
    BoxWriter, Mdat, Mfhd, Moof, SampleFlags, Tfdt, Tfhd, TfhdFlags, Traf, Trun, TrunEntry,
    TrunFlags,
};
use crate::error::{Fmp4Error, Result};
use crate::sample::{AudioSample, VideoSample};
use crate::track::{AudioTrackConfig, Tracks, VideoTrackConfig, VIDEO_TIMESCALE};
use fragmux_core::{Duration, TimeBase, Timestamp};

/// Write the video `traf` (tfhd, tfdt, trun).
///
/// The returned run table still has a zero data offset; the assembler
/// rewrites it in place after the `mdat` is emitted.
fn write_video_traf(
    w: &mut BoxWriter,
    track_id: u32,
    config: &VideoTrackConfig,
    samples: &[VideoSample],
    start_dts: Timestamp,
    default_duration: Duration,
) -> Result<(Trun, usize)> {
    w.begin_box(&Traf); // <traf>

    w.write_box(&Tfhd {
        flags: TfhdFlags::DEFAULT_BASE_IS_MOOF,
        track_id,
    });
    w.write_box(&Tfdt {
        base_media_decode_time: start_dts.to_ticks(VIDEO_TIMESCALE) as u64,
    });

    let lead = default_duration.mul_int(i64::from(config.composition_lead_frames));
    let mut trun = Trun {
        version: 1,
        flags: TrunFlags::DATA_OFFSET
            | TrunFlags::SAMPLE_DURATION
            | TrunFlags::SAMPLE_SIZE
            | TrunFlags::SAMPLE_FLAGS
            | TrunFlags::SAMPLE_COMPOSITION_TIME_OFFSET,
        data_offset: 0,
        entries: Vec::with_capacity(samples.len()),
    };

    for (i, sample) in samples.iter().enumerate() {
        // Decode-time delta to the next sample; the last sample takes
        // the caller-supplied nominal duration.
        let duration = match samples.get(i + 1) {
            Some(next) => next.dts - sample.dts,
            None => default_duration,
        };

        let offset = ((sample.pts - sample.dts) + lead).to_ticks(VIDEO_TIMESCALE);
        if offset < 0 {
            return Err(Fmp4Error::NegativeCompositionOffset {
                pts: sample.pts.to_ticks(VIDEO_TIMESCALE),
                dts: sample.dts.to_ticks(VIDEO_TIMESCALE),
            });
        }

        let mut flags = SampleFlags::empty();
        if !sample.keyframe {
            flags |= SampleFlags::NON_SYNC;
        }

        trun.entries.push(TrunEntry {
            duration: duration.to_ticks(VIDEO_TIMESCALE) as u32,
            size: sample.payload.len() as u32,
            flags,
            composition_offset: offset as i32,
        });
    }

    let trun_offset = w.write_box(&trun);
    w.end_box()?; // </traf>

    Ok((trun, trun_offset))
}

/// Write the audio `traf`, or nothing when the batch is empty.
fn write_audio_traf(
    w: &mut BoxWriter,
    track_id: u32,
    config: &AudioTrackConfig,
    samples: &[AudioSample],
) -> Result<Option<(Trun, usize)>> {
    if samples.is_empty() {
        return Ok(None);
    }

    w.begin_box(&Traf); // <traf>

    w.write_box(&Tfhd {
        flags: TfhdFlags::DEFAULT_BASE_IS_MOOF,
        track_id,
    });
    w.write_box(&Tfdt {
        base_media_decode_time: samples[0].pts.to_ticks(config.clock_rate) as u64,
    });

    let mut trun = Trun {
        version: 0,
        flags: TrunFlags::DATA_OFFSET | TrunFlags::SAMPLE_DURATION | TrunFlags::SAMPLE_SIZE,
        data_offset: 0,
        entries: Vec::with_capacity(samples.len()),
    };

    // Tick positions computed once so per-sample deltas are exact in
    // the track clock.
    let ticks: Vec<i64> = samples
        .iter()
        .map(|s| s.pts.to_ticks(config.clock_rate))
        .collect();

    for (i, sample) in samples.iter().enumerate() {
        trun.entries.push(TrunEntry {
            duration: audio_sample_duration(&ticks, i) as u32,
            size: sample.payload.len() as u32,
            ..Default::default()
        });
    }

    let trun_offset = w.write_box(&trun);
    w.end_box()?; // </traf>

    Ok(Some((trun, trun_offset)))
}

/// Duration of audio sample `i` given the batch's pts tick positions:
/// the delta to the next sample. The trailing sample reuses the
/// preceding delta (access units from one encoder are constant-rate);
/// a single-sample batch gets zero.
fn audio_sample_duration(ticks: &[i64], i: usize) -> i64 {
    if i + 1 < ticks.len() {
        ticks[i + 1] - ticks[i]
    } else if i > 0 {
        ticks[i] - ticks[i - 1]
    } else {
        0
    }
}

/// Total duration of a video batch, in video track ticks: the sum of
/// the per-sample durations exactly as the run table carries them.
pub(crate) fn video_batch_duration(samples: &[VideoSample], default_duration: Duration) -> Duration {
    let mut total = Duration::new(0, TimeBase::MPEG);
    for (i, sample) in samples.iter().enumerate() {
        let duration = match samples.get(i + 1) {
            Some(next) => next.dts - sample.dts,
            None => default_duration,
        };
        total = total + duration;
    }
    total
}

/// Total duration of an audio batch: first presentation time to just
/// past the last sample, under the same trailing-delta rule the run
/// table uses.
pub(crate) fn audio_batch_duration(samples: &[AudioSample]) -> Duration {
    if samples.len() < 2 {
        return Duration::zero();
    }
    let first = samples[0].pts;
    let last = samples[samples.len() - 1].pts;
    let previous = samples[samples.len() - 2].pts;
    (last - first) + (last - previous)
}

/// Render one complete CMAF fragment.
///
/// Builds `moof { mfhd, traf(video)?, traf(audio)? } mdat` with the
/// video payload block followed by the audio payload block in a single
/// `mdat`, then patches each run table's data offset relative to the
/// `moof` start. Returns the fully rendered byte buffer; any failure
/// leaves nothing usable and the fragment must be discarded.
pub fn render_part(
    tracks: &Tracks,
    video_samples: &[VideoSample],
    audio_samples: &[AudioSample],
    start_dts: Timestamp,
    video_default_duration: Duration,
) -> Result<Vec<u8>> {
    let mut w = BoxWriter::new();

    let moof_offset = w.begin_box(&Moof); // <moof>

    // Parts are independently addressable, so a constant sequence
    // number is sufficient.
    w.write_box(&Mfhd { sequence_number: 0 });

    let mut video_run = None;
    let mut audio_run = None;
    match tracks {
        Tracks::VideoOnly(video) => {
            video_run = Some(write_video_traf(
                &mut w,
                1,
                video,
                video_samples,
                start_dts,
                video_default_duration,
            )?);
        }
        Tracks::AudioOnly(audio) => {
            audio_run = write_audio_traf(&mut w, 1, audio, audio_samples)?;
        }
        Tracks::Muxed { video, audio } => {
            video_run = Some(write_video_traf(
                &mut w,
                1,
                video,
                video_samples,
                start_dts,
                video_default_duration,
            )?);
            audio_run = write_audio_traf(&mut w, 2, audio, audio_samples)?;
        }
    }

    w.end_box()?; // </moof>

    let video_payload_len: usize = if tracks.has_video() {
        video_samples.iter().map(|s| s.payload.len()).sum()
    } else {
        0
    };
    let audio_payload_len: usize = if tracks.has_audio() {
        audio_samples.iter().map(|s| s.payload.len()).sum()
    } else {
        0
    };

    let mut data = Vec::with_capacity(video_payload_len + audio_payload_len);
    if tracks.has_video() {
        for sample in video_samples {
            data.extend_from_slice(&sample.payload);
        }
    }
    if tracks.has_audio() {
        for sample in audio_samples {
            data.extend_from_slice(&sample.payload);
        }
    }
    let mdat_offset = w.write_box(&Mdat { data });

    // Point past the 8-byte mdat header, relative to the moof start.
    let base_offset = (mdat_offset - moof_offset + 8) as i32;
    if let Some((mut trun, trun_offset)) = video_run {
        trun.data_offset = base_offset;
        w.rewrite_box(trun_offset, &trun)?;
    }
    if let Some((mut trun, trun_offset)) = audio_run {
        // Audio payload sits directly after the video payload block.
        trun.data_offset = base_offset + video_payload_len as i32;
        w.rewrite_box(trun_offset, &trun)?;
    }

    w.finish()
}
