//! Part rendering tests.
//!
//! These tests verify the rendered fragment layout byte by byte:
//! box sizes and types, run table contents, and the data offsets that
//! tie the run tables to the payload block.

use std::sync::Arc;

use fragmux_core::{Duration, TimeBase, Timestamp};
use fragmux_fmp4::{render_part, AudioSample, Fmp4Error, Part, Tracks, VideoSample};

const TB: TimeBase = TimeBase::MPEG;

fn ts(ticks: i64) -> Timestamp {
    Timestamp::new(ticks, TB)
}

fn u32_at(buf: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes(buf[offset..offset + 4].try_into().unwrap())
}

fn i32_at(buf: &[u8], offset: usize) -> i32 {
    i32::from_be_bytes(buf[offset..offset + 4].try_into().unwrap())
}

fn u64_at(buf: &[u8], offset: usize) -> u64 {
    u64::from_be_bytes(buf[offset..offset + 8].try_into().unwrap())
}

fn box_type_at(buf: &[u8], offset: usize) -> &[u8] {
    &buf[offset + 4..offset + 8]
}

/// Offset of the first top-level box of the given type.
fn find_box(buf: &[u8], name: &[u8; 4]) -> usize {
    let mut offset = 0;
    while offset < buf.len() {
        if box_type_at(buf, offset) == name {
            return offset;
        }
        offset += u32_at(buf, offset) as usize;
    }
    panic!("box {:?} not found", std::str::from_utf8(name));
}

// =============================================================================
// Video-only layout
// =============================================================================

#[test]
fn test_video_only_layout() {
    let tracks = Tracks::new(true, false, 0).unwrap();
    let samples = vec![
        VideoSample::new(ts(0), ts(0), vec![0xAA], true),
        VideoSample::new(ts(3000), ts(3000), vec![0xBB, 0xBB], false),
    ];
    let buf = render_part(&tracks, &samples, &[], ts(0), Duration::new(3000, TB)).unwrap();

    // moof { mfhd, traf { tfhd, tfdt, trun } } mdat
    assert_eq!(u32_at(&buf, 0), 120);
    assert_eq!(box_type_at(&buf, 0), b"moof");
    assert_eq!(u32_at(&buf, 8), 16);
    assert_eq!(box_type_at(&buf, 8), b"mfhd");
    assert_eq!(u32_at(&buf, 24), 96);
    assert_eq!(box_type_at(&buf, 24), b"traf");

    // tfhd: version 0, flags default-base-is-moof, track 1
    let tfhd = 32;
    assert_eq!(u32_at(&buf, tfhd), 16);
    assert_eq!(box_type_at(&buf, tfhd), b"tfhd");
    assert_eq!(&buf[tfhd + 8..tfhd + 12], &[0x00, 0x02, 0x00, 0x00]);
    assert_eq!(u32_at(&buf, tfhd + 12), 1);

    // tfdt: version 1, 64-bit decode time 0
    let tfdt = 48;
    assert_eq!(u32_at(&buf, tfdt), 20);
    assert_eq!(box_type_at(&buf, tfdt), b"tfdt");
    assert_eq!(buf[tfdt + 8], 1);
    assert_eq!(u64_at(&buf, tfdt + 12), 0);

    // trun: version 1, flags 0x000F01, two entries
    let trun = 68;
    assert_eq!(u32_at(&buf, trun), 52);
    assert_eq!(box_type_at(&buf, trun), b"trun");
    assert_eq!(buf[trun + 8], 1);
    assert_eq!(&buf[trun + 9..trun + 12], &[0x00, 0x0F, 0x01]);
    assert_eq!(u32_at(&buf, trun + 12), 2);
    assert_eq!(i32_at(&buf, trun + 16), 128);

    // entry 0: keyframe, composition offset covers the two-frame lead
    assert_eq!(u32_at(&buf, trun + 20), 3000);
    assert_eq!(u32_at(&buf, trun + 24), 1);
    assert_eq!(u32_at(&buf, trun + 28), 0);
    assert_eq!(i32_at(&buf, trun + 32), 6000);

    // entry 1: non-keyframe takes the nominal duration and the
    // non-sync flag
    assert_eq!(u32_at(&buf, trun + 36), 3000);
    assert_eq!(u32_at(&buf, trun + 40), 2);
    assert_eq!(u32_at(&buf, trun + 44), 0x0001_0000);
    assert_eq!(i32_at(&buf, trun + 48), 6000);

    // mdat directly after the moof, payloads concatenated
    assert_eq!(u32_at(&buf, 120), 11);
    assert_eq!(box_type_at(&buf, 120), b"mdat");
    assert_eq!(&buf[128..131], &[0xAA, 0xBB, 0xBB]);
    assert_eq!(buf.len(), 131);
}

#[test]
fn test_video_tfdt_carries_start_dts() {
    let tracks = Tracks::new(true, false, 0).unwrap();
    let samples = vec![VideoSample::new(ts(270_000), ts(270_000), vec![1], true)];
    let buf = render_part(
        &tracks,
        &samples,
        &[],
        ts(270_000),
        Duration::new(3000, TB),
    )
    .unwrap();

    let tfdt = find_box(&buf[32..], b"tfdt") + 32;
    assert_eq!(u64_at(&buf, tfdt + 12), 270_000);
}

// =============================================================================
// Audio-only layout
// =============================================================================

#[test]
fn test_audio_only_layout() {
    let clock = TimeBase::hz(48000);
    let tracks = Tracks::new(false, true, 48000).unwrap();
    let samples = vec![
        AudioSample::new(Timestamp::new(0, clock), vec![0x10, 0x11]),
        AudioSample::new(Timestamp::new(1024, clock), vec![0x20]),
    ];
    let buf = render_part(&tracks, &[], &samples, ts(0), Duration::zero()).unwrap();

    assert_eq!(u32_at(&buf, 0), 104);
    assert_eq!(box_type_at(&buf, 0), b"moof");

    // tfdt base decode time is the first pts in the audio clock
    let tfdt = 48;
    assert_eq!(box_type_at(&buf, tfdt), b"tfdt");
    assert_eq!(u64_at(&buf, tfdt + 12), 0);

    // trun: version 0, flags 0x000301, no per-sample flags or offsets
    let trun = 68;
    assert_eq!(u32_at(&buf, trun), 36);
    assert_eq!(box_type_at(&buf, trun), b"trun");
    assert_eq!(buf[trun + 8], 0);
    assert_eq!(&buf[trun + 9..trun + 12], &[0x00, 0x03, 0x01]);
    assert_eq!(u32_at(&buf, trun + 12), 2);
    assert_eq!(i32_at(&buf, trun + 16), 112);

    // durations: inter-sample delta, trailing sample repeats it
    assert_eq!(u32_at(&buf, trun + 20), 1024);
    assert_eq!(u32_at(&buf, trun + 24), 2);
    assert_eq!(u32_at(&buf, trun + 28), 1024);
    assert_eq!(u32_at(&buf, trun + 32), 1);

    assert_eq!(box_type_at(&buf, 104), b"mdat");
    assert_eq!(&buf[112..115], &[0x10, 0x11, 0x20]);
}

#[test]
fn test_empty_audio_batch_writes_no_traf() {
    let tracks = Tracks::new(true, true, 48000).unwrap();
    let samples = vec![VideoSample::new(ts(0), ts(0), vec![1], true)];
    let buf = render_part(&tracks, &samples, &[], ts(0), Duration::new(3000, TB)).unwrap();

    // Only the video traf is present inside the moof.
    let moof = &buf[..u32_at(&buf, 0) as usize];
    let mut trafs = 0;
    let mut offset = 8;
    while offset < moof.len() {
        if box_type_at(moof, offset) == b"traf" {
            trafs += 1;
        }
        offset += u32_at(moof, offset) as usize;
    }
    assert_eq!(trafs, 1);
}

// =============================================================================
// Muxed data offsets
// =============================================================================

#[test]
fn test_muxed_offsets_separate_payload_blocks() {
    let clock = TimeBase::hz(48000);
    let tracks = Tracks::new(true, true, 48000).unwrap();
    let video = vec![
        VideoSample::new(ts(0), ts(0), vec![0xAA; 5], true),
        VideoSample::new(ts(3000), ts(3000), vec![0xBB; 7], false),
    ];
    let audio = vec![
        AudioSample::new(Timestamp::new(0, clock), vec![0xC0; 3]),
        AudioSample::new(Timestamp::new(1024, clock), vec![0xC1; 4]),
    ];
    let buf = render_part(&tracks, &video, &audio, ts(0), Duration::new(3000, TB)).unwrap();

    let moof_size = u32_at(&buf, 0) as usize;
    let mdat = find_box(&buf, b"mdat");
    assert_eq!(mdat, moof_size);

    // Walk the two trafs and pull each trun data offset.
    let mut offsets = Vec::new();
    let mut offset = 8;
    while offset < moof_size {
        if box_type_at(&buf, offset) == b"traf" {
            let trun = offset + 8 + find_box(&buf[offset + 8..], b"trun");
            offsets.push(i32_at(&buf, trun + 16));
        }
        offset += u32_at(&buf, offset) as usize;
    }
    assert_eq!(offsets.len(), 2);

    // Video points past the mdat header; audio past the video block.
    assert_eq!(offsets[0] as usize, mdat + 8);
    assert_eq!(offsets[1] - offsets[0], 12);

    // Payload blocks sit exactly where the offsets claim.
    assert_eq!(&buf[offsets[0] as usize..offsets[0] as usize + 5], &[0xAA; 5]);
    assert_eq!(&buf[offsets[1] as usize..offsets[1] as usize + 3], &[0xC0; 3]);
}

#[test]
fn test_sample_count_matches_batch() {
    let tracks = Tracks::new(true, false, 0).unwrap();
    let samples: Vec<VideoSample> = (0..17)
        .map(|i| VideoSample::new(ts(i * 3000), ts(i * 3000), vec![i as u8], i == 0))
        .collect();
    let buf = render_part(&tracks, &samples, &[], ts(0), Duration::new(3000, TB)).unwrap();

    let trun = find_box(&buf[32..], b"trun") + 32;
    assert_eq!(u32_at(&buf, trun + 12), 17);

    let mdat = find_box(&buf, b"mdat");
    assert_eq!(u32_at(&buf, mdat) as usize, 8 + 17);
}

// =============================================================================
// Failure paths
// =============================================================================

#[test]
fn test_negative_composition_offset_is_fatal() {
    let tracks = Tracks::new(true, false, 0).unwrap();
    let samples = vec![VideoSample::new(ts(0), ts(10), vec![1], true)];
    let err = render_part(&tracks, &samples, &[], ts(0), Duration::zero()).unwrap_err();
    assert!(matches!(
        err,
        Fmp4Error::NegativeCompositionOffset { pts: 0, dts: 10 }
    ));
}

#[test]
fn test_lead_absorbs_reordering() {
    // pts one nominal duration behind dts still fits inside the
    // two-frame lead.
    let tracks = Tracks::new(true, false, 0).unwrap();
    let samples = vec![VideoSample::new(ts(0), ts(3000), vec![1], true)];
    let buf = render_part(&tracks, &samples, &[], ts(0), Duration::new(3000, TB)).unwrap();

    let trun = find_box(&buf[32..], b"trun") + 32;
    assert_eq!(i32_at(&buf, trun + 32), 3000);
}

// =============================================================================
// Part lifecycle
// =============================================================================

#[test]
fn test_part_lifecycle_end_to_end() {
    let tracks = Arc::new(Tracks::new(true, true, 48000).unwrap());
    let clock = TimeBase::hz(48000);
    let mut part = Part::new(tracks, 3, ts(0), Duration::new(3000, TB));

    assert_eq!(part.name(), "part3");
    assert!(!part.has_content());
    assert!(!part.is_independent());

    part.write_video(VideoSample::new(ts(0), ts(0), vec![0xAA], true));
    part.write_video(VideoSample::new(ts(3000), ts(3000), vec![0xBB], false));
    part.write_audio(AudioSample::new(Timestamp::new(0, clock), vec![0xC0]));
    assert!(part.is_independent());
    assert!(part.has_content());
    assert_eq!(part.duration(), Duration::new(6000, TB));

    part.finalize().unwrap();
    assert!(part.is_finalized());
    assert_eq!(part.duration(), Duration::new(6000, TB));

    let content = part.content().unwrap();
    assert_eq!(content.len(), part.size());
    assert_eq!(box_type_at(content, 0), b"moof");
    let mdat = find_box(content, b"mdat");
    assert_eq!(&content[mdat + 8..mdat + 11], &[0xAA, 0xBB, 0xC0]);
}

#[test]
fn test_part_duration_uses_timescale_conversion() {
    // Samples timestamped in nanoseconds must land on exact 90 kHz
    // ticks, one sample at a time, without drift.
    let ns = TimeBase::NANOSECONDS;
    let tracks = Arc::new(Tracks::new(true, false, 0).unwrap());
    let mut part = Part::new(
        tracks,
        0,
        Timestamp::new(0, ns),
        Duration::new(33_333_333, ns),
    );
    for i in 0..30i64 {
        let t = Timestamp::new(i * 33_333_333, ns);
        part.write_video(VideoSample::new(t, t, vec![0], i == 0));
    }
    part.finalize().unwrap();

    let content = part.content().unwrap();
    let trun = find_box(&content[32..], b"trun") + 32;
    let count = u32_at(content, trun + 12) as usize;
    assert_eq!(count, 30);

    // Each delta rounds independently to the nominal tick count, so
    // the total never drifts from count * nominal.
    let mut total = 0u64;
    for i in 0..count {
        let duration = u32_at(content, trun + 20 + i * 16);
        assert_eq!(duration, 3000);
        total += u64::from(duration);
    }
    assert_eq!(total, 90_000);
}
