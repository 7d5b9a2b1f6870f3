//! Hierarchical ISO-BMFF box serialization.
//!
//! A fragment is a tree of boxes whose size fields can only be filled
//! in once their children are written, and whose `trun` data offsets
//! can only be filled in once the `mdat` position is known. The
//! [`BoxWriter`] handles both: it keeps a stack of open-box offsets for
//! deferred size patching, and supports rewriting an already-emitted
//! box in place as long as the new serialization is byte-for-byte the
//! same length.
//!
//! All multi-byte integers are big-endian per ISO-BMFF convention.

use crate::error::{Fmp4Error, Result};
use bitflags::bitflags;

/// A serializable ISO-BMFF box.
///
/// Implementations write everything after the 8-byte size/type header;
/// the writer owns the header and the size bookkeeping. For full boxes
/// the version and flag bytes are part of the payload.
pub trait Mp4Box {
    /// Four-character box type code.
    fn box_type(&self) -> [u8; 4];

    /// Serialize the box payload into `out`.
    fn write_payload(&self, out: &mut Vec<u8>);
}

/// Writer for a nested box tree with deferred size and offset patching.
///
/// All writes go into one growing in-memory buffer; nothing is flushed
/// until [`BoxWriter::finish`] hands the buffer back. Offsets returned
/// by the write methods are absolute positions in that buffer.
#[derive(Debug, Default)]
pub struct BoxWriter {
    buf: Vec<u8>,
    open: Vec<usize>,
}

impl BoxWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current length of the accumulated buffer.
    pub fn position(&self) -> usize {
        self.buf.len()
    }

    /// Open a box: write its header with a placeholder size, then its
    /// own payload fields, and push the start offset for the matching
    /// [`BoxWriter::end_box`]. Children are written in between.
    ///
    /// Returns the absolute start offset of the box.
    pub fn begin_box(&mut self, b: &dyn Mp4Box) -> usize {
        let start = self.write_header_and_payload(b);
        self.open.push(start);
        start
    }

    /// Write a complete self-contained box and patch its size
    /// immediately. Returns the absolute start offset of the box.
    pub fn write_box(&mut self, b: &dyn Mp4Box) -> usize {
        let start = self.write_header_and_payload(b);
        self.patch_size(start);
        start
    }

    /// Close the most recently opened box, computing its real size from
    /// the bytes written since [`BoxWriter::begin_box`] and patching
    /// the placeholder in place.
    pub fn end_box(&mut self) -> Result<()> {
        let start = self.open.pop().ok_or(Fmp4Error::UnbalancedBoxEnd)?;
        self.patch_size(start);
        Ok(())
    }

    /// Re-serialize a box over an already-written region of identical
    /// size.
    ///
    /// Used to inject fields only known after later boxes are emitted
    /// (e.g. `trun.data_offset` after the `mdat` position is fixed).
    /// Fails if the new serialization differs in length from the
    /// region, which would corrupt every following box.
    pub fn rewrite_box(&mut self, offset: usize, b: &dyn Mp4Box) -> Result<()> {
        if offset + 8 > self.buf.len() {
            return Err(Fmp4Error::RewriteOutOfBounds { offset });
        }
        let region = u32::from_be_bytes([
            self.buf[offset],
            self.buf[offset + 1],
            self.buf[offset + 2],
            self.buf[offset + 3],
        ]) as usize;
        if offset + region > self.buf.len() {
            return Err(Fmp4Error::RewriteOutOfBounds { offset });
        }

        let mut scratch = Vec::with_capacity(region);
        scratch.extend_from_slice(&[0, 0, 0, 0]);
        scratch.extend_from_slice(&b.box_type());
        b.write_payload(&mut scratch);
        if scratch.len() != region {
            return Err(Fmp4Error::RewriteSizeMismatch {
                offset,
                expected: region,
                actual: scratch.len(),
            });
        }
        let size = scratch.len() as u32;
        scratch[0..4].copy_from_slice(&size.to_be_bytes());

        self.buf[offset..offset + region].copy_from_slice(&scratch);
        Ok(())
    }

    /// Consume the writer and return the accumulated buffer.
    ///
    /// Fails if any box is still open: an unbalanced tree means the
    /// size fields are wrong and the fragment must be discarded.
    pub fn finish(self) -> Result<Vec<u8>> {
        if !self.open.is_empty() {
            return Err(Fmp4Error::UnclosedBoxes {
                depth: self.open.len(),
            });
        }
        Ok(self.buf)
    }

    fn write_header_and_payload(&mut self, b: &dyn Mp4Box) -> usize {
        let start = self.buf.len();
        self.buf.extend_from_slice(&[0, 0, 0, 0]); // size placeholder
        self.buf.extend_from_slice(&b.box_type());
        b.write_payload(&mut self.buf);
        start
    }

    fn patch_size(&mut self, start: usize) {
        let size = (self.buf.len() - start) as u32;
        self.buf[start..start + 4].copy_from_slice(&size.to_be_bytes());
    }
}

bitflags! {
    /// `tfhd` flag word.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TfhdFlags: u32 {
        /// base-data-offset field present.
        const BASE_DATA_OFFSET = 0x000001;
        /// sample-description-index field present.
        const SAMPLE_DESCRIPTION_INDEX = 0x000002;
        /// default-sample-duration field present.
        const DEFAULT_SAMPLE_DURATION = 0x000008;
        /// default-sample-size field present.
        const DEFAULT_SAMPLE_SIZE = 0x000010;
        /// default-sample-flags field present.
        const DEFAULT_SAMPLE_FLAGS = 0x000020;
        /// Track fragment offsets are relative to the enclosing moof.
        const DEFAULT_BASE_IS_MOOF = 0x020000;
    }
}

bitflags! {
    /// `trun` flag word.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TrunFlags: u32 {
        /// data-offset field present.
        const DATA_OFFSET = 0x000001;
        /// first-sample-flags field present.
        const FIRST_SAMPLE_FLAGS = 0x000004;
        /// Per-sample duration present.
        const SAMPLE_DURATION = 0x000100;
        /// Per-sample size present.
        const SAMPLE_SIZE = 0x000200;
        /// Per-sample flags present.
        const SAMPLE_FLAGS = 0x000400;
        /// Per-sample composition time offset present.
        const SAMPLE_COMPOSITION_TIME_OFFSET = 0x000800;
    }
}

bitflags! {
    /// ISO-BMFF per-sample flag word, as carried in `trun` entries.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SampleFlags: u32 {
        /// sample_is_non_sync_sample: set for every non-keyframe.
        const NON_SYNC = 1 << 16;
    }
}

/// Write the version byte and 24-bit flag word of a full box.
fn write_full_box_header(out: &mut Vec<u8>, version: u8, flags: u32) {
    out.push(version);
    out.extend_from_slice(&[(flags >> 16) as u8, (flags >> 8) as u8, flags as u8]);
}

/// `moof` movie fragment container box.
#[derive(Debug, Clone, Copy, Default)]
pub struct Moof;

impl Mp4Box for Moof {
    fn box_type(&self) -> [u8; 4] {
        *b"moof"
    }

    fn write_payload(&self, _out: &mut Vec<u8>) {}
}

/// `traf` track fragment container box.
#[derive(Debug, Clone, Copy, Default)]
pub struct Traf;

impl Mp4Box for Traf {
    fn box_type(&self) -> [u8; 4] {
        *b"traf"
    }

    fn write_payload(&self, _out: &mut Vec<u8>) {}
}

/// `mfhd` movie fragment header.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mfhd {
    /// Fragment sequence number.
    pub sequence_number: u32,
}

impl Mp4Box for Mfhd {
    fn box_type(&self) -> [u8; 4] {
        *b"mfhd"
    }

    fn write_payload(&self, out: &mut Vec<u8>) {
        write_full_box_header(out, 0, 0);
        out.extend_from_slice(&self.sequence_number.to_be_bytes());
    }
}

/// `tfhd` track fragment header.
#[derive(Debug, Clone, Copy)]
pub struct Tfhd {
    /// Flag word; optional fields beyond the track id are not used by
    /// this muxer, so no corresponding value fields exist here.
    pub flags: TfhdFlags,
    /// Track identifier within the fragment.
    pub track_id: u32,
}

impl Mp4Box for Tfhd {
    fn box_type(&self) -> [u8; 4] {
        *b"tfhd"
    }

    fn write_payload(&self, out: &mut Vec<u8>) {
        write_full_box_header(out, 0, self.flags.bits());
        out.extend_from_slice(&self.track_id.to_be_bytes());
    }
}

/// `tfdt` track fragment base decode time.
///
/// Always written as version 1 (64-bit decode time).
#[derive(Debug, Clone, Copy, Default)]
pub struct Tfdt {
    /// Sum of decode durations of all earlier samples, in track ticks.
    pub base_media_decode_time: u64,
}

impl Mp4Box for Tfdt {
    fn box_type(&self) -> [u8; 4] {
        *b"tfdt"
    }

    fn write_payload(&self, out: &mut Vec<u8>) {
        write_full_box_header(out, 1, 0);
        out.extend_from_slice(&self.base_media_decode_time.to_be_bytes());
    }
}

/// One sample record in a `trun` run table.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrunEntry {
    /// Sample duration in track ticks.
    pub duration: u32,
    /// Sample payload size in bytes.
    pub size: u32,
    /// Per-sample flags.
    pub flags: SampleFlags,
    /// Composition time offset (pts ahead of dts) in track ticks.
    pub composition_offset: i32,
}

/// `trun` track fragment run table.
///
/// Which per-entry fields are serialized is governed by `flags`, so a
/// rewrite with only `data_offset` changed is always length-stable.
#[derive(Debug, Clone, Default)]
pub struct Trun {
    /// Box version: 1 gives the composition offset a signed encoding.
    pub version: u8,
    /// Flag word selecting the serialized fields.
    pub flags: TrunFlags,
    /// Offset from the enclosing moof to the first sample payload,
    /// patched in after the mdat position is known.
    pub data_offset: i32,
    /// Per-sample records.
    pub entries: Vec<TrunEntry>,
}

impl Mp4Box for Trun {
    fn box_type(&self) -> [u8; 4] {
        *b"trun"
    }

    fn write_payload(&self, out: &mut Vec<u8>) {
        write_full_box_header(out, self.version, self.flags.bits());
        out.extend_from_slice(&(self.entries.len() as u32).to_be_bytes());
        if self.flags.contains(TrunFlags::DATA_OFFSET) {
            out.extend_from_slice(&self.data_offset.to_be_bytes());
        }
        for entry in &self.entries {
            if self.flags.contains(TrunFlags::SAMPLE_DURATION) {
                out.extend_from_slice(&entry.duration.to_be_bytes());
            }
            if self.flags.contains(TrunFlags::SAMPLE_SIZE) {
                out.extend_from_slice(&entry.size.to_be_bytes());
            }
            if self.flags.contains(TrunFlags::SAMPLE_FLAGS) {
                out.extend_from_slice(&entry.flags.bits().to_be_bytes());
            }
            if self.flags.contains(TrunFlags::SAMPLE_COMPOSITION_TIME_OFFSET) {
                // Version 0 carries an unsigned offset, version 1 signed.
                out.extend_from_slice(&entry.composition_offset.to_be_bytes());
            }
        }
    }
}

/// `mdat` media data box.
#[derive(Debug, Clone, Default)]
pub struct Mdat {
    /// Concatenated sample payloads.
    pub data: Vec<u8>,
}

impl Mp4Box for Mdat {
    fn box_type(&self) -> [u8; 4] {
        *b"mdat"
    }

    fn write_payload(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.data);
    }
}
