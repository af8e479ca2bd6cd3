//! Random-access frame index over the spatial data block.

use tracing::{debug, warn};

use super::format::*;
use super::reader::{read_f32_le, read_u32_le, BlockSpan};
use crate::util::{FormatError, Result};

/// Location and identity of one frame inside the container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameIndexEntry {
    /// Frame number as recorded in the frame header
    pub frame_number: u32,
    /// Elapsed simulation time of the frame
    pub time: f32,
    /// Absolute byte offset from the start of the file
    pub offset: usize,
    /// Byte length, including the frame header
    pub length: usize,
}

impl FrameIndexEntry {
    /// Byte range of the frame within the file buffer.
    #[inline]
    pub fn range(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.length
    }
}

/// Ordered table of frame locations, built once per load by a single
/// forward pass over the spatial block. Immutable afterward.
pub struct FrameIndex {
    spatial_version: u32,
    entries: Vec<FrameIndexEntry>,
}

impl FrameIndex {
    /// Walk the spatial data block and index every frame.
    pub fn build(data: &[u8], span: BlockSpan) -> Result<Self> {
        let payload = &data[span.payload_range()];
        if payload.len() < 2 * BYTES_PER_VALUE {
            return Err(FormatError::UnexpectedEof((span.offset + span.length) as u64).into());
        }
        let spatial_version = read_u32_le(payload);
        let n_frames = read_u32_le(&payload[4..]);

        let locator_bytes = n_frames as usize * 2 * BYTES_PER_VALUE;
        if payload.len() < 2 * BYTES_PER_VALUE + locator_bytes {
            let found = (payload.len() - 2 * BYTES_PER_VALUE) / (2 * BYTES_PER_VALUE);
            return Err(FormatError::FrameCountMismatch {
                declared: n_frames,
                found: found as u32,
            }
            .into());
        }

        let mut entries = Vec::with_capacity(n_frames as usize);
        for i in 0..n_frames as usize {
            let locator_pos = 2 * BYTES_PER_VALUE + i * 2 * BYTES_PER_VALUE;
            // offsets in the locator table are relative to the block start
            let rel_offset = read_u32_le(&payload[locator_pos..]) as usize;
            let length = read_u32_le(&payload[locator_pos + 4..]) as usize;

            let end = rel_offset.checked_add(length);
            if length < FRAME_HEADER_N_VALUES * BYTES_PER_VALUE
                || end.map_or(true, |e| e > span.length)
            {
                return Err(FormatError::TruncatedFrame {
                    frame: i as u32,
                    offset: rel_offset as u32,
                    length: length as u32,
                    block_len: span.length as u32,
                }
                .into());
            }

            let offset = span.offset + rel_offset;
            let frame_number = read_u32_le(&data[offset..]);
            let time = read_f32_le(&data[offset + 4..]);
            if frame_number != i as u32 {
                warn!(index = i, frame_number, "Frame number does not match its position");
            }
            entries.push(FrameIndexEntry {
                frame_number,
                time,
                offset,
                length,
            });
        }

        debug!(n_frames, spatial_version, "Built frame index");
        Ok(Self {
            spatial_version,
            entries,
        })
    }

    /// Spatial data block version.
    #[inline]
    pub fn spatial_version(&self) -> u32 {
        self.spatial_version
    }

    /// Number of indexed frames.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the trajectory has no frames.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get the entry at a frame index.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&FrameIndexEntry> {
        self.entries.get(index)
    }

    /// All entries in frame order.
    #[inline]
    pub fn entries(&self) -> &[FrameIndexEntry] {
        &self.entries
    }

    /// Index of the frame whose time is closest to `time`.
    ///
    /// Linear scan from the start; since times are non-decreasing, the scan
    /// stops as soon as the distance starts increasing. The result is clamped
    /// to the last valid index.
    pub fn nearest_time(&self, time: f32) -> usize {
        let mut closest = 0usize;
        let mut min_dist = f32::INFINITY;
        for (i, entry) in self.entries.iter().enumerate() {
            let dist = (entry.time - time).abs();
            if dist < min_dist {
                min_dist = dist;
                closest = i;
            } else {
                // distance is increasing, the closest frame is behind us
                break;
            }
        }
        closest.min(self.entries.len().saturating_sub(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::Error;

    fn put_u32(buf: &mut Vec<u8>, v: u32) {
        buf.extend_from_slice(&v.to_le_bytes());
    }

    fn put_f32(buf: &mut Vec<u8>, v: f32) {
        buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Spatial block with empty frames at the given times.
    fn spatial_block(times: &[f32]) -> Vec<u8> {
        let n = times.len();
        let frame_len = FRAME_HEADER_N_VALUES * BYTES_PER_VALUE;
        let length = 8 + 8 + n * 8 + n * frame_len;
        let mut buf = Vec::new();
        put_u32(&mut buf, BlockType::SpatialDataBinary.tag());
        put_u32(&mut buf, length as u32);
        put_u32(&mut buf, SPATIAL_DATA_VERSION);
        put_u32(&mut buf, n as u32);
        let frames_start = 16 + n * 8;
        for i in 0..n {
            put_u32(&mut buf, (frames_start + i * frame_len) as u32);
            put_u32(&mut buf, frame_len as u32);
        }
        for (i, time) in times.iter().enumerate() {
            put_u32(&mut buf, i as u32);
            put_f32(&mut buf, *time);
            put_u32(&mut buf, 0);
        }
        buf
    }

    fn span_for(block: &[u8]) -> BlockSpan {
        BlockSpan {
            offset: 0,
            length: block.len(),
        }
    }

    #[test]
    fn test_index_completeness() {
        let block = spatial_block(&[0.0, 0.1, 0.2, 0.3]);
        let index = FrameIndex::build(&block, span_for(&block)).unwrap();
        assert_eq!(index.len(), 4);
        for (i, entry) in index.entries().iter().enumerate() {
            assert_eq!(entry.frame_number, i as u32);
        }
    }

    #[test]
    fn test_frame_count_mismatch() {
        let mut block = spatial_block(&[0.0, 0.1]);
        // claim more frames than the block holds
        block[12..16].copy_from_slice(&100u32.to_le_bytes());
        let result = FrameIndex::build(&block, span_for(&block));
        assert!(matches!(
            result,
            Err(Error::Format(FormatError::FrameCountMismatch { declared: 100, .. }))
        ));
    }

    #[test]
    fn test_truncated_frame() {
        let mut block = spatial_block(&[0.0, 0.1]);
        // last frame's locator length runs past the block end
        let locator_pos = 16 + 8 + 4;
        block[locator_pos..locator_pos + 4].copy_from_slice(&10_000u32.to_le_bytes());
        let result = FrameIndex::build(&block, span_for(&block));
        assert!(matches!(
            result,
            Err(Error::Format(FormatError::TruncatedFrame { frame: 1, .. }))
        ));
    }

    #[test]
    fn test_nearest_time() {
        let block = spatial_block(&[0.0, 1.0, 2.0, 3.0]);
        let index = FrameIndex::build(&block, span_for(&block)).unwrap();
        assert_eq!(index.nearest_time(-5.0), 0);
        assert_eq!(index.nearest_time(0.4), 0);
        assert_eq!(index.nearest_time(1.6), 2);
        assert_eq!(index.nearest_time(2.0), 2);
        // past the end clamps to the last frame
        assert_eq!(index.nearest_time(100.0), 3);
    }

    #[test]
    fn test_nearest_time_single_frame() {
        let block = spatial_block(&[0.5]);
        let index = FrameIndex::build(&block, span_for(&block)).unwrap();
        assert_eq!(index.nearest_time(99.0), 0);
    }
}
