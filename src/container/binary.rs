//! Binary container access: block index plus lazy frame decoding.

use std::path::Path;

use tracing::debug;

use super::info::TrajectoryInfo;
use crate::binary::{decode_frame, BlockIndex, BlockType, FileBuffer, FrameIndex, FrameRecord};
use crate::util::{Error, Result};

/// An open binary `.simularium` container.
///
/// Loading parses the header, trajectory info, and the frame locator table;
/// frame payloads stay untouched in the buffer until requested, so opening a
/// multi-gigabyte file costs only the index walk.
pub struct BinaryData {
    buffer: FileBuffer,
    index: BlockIndex,
    frames: FrameIndex,
    info: TrajectoryInfo,
}

impl BinaryData {
    /// Open a binary container file, memory-mapping it when possible.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_buffer(FileBuffer::open(path)?)
    }

    /// Load a binary container from in-memory bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        Self::from_buffer(FileBuffer::from_bytes(bytes))
    }

    pub(crate) fn from_buffer(buffer: FileBuffer) -> Result<Self> {
        let index = BlockIndex::parse(&buffer)?;
        let spatial = index.require(BlockType::SpatialDataBinary)?;
        let frames = FrameIndex::build(&buffer, spatial)?;
        let info = serde_json::from_value(
            index.json_block(&buffer, BlockType::TrajectoryInfoJson)?,
        )?;
        debug!(n_frames = frames.len(), "Opened binary container");
        Ok(Self {
            buffer,
            index,
            frames,
            info,
        })
    }

    /// The parsed trajectory info block.
    #[inline]
    pub fn trajectory_info(&self) -> &TrajectoryInfo {
        &self.info
    }

    /// Number of frames in the spatial block.
    #[inline]
    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    /// The frame locator index.
    #[inline]
    pub fn frame_index(&self) -> &FrameIndex {
        &self.frames
    }

    /// Decode the frame at an index.
    pub fn frame(&self, index: usize) -> Result<FrameRecord> {
        let entry = self.frames.get(index).ok_or(Error::FrameOutOfBounds {
            index,
            count: self.frames.len(),
        })?;
        decode_frame(&self.buffer[entry.range()])
    }

    /// Index of the frame whose time is closest to `time`.
    pub fn nearest_frame_index(&self, time: f32) -> Result<usize> {
        if self.frames.is_empty() {
            return Err(Error::FrameOutOfBounds { index: 0, count: 0 });
        }
        Ok(self.frames.nearest_time(time))
    }

    /// Decode the frame whose time is closest to `time`.
    pub fn frame_at_time(&self, time: f32) -> Result<FrameRecord> {
        self.frame(self.nearest_frame_index(time)?)
    }

    /// Plot payloads from the plot data block; empty when the block is
    /// absent or holds no plots.
    pub fn plots(&self) -> Result<Vec<serde_json::Value>> {
        if self.index.get(BlockType::PlotDataJson).is_none() {
            return Ok(Vec::new());
        }
        let block = self.index.json_block(&self.buffer, BlockType::PlotDataJson)?;
        match block.get("data") {
            Some(serde_json::Value::Array(plots)) => Ok(plots.clone()),
            Some(other) => Err(Error::invalid(format!(
                "Plot data is not an array: {}",
                other
            ))),
            None => Ok(Vec::new()),
        }
    }
}
