//! Binary container writer.
//!
//! Serializes assembled blocks (trajectory info JSON, encoded spatial frames,
//! plot data JSON) into the framed block structure, header first.

use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, WriteBytesExt};
use tracing::info;

use super::format::*;
use crate::util::{Error, Result};

/// Container content ready for serialization.
pub struct ContainerBlocks {
    /// Trajectory info block, serialized JSON
    pub trajectory_info: Vec<u8>,
    /// One encoded payload per frame, in frame order
    pub spatial_frames: Vec<Vec<u8>>,
    /// Plot data block, serialized JSON
    pub plot_data: Vec<u8>,
}

impl ContainerBlocks {
    fn json_block_size(json: &[u8]) -> usize {
        BLOCK_HEADER_N_VALUES * BYTES_PER_VALUE + json.len() + padding_for(json.len())
    }

    fn spatial_block_size(&self) -> usize {
        (BLOCK_HEADER_N_VALUES + 2) * BYTES_PER_VALUE
            + self.spatial_frames.len() * 2 * BYTES_PER_VALUE
            + self.spatial_frames.iter().map(Vec::len).sum::<usize>()
    }

    /// Total serialized file size in bytes.
    pub fn file_size(&self) -> usize {
        header_size(3)
            + Self::json_block_size(&self.trajectory_info)
            + self.spatial_block_size()
            + Self::json_block_size(&self.plot_data)
    }
}

/// Counting little-endian output stream.
struct BlockStream<W: Write> {
    writer: W,
    pos: u64,
}

impl<W: Write> BlockStream<W> {
    fn new(writer: W) -> Self {
        Self { writer, pos: 0 }
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.writer.write_all(data)?;
        self.pos += data.len() as u64;
        Ok(())
    }

    fn write_u32(&mut self, value: u32) -> Result<()> {
        self.writer.write_u32::<LittleEndian>(value)?;
        self.pos += 4;
        Ok(())
    }

    fn pad_to_alignment(&mut self, written: usize) -> Result<()> {
        for _ in 0..padding_for(written) {
            self.writer.write_u8(0)?;
            self.pos += 1;
        }
        Ok(())
    }
}

/// Every offset, length, and locator field in the container is a u32, so the
/// whole file must fit in 4 GiB or the descriptors would silently wrap.
fn check_encodable_size(file_size: usize) -> Result<()> {
    if file_size > u32::MAX as usize {
        return Err(Error::validation(format!(
            "Container of {} bytes exceeds the 4 GiB format limit",
            file_size
        )));
    }
    Ok(())
}

/// Serialize the container to any writer. Returns bytes written.
pub fn write_blocks<W: Write>(writer: W, blocks: &ContainerBlocks) -> Result<u64> {
    check_encodable_size(blocks.file_size())?;
    let mut stream = BlockStream::new(writer);

    let info_size = ContainerBlocks::json_block_size(&blocks.trajectory_info);
    let spatial_size = blocks.spatial_block_size();
    let plot_size = ContainerBlocks::json_block_size(&blocks.plot_data);

    let info_offset = header_size(3);
    let spatial_offset = info_offset + info_size;
    let plot_offset = spatial_offset + spatial_size;

    // constant header
    stream.write_bytes(FILE_IDENTIFIER)?;
    stream.write_u32(header_size(3) as u32)?;
    stream.write_u32(BINARY_VERSION)?;
    stream.write_u32(3)?;
    // descriptors: (offset, type, length)
    for (offset, block_type, length) in [
        (info_offset, BlockType::TrajectoryInfoJson, info_size),
        (spatial_offset, BlockType::SpatialDataBinary, spatial_size),
        (plot_offset, BlockType::PlotDataJson, plot_size),
    ] {
        stream.write_u32(offset as u32)?;
        stream.write_u32(block_type.tag())?;
        stream.write_u32(length as u32)?;
    }

    write_json_block(
        &mut stream,
        BlockType::TrajectoryInfoJson,
        &blocks.trajectory_info,
    )?;
    write_spatial_block(&mut stream, blocks)?;
    write_json_block(&mut stream, BlockType::PlotDataJson, &blocks.plot_data)?;

    debug_assert_eq!(stream.pos, blocks.file_size() as u64);
    Ok(stream.pos)
}

fn write_json_block<W: Write>(
    stream: &mut BlockStream<W>,
    block_type: BlockType,
    json: &[u8],
) -> Result<()> {
    stream.write_u32(block_type.tag())?;
    stream.write_u32(ContainerBlocks::json_block_size(json) as u32)?;
    stream.write_bytes(json)?;
    stream.pad_to_alignment(json.len())
}

fn write_spatial_block<W: Write>(
    stream: &mut BlockStream<W>,
    blocks: &ContainerBlocks,
) -> Result<()> {
    let n_frames = blocks.spatial_frames.len();
    stream.write_u32(BlockType::SpatialDataBinary.tag())?;
    stream.write_u32(blocks.spatial_block_size() as u32)?;
    stream.write_u32(SPATIAL_DATA_VERSION)?;
    stream.write_u32(n_frames as u32)?;

    // frame locators, offsets relative to the block start
    let mut frame_offset = (BLOCK_HEADER_N_VALUES + 2 + 2 * n_frames) * BYTES_PER_VALUE;
    for frame in &blocks.spatial_frames {
        stream.write_u32(frame_offset as u32)?;
        stream.write_u32(frame.len() as u32)?;
        frame_offset += frame.len();
    }
    for frame in &blocks.spatial_frames {
        stream.write_bytes(frame)?;
    }
    Ok(())
}

/// Serialize the container into an in-memory byte buffer.
pub fn container_to_bytes(blocks: &ContainerBlocks) -> Result<Vec<u8>> {
    let mut bytes = Vec::with_capacity(blocks.file_size());
    write_blocks(&mut bytes, blocks)?;
    Ok(bytes)
}

/// Write the container to disk, appending the `.simularium` extension when
/// the path does not already carry it. Returns the path written.
pub fn write_container(path: impl AsRef<Path>, blocks: &ContainerBlocks) -> Result<PathBuf> {
    let path = path.as_ref();
    let path = if path.extension().is_some_and(|e| e == FILE_EXTENSION) {
        path.to_path_buf()
    } else {
        let mut name = path.as_os_str().to_os_string();
        name.push(".");
        name.push(FILE_EXTENSION);
        PathBuf::from(name)
    };

    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&path)?;
    let mut writer = BufWriter::with_capacity(2 * 1024 * 1024, file);
    let written = write_blocks(&mut writer, blocks)?;
    writer.flush()?;
    info!(path = %path.display(), bytes = written, "Wrote binary container");
    Ok(path)
}
