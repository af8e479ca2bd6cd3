//! Binary container reading: whole-file buffers and the block index.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::ops::Deref;
use std::path::Path;

use memmap2::Mmap;
use tracing::warn;

use super::format::*;
use crate::util::{Error, FormatError, Result};

/// Read little-endian u32 from bytes.
#[inline]
pub(crate) fn read_u32_le(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Read little-endian f32 from bytes.
#[inline]
pub(crate) fn read_f32_le(bytes: &[u8]) -> f32 {
    f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Raw container bytes, memory-mapped or owned.
///
/// The buffer is the single owner of the file's bytes; every other structure
/// holds offsets into it until a frame is materialized.
pub struct FileBuffer {
    inner: BufferInner,
}

enum BufferInner {
    /// Memory-mapped file (preferred for large files)
    Mmap(Mmap),
    /// Owned bytes (fallback, and for in-memory sources)
    Owned(Vec<u8>),
}

impl FileBuffer {
    /// Open a file, memory-mapping it when possible.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_opts(path, true)
    }

    /// Open a file with optional memory mapping.
    pub fn open_opts(path: impl AsRef<Path>, use_mmap: bool) -> Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;

        let size = file.metadata()?.len();
        let inner = if use_mmap && size > 0 {
            // Safety: file is opened read-only
            let mmap =
                unsafe { Mmap::map(&file) }.map_err(|e| Error::MmapFailed(e.to_string()))?;
            BufferInner::Mmap(mmap)
        } else {
            let mut bytes = Vec::with_capacity(size as usize);
            file.read_to_end(&mut bytes)?;
            BufferInner::Owned(bytes)
        };

        Ok(Self { inner })
    }

    /// Wrap already-loaded bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            inner: BufferInner::Owned(bytes),
        }
    }

    /// Total buffer size in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    /// Check if the buffer is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the raw bytes.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        match &self.inner {
            BufferInner::Mmap(mmap) => mmap,
            BufferInner::Owned(bytes) => bytes,
        }
    }
}

impl Deref for FileBuffer {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

/// Check whether a byte buffer starts with the binary file identifier.
pub fn is_binary(data: &[u8]) -> bool {
    data.len() >= FILE_IDENTIFIER.len() && &data[..FILE_IDENTIFIER.len()] == FILE_IDENTIFIER
}

/// Byte range of one block within the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSpan {
    /// Absolute offset from the start of the file
    pub offset: usize,
    /// Length in bytes, including the block's own header
    pub length: usize,
}

impl BlockSpan {
    /// Byte range of the block's payload, after its header.
    #[inline]
    pub fn payload_range(&self) -> std::ops::Range<usize> {
        let header = BLOCK_HEADER_N_VALUES * BYTES_PER_VALUE;
        self.offset + header..self.offset + self.length
    }
}

/// Parsed top-level block index of a binary container.
///
/// Built by one pure parse of the file header; maps each known block type to
/// its byte range. Unknown block tags are skipped with a warning so files from
/// newer tools still load.
pub struct BlockIndex {
    version: u32,
    blocks: BTreeMap<BlockType, BlockSpan>,
}

impl BlockIndex {
    /// Parse the header of a binary container.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if !is_binary(data) {
            return Err(FormatError::InvalidMagic.into());
        }
        if data.len() < constant_header_size() {
            return Err(FormatError::UnexpectedEof(data.len() as u64).into());
        }

        let id_len = FILE_IDENTIFIER.len();
        let header_length = read_u32_le(&data[id_len..]) as usize;
        let version = read_u32_le(&data[id_len + 4..]);
        let n_blocks = read_u32_le(&data[id_len + 8..]) as usize;

        if version != BINARY_VERSION {
            return Err(FormatError::UnsupportedVersion(version).into());
        }
        if n_blocks == 0 {
            return Err(FormatError::InvalidStructure("Container has no blocks".into()).into());
        }
        let descriptors_end = header_size(n_blocks);
        if header_length != descriptors_end {
            return Err(FormatError::InvalidStructure(format!(
                "Header length {} does not match {} for {} blocks",
                header_length, descriptors_end, n_blocks
            ))
            .into());
        }
        if data.len() < descriptors_end {
            return Err(FormatError::UnexpectedEof(data.len() as u64).into());
        }

        let mut blocks = BTreeMap::new();
        let mut spans = Vec::with_capacity(n_blocks);
        for index in 0..n_blocks {
            let pos = constant_header_size() + index * HEADER_N_VALUES_PER_BLOCK * BYTES_PER_VALUE;
            let offset = read_u32_le(&data[pos..]);
            let tag = read_u32_le(&data[pos + 4..]);
            let length = read_u32_le(&data[pos + 8..]);

            if offset as usize % BLOCK_OFFSET_ALIGNMENT != 0 {
                return Err(FormatError::InvalidStructure(format!(
                    "Block #{} offset {} is not {}-byte aligned",
                    index, offset, BLOCK_OFFSET_ALIGNMENT
                ))
                .into());
            }
            let end = offset as u64 + length as u64;
            if (offset as usize) < descriptors_end
                || end > data.len() as u64
                || (length as usize) < BLOCK_HEADER_N_VALUES * BYTES_PER_VALUE
            {
                return Err(FormatError::BlockOutOfBounds {
                    block_type: tag,
                    offset,
                    length,
                    buffer_len: data.len(),
                }
                .into());
            }

            // Each block repeats its type and length; the two views must agree.
            let header_type = read_u32_le(&data[offset as usize..]);
            let header_length = read_u32_le(&data[offset as usize + 4..]);
            if header_type != tag || header_length != length {
                return Err(FormatError::BlockHeaderMismatch {
                    index,
                    header_type,
                    header_length,
                    descriptor_type: tag,
                    descriptor_length: length,
                }
                .into());
            }
            spans.push((offset as usize, length as usize));

            let Some(block_type) = BlockType::from_tag(tag) else {
                warn!(tag, "Skipping unsupported block type");
                continue;
            };
            let span = BlockSpan {
                offset: offset as usize,
                length: length as usize,
            };
            if blocks.insert(block_type, span).is_some() {
                warn!(?block_type, "More than one block of this type, using last");
            }
        }

        spans.sort_unstable();
        for pair in spans.windows(2) {
            if pair[0].0 + pair[0].1 > pair[1].0 {
                return Err(FormatError::InvalidStructure(format!(
                    "Blocks overlap: ({}, {}) and ({}, {})",
                    pair[0].0, pair[0].1, pair[1].0, pair[1].1
                ))
                .into());
            }
        }

        let index = Self { version, blocks };
        index.require(BlockType::TrajectoryInfoJson)?;
        if index.get(BlockType::SpatialDataBinary).is_none()
            && index.get(BlockType::SpatialDataJson).is_none()
        {
            return Err(FormatError::MissingBlock("spatial data").into());
        }
        Ok(index)
    }

    /// Binary container version from the header.
    #[inline]
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Number of recognized blocks.
    #[inline]
    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Get the span for a block type, if present.
    #[inline]
    pub fn get(&self, block_type: BlockType) -> Option<BlockSpan> {
        self.blocks.get(&block_type).copied()
    }

    /// Get the span for a block type or fail with a missing-block error.
    pub fn require(&self, block_type: BlockType) -> Result<BlockSpan> {
        self.get(block_type).ok_or_else(|| {
            let name = match block_type {
                BlockType::SpatialDataJson => "spatial data (JSON)",
                BlockType::TrajectoryInfoJson => "trajectory info",
                BlockType::PlotDataJson => "plot data",
                BlockType::SpatialDataBinary => "spatial data",
            };
            Error::Format(FormatError::MissingBlock(name))
        })
    }

    /// Parse a JSON block's payload, trimming NUL padding.
    pub fn json_block(&self, data: &[u8], block_type: BlockType) -> Result<serde_json::Value> {
        let span = self.require(block_type)?;
        let payload = &data[span.payload_range()];
        let text = std::str::from_utf8(payload)?.trim_end_matches('\0');
        Ok(serde_json::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn put_u32(buf: &mut Vec<u8>, v: u32) {
        buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Minimal container: trajectory info JSON + empty spatial binary block.
    fn tiny_container() -> Vec<u8> {
        let info = br#"{"version":3}"#;
        let info_len = 8 + info.len() + padding_for(info.len());
        // spatial: block header + version + n_frames(0)
        let spatial_len = 8 + 8;
        let header_len = header_size(2);

        let mut buf = Vec::new();
        buf.extend_from_slice(FILE_IDENTIFIER);
        put_u32(&mut buf, header_len as u32);
        put_u32(&mut buf, BINARY_VERSION);
        put_u32(&mut buf, 2);
        // descriptors: (offset, type, length)
        put_u32(&mut buf, header_len as u32);
        put_u32(&mut buf, BlockType::TrajectoryInfoJson.tag());
        put_u32(&mut buf, info_len as u32);
        put_u32(&mut buf, (header_len + info_len) as u32);
        put_u32(&mut buf, BlockType::SpatialDataBinary.tag());
        put_u32(&mut buf, spatial_len as u32);
        // trajectory info block
        put_u32(&mut buf, BlockType::TrajectoryInfoJson.tag());
        put_u32(&mut buf, info_len as u32);
        buf.extend_from_slice(info);
        buf.extend(std::iter::repeat(0u8).take(padding_for(info.len())));
        // spatial block
        put_u32(&mut buf, BlockType::SpatialDataBinary.tag());
        put_u32(&mut buf, spatial_len as u32);
        put_u32(&mut buf, SPATIAL_DATA_VERSION);
        put_u32(&mut buf, 0);
        buf
    }

    #[test]
    fn test_parse_index() {
        let buf = tiny_container();
        let index = BlockIndex::parse(&buf).unwrap();
        assert_eq!(index.version(), BINARY_VERSION);
        assert_eq!(index.num_blocks(), 2);
        assert!(index.get(BlockType::SpatialDataBinary).is_some());
        let info = index.json_block(&buf, BlockType::TrajectoryInfoJson).unwrap();
        assert_eq!(info["version"], 3);
    }

    #[test]
    fn test_invalid_magic() {
        let result = BlockIndex::parse(b"NOTSIMULARIUM___rest");
        assert!(matches!(
            result,
            Err(Error::Format(FormatError::InvalidMagic))
        ));
    }

    #[test]
    fn test_short_buffer() {
        let result = BlockIndex::parse(b"SIM");
        assert!(matches!(
            result,
            Err(Error::Format(FormatError::InvalidMagic))
        ));
    }

    #[test]
    fn test_block_out_of_bounds() {
        let mut buf = tiny_container();
        // corrupt the first descriptor's length
        let pos = constant_header_size() + 8;
        buf[pos..pos + 4].copy_from_slice(&u32::MAX.to_le_bytes());
        let result = BlockIndex::parse(&buf);
        assert!(matches!(
            result,
            Err(Error::Format(FormatError::BlockOutOfBounds { .. }))
        ));
    }

    #[test]
    fn test_block_header_mismatch() {
        let mut buf = tiny_container();
        // corrupt the trajectory info block's own type field
        let pos = header_size(2);
        buf[pos..pos + 4].copy_from_slice(&9u32.to_le_bytes());
        let result = BlockIndex::parse(&buf);
        assert!(matches!(
            result,
            Err(Error::Format(FormatError::BlockHeaderMismatch { .. }))
        ));
    }

    #[test]
    fn test_overlapping_blocks() {
        let mut buf = tiny_container();
        // duplicate the first descriptor into the second slot
        let first = constant_header_size();
        let second = first + 12;
        let descriptor: Vec<u8> = buf[first..first + 12].to_vec();
        buf[second..second + 12].copy_from_slice(&descriptor);
        let result = BlockIndex::parse(&buf);
        assert!(matches!(
            result,
            Err(Error::Format(FormatError::InvalidStructure(_)))
        ));
    }

    #[test]
    fn test_unsupported_version() {
        let mut buf = tiny_container();
        let pos = FILE_IDENTIFIER.len() + 4;
        buf[pos..pos + 4].copy_from_slice(&7u32.to_le_bytes());
        let result = BlockIndex::parse(&buf);
        assert!(matches!(
            result,
            Err(Error::Format(FormatError::UnsupportedVersion(7)))
        ));
    }
}
