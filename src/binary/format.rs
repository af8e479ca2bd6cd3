//! Simularium binary format constants and structures.

use crate::util::FormatError;

/// Magic bytes at the start of a .simularium binary file.
pub const FILE_IDENTIFIER: &[u8; 16] = b"SIMULARIUMBINARY";

/// Size of every numeric value in the format, in bytes.
pub const BYTES_PER_VALUE: usize = 4;

/// Current binary container version.
pub const BINARY_VERSION: u32 = 2;

/// Current spatial data block version.
pub const SPATIAL_DATA_VERSION: u32 = 1;

/// Current trajectory info JSON version.
pub const TRAJECTORY_INFO_VERSION: u32 = 3;

/// Current plot data JSON version.
pub const PLOT_DATA_VERSION: u32 = 1;

/// Values in the constant header after the identifier:
/// header length, binary version, block count.
pub const HEADER_CONSTANT_N_VALUES: usize = 3;

/// Values per block descriptor: offset, type, length.
pub const HEADER_N_VALUES_PER_BLOCK: usize = 3;

/// Values in the header each block carries at its start: type, length.
pub const BLOCK_HEADER_N_VALUES: usize = 2;

/// Byte alignment for block offsets.
pub const BLOCK_OFFSET_ALIGNMENT: usize = 4;

/// Values in a frame header: frame number, time, agent count.
pub const FRAME_HEADER_N_VALUES: usize = 3;

/// Fixed values per agent record, including the subpoint count.
pub const MIN_VALUES_PER_AGENT: usize = 11;

/// Subpoint values per 3D point.
pub const VALUES_PER_3D_POINT: usize = 3;

/// Largest agent unique ID that survives the f32 wire encoding exactly.
pub const MAX_AGENT_ID: u32 = 1 << 24;

/// Per-agent value indices within a packed agent record.
pub mod agent_index {
    pub const VIZ_TYPE: usize = 0;
    pub const UID: usize = 1;
    pub const TID: usize = 2;
    pub const POSX: usize = 3;
    pub const POSY: usize = 4;
    pub const POSZ: usize = 5;
    pub const ROTX: usize = 6;
    pub const ROTY: usize = 7;
    pub const ROTZ: usize = 8;
    pub const RADIUS: usize = 9;
    pub const NSP: usize = 10;
}

/// Default viewer camera settings written when the caller supplies none.
pub mod default_camera {
    pub const POSITION: [f32; 3] = [0.0, 0.0, 120.0];
    pub const LOOK_AT_POSITION: [f32; 3] = [0.0, 0.0, 0.0];
    pub const UP_VECTOR: [f32; 3] = [0.0, 1.0, 0.0];
    pub const FOV_DEGREES: f32 = 75.0;
}

/// Default simulation volume dimensions.
pub const DEFAULT_BOX_SIZE: [f32; 3] = [100.0, 100.0, 100.0];

/// File extension appended on write.
pub const FILE_EXTENSION: &str = "simularium";

/// Top-level block types in a binary container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BlockType {
    /// Spatial data as JSON (written by older tools, never produced here)
    SpatialDataJson,
    /// Trajectory info (metadata) as JSON
    TrajectoryInfoJson,
    /// Plot data as JSON
    PlotDataJson,
    /// Spatial data as packed binary frames
    SpatialDataBinary,
}

impl BlockType {
    /// Wire tag for this block type.
    #[inline]
    pub const fn tag(self) -> u32 {
        match self {
            Self::SpatialDataJson => 0,
            Self::TrajectoryInfoJson => 1,
            Self::PlotDataJson => 2,
            Self::SpatialDataBinary => 3,
        }
    }

    /// Parse a wire tag, returning None for unknown tags so callers can
    /// skip blocks written by newer tools.
    #[inline]
    pub const fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            0 => Some(Self::SpatialDataJson),
            1 => Some(Self::TrajectoryInfoJson),
            2 => Some(Self::PlotDataJson),
            3 => Some(Self::SpatialDataBinary),
            _ => None,
        }
    }
}

/// Visualization type tag selecting point vs fiber rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VizType {
    /// Render as a sphere (or other single-point geometry)
    #[default]
    Default,
    /// Render as a line through the agent's subpoints
    Fiber,
}

impl VizType {
    /// Wire value, stored as an f32 in both encodings.
    #[inline]
    pub const fn value(self) -> f32 {
        match self {
            Self::Default => 1000.0,
            Self::Fiber => 1001.0,
        }
    }

    /// Parse a wire value.
    pub fn from_value(value: f32) -> Result<Self, FormatError> {
        if value == 1000.0 {
            Ok(Self::Default)
        } else if value == 1001.0 {
            Ok(Self::Fiber)
        } else {
            Err(FormatError::InvalidStructure(format!(
                "Unknown viz type value: {}",
                value
            )))
        }
    }
}

/// Size of the constant file header (identifier plus three values) in bytes.
pub const fn constant_header_size() -> usize {
    FILE_IDENTIFIER.len() + HEADER_CONSTANT_N_VALUES * BYTES_PER_VALUE
}

/// Total header size for a file with `n_blocks` blocks.
pub const fn header_size(n_blocks: usize) -> usize {
    constant_header_size() + n_blocks * HEADER_N_VALUES_PER_BLOCK * BYTES_PER_VALUE
}

/// Bytes of a packed agent record with the given subpoint value count.
pub const fn agent_record_size(n_subpoint_values: usize) -> usize {
    (MIN_VALUES_PER_AGENT + n_subpoint_values) * BYTES_PER_VALUE
}

/// Padding needed to bring `len` up to the block alignment boundary.
pub const fn padding_for(len: usize) -> usize {
    (BLOCK_OFFSET_ALIGNMENT - len % BLOCK_OFFSET_ALIGNMENT) % BLOCK_OFFSET_ALIGNMENT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier() {
        assert_eq!(FILE_IDENTIFIER.len(), 16);
        assert_eq!(&FILE_IDENTIFIER[..], b"SIMULARIUMBINARY");
    }

    #[test]
    fn test_header_sizes() {
        assert_eq!(constant_header_size(), 28);
        // 3 blocks: 28 + 3 * 12
        assert_eq!(header_size(3), 64);
    }

    #[test]
    fn test_agent_record_size() {
        // no subpoints: fixed prefix only
        assert_eq!(agent_record_size(0), 44);
        // 2 subpoints = 6 values
        assert_eq!(agent_record_size(6), 68);
    }

    #[test]
    fn test_block_type_tags() {
        for bt in [
            BlockType::SpatialDataJson,
            BlockType::TrajectoryInfoJson,
            BlockType::PlotDataJson,
            BlockType::SpatialDataBinary,
        ] {
            assert_eq!(BlockType::from_tag(bt.tag()), Some(bt));
        }
        assert_eq!(BlockType::from_tag(99), None);
    }

    #[test]
    fn test_viz_type_values() {
        assert_eq!(VizType::Default.value(), 1000.0);
        assert_eq!(VizType::Fiber.value(), 1001.0);
        assert!(VizType::from_value(1002.0).is_err());
    }

    #[test]
    fn test_padding() {
        assert_eq!(padding_for(0), 0);
        assert_eq!(padding_for(5), 3);
        assert_eq!(padding_for(8), 0);
    }
}
