//! Error types for the Simularium library.

use std::path::PathBuf;
use thiserror::Error;

/// Malformed, truncated, or inconsistent container bytes.
///
/// Always fatal to the read operation that raised it; the only tolerated
/// anomaly is trailing padding inside a frame's declared length, which is
/// logged and skipped during decode.
#[derive(Error, Debug)]
pub enum FormatError {
    /// Invalid magic bytes at start of file
    #[error("Invalid Simularium file: expected file identifier")]
    InvalidMagic,

    /// Unsupported binary format version
    #[error("Unsupported Simularium binary version: {0}")]
    UnsupportedVersion(u32),

    /// File is truncated or corrupted
    #[error("Unexpected end of data at byte {0}")]
    UnexpectedEof(u64),

    /// A block descriptor points outside the file buffer
    #[error("Block {block_type} at offset {offset} with length {length} exceeds buffer of {buffer_len} bytes")]
    BlockOutOfBounds {
        block_type: u32,
        offset: u32,
        length: u32,
        buffer_len: usize,
    },

    /// A block's own header disagrees with the index descriptor
    #[error("Block #{index} header ({header_type}, {header_length}) does not match descriptor ({descriptor_type}, {descriptor_length})")]
    BlockHeaderMismatch {
        index: usize,
        header_type: u32,
        header_length: u32,
        descriptor_type: u32,
        descriptor_length: u32,
    },

    /// A required block type is absent from the index
    #[error("Required block not found: {0}")]
    MissingBlock(&'static str),

    /// Declared frame count does not match frames actually present
    #[error("Spatial block declares {declared} frames but {found} were read")]
    FrameCountMismatch { declared: u32, found: u32 },

    /// A frame's declared byte range exceeds the spatial block
    #[error("Frame {frame} range (offset {offset}, length {length}) exceeds spatial block of {block_len} bytes")]
    TruncatedFrame {
        frame: u32,
        offset: u32,
        length: u32,
        block_len: u32,
    },

    /// An agent record cannot be fully read within its frame's length
    #[error("Frame {frame}: agent {agent} of {n_agents} truncated at byte {at}")]
    TruncatedAgent {
        frame: u32,
        agent: u32,
        n_agents: u32,
        at: usize,
    },

    /// Invalid data structure in file
    #[error("Invalid file structure: {0}")]
    InvalidStructure(String),
}

/// Main error type for Simularium operations.
#[derive(Error, Debug)]
pub enum Error {
    /// File does not exist or cannot be accessed
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Container bytes are malformed
    #[error(transparent)]
    Format(#[from] FormatError),

    /// A required field is absent from supplied data
    #[error("Missing data: '{0}'")]
    MissingField(String),

    /// A value violates a documented constraint
    #[error("Invalid data: {0}")]
    Validation(String),

    /// Frame index out of bounds
    #[error("Frame index {index} out of bounds (count: {count})")]
    FrameOutOfBounds { index: usize, count: usize },

    /// Memory mapping failed
    #[error("Memory mapping failed: {0}")]
    MmapFailed(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// UTF-8 conversion error
    #[error("Invalid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// JSON parse or serialize error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create an invalid structure error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Format(FormatError::InvalidStructure(msg.into()))
    }

    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a missing field error naming the absent field.
    pub fn missing(field: impl Into<String>) -> Self {
        Self::MissingField(field.into())
    }
}

/// Result type alias for Simularium operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = Error::Format(FormatError::InvalidMagic);
        assert!(e.to_string().contains("identifier"));

        let e = Error::FrameOutOfBounds { index: 5, count: 3 };
        assert!(e.to_string().contains("5"));
        assert!(e.to_string().contains("3"));

        let e = Error::missing("box_size");
        assert!(e.to_string().contains("box_size"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_format_error_wraps() {
        let err: Error = FormatError::FrameCountMismatch {
            declared: 4,
            found: 3,
        }
        .into();
        assert!(matches!(err, Error::Format(_)));
    }
}
