//! Low-level Simularium binary container format.
//!
//! A `.simularium` binary file is a framed, block-structured container:
//! a magic-identified header indexes top-level blocks (trajectory info JSON,
//! packed spatial frames, plot data JSON) by offset and length, and the
//! spatial block carries its own per-frame locator table for random access.

pub mod codec;
pub mod format;
pub mod frame_index;
pub mod reader;
pub mod writer;

pub use codec::{decode_frame, encode_frame, packing_mode, AgentRecord, FrameRecord, PackingMode};
pub use format::{BlockType, VizType};
pub use frame_index::{FrameIndex, FrameIndexEntry};
pub use reader::{is_binary, BlockIndex, BlockSpan, FileBuffer};
pub use writer::{container_to_bytes, write_container, ContainerBlocks};
