//! Reading `.simularium` containers, binary or legacy JSON.
//!
//! [`SimulariumData`] sniffs the file identifier and dispatches to the right
//! backend; both expose the same frame and metadata operations.

pub mod binary;
pub mod info;
pub mod json;

use std::path::Path;

use glam::Vec3;
use serde_json::Value;

use crate::binary::{is_binary, FileBuffer, FrameRecord};
use crate::trajectory::{Agent, TrajectoryData, TrajectoryFrame};
use crate::util::{Error, Result};

pub use binary::BinaryData;
pub use info::{CameraJson, TrajectoryInfo, TypeEntry, XyzValues};
pub use json::JsonData;

/// An open trajectory container of either encoding.
pub enum SimulariumData {
    Binary(BinaryData),
    Json(JsonData),
}

impl SimulariumData {
    /// Open a container file, detecting the encoding from its first bytes.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_buffer(FileBuffer::open(path)?)
    }

    /// Load a container from in-memory bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        Self::from_buffer(FileBuffer::from_bytes(bytes))
    }

    fn from_buffer(buffer: FileBuffer) -> Result<Self> {
        if is_binary(&buffer) {
            Ok(Self::Binary(BinaryData::from_buffer(buffer)?))
        } else {
            Ok(Self::Json(JsonData::from_buffer(&buffer)?))
        }
    }

    /// The parsed trajectory info.
    pub fn trajectory_info(&self) -> &TrajectoryInfo {
        match self {
            Self::Binary(data) => data.trajectory_info(),
            Self::Json(data) => data.trajectory_info(),
        }
    }

    /// Number of frames.
    pub fn num_frames(&self) -> usize {
        match self {
            Self::Binary(data) => data.num_frames(),
            Self::Json(data) => data.num_frames(),
        }
    }

    /// The decoded frame at an index.
    pub fn frame(&self, index: usize) -> Result<FrameRecord> {
        match self {
            Self::Binary(data) => data.frame(index),
            Self::Json(data) => data.frame(index),
        }
    }

    /// Index of the frame whose time is closest to `time`.
    pub fn nearest_frame_index(&self, time: f32) -> Result<usize> {
        match self {
            Self::Binary(data) => data.nearest_frame_index(time),
            Self::Json(data) => data.nearest_frame_index(time),
        }
    }

    /// The decoded frame whose time is closest to `time`.
    pub fn frame_at_time(&self, time: f32) -> Result<FrameRecord> {
        self.frame(self.nearest_frame_index(time)?)
    }

    /// Plot payloads, empty when the container has none.
    pub fn plots(&self) -> Result<Vec<Value>> {
        match self {
            Self::Binary(data) => data.plots(),
            Self::Json(data) => Ok(data.plots().to_vec()),
        }
    }

    /// Rebuild an editable trajectory from the container.
    ///
    /// Type IDs resolve back to names through the type mapping and flat
    /// subpoint values regroup into 3D points, so a reconverted trajectory
    /// produces the same container again.
    pub fn to_trajectory_data(&self) -> Result<TrajectoryData> {
        let info = self.trajectory_info();
        let mut frames = Vec::with_capacity(self.num_frames());
        for index in 0..self.num_frames() {
            let record = self.frame(index)?;
            let mut agents = Vec::with_capacity(record.agents.len());
            for agent in &record.agents {
                let type_name = info.type_name(agent.type_id).ok_or_else(|| {
                    Error::missing(format!("typeMapping entry for type ID {}", agent.type_id))
                })?;
                if agent.subpoints.len() % 3 != 0 {
                    return Err(Error::invalid(format!(
                        "Frame {}: agent {} has {} subpoint values, not a multiple of 3",
                        index,
                        agent.unique_id,
                        agent.subpoints.len()
                    )));
                }
                agents.push(Agent {
                    viz_type: agent.viz_type,
                    unique_id: agent.unique_id,
                    type_name: type_name.to_string(),
                    position: agent.position,
                    rotation: agent.rotation,
                    radius: agent.radius,
                    subpoints: agent
                        .subpoints
                        .chunks_exact(3)
                        .map(|p| Vec3::new(p[0], p[1], p[2]))
                        .collect(),
                });
            }
            frames.push(TrajectoryFrame::new(record.time, agents));
        }

        Ok(TrajectoryData {
            meta: info.meta_data(),
            frames,
            time_units: info.time_units.clone(),
            spatial_units: info.spatial_units.clone(),
            display_data: info.display_data()?,
            plots: self.plots()?,
        })
    }
}
