//! Legacy JSON container access.
//!
//! The JSON form predates the binary container: one object holding the
//! trajectory info, every frame as a flat value array, and plot data. The
//! whole document is materialized at load, so unlike [`super::BinaryData`]
//! there is no lazy per-frame decoding to be had.

use std::path::Path;

use glam::Vec3;
use serde_json::Value;
use tracing::debug;

use super::info::TrajectoryInfo;
use crate::binary::format::{agent_index, MIN_VALUES_PER_AGENT, VizType};
use crate::binary::{AgentRecord, FileBuffer, FrameRecord};
use crate::util::{Error, Result};

/// An open JSON `.simularium` container.
pub struct JsonData {
    info: TrajectoryInfo,
    frames: Vec<FrameRecord>,
    plots: Vec<Value>,
}

impl JsonData {
    /// Open a JSON container file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_buffer(&FileBuffer::open(path)?)
    }

    /// Load a JSON container from in-memory bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let document: Value = serde_json::from_slice(bytes)?;
        Self::from_document(document)
    }

    pub(crate) fn from_buffer(buffer: &FileBuffer) -> Result<Self> {
        Self::from_bytes(buffer)
    }

    fn from_document(document: Value) -> Result<Self> {
        let info = document
            .get("trajectoryInfo")
            .ok_or_else(|| Error::missing("trajectoryInfo"))?;
        let info: TrajectoryInfo = serde_json::from_value(info.clone())?;

        let bundle = document
            .get("spatialData")
            .ok_or_else(|| Error::missing("spatialData"))?
            .get("bundleData")
            .and_then(Value::as_array)
            .ok_or_else(|| Error::missing("spatialData.bundleData"))?;
        let frames = bundle
            .iter()
            .enumerate()
            .map(|(i, frame)| parse_frame(i, frame))
            .collect::<Result<Vec<_>>>()?;

        let plots = match document.get("plotData").and_then(|p| p.get("data")) {
            Some(Value::Array(plots)) => plots.clone(),
            _ => Vec::new(),
        };

        debug!(n_frames = frames.len(), "Loaded JSON container");
        Ok(Self {
            info,
            frames,
            plots,
        })
    }

    /// The parsed trajectory info.
    #[inline]
    pub fn trajectory_info(&self) -> &TrajectoryInfo {
        &self.info
    }

    /// Number of frames in the bundle.
    #[inline]
    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    /// The frame at an index.
    pub fn frame(&self, index: usize) -> Result<FrameRecord> {
        self.frames
            .get(index)
            .cloned()
            .ok_or(Error::FrameOutOfBounds {
                index,
                count: self.frames.len(),
            })
    }

    /// Index of the frame whose time is closest to `time`.
    pub fn nearest_frame_index(&self, time: f32) -> Result<usize> {
        if self.frames.is_empty() {
            return Err(Error::FrameOutOfBounds { index: 0, count: 0 });
        }
        let mut closest = 0usize;
        let mut min_dist = f32::INFINITY;
        for (i, frame) in self.frames.iter().enumerate() {
            let dist = (frame.time - time).abs();
            if dist < min_dist {
                min_dist = dist;
                closest = i;
            } else {
                break;
            }
        }
        Ok(closest)
    }

    /// The frame whose time is closest to `time`.
    pub fn frame_at_time(&self, time: f32) -> Result<FrameRecord> {
        self.frame(self.nearest_frame_index(time)?)
    }

    /// Plot payloads.
    #[inline]
    pub fn plots(&self) -> &[Value] {
        &self.plots
    }
}

/// Parse one bundle entry's flat value array into agent records.
fn parse_frame(index: usize, frame: &Value) -> Result<FrameRecord> {
    let field = |name: &str| {
        frame
            .get(name)
            .ok_or_else(|| Error::missing(format!("bundleData[{}].{}", index, name)))
    };
    let frame_number = field("frameNumber")?
        .as_u64()
        .ok_or_else(|| Error::invalid(format!("Frame {}: frameNumber is not a number", index)))?;
    let time = field("time")?
        .as_f64()
        .ok_or_else(|| Error::invalid(format!("Frame {}: time is not a number", index)))?;
    let data = field("data")?
        .as_array()
        .ok_or_else(|| Error::invalid(format!("Frame {}: data is not an array", index)))?;

    let values = data
        .iter()
        .map(|v| {
            v.as_f64()
                .map(|v| v as f32)
                .ok_or_else(|| Error::invalid(format!("Frame {}: non-numeric agent value", index)))
        })
        .collect::<Result<Vec<f32>>>()?;

    let mut agents = Vec::new();
    let mut pos = 0usize;
    while pos < values.len() {
        if pos + MIN_VALUES_PER_AGENT > values.len() {
            return Err(Error::invalid(format!(
                "Frame {}: agent record truncated at value {}",
                index, pos
            )));
        }
        let record = &values[pos..pos + MIN_VALUES_PER_AGENT];
        let nsp_value = record[agent_index::NSP];
        if !nsp_value.is_finite() || nsp_value < 0.0 {
            return Err(Error::invalid(format!(
                "Frame {}: invalid subpoint count {}",
                index, nsp_value
            )));
        }
        let n_subpoints = nsp_value as usize;
        pos += MIN_VALUES_PER_AGENT;
        // compare against what remains; the declared count may saturate
        if n_subpoints > values.len() - pos {
            return Err(Error::invalid(format!(
                "Frame {}: {} subpoint values declared but {} remain",
                index,
                n_subpoints,
                values.len() - pos
            )));
        }
        agents.push(AgentRecord {
            viz_type: VizType::from_value(record[agent_index::VIZ_TYPE])?,
            unique_id: record[agent_index::UID] as u32,
            type_id: record[agent_index::TID] as u32,
            position: Vec3::new(
                record[agent_index::POSX],
                record[agent_index::POSY],
                record[agent_index::POSZ],
            ),
            rotation: Vec3::new(
                record[agent_index::ROTX],
                record[agent_index::ROTY],
                record[agent_index::ROTZ],
            ),
            radius: record[agent_index::RADIUS],
            subpoints: values[pos..pos + n_subpoints].to_vec(),
        });
        pos += n_subpoints;
    }

    Ok(FrameRecord {
        frame_number: frame_number as u32,
        time: time as f32,
        agents,
    })
}
