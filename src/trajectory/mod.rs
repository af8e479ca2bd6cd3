//! Common in-memory trajectory representation.
//!
//! Engine-specific readers populate [`TrajectoryData`], filters may mutate it
//! in place, and the converter consumes it exactly once to produce container
//! blocks. Optional per-agent fields (rotation, subpoints) are explicit with
//! zero-length/zero-value defaults rather than probed dynamically.

pub mod display;
pub mod meta;
pub mod units;

use std::collections::HashMap;

use glam::Vec3;

use crate::binary::format::{VizType, MAX_AGENT_ID};
use crate::util::{clamp_precision, Error, Result};

pub use display::{DisplayData, DisplayType};
pub use meta::{CameraSettings, MetaData};
pub use units::UnitData;

/// One entity at one timestep, identified by a type name rather than the
/// container's numeric type ID.
#[derive(Debug, Clone, PartialEq)]
pub struct Agent {
    pub viz_type: VizType,
    /// Unique within the whole trajectory
    pub unique_id: u32,
    pub type_name: String,
    pub position: Vec3,
    /// XYZ euler angles in degrees; zero when the engine provides none
    pub rotation: Vec3,
    pub radius: f32,
    /// Auxiliary 3D points for fiber geometry; empty for point agents
    pub subpoints: Vec<Vec3>,
}

impl Agent {
    /// A point-rendered agent.
    pub fn point(unique_id: u32, type_name: impl Into<String>, position: Vec3, radius: f32) -> Self {
        Self {
            viz_type: VizType::Default,
            unique_id,
            type_name: type_name.into(),
            position,
            rotation: Vec3::ZERO,
            radius,
            subpoints: Vec::new(),
        }
    }

    /// A fiber-rendered agent passing through the given subpoints.
    pub fn fiber(unique_id: u32, type_name: impl Into<String>, subpoints: Vec<Vec3>) -> Self {
        Self {
            viz_type: VizType::Fiber,
            unique_id,
            type_name: type_name.into(),
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            radius: 1.0,
            subpoints,
        }
    }
}

/// All agents at one timestep.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrajectoryFrame {
    /// Elapsed simulation time, in `TrajectoryData::time_units`
    pub time: f32,
    pub agents: Vec<Agent>,
}

impl TrajectoryFrame {
    pub fn new(time: f32, agents: Vec<Agent>) -> Self {
        Self { time, agents }
    }
}

/// Simulation trajectory outputs plus plot data, ready for conversion.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrajectoryData {
    pub meta: MetaData,
    pub frames: Vec<TrajectoryFrame>,
    pub time_units: UnitData,
    pub spatial_units: UnitData,
    /// Display info per agent type name
    pub display_data: HashMap<String, DisplayData>,
    /// Plot payloads already in viewer format
    pub plots: Vec<serde_json::Value>,
}

impl TrajectoryData {
    /// Trajectory with the given metadata and frames, defaults for the rest.
    pub fn new(meta: MetaData, frames: Vec<TrajectoryFrame>) -> Self {
        Self {
            meta,
            frames,
            time_units: UnitData::seconds(),
            spatial_units: UnitData::meters(),
            display_data: HashMap::new(),
            plots: Vec::new(),
        }
    }

    /// Rebuild an editable trajectory from an open container, so a loaded
    /// file can be filtered and re-exported.
    pub fn from_container(container: &crate::container::SimulariumData) -> Result<Self> {
        container.to_trajectory_data()
    }

    /// Number of timesteps.
    #[inline]
    pub fn total_steps(&self) -> usize {
        self.frames.len()
    }

    /// Time between the first two recorded steps, or zero for a single step,
    /// clamped to 4 significant figures.
    pub fn time_step_size(&self) -> f64 {
        if self.frames.len() > 1 {
            clamp_precision((self.frames[1].time - self.frames[0].time) as f64)
        } else {
            0.0
        }
    }

    /// Validate constraints that must hold before encoding.
    ///
    /// Agent unique IDs must survive the f32 wire encoding, and fiber agents
    /// must carry subpoints while point agents must not.
    pub fn validate(&self) -> Result<()> {
        for (time_index, frame) in self.frames.iter().enumerate() {
            for (agent_index, agent) in frame.agents.iter().enumerate() {
                if agent.unique_id > MAX_AGENT_ID {
                    return Err(Error::validation(format!(
                        "Agent ID {} does not fit the wire encoding (max {})",
                        agent.unique_id, MAX_AGENT_ID
                    )));
                }
                let has_subpoints = !agent.subpoints.is_empty();
                if has_subpoints != (agent.viz_type == VizType::Fiber) {
                    return Err(Error::validation(format!(
                        "Agent at time {}, index {}: type {} {} subpoints but viz type is {:?}",
                        time_index,
                        agent_index,
                        agent.type_name,
                        if has_subpoints { "has" } else { "does not have" },
                        agent.viz_type,
                    )));
                }
                if let Some(display) = self.display_data.get(&agent.type_name) {
                    if let Some(display_type) = display.display_type {
                        if has_subpoints != (display_type == DisplayType::Fiber) {
                            return Err(Error::validation(format!(
                                "Agent at time {}, index {}: type {} {} subpoints but display type is {:?}",
                                time_index,
                                agent_index,
                                agent.type_name,
                                if has_subpoints { "has" } else { "does not have" },
                                display_type,
                            )));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}
