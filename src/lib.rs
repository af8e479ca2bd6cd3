//! # Simularium
//!
//! Rust implementation of the Simularium (.simularium) trajectory container
//! format.
//!
//! Original Simularium format and tooling developed by the Allen Institute
//! for Cell Science. All rights to the original belong to the authors. This
//! is an independent Rust implementation aiming to match the original for
//! binary compatibility with the Simularium viewer.
//!
//! ## Modules
//!
//! - [`util`] - Errors and small shared helpers
//! - [`binary`] - Low-level binary container format (blocks, frames, codec)
//! - [`trajectory`] - In-memory trajectory model (agents, metadata, units)
//! - [`plots`] - Plot builders producing viewer-ready JSON
//! - [`container`] - Reading containers, binary or legacy JSON
//! - [`convert`] - Converting trajectories into binary containers
//!
//! ## Example
//!
//! ```ignore
//! use simularium::prelude::*;
//!
//! let data = SimulariumData::open("trajectory.simularium")?;
//! println!("{} frames", data.num_frames());
//!
//! let frame = data.frame(0)?;
//! for agent in &frame.agents {
//!     println!("agent {} at {:?}", agent.unique_id, agent.position);
//! }
//! ```

pub mod binary;
pub mod container;
pub mod convert;
pub mod plots;
pub mod trajectory;
pub mod util;

// Re-export commonly used types
pub use container::{BinaryData, JsonData, SimulariumData, TrajectoryInfo};
pub use convert::TrajectoryConverter;
pub use util::{Error, Result};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::binary::{AgentRecord, FrameRecord, VizType};
    pub use crate::container::{BinaryData, JsonData, SimulariumData, TrajectoryInfo};
    pub use crate::convert::TrajectoryConverter;
    pub use crate::plots::{HistogramPlotData, RenderMode, ScatterPlotData};
    pub use crate::trajectory::{
        Agent, CameraSettings, DisplayData, DisplayType, MetaData, TrajectoryData,
        TrajectoryFrame, UnitData,
    };
    pub use crate::util::{Error, Result};
}
