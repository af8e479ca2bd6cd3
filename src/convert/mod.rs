//! Conversion from trajectory data to a binary container.
//!
//! Assembly is two passes over the frames. The first pass runs sequentially:
//! it assigns numeric type IDs in first-seen order and translates agents to
//! wire records, so identical trajectories always produce identical type
//! mappings. The second pass encodes frames to bytes and is embarrassingly
//! parallel, so it runs on the rayon pool.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde_json::json;
use tracing::{debug, info};

use crate::binary::format::{PLOT_DATA_VERSION, TRAJECTORY_INFO_VERSION};
use crate::binary::{
    container_to_bytes, encode_frame, packing_mode, write_container, AgentRecord, ContainerBlocks,
    FrameRecord,
};
use crate::container::{TrajectoryInfo, TypeEntry};
use crate::plots::{HistogramPlotData, ScatterPlotData};
use crate::trajectory::TrajectoryData;
use crate::util::Result;

/// Called with (frames done, frames total) as conversion progresses.
pub type ProgressCallback = Box<dyn Fn(usize, usize) + Send + Sync>;

const PROGRESS_EVERY: usize = 100;

/// Converts one trajectory into a `.simularium` binary container.
pub struct TrajectoryConverter {
    data: TrajectoryData,
    progress: Option<ProgressCallback>,
}

impl TrajectoryConverter {
    /// Create a converter for the given trajectory.
    pub fn new(data: TrajectoryData) -> Self {
        Self {
            data,
            progress: None,
        }
    }

    /// Report conversion progress through a callback.
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Attach a scatter plot to the output container.
    pub fn add_scatter_plot(&mut self, plot: &ScatterPlotData) {
        self.data.plots.push(plot.to_plot_json());
    }

    /// Attach a histogram to the output container.
    pub fn add_histogram(&mut self, plot: &HistogramPlotData) {
        self.data.plots.push(plot.to_plot_json());
    }

    /// The trajectory being converted.
    #[inline]
    pub fn data(&self) -> &TrajectoryData {
        &self.data
    }

    /// Serialize the trajectory into an in-memory container.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        container_to_bytes(&self.assemble()?)
    }

    /// Write the trajectory to disk, appending the `.simularium` extension
    /// when absent. Returns the path written.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let blocks = self.assemble()?;
        let written = write_container(path, &blocks)?;
        info!(
            path = %written.display(),
            n_frames = blocks.spatial_frames.len(),
            "Conversion complete"
        );
        Ok(written)
    }

    /// Validate and assemble all three container blocks.
    fn assemble(&self) -> Result<ContainerBlocks> {
        self.data.validate()?;

        let (frames, type_order) = self.build_wire_frames();
        let mode = packing_mode(&frames);
        debug!(n_frames = frames.len(), ?mode, "Encoding spatial frames");
        let spatial_frames: Vec<Vec<u8>> = frames
            .par_iter()
            .map(|frame| encode_frame(frame, mode))
            .collect();

        let trajectory_info = serde_json::to_vec(&self.build_info(&type_order))?;
        let plot_data = serde_json::to_vec(&json!({
            "version": PLOT_DATA_VERSION,
            "data": self.data.plots,
        }))?;

        Ok(ContainerBlocks {
            trajectory_info,
            spatial_frames,
            plot_data,
        })
    }

    /// Sequential pass: assign type IDs in first-seen order and translate
    /// agents to wire records, applying the scale factor to spatial values.
    fn build_wire_frames(&self) -> (Vec<FrameRecord>, Vec<String>) {
        let scale = self.data.meta.scale_factor;
        let mut type_ids: HashMap<&str, u32> = HashMap::new();
        let mut type_order: Vec<String> = Vec::new();
        let total = self.data.frames.len();

        let mut frames = Vec::with_capacity(total);
        for (frame_number, frame) in self.data.frames.iter().enumerate() {
            let agents = frame
                .agents
                .iter()
                .map(|agent| {
                    let type_id = *type_ids.entry(&agent.type_name).or_insert_with(|| {
                        type_order.push(agent.type_name.clone());
                        (type_order.len() - 1) as u32
                    });
                    AgentRecord {
                        viz_type: agent.viz_type,
                        unique_id: agent.unique_id,
                        type_id,
                        position: agent.position * scale,
                        rotation: agent.rotation,
                        radius: agent.radius * scale,
                        subpoints: agent
                            .subpoints
                            .iter()
                            .flat_map(|p| (*p * scale).to_array())
                            .collect(),
                    }
                })
                .collect();
            frames.push(FrameRecord {
                frame_number: frame_number as u32,
                time: frame.time,
                agents,
            });

            if let Some(progress) = &self.progress {
                let done = frame_number + 1;
                if done % PROGRESS_EVERY == 0 || done == total {
                    progress(done, total);
                }
            }
        }
        (frames, type_order)
    }

    /// Build the trajectory info block from the metadata and type order.
    fn build_info(&self, type_order: &[String]) -> TrajectoryInfo {
        let mut type_mapping = BTreeMap::new();
        for (type_id, name) in type_order.iter().enumerate() {
            let geometry = self
                .data
                .display_data
                .get(name)
                .and_then(|display| display.geometry_json());
            type_mapping.insert(
                type_id.to_string(),
                TypeEntry {
                    name: name.clone(),
                    geometry,
                },
            );
        }

        let meta = &self.data.meta;
        TrajectoryInfo {
            version: TRAJECTORY_INFO_VERSION,
            time_units: self.data.time_units.clone(),
            time_step_size: self.data.time_step_size(),
            total_steps: self.data.total_steps() as u64,
            spatial_units: self.data.spatial_units.clone(),
            size: meta.scaled_box_size().into(),
            camera_default: (&meta.camera_defaults).into(),
            type_mapping,
            trajectory_title: (!meta.trajectory_title.is_empty())
                .then(|| meta.trajectory_title.clone()),
            model_info: meta.model_info.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trajectory::{Agent, MetaData, TrajectoryFrame};
    use crate::util::Error;
    use glam::Vec3;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn two_type_trajectory() -> TrajectoryData {
        TrajectoryData::new(
            MetaData::default(),
            vec![
                TrajectoryFrame::new(
                    0.0,
                    vec![
                        Agent::point(0, "B", Vec3::ZERO, 1.0),
                        Agent::point(1, "A", Vec3::ONE, 1.0),
                    ],
                ),
                TrajectoryFrame::new(
                    0.1,
                    vec![
                        Agent::point(0, "A", Vec3::ZERO, 1.0),
                        Agent::point(1, "C", Vec3::ONE, 1.0),
                    ],
                ),
            ],
        )
    }

    #[test]
    fn test_type_ids_first_seen_order() {
        let converter = TrajectoryConverter::new(two_type_trajectory());
        let (frames, type_order) = converter.build_wire_frames();
        assert_eq!(type_order, vec!["B", "A", "C"]);
        // "A" keeps its ID across frames
        assert_eq!(frames[0].agents[1].type_id, 1);
        assert_eq!(frames[1].agents[0].type_id, 1);
        assert_eq!(frames[1].agents[1].type_id, 2);
    }

    #[test]
    fn test_info_block_contents() {
        let mut data = two_type_trajectory();
        data.meta.trajectory_title = "test run".to_string();
        let converter = TrajectoryConverter::new(data);
        let (_, type_order) = converter.build_wire_frames();
        let info = converter.build_info(&type_order);
        assert_eq!(info.version, TRAJECTORY_INFO_VERSION);
        assert_eq!(info.total_steps, 2);
        assert!((info.time_step_size - 0.1).abs() < 1e-9);
        assert_eq!(info.type_name(0), Some("B"));
        assert_eq!(info.trajectory_title.as_deref(), Some("test run"));
    }

    #[test]
    fn test_scale_factor_applied() {
        let mut data = two_type_trajectory();
        data.meta.scale_factor = 10.0;
        let converter = TrajectoryConverter::new(data);
        let (frames, type_order) = converter.build_wire_frames();
        assert_eq!(frames[0].agents[1].position, Vec3::splat(10.0));
        assert_eq!(frames[0].agents[1].radius, 10.0);
        let info = converter.build_info(&type_order);
        assert_eq!(info.size.x, 1000.0);
    }

    #[test]
    fn test_invalid_trajectory_rejected() {
        let mut data = two_type_trajectory();
        data.frames[0].agents[0].unique_id = u32::MAX;
        let converter = TrajectoryConverter::new(data);
        assert!(matches!(converter.to_bytes(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_progress_reported() {
        let mut frames = Vec::new();
        for i in 0..250 {
            frames.push(TrajectoryFrame::new(i as f32, Vec::new()));
        }
        let data = TrajectoryData::new(MetaData::default(), frames);

        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let converter = TrajectoryConverter::new(data).with_progress(Box::new(move |done, total| {
            assert_eq!(total, 250);
            assert!(done <= total);
            seen.fetch_add(1, Ordering::SeqCst);
        }));
        converter.to_bytes().unwrap();
        // at 100, 200, and 250
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
