//! Trajectory-level metadata: bounding volume, camera defaults, titles.

use glam::Vec3;

use crate::binary::format::{default_camera, DEFAULT_BOX_SIZE};

/// Initial viewer camera settings, also used when the camera is reset.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraSettings {
    pub position: Vec3,
    pub look_at_position: Vec3,
    pub up_vector: Vec3,
    pub fov_degrees: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            position: Vec3::from_array(default_camera::POSITION),
            look_at_position: Vec3::from_array(default_camera::LOOK_AT_POSITION),
            up_vector: Vec3::from_array(default_camera::UP_VECTOR),
            fov_degrees: default_camera::FOV_DEGREES,
        }
    }
}

/// Metadata for one simulation trajectory.
#[derive(Debug, Clone, PartialEq)]
pub struct MetaData {
    /// XYZ dimensions of the simulation bounding volume
    pub box_size: Vec3,
    pub camera_defaults: CameraSettings,
    /// Scene multiplier, for visualizations that are too large or small
    pub scale_factor: f32,
    /// Title for this run of the model, empty if untitled
    pub trajectory_title: String,
    /// Free-form metadata for the model that produced the trajectory
    pub model_info: Option<serde_json::Value>,
}

impl Default for MetaData {
    fn default() -> Self {
        Self {
            box_size: Vec3::from_array(DEFAULT_BOX_SIZE),
            camera_defaults: CameraSettings::default(),
            scale_factor: 1.0,
            trajectory_title: String::new(),
            model_info: None,
        }
    }
}

impl MetaData {
    /// Metadata with a given box size and defaults for the rest.
    pub fn with_box_size(box_size: Vec3) -> Self {
        Self {
            box_size,
            ..Default::default()
        }
    }

    /// Box size with the scale factor applied, as written to trajectory info.
    pub fn scaled_box_size(&self) -> Vec3 {
        self.box_size * self.scale_factor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let meta = MetaData::default();
        assert_eq!(meta.box_size, Vec3::splat(100.0));
        assert_eq!(meta.camera_defaults.fov_degrees, 75.0);
        assert_eq!(meta.scale_factor, 1.0);
    }

    #[test]
    fn test_scaled_box_size() {
        let mut meta = MetaData::with_box_size(Vec3::new(10.0, 20.0, 30.0));
        meta.scale_factor = 2.0;
        assert_eq!(meta.scaled_box_size(), Vec3::new(20.0, 40.0, 60.0));
    }
}
