//! Trajectory info block: the JSON metadata describing a container.

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::trajectory::{CameraSettings, DisplayData, DisplayType, MetaData, UnitData};
use crate::util::Result;

/// An `{x, y, z}` JSON object.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct XyzValues {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl From<Vec3> for XyzValues {
    fn from(v: Vec3) -> Self {
        Self {
            x: v.x,
            y: v.y,
            z: v.z,
        }
    }
}

impl From<XyzValues> for Vec3 {
    fn from(v: XyzValues) -> Self {
        Vec3::new(v.x, v.y, v.z)
    }
}

/// Camera settings as stored in trajectory info.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraJson {
    pub position: XyzValues,
    pub look_at_position: XyzValues,
    pub up_vector: XyzValues,
    pub fov_degrees: f32,
}

impl From<&CameraSettings> for CameraJson {
    fn from(camera: &CameraSettings) -> Self {
        Self {
            position: camera.position.into(),
            look_at_position: camera.look_at_position.into(),
            up_vector: camera.up_vector.into(),
            fov_degrees: camera.fov_degrees,
        }
    }
}

impl Default for CameraJson {
    fn default() -> Self {
        (&CameraSettings::default()).into()
    }
}

impl From<&CameraJson> for CameraSettings {
    fn from(json: &CameraJson) -> Self {
        Self {
            position: json.position.into(),
            look_at_position: json.look_at_position.into(),
            up_vector: json.up_vector.into(),
            fov_degrees: json.fov_degrees,
        }
    }
}

/// One agent type in the type mapping: a display name plus optional geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeEntry {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geometry: Option<serde_json::Value>,
}

/// The trajectory info block.
///
/// Serialized as camelCase JSON; the type mapping is a BTreeMap so repeated
/// conversions of the same trajectory serialize identically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrajectoryInfo {
    pub version: u32,
    /// Defaults to whole seconds when other tools omit it
    #[serde(default)]
    pub time_units: UnitData,
    /// Time between steps, clamped to 4 significant figures
    pub time_step_size: f64,
    pub total_steps: u64,
    #[serde(default = "UnitData::meters")]
    pub spatial_units: UnitData,
    /// Bounding volume dimensions, with any scale factor already applied
    pub size: XyzValues,
    #[serde(default)]
    pub camera_default: CameraJson,
    /// Numeric type ID (as a decimal string key) to type info
    pub type_mapping: BTreeMap<String, TypeEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trajectory_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_info: Option<serde_json::Value>,
}

impl TrajectoryInfo {
    /// Display name for a numeric type ID, if mapped.
    pub fn type_name(&self, type_id: u32) -> Option<&str> {
        self.type_mapping
            .get(&type_id.to_string())
            .map(|entry| entry.name.as_str())
    }

    /// Reconstruct trajectory metadata from this info block.
    ///
    /// The scale factor is folded into the stored box size at write time, so
    /// the round-tripped metadata always reports a factor of 1.
    pub fn meta_data(&self) -> MetaData {
        MetaData {
            box_size: self.size.into(),
            camera_defaults: (&self.camera_default).into(),
            scale_factor: 1.0,
            trajectory_title: self.trajectory_title.clone().unwrap_or_default(),
            model_info: self.model_info.clone(),
        }
    }

    /// Reconstruct per-type display data from the type mapping.
    pub fn display_data(&self) -> Result<HashMap<String, DisplayData>> {
        let mut display_data = HashMap::new();
        for entry in self.type_mapping.values() {
            let mut display = DisplayData::new(&entry.name);
            if let Some(geometry) = &entry.geometry {
                if let Some(tag) = geometry.get("displayType").and_then(|v| v.as_str()) {
                    display = display.with_display_type(DisplayType::from_str(tag)?);
                }
                if let Some(url) = geometry.get("url").and_then(|v| v.as_str()) {
                    display = display.with_url(url);
                }
                if let Some(color) = geometry.get("color").and_then(|v| v.as_str()) {
                    display = display.with_color(color)?;
                }
            }
            if !display.is_default() {
                display_data.insert(entry.name.clone(), display);
            }
        }
        Ok(display_data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::format::TRAJECTORY_INFO_VERSION;

    fn sample_info() -> TrajectoryInfo {
        let mut type_mapping = BTreeMap::new();
        type_mapping.insert(
            "0".to_string(),
            TypeEntry {
                name: "actin".to_string(),
                geometry: Some(serde_json::json!({
                    "displayType": "FIBER",
                    "color": "#ff0000",
                })),
            },
        );
        type_mapping.insert(
            "1".to_string(),
            TypeEntry {
                name: "arp".to_string(),
                geometry: None,
            },
        );
        TrajectoryInfo {
            version: TRAJECTORY_INFO_VERSION,
            time_units: UnitData::new("ns", 1.0),
            time_step_size: 0.1,
            total_steps: 10,
            spatial_units: UnitData::new("nm", 1.0),
            size: XyzValues {
                x: 100.0,
                y: 100.0,
                z: 100.0,
            },
            camera_default: (&CameraSettings::default()).into(),
            type_mapping,
            trajectory_title: Some("branched actin".to_string()),
            model_info: None,
        }
    }

    #[test]
    fn test_serde_field_names() {
        let json = serde_json::to_value(sample_info()).unwrap();
        assert_eq!(json["timeStepSize"], 0.1);
        assert_eq!(json["totalSteps"], 10);
        assert_eq!(json["timeUnits"]["name"], "ns");
        assert_eq!(json["size"]["x"], 100.0);
        assert_eq!(json["cameraDefault"]["fovDegrees"], 75.0);
        assert_eq!(json["typeMapping"]["0"]["name"], "actin");
        assert_eq!(json["trajectoryTitle"], "branched actin");
        // absent optional fields are omitted, not null
        assert!(json.get("modelInfo").is_none());
    }

    #[test]
    fn test_serde_roundtrip() {
        let info = sample_info();
        let json = serde_json::to_string(&info).unwrap();
        let parsed: TrajectoryInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, info);
    }

    #[test]
    fn test_optional_viewer_fields_defaulted() {
        // info written by other tools may omit units and camera settings
        let parsed: TrajectoryInfo = serde_json::from_value(serde_json::json!({
            "version": 3,
            "timeStepSize": 0.1,
            "totalSteps": 4,
            "size": {"x": 50.0, "y": 50.0, "z": 50.0},
            "typeMapping": {}
        }))
        .unwrap();
        assert_eq!(parsed.time_units.name, "s");
        assert_eq!(parsed.spatial_units.name, "m");
        assert_eq!(parsed.camera_default.fov_degrees, 75.0);
    }

    #[test]
    fn test_type_name_lookup() {
        let info = sample_info();
        assert_eq!(info.type_name(0), Some("actin"));
        assert_eq!(info.type_name(1), Some("arp"));
        assert_eq!(info.type_name(2), None);
    }

    #[test]
    fn test_display_data_reconstruction() {
        let display_data = sample_info().display_data().unwrap();
        let actin = &display_data["actin"];
        assert_eq!(actin.display_type, Some(DisplayType::Fiber));
        assert_eq!(actin.color(), Some("#ff0000"));
        // types without geometry round-trip as absent display data
        assert!(!display_data.contains_key("arp"));
    }
}
