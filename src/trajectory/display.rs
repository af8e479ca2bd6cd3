//! Per-type display information for the viewer.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::util::{Error, Result};

/// Geometry used to render an agent type.
///
/// These tags are part of the file format; changing them requires a
/// trajectory-info version bump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DisplayType {
    Sphere,
    Pdb,
    Obj,
    Fiber,
}

impl DisplayType {
    /// Wire tag for this display type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sphere => "SPHERE",
            Self::Pdb => "PDB",
            Self::Obj => "OBJ",
            Self::Fiber => "FIBER",
        }
    }
}

impl FromStr for DisplayType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "SPHERE" => Ok(Self::Sphere),
            "PDB" => Ok(Self::Pdb),
            "OBJ" => Ok(Self::Obj),
            "FIBER" => Ok(Self::Fiber),
            other => Err(Error::validation(format!(
                "Unrecognized display type: '{}'",
                other
            ))),
        }
    }
}

/// How to display one agent type: geometry, optional mesh URL, and color.
///
/// Values are validated at construction; a `DisplayData` that exists is
/// always writable.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DisplayData {
    pub name: String,
    /// Rendering radius override; None means use the per-agent radius
    pub radius: Option<f32>,
    pub display_type: Option<DisplayType>,
    /// Local path or web URL for PDB/OBJ geometry
    pub url: Option<String>,
    /// Hex color, "#RGB" or "#RRGGBB"
    color: Option<String>,
}

impl DisplayData {
    /// Create display data with defaults for everything but the name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_display_type(mut self, display_type: DisplayType) -> Self {
        self.display_type = Some(display_type);
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_radius(mut self, radius: f32) -> Self {
        self.radius = Some(radius);
        self
    }

    /// Set the display color, validating `#RGB` / `#RRGGBB` form.
    pub fn with_color(mut self, color: impl Into<String>) -> Result<Self> {
        let color = color.into();
        let bytes = color.as_bytes();
        let valid = (bytes.len() == 4 || bytes.len() == 7)
            && bytes[0] == b'#'
            && bytes[1..].iter().all(|b| b.is_ascii_hexdigit());
        if !valid {
            return Err(Error::validation(format!(
                "{} should be provided as '#xxxxxx' or '#xxx'",
                color
            )));
        }
        self.color = Some(color);
        Ok(self)
    }

    /// Color accessor (always validated).
    pub fn color(&self) -> Option<&str> {
        self.color.as_deref()
    }

    /// Check if this holds only default data (nothing worth writing).
    pub fn is_default(&self) -> bool {
        self.display_type.is_none() && self.url.is_none() && self.color.is_none()
    }

    /// Geometry entry for the trajectory-info type mapping, if any.
    pub fn geometry_json(&self) -> Option<serde_json::Value> {
        if self.is_default() {
            return None;
        }
        let mut geometry = serde_json::Map::new();
        if let Some(display_type) = self.display_type {
            geometry.insert("displayType".into(), json!(display_type.as_str()));
        }
        if let Some(url) = &self.url {
            geometry.insert("url".into(), json!(url));
        }
        if let Some(color) = &self.color {
            geometry.insert("color".into(), json!(color));
        }
        Some(geometry.into())
    }
}
