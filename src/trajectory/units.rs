//! Time and spatial unit definitions.

use serde::{Deserialize, Serialize};

use crate::util::clamp_precision;

/// A unit name plus a scalar multiplier for values given in fractions of it.
///
/// Magnitudes are clamped to 4 significant figures, matching what the viewer
/// displays and what trajectory-info JSON stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitData {
    pub magnitude: f64,
    pub name: String,
}

impl UnitData {
    /// Create unit data with a clamped magnitude.
    pub fn new(name: impl Into<String>, magnitude: f64) -> Self {
        Self {
            magnitude: clamp_precision(magnitude),
            name: name.into(),
        }
    }

    /// Whole seconds, the default time unit.
    pub fn seconds() -> Self {
        Self::new("s", 1.0)
    }

    /// Whole meters, the default spatial unit.
    pub fn meters() -> Self {
        Self::new("m", 1.0)
    }

    /// Multiply the magnitude, re-clamping precision.
    pub fn multiply(&mut self, multiplier: f64) {
        self.magnitude = clamp_precision(self.magnitude * multiplier);
    }
}

impl Default for UnitData {
    fn default() -> Self {
        Self::seconds()
    }
}

impl std::fmt::Display for UnitData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if (self.magnitude - 1.0).abs() > f64::EPSILON {
            write!(f, "{} {}", self.magnitude, self.name)
        } else {
            write!(f, "{}", self.name)
        }
    }
}
