//! Armor plate detections as delivered by the upstream vision detector.

use serde::{Deserialize, Serialize};

use super::Point3;

/// Physical size class of a detected plate.
///
/// Carried through for the downstream solver; the tracker itself only
/// uses the detection id and pose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlateType {
    Small,
    Large,
}

/// One detected armor plate, already transformed into the world frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArmorObservation {
    /// Robot identity string from the detector ("1".."7", "guard", ...)
    pub id: String,
    /// Plate center position in the world frame (meters)
    pub position: Point3,
    /// Plate facing yaw in the world frame (radians, principal branch)
    pub yaw: f64,
    /// Plate size class
    pub plate_type: PlateType,
}

impl ArmorObservation {
    pub fn new(id: impl Into<String>, position: Point3, yaw: f64, plate_type: PlateType) -> Self {
        Self {
            id: id.into(),
            position,
            yaw,
            plate_type,
        }
    }
}

/// One detector frame: a batch of plate observations sharing a stamp.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArmorFrame {
    /// Timestamp in microseconds since epoch
    pub timestamp_us: u64,
    /// Frame the poses are expressed in
    pub frame_id: String,
    /// Detected plates, zero or more
    pub armors: Vec<ArmorObservation>,
}

impl ArmorFrame {
    pub fn new(timestamp_us: u64, frame_id: impl Into<String>) -> Self {
        Self {
            timestamp_us,
            frame_id: frame_id.into(),
            armors: Vec::new(),
        }
    }
}
