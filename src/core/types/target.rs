//! Published output payloads: measurement, target snapshot, gimbal command.

use serde::{Deserialize, Serialize};

use super::Point3;

/// The 4-vector fed to the last filter update.
///
/// Published every tick the tracker is not lost, mainly for offline
/// filter tuning.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Measurement {
    /// Timestamp in microseconds since epoch
    pub timestamp_us: u64,
    /// Observed plate x (meters)
    pub x: f64,
    /// Observed plate y (meters)
    pub y: f64,
    /// Observed plate z (meters)
    pub z: f64,
    /// Observed plate yaw, unwrapped onto the filter's branch (radians)
    pub yaw: f64,
}

/// Smoothed whole-robot target estimate, published every tick.
///
/// Fields beyond `tracking` are meaningful only when `tracking` is true.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TargetSnapshot {
    /// Timestamp in microseconds since epoch
    pub timestamp_us: u64,
    /// World frame the estimate is expressed in
    pub frame_id: String,
    /// Whether a confirmed track backs this snapshot
    pub tracking: bool,
    /// Tracked robot identity
    pub id: String,
    /// Plate count of the tracked robot (2, 3 or 4)
    pub armors_num: u32,
    /// Robot center position; z is the currently observed plate height (meters)
    pub position: Point3,
    /// Robot center velocity (m/s)
    pub velocity: Point3,
    /// Yaw of the currently observed plate, continuous (radians)
    pub yaw: f64,
    /// Yaw rate (rad/s)
    pub v_yaw: f64,
    /// Radius from center to the currently observed plate (meters)
    pub radius_1: f64,
    /// Radius of the alternate plate pair (meters)
    pub radius_2: f64,
    /// Height offset of the alternate plate pair (meters)
    pub dz: f64,
}

impl TargetSnapshot {
    /// Snapshot with `tracking = false` and a zeroed payload.
    pub fn untracked(timestamp_us: u64, frame_id: impl Into<String>) -> Self {
        Self {
            timestamp_us,
            frame_id: frame_id.into(),
            ..Default::default()
        }
    }
}

/// Aim correction and fire decision for the gimbal servo controller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GimbalCommand {
    /// Yaw correction relative to the current gimbal heading (radians)
    pub yaw_diff: f64,
    /// Pitch correction relative to the current gimbal elevation (radians)
    pub pitch_diff: f64,
    /// Line-of-sight distance to the aim point (meters); -1 when inactive
    pub distance: f64,
    /// Whether firing now is advised
    pub fire_advice: bool,
}

impl GimbalCommand {
    /// The inactive command: hold the gimbal, do not fire.
    pub fn neutral() -> Self {
        Self {
            yaw_diff: 0.0,
            pitch_diff: 0.0,
            distance: -1.0,
            fire_advice: false,
        }
    }
}

impl Default for GimbalCommand {
    fn default() -> Self {
        Self::neutral()
    }
}
