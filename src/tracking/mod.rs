//! Target tracking: plate geometry and the track lifecycle machine.

pub mod geometry;
mod tracker;

pub use geometry::{armor_count, best_match, predicted_plates, PlateEstimate, PlateMatch};
pub use tracker::{Tracker, TrackerConfig, TrackerState};
