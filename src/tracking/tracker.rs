//! Track lifecycle and measurement association.
//!
//! Wraps the whole-robot filter with the state machine that decides when
//! a track exists, which detected plate feeds the filter, and when the
//! track is dropped.
//!
//! # State Machine
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                                                            │
//! │   ┌──────┐          ┌───────────┐          ┌──────────┐    │
//! │   │ Lost │──init───▶│ Detecting │──thres──▶│ Tracking │    │
//! │   │      │◀──miss───│           │          │          │    │
//! │   └──────┘          └───────────┘          └──────────┘    │
//! │      ▲                                       │     ▲       │
//! │      │ lost_count > lost_thres          miss │     │ match │
//! │      │                                       ▼     │       │
//! │      │                                 ┌───────────┐       │
//! │      └─────────────────────────────────│ TempLost  │       │
//! │                                        └───────────┘       │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Association
//!
//! Each tick the filter predicts forward and the detections carrying the
//! tracked id are compared against all predicted plates. A hit on plate 0
//! within the yaw gate is a plain correction. A hit on another plate (or
//! a discontinuous yaw) means the enemy rotated far enough that a
//! neighboring plate took over: the two-radius, two-height geometry is
//! swapped before the correction so the radius does not oscillate across
//! the handover. Anything outside the distance gate is a miss.

use log::{debug, info, warn};
use serde::Deserialize;

use crate::core::math::unwrap_angle;
use crate::core::types::{ArmorFrame, ArmorObservation, Point3};
use crate::estimation::{
    build_robot_ekf, state, DtHandle, EkfConfig, PlateMeasurement, RobotEkf, RobotState,
};
use crate::tracking::geometry::{self, PlateMatch};

/// Hard bounds on the estimated plate radius (meters).
const MIN_PLATE_RADIUS: f64 = 0.12;
const MAX_PLATE_RADIUS: f64 = 0.40;
/// Radius a fresh track starts from (meters).
const INITIAL_PLATE_RADIUS: f64 = 0.26;

/// Track lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackerState {
    /// No track; waiting for an acceptable observation.
    #[default]
    Lost,
    /// Track initialized, accumulating confirmation frames.
    Detecting,
    /// Confirmed track with fresh corrections.
    Tracking,
    /// Confirmed track coasting on prediction.
    TempLost,
}

/// Configuration for the tracker.
#[derive(Debug, Clone, Deserialize)]
pub struct TrackerConfig {
    /// Association gate between an observation and a predicted plate (meters).
    /// Default: 0.2
    #[serde(default = "default_max_match_distance")]
    pub max_match_distance: f64,

    /// Yaw gate separating a same-plate correction from an armor jump (radians).
    /// Default: 1.0
    #[serde(default = "default_max_match_yaw_diff")]
    pub max_match_yaw_diff: f64,

    /// Consecutive associated frames needed to confirm a track.
    /// Default: 5
    #[serde(default = "default_tracking_thres")]
    pub tracking_thres: u32,

    /// Time budget a confirmed track may coast before it is dropped (seconds).
    /// Default: 0.3
    #[serde(default = "default_lost_time_thres")]
    pub lost_time_thres: f64,
}

// Default value functions
fn default_max_match_distance() -> f64 {
    0.2
}
fn default_max_match_yaw_diff() -> f64 {
    1.0
}
fn default_tracking_thres() -> u32 {
    5
}
fn default_lost_time_thres() -> f64 {
    0.3
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_match_distance: default_max_match_distance(),
            max_match_yaw_diff: default_max_match_yaw_diff(),
            tracking_thres: default_tracking_thres(),
            lost_time_thres: default_lost_time_thres(),
        }
    }
}

/// Single-target tracker: filter plus track lifecycle.
///
/// Stateful and not re-entrant; one `step` completes before the next
/// begins (the detection stream drives it).
pub struct Tracker {
    config: TrackerConfig,
    ekf: RobotEkf,
    dt: DtHandle,

    state: TrackerState,
    /// Identity locked at init; immutable for the life of the track
    tracked_id: String,
    /// Plate count of the tracked robot (2, 3 or 4)
    tracked_armors_num: u32,
    /// Published state: posterior after a correction, prediction otherwise
    target_state: RobotState,
    /// The 4-vector fed to the most recent correction
    measurement: PlateMeasurement,
    /// Radius of the alternate plate pair (4-plate robots)
    another_r: f64,
    /// Height offset of the alternate plate pair (4-plate robots)
    dz: f64,
    /// Posterior yaw at the last correction, for unwrapping
    last_yaw: f64,

    detect_count: u32,
    lost_count: u32,
    /// Frame count equivalent of `lost_time_thres`, recomputed per tick
    lost_thres: u32,
}

impl Tracker {
    /// Create a tracker in the `Lost` state.
    pub fn new(config: TrackerConfig, ekf_config: &EkfConfig) -> Self {
        let dt = DtHandle::new(0.0);
        let ekf = build_robot_ekf(ekf_config, &dt);
        Self {
            config,
            ekf,
            dt,
            state: TrackerState::Lost,
            tracked_id: String::new(),
            tracked_armors_num: 4,
            target_state: RobotState::zeros(),
            measurement: PlateMeasurement::zeros(),
            another_r: INITIAL_PLATE_RADIUS,
            dz: 0.0,
            last_yaw: 0.0,
            detect_count: 0,
            lost_count: 0,
            lost_thres: 0,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TrackerState {
        self.state
    }

    /// Whether a confirmed track backs the published state.
    pub fn is_tracking(&self) -> bool {
        matches!(self.state, TrackerState::Tracking | TrackerState::TempLost)
    }

    /// Identity locked at init.
    pub fn tracked_id(&self) -> &str {
        &self.tracked_id
    }

    /// Plate count of the tracked robot.
    pub fn armors_num(&self) -> u32 {
        self.tracked_armors_num
    }

    /// Published robot state (posterior, or prediction while coasting).
    pub fn target_state(&self) -> &RobotState {
        &self.target_state
    }

    /// The 4-vector fed to the most recent correction.
    pub fn measurement(&self) -> &PlateMeasurement {
        &self.measurement
    }

    /// Radius of the alternate plate pair.
    pub fn another_r(&self) -> f64 {
        self.another_r
    }

    /// Height offset of the alternate plate pair.
    pub fn dz(&self) -> f64 {
        self.dz
    }

    /// Set the tick interval and recompute the coasting frame budget.
    ///
    /// Must be called before `step` on every tick the tracker is not
    /// `Lost` (the caller derives dt from successive frame stamps).
    pub fn set_dt(&mut self, dt: f64) {
        self.dt.set(dt);
        self.lost_thres = (self.config.lost_time_thres / dt).abs() as u32;
    }

    /// Process one detector frame.
    pub fn step(&mut self, frame: &ArmorFrame) {
        match self.state {
            TrackerState::Lost => self.init(frame),
            _ => self.update(frame),
        }
    }

    /// Start a track from the observation closest to the origin.
    ///
    /// Accepts unconditionally given any observation; transitions to
    /// `Detecting`.
    pub fn init(&mut self, frame: &ArmorFrame) {
        let Some(armor) = frame
            .armors
            .iter()
            .min_by(|a, b| a.position.norm().total_cmp(&b.position.norm()))
        else {
            return;
        };

        self.tracked_id = armor.id.clone();
        self.tracked_armors_num = geometry::armor_count(&armor.id);
        self.another_r = INITIAL_PLATE_RADIUS;
        self.dz = 0.0;
        self.detect_count = 0;
        self.lost_count = 0;
        self.seed_filter(armor);
        self.state = TrackerState::Detecting;
        info!(
            "tracker: new track on id '{}' ({} plates)",
            self.tracked_id, self.tracked_armors_num
        );
    }

    /// Predict, associate and correct for one frame; drive the FSM.
    fn update(&mut self, frame: &ArmorFrame) {
        let prediction = self.ekf.predict();
        self.target_state = prediction;

        let matched = match self.associate(frame, &prediction) {
            Some((armor, plate)) => {
                let yaw = unwrap_angle(self.last_yaw, armor.yaw);
                let yaw_diff = (yaw - prediction[state::YAW]).abs();
                if plate.index != 0 || yaw_diff >= self.config.max_match_yaw_diff {
                    // A different plate took over as the current one
                    self.handle_armor_jump(armor, yaw);
                }
                self.apply_update(armor, yaw)
            }
            None => false,
        };

        self.clamp_radius();
        if matched {
            self.last_yaw = self.target_state[state::YAW];
        }

        self.transition(matched);
    }

    /// Gate the frame's same-id observations against the predicted plates.
    ///
    /// Returns the globally closest (observation, plate) pair if it passes
    /// the distance gate.
    fn associate<'a>(
        &self,
        frame: &'a ArmorFrame,
        prediction: &RobotState,
    ) -> Option<(&'a ArmorObservation, PlateMatch)> {
        let mut best: Option<(&ArmorObservation, PlateMatch)> = None;
        for armor in frame.armors.iter().filter(|a| a.id == self.tracked_id) {
            let Some(plate) = geometry::best_match(
                &armor.position,
                prediction,
                self.tracked_armors_num,
                self.another_r,
                self.dz,
            ) else {
                continue;
            };
            if best.as_ref().map_or(true, |(_, b)| plate.distance < b.distance) {
                best = Some((armor, plate));
            }
        }

        match best {
            Some((armor, plate)) if plate.distance < self.config.max_match_distance => {
                Some((armor, plate))
            }
            Some((_, plate)) => {
                debug!(
                    "tracker: nearest plate {:.3} m from observation, gate is {:.3} m",
                    plate.distance, self.config.max_match_distance
                );
                None
            }
            None => None,
        }
    }

    /// Correct the filter with the observation; a numerical failure rolls
    /// back to the prediction and counts as a miss.
    fn apply_update(&mut self, armor: &ArmorObservation, yaw: f64) -> bool {
        let p = armor.position;
        let z = PlateMeasurement::new(p.x, p.y, p.z, yaw);
        self.measurement = z;
        match self.ekf.update(&z) {
            Ok(posterior) => {
                self.target_state = posterior;
                true
            }
            Err(e) => {
                warn!("tracker: measurement rejected ({e})");
                self.target_state = *self.ekf.state();
                false
            }
        }
    }

    /// Rewrite the filter state so the observed plate becomes the current
    /// (index 0) reference.
    ///
    /// For 4-plate robots the radius and height pairs are swapped, keeping
    /// `dz` a stable per-robot constant with alternating sign. If even the
    /// swapped geometry cannot explain the observation the filter has
    /// diverged and the center is re-seeded from the observation.
    fn handle_armor_jump(&mut self, armor: &ArmorObservation, yaw: f64) {
        self.target_state[state::YAW] = yaw;
        if self.tracked_armors_num == 4 {
            self.dz = self.target_state[state::ZA] - armor.position.z;
            self.target_state[state::ZA] = armor.position.z;
            std::mem::swap(&mut self.target_state[state::R], &mut self.another_r);
        }
        debug!("tracker: armor jump to yaw {:.2} rad", yaw);

        let r = self.target_state[state::R];
        let inferred = Point3::new(
            self.target_state[state::XC] - r * yaw.cos(),
            self.target_state[state::YC] - r * yaw.sin(),
            self.target_state[state::ZA],
        );
        if inferred.distance(&armor.position) > self.config.max_match_distance {
            warn!("tracker: state diverged, re-seeding center from observation");
            let p = armor.position;
            self.target_state[state::XC] = p.x + r * yaw.cos();
            self.target_state[state::VXC] = 0.0;
            self.target_state[state::YC] = p.y + r * yaw.sin();
            self.target_state[state::VYC] = 0.0;
            self.target_state[state::ZA] = p.z;
            self.target_state[state::VZA] = 0.0;
        }

        self.ekf.set_state(&self.target_state);
    }

    /// Seed the filter from a single observation: center one initial
    /// radius behind the plate, all velocities zero.
    fn seed_filter(&mut self, armor: &ArmorObservation) {
        let p = armor.position;
        let yaw = armor.yaw;
        let mut x = RobotState::zeros();
        x[state::XC] = p.x + INITIAL_PLATE_RADIUS * yaw.cos();
        x[state::YC] = p.y + INITIAL_PLATE_RADIUS * yaw.sin();
        x[state::ZA] = p.z;
        x[state::YAW] = yaw;
        x[state::R] = INITIAL_PLATE_RADIUS;

        self.ekf.set_state(&x);
        self.target_state = x;
        self.last_yaw = yaw;
    }

    /// Keep the estimated radius inside its physical bounds.
    fn clamp_radius(&mut self) {
        let r = self.target_state[state::R];
        let clamped = r.clamp(MIN_PLATE_RADIUS, MAX_PLATE_RADIUS);
        if clamped != r {
            self.target_state[state::R] = clamped;
            self.ekf.set_state(&self.target_state);
        }
    }

    /// All lifecycle transitions live here.
    fn transition(&mut self, matched: bool) {
        match self.state {
            TrackerState::Detecting => {
                if matched {
                    self.detect_count += 1;
                    if self.detect_count >= self.config.tracking_thres {
                        self.detect_count = 0;
                        self.state = TrackerState::Tracking;
                        info!("tracker: track on '{}' confirmed", self.tracked_id);
                    }
                } else {
                    self.detect_count = 0;
                    self.state = TrackerState::Lost;
                    debug!("tracker: candidate track dropped before confirmation");
                }
            }
            TrackerState::Tracking => {
                if !matched {
                    self.state = TrackerState::TempLost;
                    self.lost_count = 1;
                    debug!("tracker: target out of view, coasting");
                }
            }
            TrackerState::TempLost => {
                if matched {
                    self.lost_count = 0;
                    self.state = TrackerState::Tracking;
                } else {
                    self.lost_count += 1;
                    if self.lost_count > self.lost_thres {
                        self.lost_count = 0;
                        self.state = TrackerState::Lost;
                        warn!(
                            "tracker: track on '{}' lost after coasting past {:.2} s",
                            self.tracked_id, self.config.lost_time_thres
                        );
                    }
                }
            }
            // Lost never reaches update()
            TrackerState::Lost => {}
        }
    }
}
