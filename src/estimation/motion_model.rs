//! Whole-robot motion model for the 9-state tracking filter.
//!
//! The enemy robot is modeled as a platform translating with constant
//! velocity and spinning about its vertical axis, carrying plates at a
//! horizontal radius from the center. The filter state describes the
//! *currently observed* plate:
//!
//! ```text
//! index  0    1    2    3    4   5    6    7     8
//! state  xc   vxc  yc   vyc  za  vza  yaw  vyaw  r
//! ```
//!
//! The observation is the detected plate pose `(xa, ya, za, yaw)`, related
//! to the state by
//!
//! ```text
//! xa = xc − r·cos(yaw)     ya = yc − r·sin(yaw)
//! ```
//!
//! Constant velocity in the four (position, velocity) pairs; the radius is
//! a random walk. Process noise is built from per-axis spectral densities
//! and the tick interval; measurement noise scales the x/y/z rows with the
//! measured coordinates so far-away poses are trusted less.

use std::cell::Cell;
use std::rc::Rc;

use nalgebra::{SMatrix, SVector};
use serde::Deserialize;

use super::ekf::{ExtendedKalmanFilter, MeasMat, StateMat};

/// Indices into the 9-entry robot state vector.
pub mod state {
    pub const XC: usize = 0;
    pub const VXC: usize = 1;
    pub const YC: usize = 2;
    pub const VYC: usize = 3;
    pub const ZA: usize = 4;
    pub const VZA: usize = 5;
    pub const YAW: usize = 6;
    pub const VYAW: usize = 7;
    pub const R: usize = 8;
}

/// The tracking filter: 9 states, 4 measurement components.
pub type RobotEkf = ExtendedKalmanFilter<9, 4>;
/// Robot state vector.
pub type RobotState = SVector<f64, 9>;
/// Plate measurement vector `(xa, ya, za, yaw)`.
pub type PlateMeasurement = SVector<f64, 4>;

/// Tick interval shared between the tracker and the noise provider.
///
/// The tracker writes the frame-to-frame dt once per tick before
/// `predict`; the process hooks captured by the filter read it. The
/// tracker is single-threaded by contract, so a `Rc<Cell<_>>` is all the
/// sharing this needs.
#[derive(Debug, Clone)]
pub struct DtHandle(Rc<Cell<f64>>);

impl DtHandle {
    pub fn new(dt: f64) -> Self {
        Self(Rc::new(Cell::new(dt)))
    }

    #[inline]
    pub fn set(&self, dt: f64) {
        self.0.set(dt);
    }

    #[inline]
    pub fn get(&self) -> f64 {
        self.0.get()
    }
}

/// Filter noise configuration.
///
/// The sigma2 values are per-axis process spectral densities; the r
/// values are measurement noise coefficients (x/y/z are scaled by the
/// magnitude of the measured coordinate, yaw is absolute).
#[derive(Debug, Clone, Deserialize)]
pub struct EkfConfig {
    /// Process density along world x ((m/s²)² s) (default: 20.0)
    #[serde(default = "default_sigma2_q_x")]
    pub sigma2_q_x: f64,

    /// Process density along world y (default: 20.0)
    #[serde(default = "default_sigma2_q_y")]
    pub sigma2_q_y: f64,

    /// Process density along world z (default: 20.0)
    #[serde(default = "default_sigma2_q_z")]
    pub sigma2_q_z: f64,

    /// Process density for plate yaw ((rad/s²)² s) (default: 100.0)
    #[serde(default = "default_sigma2_q_yaw")]
    pub sigma2_q_yaw: f64,

    /// Process density for the plate radius random walk (default: 800.0)
    #[serde(default = "default_sigma2_q_r")]
    pub sigma2_q_r: f64,

    /// Measurement noise coefficient for xa, scaled by |xa| (default: 0.05)
    #[serde(default = "default_r_x")]
    pub r_x: f64,

    /// Measurement noise coefficient for ya, scaled by |ya| (default: 0.05)
    #[serde(default = "default_r_y")]
    pub r_y: f64,

    /// Measurement noise coefficient for za, scaled by |za| (default: 0.05)
    #[serde(default = "default_r_z")]
    pub r_z: f64,

    /// Measurement noise for yaw (rad²) (default: 0.02)
    #[serde(default = "default_r_yaw")]
    pub r_yaw: f64,
}

// Default value functions
fn default_sigma2_q_x() -> f64 {
    20.0
}
fn default_sigma2_q_y() -> f64 {
    20.0
}
fn default_sigma2_q_z() -> f64 {
    20.0
}
fn default_sigma2_q_yaw() -> f64 {
    100.0
}
fn default_sigma2_q_r() -> f64 {
    800.0
}
fn default_r_x() -> f64 {
    0.05
}
fn default_r_y() -> f64 {
    0.05
}
fn default_r_z() -> f64 {
    0.05
}
fn default_r_yaw() -> f64 {
    0.02
}

impl Default for EkfConfig {
    fn default() -> Self {
        Self {
            sigma2_q_x: default_sigma2_q_x(),
            sigma2_q_y: default_sigma2_q_y(),
            sigma2_q_z: default_sigma2_q_z(),
            sigma2_q_yaw: default_sigma2_q_yaw(),
            sigma2_q_r: default_sigma2_q_r(),
            r_x: default_r_x(),
            r_y: default_r_y(),
            r_z: default_r_z(),
            r_yaw: default_r_yaw(),
        }
    }
}

/// Build the tracking filter from the noise configuration and the shared
/// tick interval. P₀ is identity.
pub fn build_robot_ekf(config: &EkfConfig, dt: &DtHandle) -> RobotEkf {
    use state::*;

    // f - constant velocity on the four (position, velocity) pairs
    let f = {
        let dt = dt.clone();
        Box::new(move |x: &RobotState| {
            let t = dt.get();
            let mut x_new = *x;
            x_new[XC] += x[VXC] * t;
            x_new[YC] += x[VYC] * t;
            x_new[ZA] += x[VZA] * t;
            x_new[YAW] += x[VYAW] * t;
            x_new
        })
    };

    // J_f - block constant-velocity matrix, identity on r
    let jacobian_f = {
        let dt = dt.clone();
        Box::new(move |_: &RobotState| {
            let t = dt.get();
            let mut m = StateMat::<9>::identity();
            m[(XC, VXC)] = t;
            m[(YC, VYC)] = t;
            m[(ZA, VZA)] = t;
            m[(YAW, VYAW)] = t;
            m
        })
    };

    // h - plate pose from robot state
    let h = Box::new(|x: &RobotState| {
        let (yaw, r) = (x[YAW], x[R]);
        SVector::<f64, 4>::new(
            x[XC] - r * yaw.cos(), // xa
            x[YC] - r * yaw.sin(), // ya
            x[ZA],                 // za
            yaw,
        )
    });

    // J_h
    let jacobian_h = Box::new(|x: &RobotState| {
        let (yaw, r) = (x[YAW], x[R]);
        let (sin_yaw, cos_yaw) = yaw.sin_cos();
        let mut m = SMatrix::<f64, 4, 9>::zeros();
        m[(0, XC)] = 1.0;
        m[(0, YAW)] = r * sin_yaw;
        m[(0, R)] = -cos_yaw;
        m[(1, YC)] = 1.0;
        m[(1, YAW)] = -r * cos_yaw;
        m[(1, R)] = -sin_yaw;
        m[(2, ZA)] = 1.0;
        m[(3, YAW)] = 1.0;
        m
    });

    // Q(dt) - white-noise-acceleration blocks per axis
    let update_q = {
        let dt = dt.clone();
        let (sx, sy, sz, syaw, sr) = (
            config.sigma2_q_x,
            config.sigma2_q_y,
            config.sigma2_q_z,
            config.sigma2_q_yaw,
            config.sigma2_q_r,
        );
        Box::new(move || {
            let t = dt.get();
            let (t2, t3, t4) = (t * t, t * t * t, t * t * t * t);
            let mut q = StateMat::<9>::zeros();
            for (pos, sigma2) in [(XC, sx), (YC, sy), (ZA, sz), (YAW, syaw)] {
                let vel = pos + 1;
                q[(pos, pos)] = t4 / 4.0 * sigma2;
                q[(pos, vel)] = t3 / 2.0 * sigma2;
                q[(vel, pos)] = t3 / 2.0 * sigma2;
                q[(vel, vel)] = t2 * sigma2;
            }
            q[(R, R)] = t4 / 4.0 * sr;
            q
        })
    };

    // R(z) - pose accuracy degrades with distance from the origin
    let update_r = {
        let (rx, ry, rz, ryaw) = (config.r_x, config.r_y, config.r_z, config.r_yaw);
        Box::new(move |z: &PlateMeasurement| {
            MeasMat::<4>::from_diagonal(&SVector::<f64, 4>::new(
                (rx * z[0]).abs(),
                (ry * z[1]).abs(),
                (rz * z[2]).abs(),
                ryaw,
            ))
        })
    };

    ExtendedKalmanFilter::new(
        f,
        h,
        jacobian_f,
        jacobian_h,
        update_q,
        update_r,
        StateMat::<9>::identity(),
    )
}
