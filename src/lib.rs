//! Lakshya - target tracking and aiming core for a turret combat robot.
//!
//! Consumes a stream of armor-plate detections produced by an upstream
//! vision detector, fuses them into a smoothed estimate of one enemy
//! robot's motion, and emits a target snapshot plus a gimbal command for
//! the downstream ballistic solver. Works under partial detection (plates
//! occlude and reappear as the enemy rotates), detection noise, and
//! variable frame cadence.
//!
//! # Architecture
//!
//! The crate is organized into 5 logical layers:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                      bin/                           │  ← Executables
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                      io/                            │  ← Infrastructure
//! │               (pipeline, replay)                    │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │              tracking/ + solver/                    │  ← Orchestration
//! │        (track FSM, geometry, solver seam)           │
//! └─────────────────────────────────────────────────────┘
//! ┌─────────────────────────────────────────────────────┐
//! │                  estimation/                        │  ← Core algorithms
//! │              (EKF, motion model)                    │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                     core/                           │  ← Foundation
//! │                 (types, math)                       │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Data flow per tick
//!
//! ```text
//! (detections, stamp) → frame transform → Tracker::step
//!                     → target snapshot → ballistic solver → gimbal command
//! ```
//!
//! The tracked robot is modeled as a spinning platform carrying 2-4 armor
//! plates; a 9-state extended Kalman filter estimates its center, yaw and
//! plate radius from whichever single plate is currently visible, and a
//! four-state lifecycle machine governs detection, confirmation,
//! coasting and loss.

// ============================================================================
// Layer 1: Core foundation (no internal deps)
// ============================================================================
pub mod core;

// ============================================================================
// Layer 2: State estimation (depends on core)
// ============================================================================
pub mod estimation;

// ============================================================================
// Layer 3: Tracking and the solver seam (depends on core, estimation)
// ============================================================================
pub mod solver;
pub mod tracking;

// ============================================================================
// Layer 4: I/O infrastructure (depends on all layers)
// ============================================================================
pub mod io;

// ============================================================================
// Cross-cutting: configuration and errors
// ============================================================================
pub mod config;
pub mod error;

// ============================================================================
// Convenience re-exports (flat namespace for common use)
// ============================================================================

pub use config::AimConfig;
pub use error::{AimError, Result};

pub use core::math;
pub use core::types::{
    ArmorFrame, ArmorObservation, GimbalCommand, Measurement, PlateType, Point3, TargetSnapshot,
};

pub use estimation::{
    build_robot_ekf, DtHandle, EkfConfig, ExtendedKalmanFilter, FilterError, PlateMeasurement,
    RobotEkf, RobotState,
};

pub use tracking::{armor_count, predicted_plates, Tracker, TrackerConfig, TrackerState};

pub use solver::{BallisticSolver, DirectAimSolver, SolverError, SolverFacade};

pub use io::{AimPipeline, FrameTransformer, IdentityTransform, PipelineStats, TickOutput};
