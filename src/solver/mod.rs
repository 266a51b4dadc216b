//! Downstream seam: target publication and the gimbal command.
//!
//! The ballistic solver itself lives outside this crate; only its input
//! contract is fixed here. The facade turns the tracker's state into the
//! published [`TargetSnapshot`] and guards the solver call so a solver
//! failure can never take the aiming loop down: whatever goes wrong, a
//! neutral command goes out.

use log::warn;
use thiserror::Error;

use crate::core::types::{GimbalCommand, Point3, TargetSnapshot};
use crate::estimation::state;
use crate::tracking::Tracker;

/// Failure inside a ballistic solver implementation.
#[derive(Error, Debug)]
#[error("{0}")]
pub struct SolverError(pub String);

/// Converts a tracked target into a gimbal aim and fire decision.
///
/// Implementations receive the snapshot and the current time and may fail
/// freely; the facade maps every failure to the neutral command.
pub trait BallisticSolver {
    fn solve(
        &mut self,
        target: &TargetSnapshot,
        now_us: u64,
    ) -> Result<GimbalCommand, SolverError>;
}

/// Thin adapter between the tracker and the ballistic solver.
pub struct SolverFacade {
    solver: Box<dyn BallisticSolver>,
}

impl SolverFacade {
    pub fn new(solver: Box<dyn BallisticSolver>) -> Self {
        Self { solver }
    }

    /// Build the published snapshot for this tick.
    ///
    /// Carries the full state while the tracker is tracking or coasting;
    /// otherwise `tracking = false` with a zeroed payload.
    pub fn snapshot(
        &self,
        tracker: &Tracker,
        timestamp_us: u64,
        frame_id: &str,
    ) -> TargetSnapshot {
        if !tracker.is_tracking() {
            return TargetSnapshot::untracked(timestamp_us, frame_id);
        }

        let x = tracker.target_state();
        TargetSnapshot {
            timestamp_us,
            frame_id: frame_id.to_string(),
            tracking: true,
            id: tracker.tracked_id().to_string(),
            armors_num: tracker.armors_num(),
            position: Point3::new(x[state::XC], x[state::YC], x[state::ZA]),
            velocity: Point3::new(x[state::VXC], x[state::VYC], x[state::VZA]),
            yaw: x[state::YAW],
            v_yaw: x[state::VYAW],
            radius_1: x[state::R],
            radius_2: tracker.another_r(),
            dz: tracker.dz(),
        }
    }

    /// Run the solver for this tick.
    ///
    /// Emits the neutral command when there is nothing to aim at or when
    /// the solver fails.
    pub fn command(&mut self, target: &TargetSnapshot, now_us: u64) -> GimbalCommand {
        if !target.tracking {
            return GimbalCommand::neutral();
        }
        match self.solver.solve(target, now_us) {
            Ok(cmd) => cmd,
            Err(e) => {
                warn!("solver failed, emitting neutral command: {e}");
                GimbalCommand::neutral()
            }
        }
    }
}

/// Reference solver that points straight at the estimated robot center.
///
/// Used by the replay tool and the tests; a real ballistic solver (bullet
/// drop, flight-time lead, spin compensation) replaces this behind the
/// same trait.
#[derive(Debug)]
pub struct DirectAimSolver {
    /// Fire gate on the yaw correction (radians)
    pub fire_yaw_gate: f64,
}

impl DirectAimSolver {
    pub fn new() -> Self {
        Self {
            fire_yaw_gate: 0.02,
        }
    }
}

impl Default for DirectAimSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl BallisticSolver for DirectAimSolver {
    fn solve(
        &mut self,
        target: &TargetSnapshot,
        _now_us: u64,
    ) -> Result<GimbalCommand, SolverError> {
        let p = &target.position;
        let horizontal = (p.x * p.x + p.y * p.y).sqrt();
        let distance = (horizontal * horizontal + p.z * p.z).sqrt();
        if distance <= f64::EPSILON {
            return Err(SolverError("target at the gimbal origin".into()));
        }

        let yaw_diff = p.y.atan2(p.x);
        let pitch_diff = p.z.atan2(horizontal);
        Ok(GimbalCommand {
            yaw_diff,
            pitch_diff,
            distance,
            fire_advice: yaw_diff.abs() < self.fire_yaw_gate,
        })
    }
}
