//! Per-tick wiring of the aiming core.
//!
//! One `step` per detector frame, single-threaded, driven by the incoming
//! stream:
//!
//! 1. Transform the frame into the target frame (external collaborator;
//!    failure drops the tick).
//! 2. Discard abnormal observations (|z| > 2 m, non-finite yaw).
//! 3. Drive the tracker: init when lost, otherwise dt bookkeeping and a
//!    predict/associate/correct step.
//! 4. Publish the measurement, the target snapshot and a gimbal command.
//!
//! Every error is tick-local: a dropped tick leaves the tracker exactly
//! as it was.

use log::warn;

use crate::config::AimConfig;
use crate::core::types::{ArmorFrame, GimbalCommand, Measurement, TargetSnapshot};
use crate::error::{AimError, Result};
use crate::solver::{BallisticSolver, SolverFacade};
use crate::tracking::{Tracker, TrackerState};

/// Observations farther than this from the ground plane are detector
/// artifacts (meters).
const MAX_OBSERVATION_Z: f64 = 2.0;

/// External frame-transform collaborator.
///
/// Rewrites the frame's poses into `target_frame`. May block up to its own
/// bounded timeout; an error fails the whole tick.
pub trait FrameTransformer {
    fn transform(&self, frame: &ArmorFrame, target_frame: &str) -> Result<ArmorFrame>;
}

/// Transformer for streams already expressed in the target frame.
#[derive(Debug, Default)]
pub struct IdentityTransform;

impl FrameTransformer for IdentityTransform {
    fn transform(&self, frame: &ArmorFrame, target_frame: &str) -> Result<ArmorFrame> {
        let mut out = frame.clone();
        out.frame_id = target_frame.to_string();
        Ok(out)
    }
}

/// Everything one tick publishes.
#[derive(Debug, Clone)]
pub struct TickOutput {
    /// The filter input, present whenever the tracker was not lost
    pub measurement: Option<Measurement>,
    /// Target snapshot, published every tick
    pub target: TargetSnapshot,
    /// Gimbal command, published every tick (neutral when not tracking)
    pub gimbal: GimbalCommand,
}

/// Running counters for diagnostics.
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineStats {
    /// Ticks that reached the tracker
    pub ticks: u64,
    /// Ticks dropped before the tracker (transform failure, bad stamps)
    pub dropped_ticks: u64,
}

/// The aiming core, end to end: transform seam, tracker, solver facade.
pub struct AimPipeline {
    config: AimConfig,
    tracker: Tracker,
    facade: SolverFacade,
    transformer: Box<dyn FrameTransformer>,
    last_stamp_us: Option<u64>,
    stats: PipelineStats,
}

impl AimPipeline {
    pub fn new(
        config: AimConfig,
        transformer: Box<dyn FrameTransformer>,
        solver: Box<dyn BallisticSolver>,
    ) -> Self {
        let tracker = Tracker::new(config.tracker.clone(), &config.ekf);
        Self {
            config,
            tracker,
            facade: SolverFacade::new(solver),
            transformer,
            last_stamp_us: None,
            stats: PipelineStats::default(),
        }
    }

    /// The wrapped tracker, for state inspection.
    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    /// Diagnostics counters.
    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    /// Process one detector frame.
    ///
    /// An `Err` means the tick was dropped and the tracker is unchanged.
    pub fn step(&mut self, frame: &ArmorFrame) -> Result<TickOutput> {
        let mut frame = match self
            .transformer
            .transform(frame, &self.config.target_frame)
        {
            Ok(frame) => frame,
            Err(e) => {
                self.stats.dropped_ticks += 1;
                warn!("dropping tick: {e}");
                return Err(e);
            }
        };

        frame
            .armors
            .retain(|a| a.position.z.abs() <= MAX_OBSERVATION_Z && a.yaw.is_finite());

        let stamp = frame.timestamp_us;
        let mut measurement = None;

        if self.tracker.state() == TrackerState::Lost {
            self.tracker.step(&frame);
        } else {
            let dt_s = match self.last_stamp_us {
                Some(last) => (stamp as f64 - last as f64) / 1_000_000.0,
                None => 0.0,
            };
            if dt_s <= 0.0 {
                self.stats.dropped_ticks += 1;
                warn!("dropping tick with non-monotonic stamp (dt = {dt_s} s)");
                return Err(AimError::NonMonotonicStamp { dt_s });
            }
            self.tracker.set_dt(dt_s);
            self.tracker.step(&frame);

            let m = self.tracker.measurement();
            measurement = Some(Measurement {
                timestamp_us: stamp,
                x: m[0],
                y: m[1],
                z: m[2],
                yaw: m[3],
            });
        }

        self.last_stamp_us = Some(stamp);
        self.stats.ticks += 1;

        let target = self.facade.snapshot(&self.tracker, stamp, &self.config.target_frame);
        let gimbal = self.facade.command(&target, stamp);
        Ok(TickOutput {
            measurement,
            target,
            gimbal,
        })
    }
}
