//! Tracking Scenario Tests
//!
//! Synthetic detection streams to validate the aiming core end to end
//! without hardware. Covers:
//! - Cold start, confirmation and loss lifecycle
//! - Coasting on prediction while the target is out of view
//! - Plate handover on a spinning 4-plate robot
//! - Outlier gating and yaw continuity across the ±π seam
//!
//! Run with: `cargo test --test tracking_scenarios`

use approx::assert_relative_eq;
use lakshya_aim::estimation::state;
use lakshya_aim::{
    math, AimConfig, AimPipeline, ArmorFrame, ArmorObservation, DirectAimSolver,
    IdentityTransform, PlateType, Point3, TrackerState,
};
use std::f64::consts::PI;

// ============================================================================
// Test Helpers
// ============================================================================

fn pipeline() -> AimPipeline {
    AimPipeline::new(
        AimConfig::default(),
        Box::new(IdentityTransform),
        Box::new(DirectAimSolver::new()),
    )
}

fn frame(stamp_us: u64, observations: &[(&str, f64, f64, f64, f64)]) -> ArmorFrame {
    let mut f = ArmorFrame::new(stamp_us, "camera");
    for (id, x, y, z, yaw) in observations {
        f.armors.push(ArmorObservation::new(
            *id,
            Point3::new(*x, *y, *z),
            *yaw,
            PlateType::Small,
        ));
    }
    f
}

/// Ground truth for a 4-plate robot spinning while strafing.
struct SpinningRobot {
    xc0: f64,
    yc0: f64,
    za: f64,
    vx: f64,
    vy: f64,
    v_yaw: f64,
    r1: f64,
    r2: f64,
    dz: f64,
}

impl SpinningRobot {
    /// Detector view at time `t`: the plates roughly facing the turret.
    fn frame_at(&self, t: f64) -> ArmorFrame {
        let xc = self.xc0 + self.vx * t;
        let yc = self.yc0 + self.vy * t;
        let yaw = self.v_yaw * t;

        let mut f = ArmorFrame::new((t * 1e6) as u64, "camera");
        for i in 0..4 {
            let plate_yaw = yaw + i as f64 * PI / 2.0;
            if (plate_yaw - yc.atan2(xc)).cos() <= 0.45 {
                continue;
            }
            let (r, z) = if i % 2 == 0 {
                (self.r1, self.za)
            } else {
                (self.r2, self.za + self.dz)
            };
            f.armors.push(ArmorObservation::new(
                "3",
                Point3::new(xc - r * plate_yaw.cos(), yc - r * plate_yaw.sin(), z),
                math::normalize_angle(plate_yaw),
                PlateType::Small,
            ));
        }
        f
    }
}

/// Step identical frames at 100 Hz until the track confirms.
fn confirm(pipeline: &mut AimPipeline, obs: (&str, f64, f64, f64, f64)) -> u64 {
    let mut stamp = 10_000u64;
    pipeline.step(&frame(stamp, &[obs])).unwrap();
    assert_eq!(pipeline.tracker().state(), TrackerState::Detecting);
    while pipeline.tracker().state() == TrackerState::Detecting {
        stamp += 10_000;
        pipeline.step(&frame(stamp, &[obs])).unwrap();
    }
    assert_eq!(pipeline.tracker().state(), TrackerState::Tracking);
    stamp
}

// ============================================================================
// Scenario: Cold Start
// ============================================================================

#[test]
fn test_cold_start_initializes_track() {
    let mut pipeline = pipeline();
    let out = pipeline
        .step(&frame(10_000, &[("3", 1.0, 0.0, 0.1, 0.0)]))
        .unwrap();

    assert_eq!(pipeline.tracker().state(), TrackerState::Detecting);
    assert!(!out.target.tracking);
    assert!(out.measurement.is_none());
    assert_eq!(out.gimbal.distance, -1.0);

    let x = pipeline.tracker().target_state();
    // The seeded state explains the observed plate pose exactly
    assert_relative_eq!(x[state::XC] - x[state::R] * x[state::YAW].cos(), 1.0, epsilon = 1e-9);
    assert_relative_eq!(x[state::YC] - x[state::R] * x[state::YAW].sin(), 0.0, epsilon = 1e-9);
    assert_relative_eq!(x[state::ZA], 0.1, epsilon = 1e-9);
    assert_relative_eq!(x[state::R], 0.26, epsilon = 1e-9);
    assert_relative_eq!(x[state::YAW], 0.0, epsilon = 1e-9);
}

// ============================================================================
// Scenario: Confirmation
// ============================================================================

#[test]
fn test_confirmation_flips_tracking_flag() {
    let mut pipeline = pipeline();
    let obs = ("3", 1.0, 0.0, 0.1, 0.0);

    let mut stamp = 10_000u64;
    let out = pipeline.step(&frame(stamp, &[obs])).unwrap();
    assert!(!out.target.tracking, "init tick is not yet tracking");

    // Default tracking_thres = 5: four more updates stay unconfirmed...
    for _ in 0..4 {
        stamp += 10_000;
        let out = pipeline.step(&frame(stamp, &[obs])).unwrap();
        assert!(!out.target.tracking);
    }
    // ...the fifth confirms
    stamp += 10_000;
    let out = pipeline.step(&frame(stamp, &[obs])).unwrap();
    assert!(out.target.tracking);
    assert_eq!(out.target.id, "3");
    assert_eq!(out.target.armors_num, 4);
    assert!(out.gimbal.distance > 0.0);
}

// ============================================================================
// Scenario: Temp-Lost Coasting
// ============================================================================

#[test]
fn test_coasting_advances_by_velocity_then_drops() {
    let mut pipeline = pipeline();

    // A target translating at a constant 0.5 m/s along x, plate yaw fixed
    let mut stamp = 0u64;
    for tick in 0..80 {
        let t = tick as f64 * 0.01;
        stamp = (t * 1e6) as u64 + 10_000;
        pipeline
            .step(&frame(stamp, &[("3", 1.0 + 0.5 * t, 0.0, 0.1, 0.0)]))
            .unwrap();
    }
    assert_eq!(pipeline.tracker().state(), TrackerState::Tracking);
    let vxc = pipeline.tracker().target_state()[state::VXC];
    assert!(vxc > 0.3, "velocity should be learned, got {vxc}");

    // Target disappears: pure prediction, position advances by v·dt
    let mut lost_ticks = 0;
    loop {
        let before = *pipeline.tracker().target_state();
        stamp += 10_000;
        let out = pipeline.step(&frame(stamp, &[])).unwrap();
        if pipeline.tracker().state() == TrackerState::Lost {
            assert!(!out.target.tracking);
            break;
        }
        lost_ticks += 1;
        assert_eq!(pipeline.tracker().state(), TrackerState::TempLost);
        assert!(out.target.tracking, "coasting still publishes the track");

        let after = pipeline.tracker().target_state();
        assert_relative_eq!(
            after[state::XC],
            before[state::XC] + before[state::VXC] * 0.01,
            epsilon = 1e-9
        );
        assert_relative_eq!(after[state::VXC], before[state::VXC], epsilon = 1e-9);
        assert!(lost_ticks < 100, "track never dropped");
    }
    // lost_time_thres = 0.3 s at 100 Hz: 30 coasting frames, dropped on the 31st
    assert_eq!(lost_ticks, 30);
}

#[test]
fn test_reacquisition_during_coasting() {
    let mut pipeline = pipeline();
    let obs = ("3", 1.0, 0.0, 0.1, 0.0);
    let mut stamp = confirm(&mut pipeline, obs);

    stamp += 10_000;
    pipeline.step(&frame(stamp, &[])).unwrap();
    assert_eq!(pipeline.tracker().state(), TrackerState::TempLost);

    stamp += 10_000;
    let out = pipeline.step(&frame(stamp, &[obs])).unwrap();
    assert_eq!(pipeline.tracker().state(), TrackerState::Tracking);
    assert!(out.target.tracking);
}

// ============================================================================
// Scenario: Spinning Robot with Plate Handover
// ============================================================================

#[test]
fn test_spinning_robot_tracks_through_handovers() {
    let robot = SpinningRobot {
        xc0: 3.0,
        yc0: 0.5,
        za: 0.12,
        vx: 0.3,
        vy: -0.1,
        v_yaw: 2.0,
        r1: 0.25,
        r2: 0.27,
        dz: 0.045,
    };

    let mut pipeline = pipeline();
    let mut confirmed_at = None;
    // 6 seconds at 100 Hz: almost two full revolutions, eight handovers
    for tick in 0..600 {
        let t = tick as f64 * 0.01;
        let out = pipeline.step(&robot.frame_at(t)).unwrap();

        let x = pipeline.tracker().target_state();
        for k in 0..9 {
            assert!(x[k].is_finite(), "state component {k} went non-finite at t={t}");
        }
        if out.target.tracking {
            assert!(
                (0.12..=0.40).contains(&out.target.radius_1),
                "radius out of bounds at t={t}: {}",
                out.target.radius_1
            );
            if confirmed_at.is_none() {
                confirmed_at = Some(tick);
            }
        }
    }

    let confirmed_at = confirmed_at.expect("track never confirmed");
    assert!(confirmed_at < 20, "confirmation took too long: {confirmed_at} ticks");

    // Once settled the track survives every handover
    assert_eq!(pipeline.tracker().state(), TrackerState::Tracking);
    let target = pipeline.tracker().target_state();
    assert!(
        (target[state::VYAW] - 2.0).abs() < 0.5,
        "spin rate estimate off: {}",
        target[state::VYAW]
    );
    // Center estimate lands near ground truth
    let t_end = 5.99;
    assert!((target[state::XC] - (3.0 + 0.3 * t_end)).abs() < 0.15);
    assert!((target[state::YC] - (0.5 - 0.1 * t_end)).abs() < 0.15);
}

// ============================================================================
// Scenario: Outlier Gating
// ============================================================================

#[test]
fn test_outlier_never_mutates_filter_state() {
    let mut pipeline = pipeline();
    let obs = ("3", 1.0, 0.0, 0.1, 0.0);
    let mut stamp = confirm(&mut pipeline, obs);

    let before = *pipeline.tracker().target_state();
    stamp += 10_000;
    // Same id, one meter away from every predicted plate
    pipeline
        .step(&frame(stamp, &[("3", 2.0, 0.0, 0.1, 0.0)]))
        .unwrap();

    assert_eq!(pipeline.tracker().state(), TrackerState::TempLost);
    let after = pipeline.tracker().target_state();
    // Static target, zero learned velocity: prediction changes nothing
    for k in 0..9 {
        assert_relative_eq!(after[k], before[k], epsilon = 1e-9);
    }
}

// ============================================================================
// Scenario: Yaw Continuity Across the Seam
// ============================================================================

#[test]
fn test_yaw_unwrap_across_seam() {
    let mut pipeline = pipeline();
    let obs = ("3", 1.0, 0.0, 0.1, 3.10);
    let mut stamp = confirm(&mut pipeline, obs);

    let x = *pipeline.tracker().target_state();
    let plate = (
        x[state::XC] - x[state::R] * x[state::YAW].cos(),
        x[state::YC] - x[state::R] * x[state::YAW].sin(),
    );

    // Same plate, yaw now reported from the other side of the seam
    stamp += 10_000;
    let out = pipeline
        .step(&frame(stamp, &[("3", plate.0, plate.1, 0.1, -3.10)]))
        .unwrap();

    let m = out.measurement.unwrap();
    assert_relative_eq!(m.yaw, 2.0 * PI - 3.10, epsilon = 1e-9);
    let yaw = pipeline.tracker().target_state()[state::YAW];
    assert!(
        (3.0..3.3).contains(&yaw),
        "posterior yaw should stay near π, got {yaw}"
    );
    assert_eq!(pipeline.tracker().state(), TrackerState::Tracking);
}

// ============================================================================
// Law: No-Motion Steady State
// ============================================================================

#[test]
fn test_static_target_steady_state() {
    let mut pipeline = pipeline();
    let obs = ("3", 1.2, -0.4, 0.15, 0.2);

    let mut stamp = 10_000u64;
    for _ in 0..60 {
        pipeline.step(&frame(stamp, &[obs])).unwrap();
        stamp += 10_000;
    }

    let x = pipeline.tracker().target_state();
    assert_relative_eq!(x[state::VXC], 0.0, epsilon = 1e-9);
    assert_relative_eq!(x[state::VYC], 0.0, epsilon = 1e-9);
    assert_relative_eq!(x[state::VZA], 0.0, epsilon = 1e-9);
    assert_relative_eq!(x[state::VYAW], 0.0, epsilon = 1e-9);
    assert_relative_eq!(x[state::R], 0.26, epsilon = 1e-9);
    assert_relative_eq!(x[state::YAW], 0.2, epsilon = 1e-9);
}

// ============================================================================
// Law: Identity Is Locked for the Track's Lifetime
// ============================================================================

#[test]
fn test_tracked_id_is_immutable_until_lost() {
    let mut pipeline = pipeline();
    let obs = ("3", 1.0, 0.0, 0.1, 0.0);
    let mut stamp = confirm(&mut pipeline, obs);

    // A closer robot with a different id never steals the track
    for _ in 0..10 {
        stamp += 10_000;
        pipeline
            .step(&frame(stamp, &[("4", 0.5, 0.0, 0.1, 0.0), obs]))
            .unwrap();
        assert_eq!(pipeline.tracker().tracked_id(), "3");
    }

    // Starve the track until it drops, then the other id can seed
    while pipeline.tracker().state() != TrackerState::Lost {
        stamp += 10_000;
        pipeline.step(&frame(stamp, &[])).unwrap();
    }
    stamp += 10_000;
    pipeline
        .step(&frame(stamp, &[("4", 0.5, 0.0, 0.1, 0.0)]))
        .unwrap();
    assert_eq!(pipeline.tracker().tracked_id(), "4");
    assert_eq!(pipeline.tracker().state(), TrackerState::Detecting);
}
