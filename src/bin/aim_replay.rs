//! Offline replay of a recorded detection log through the aiming core.
//!
//! Reads a JSON-lines log of armor frames (one `ArmorFrame` per line),
//! drives the full pipeline with an identity transform and the reference
//! solver, and logs state transitions and tracking results. Used to tune
//! gates and noise parameters against recorded matches without hardware.
//!
//! Usage:
//!   cargo run --bin aim_replay -- --log match.jsonl
//!   cargo run --bin aim_replay -- --log match.jsonl --config lakshya.toml
//!   cargo run --bin aim_replay -- --synthesize match.jsonl  # write a demo log

use std::f64::consts::PI;
use std::path::PathBuf;

use clap::Parser;
use log::{info, warn};

use lakshya_aim::io::replay;
use lakshya_aim::{
    AimConfig, AimPipeline, ArmorFrame, ArmorObservation, DirectAimSolver, IdentityTransform,
    PlateType, Point3, TrackerState,
};

/// Replay a detection log through the aiming core
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Detection log to replay (JSON lines, one frame per line)
    #[arg(short, long)]
    log: PathBuf,

    /// Configuration file path (TOML); defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Instead of replaying, write a synthetic spinning-target log to LOG
    #[arg(long)]
    synthesize: bool,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    if args.synthesize {
        let frames = synthesize_spinning_target();
        if let Err(e) = replay::write_frame_log(&args.log, &frames) {
            eprintln!("failed to write {}: {e}", args.log.display());
            std::process::exit(1);
        }
        info!("wrote {} synthetic frames to {}", frames.len(), args.log.display());
        return;
    }

    let config = match &args.config {
        Some(path) => match AimConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("failed to load config {}: {e}", path.display());
                std::process::exit(1);
            }
        },
        None => AimConfig::default(),
    };

    let frames = match replay::read_frame_log(&args.log) {
        Ok(frames) => frames,
        Err(e) => {
            eprintln!("failed to read log {}: {e}", args.log.display());
            std::process::exit(1);
        }
    };
    info!("replaying {} frames from {}", frames.len(), args.log.display());

    let mut pipeline = AimPipeline::new(
        config,
        Box::new(IdentityTransform),
        Box::new(DirectAimSolver::new()),
    );

    let mut last_state = TrackerState::Lost;
    let mut tracked_ticks = 0u64;
    let mut fire_ticks = 0u64;

    for frame in &frames {
        let output = match pipeline.step(frame) {
            Ok(output) => output,
            Err(e) => {
                warn!("tick dropped: {e}");
                continue;
            }
        };

        let state = pipeline.tracker().state();
        if state != last_state {
            info!(
                "t={:.3}s  {last_state:?} -> {state:?}",
                frame.timestamp_us as f64 / 1e6
            );
            last_state = state;
        }
        if output.target.tracking {
            tracked_ticks += 1;
            if output.gimbal.fire_advice {
                fire_ticks += 1;
            }
        }
    }

    let stats = pipeline.stats();
    info!(
        "done: {} ticks ({} dropped), tracking on {} ticks, fire advised on {}",
        stats.ticks, stats.dropped_ticks, tracked_ticks, fire_ticks
    );
}

/// A 4-plate robot spinning at 2 rad/s while strafing slowly, observed at
/// 100 Hz through the plate currently facing the turret.
fn synthesize_spinning_target() -> Vec<ArmorFrame> {
    let (r1, r2, dz) = (0.25, 0.27, 0.045);
    let v_yaw = 2.0;
    let (vx, vy) = (0.3, -0.1);
    let dt = 0.01;

    let mut frames = Vec::new();
    for tick in 0..600u64 {
        let t = tick as f64 * dt;
        let (xc, yc, za) = (3.0 + vx * t, 0.5 + vy * t, 0.12);
        let yaw = v_yaw * t;

        let mut frame = ArmorFrame::new((t * 1e6) as u64, "camera");
        for i in 0..4 {
            let plate_yaw = yaw + i as f64 * PI / 2.0;
            // The detector only sees plates roughly facing the turret
            let facing = (plate_yaw - yc.atan2(xc)).cos() > 0.45;
            if !facing {
                continue;
            }
            let (r, z) = if i % 2 == 0 { (r1, za) } else { (r2, za + dz) };
            frame.armors.push(ArmorObservation::new(
                "3",
                Point3::new(xc - r * plate_yaw.cos(), yc - r * plate_yaw.sin(), z),
                lakshya_aim::math::normalize_angle(plate_yaw),
                PlateType::Small,
            ));
        }
        frames.push(frame);
    }
    frames
}
