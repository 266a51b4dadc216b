//! JSON-lines detection logs for offline replay.
//!
//! One [`ArmorFrame`] per line. Recorded on the robot, replayed on a
//! workstation to tune gates and noise parameters without hardware.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::core::types::ArmorFrame;
use crate::error::{AimError, Result};

/// Read a frame log; blank lines are skipped.
pub fn read_frame_log(path: &Path) -> Result<Vec<ArmorFrame>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let mut frames = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let frame: ArmorFrame = serde_json::from_str(&line)
            .map_err(|e| AimError::Replay(format!("line {}: {e}", line_no + 1)))?;
        frames.push(frame);
    }
    Ok(frames)
}

/// Write a frame log, one JSON object per line.
pub fn write_frame_log(path: &Path, frames: &[ArmorFrame]) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    for frame in frames {
        serde_json::to_writer(&mut writer, frame)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}
