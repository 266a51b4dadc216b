//! Error types for lakshya-aim.

use thiserror::Error;

/// Crate-wide error type.
///
/// Every tick-level failure is local and non-fatal: the pipeline maps it
/// to a dropped tick and keeps going. Filter and solver failures never
/// surface here; the tracker rolls a rejected measurement back to the
/// prediction and the solver facade degrades to the neutral command.
#[derive(Error, Debug)]
pub enum AimError {
    #[error("transform to frame '{frame}' failed: {reason}")]
    Transform { frame: String, reason: String },

    #[error("non-monotonic frame timestamp (dt = {dt_s} s)")]
    NonMonotonicStamp { dt_s: f64 },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("replay log error: {0}")]
    Replay(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for AimError {
    fn from(e: toml::de::Error) -> Self {
        AimError::Config(e.to_string())
    }
}

impl From<serde_json::Error> for AimError {
    fn from(e: serde_json::Error) -> Self {
        AimError::Replay(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AimError>;
