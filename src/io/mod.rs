//! Infrastructure: the per-tick pipeline and offline replay logs.

mod pipeline;
pub mod replay;

pub use pipeline::{
    AimPipeline, FrameTransformer, IdentityTransform, PipelineStats, TickOutput,
};
