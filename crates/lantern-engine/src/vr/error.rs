use thiserror::Error;

use crate::hmd::Eye;

/// Failure reported by a VR runtime or the stereo pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VrError {
    /// No runtime is installed or no headset is connected.
    #[error("no VR runtime available")]
    RuntimeUnavailable,
    /// The runtime refused to start.
    #[error("VR runtime initialization failed: {0}")]
    Init(String),
    /// An eye's offscreen target could not be allocated.
    #[error("render target for {eye:?} eye: {reason}")]
    RenderTarget { eye: Eye, reason: String },
    /// Projection or eye-to-head query failed.
    #[error("{what} query for {eye:?} eye failed: {reason}")]
    Query {
        what: &'static str,
        eye: Eye,
        reason: String,
    },
    #[error("head pose unavailable: {0}")]
    Pose(String),
    #[error("compositor rejected {eye:?} eye: {reason}")]
    Submit { eye: Eye, reason: String },
}
