//! Stereo rendering for head-mounted displays.
//!
//! [`VrPipeline`] drives a [`VrRuntime`]: lazy one-shot initialization, head
//! pose before drawing, one draw per eye into offscreen targets, and
//! submission to the compositor. Any initialization failure degrades to flat
//! rendering for the rest of the process.

pub mod convert;
mod error;
mod pipeline;
mod runtime;
mod simulated;

pub use error::VrError;
pub use pipeline::{VrPipeline, VrStatus};
pub use runtime::{UnavailableRuntime, VrRuntime, VrSystemInfo};
pub use simulated::{DEFAULT_IPD, SimulatedRecord, SimulatedRuntime};
