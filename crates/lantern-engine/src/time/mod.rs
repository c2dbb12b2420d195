//! Frame timing.
//!
//! One `FrameClock` per application loop; `tick()` once per rendered frame.

mod frame_clock;

pub use frame_clock::{FrameClock, FrameTime};
