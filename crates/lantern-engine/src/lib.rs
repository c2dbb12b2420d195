//! Lantern engine crate.
//!
//! A windowed application loop with deferred input events, a two-mode
//! presentation scheduler and an optional stereo (VR) rendering path.
//! Programs implement [`Program`] and are run by [`Application`].

pub mod app;
pub mod config;
pub mod coords;
pub mod core;
pub mod device;
pub mod events;
pub mod extensions;
pub mod hmd;
pub mod input;
pub mod logging;
pub mod paint;
pub mod platform;
pub mod present;
pub mod time;
pub mod vr;

pub use app::{Application, AsyncApp, Tick, run_async};
pub use config::{Configuration, VrConfig};
pub use crate::core::{AppHandle, Extension, FrameCtx, Program, ProgramCtx, Transforms};
pub use present::{PresentationMode, UnfocusBehaviour};
