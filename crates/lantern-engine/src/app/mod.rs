//! The application loop: setup, per-tick scheduling, drawing and shutdown.

mod application;

pub use application::{Application, AsyncApp, Tick, run_async};
