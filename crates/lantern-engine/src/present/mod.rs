//! Presentation scheduling: when a tick renders and when input is flushed.

mod scheduler;

pub use scheduler::{
    DrawLatch, PresentationMode, PresentationScheduler, TickPlan, UnfocusBehaviour,
};
