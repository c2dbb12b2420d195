//! Ready-made [`Extension`](crate::core::Extension)s.

mod debug2d;

pub use debug2d::Debug2D;
