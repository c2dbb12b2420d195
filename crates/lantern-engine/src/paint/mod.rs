//! Colour model used for background clears.

pub mod color;

pub use color::Color;
