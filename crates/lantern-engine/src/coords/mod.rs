//! Coordinate types shared by input capture and window geometry.
//!
//! Canonical CPU space:
//! - Logical window units (content scale removed)
//! - Origin top-left
//! - +X right, +Y down

mod geometry;
mod vec2;

pub use geometry::WindowGeometry;
pub use vec2::Vec2;
