//! Head-mounted display camera state.

mod camera;

pub use camera::{Eye, HmdCamera};
