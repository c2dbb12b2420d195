//! wgpu graphics driver.
//!
//! Owns the wgpu device/queue and the window surface, records one command
//! encoder per frame, and keeps offscreen render targets for stereo rendering.

mod driver;
mod error;
mod init;
mod surface;

pub use driver::WgpuDriver;
pub use error::SurfaceErrorAction;
pub(crate) use error::ErrorLog;
pub use init::GpuInit;
