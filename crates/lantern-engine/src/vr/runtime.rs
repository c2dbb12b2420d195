use glam::Mat4;

use crate::hmd::Eye;
use crate::platform::TextureHandle;

use super::VrError;

/// What a runtime reports after a successful `init`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VrSystemInfo {
    pub runtime_name: String,
    /// Per-eye render target size suggested by the runtime.
    pub recommended_target_size: Option<(u32, u32)>,
}

/// VR runtime binding.
///
/// Matrices are already converted to `Mat4` (see [`super::convert`]).
pub trait VrRuntime {
    fn init(&mut self) -> Result<VrSystemInfo, VrError>;

    fn projection(&mut self, eye: Eye, near: f32, far: f32) -> Result<Mat4, VrError>;

    /// Fixed eye-to-head transform.
    fn eye_to_head(&mut self, eye: Eye) -> Result<Mat4, VrError>;

    /// Latest head pose. May block until the compositor is ready for a frame.
    fn head_pose(&mut self) -> Result<Mat4, VrError>;

    fn submit(&mut self, eye: Eye, texture: TextureHandle) -> Result<(), VrError>;

    fn shutdown(&mut self);
}

/// Runtime used when no VR binding is installed. Never initializes.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableRuntime;

impl VrRuntime for UnavailableRuntime {
    fn init(&mut self) -> Result<VrSystemInfo, VrError> {
        Err(VrError::RuntimeUnavailable)
    }

    fn projection(&mut self, _eye: Eye, _near: f32, _far: f32) -> Result<Mat4, VrError> {
        Err(VrError::RuntimeUnavailable)
    }

    fn eye_to_head(&mut self, _eye: Eye) -> Result<Mat4, VrError> {
        Err(VrError::RuntimeUnavailable)
    }

    fn head_pose(&mut self) -> Result<Mat4, VrError> {
        Err(VrError::RuntimeUnavailable)
    }

    fn submit(&mut self, _eye: Eye, _texture: TextureHandle) -> Result<(), VrError> {
        Err(VrError::RuntimeUnavailable)
    }

    fn shutdown(&mut self) {}
}
