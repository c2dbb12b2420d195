use super::Vec2;

/// Window size derived from the framebuffer and content scale.
///
/// Logical size is `ceil(framebuffer / scale)`, so a fractional scale never
/// rounds a visible pixel column away.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct WindowGeometry {
    /// Framebuffer size in physical pixels.
    pub framebuffer: (u32, u32),

    /// Content scale (physical pixels per logical unit).
    pub scale: f64,

    /// Logical width.
    pub width: u32,

    /// Logical height.
    pub height: u32,
}

impl WindowGeometry {
    pub fn compute(framebuffer: (u32, u32), scale: f64) -> Self {
        let scale = if scale.is_finite() && scale > 0.0 { scale } else { 1.0 };
        let (fw, fh) = framebuffer;

        Self {
            framebuffer,
            scale,
            width: (fw as f64 / scale).ceil() as u32,
            height: (fh as f64 / scale).ceil() as u32,
        }
    }

    /// Logical size as a vector.
    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }

    pub fn is_empty(&self) -> bool {
        self.framebuffer.0 == 0 || self.framebuffer.1 == 0
    }
}

impl Default for WindowGeometry {
    fn default() -> Self {
        Self::compute((0, 0), 1.0)
    }
}
