//! Capability surfaces the loop consumes, and the backends that provide them.
//!
//! The loop never names a concrete window system or GPU API; it talks to a
//! [`WindowSystem`] and a [`GraphicsDriver`] bundled in a [`Backend`].

mod headless;
mod windowed;

use anyhow::Result;

use crate::config::Configuration;
use crate::input::NativeEvent;
use crate::paint::Color;

pub use headless::{DriverJournal, DriverOp, HeadlessController, HeadlessDriver, HeadlessWindow};

/// Offscreen render target allocated by a [`GraphicsDriver`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct RenderTargetId(pub u64);

/// Driver-native texture name handed to a VR compositor.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct TextureHandle(pub u64);

/// Native window binding.
pub trait WindowSystem {
    /// Pumps pending platform events without blocking.
    fn poll_events(&mut self, sink: &mut dyn FnMut(NativeEvent));

    fn should_close(&self) -> bool;

    /// Framebuffer size in physical pixels.
    fn framebuffer_size(&self) -> (u32, u32);

    fn content_scale(&self) -> f64;

    /// Whether positions are reported in scaled pixels rather than logical
    /// units.
    fn reports_scaled_metrics(&self) -> bool;

    /// Window position in platform units.
    fn position(&self) -> Result<(i32, i32)>;
    fn set_position(&mut self, x: i32, y: i32);

    fn title(&self) -> String;
    fn set_title(&mut self, title: &str);

    fn clipboard_text(&mut self) -> Result<String>;
    fn set_clipboard_text(&mut self, text: &str) -> Result<()>;

    fn set_cursor_visible(&mut self, visible: bool);

    fn set_visible(&mut self, _visible: bool) {}

    /// Called right before the driver presents a frame.
    fn pre_present(&mut self) {}

    /// Releases native callbacks and destroys the window.
    fn release(&mut self);
}

/// Graphics driver binding: frame lifecycle, clear, offscreen targets.
pub trait GraphicsDriver {
    fn begin_frame(&mut self, framebuffer: (u32, u32)) -> Result<()>;

    /// Clears the bound target (or the window when none is bound).
    fn clear(&mut self, color: Color) -> Result<()>;

    fn create_render_target(&mut self, width: u32, height: u32) -> Result<RenderTargetId>;
    fn destroy_render_target(&mut self, id: RenderTargetId);

    fn bind_render_target(&mut self, id: RenderTargetId) -> Result<()>;
    fn unbind_render_target(&mut self);

    fn color_texture(&self, id: RenderTargetId) -> Option<TextureHandle>;

    /// Takes every error the driver recorded since the last call.
    fn drain_errors(&mut self) -> Vec<String>;

    /// Submits the commands recorded so far and keeps the frame open, so
    /// offscreen targets are rendered before a compositor reads them.
    fn flush(&mut self) -> Result<()>;

    fn present(&mut self) -> Result<()>;
}

/// Closed set of backend implementations.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BackendKind {
    /// winit window + wgpu driver.
    Windowed,
    /// No native window; events are scripted and draws are recorded.
    Headless,
}

impl BackendKind {
    pub fn from_config(config: &Configuration) -> Self {
        if config.headless {
            BackendKind::Headless
        } else {
            BackendKind::Windowed
        }
    }
}

/// A window system paired with the driver that renders into it.
pub struct Backend {
    // Drops first: the surface must go before the window and its event loop.
    pub driver: Box<dyn GraphicsDriver>,
    pub window: Box<dyn WindowSystem>,
}

impl Backend {
    pub fn new(window: Box<dyn WindowSystem>, driver: Box<dyn GraphicsDriver>) -> Self {
        Self { window, driver }
    }

    pub fn create(config: &Configuration) -> Result<Self> {
        let kind = BackendKind::from_config(config);
        log::debug!("creating {kind:?} backend");

        match kind {
            BackendKind::Windowed => windowed::create(config),
            BackendKind::Headless => {
                let (window, _controller) = HeadlessWindow::new(config);
                Ok(Self::new(Box::new(window), Box::new(HeadlessDriver::new())))
            }
        }
    }
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend").finish_non_exhaustive()
    }
}
