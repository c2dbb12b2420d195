use anyhow::Result;
use glam::Mat4;

use crate::coords::{Vec2, WindowGeometry};
use crate::hmd::Eye;
use crate::input::{Events, WindowMetrics};
use crate::paint::Color;
use crate::platform::{GraphicsDriver, WindowSystem};
use crate::present::{PresentationMode, PresentationScheduler};
use crate::time::FrameTime;

use super::app::{AppHandle, Extension, Program};

/// Camera matrices for the current draw call.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Transforms {
    pub view: Mat4,
    pub projection: Mat4,
}

impl Transforms {
    /// Top-left origin orthographic projection over the logical window.
    pub fn for_window(geometry: &WindowGeometry) -> Self {
        let w = geometry.width.max(1) as f32;
        let h = geometry.height.max(1) as f32;
        Self {
            view: Mat4::IDENTITY,
            projection: Mat4::orthographic_rh(0.0, w, h, 0.0, -1.0, 1.0),
        }
    }
}

impl Default for Transforms {
    fn default() -> Self {
        Self {
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
        }
    }
}

/// Per-draw context for [`Program::draw`] and extension hooks.
///
/// While VR is active the pipeline runs once per eye; `eye` names it and
/// `transforms` hold that eye's view/projection.
pub struct FrameCtx<'a> {
    pub driver: &'a mut dyn GraphicsDriver,
    pub window: WindowGeometry,
    pub time: FrameTime,
    pub eye: Option<Eye>,
    pub transforms: Transforms,
    pub events: &'a Events,
    pub(crate) scheduler: &'a PresentationScheduler,
    pub(crate) handle: &'a AppHandle,
}

impl FrameCtx<'_> {
    /// Seconds since the first frame.
    pub fn seconds(&self) -> f64 {
        self.time.seconds
    }

    pub fn presentation_mode(&self) -> PresentationMode {
        self.scheduler.mode()
    }

    /// Takes effect on the next tick.
    pub fn set_presentation_mode(&self, mode: PresentationMode) {
        self.scheduler.set_mode(mode);
    }

    pub fn request_draw(&self) {
        self.handle.request_draw();
    }

    pub fn exit(&self) {
        self.handle.exit();
    }

    pub fn handle(&self) -> AppHandle {
        self.handle.clone()
    }
}

/// Setup-time context for [`Program::setup`] and [`Extension::setup`].
pub struct ProgramCtx<'a> {
    pub events: &'a Events,
    pub window: WindowGeometry,
    pub(crate) window_system: &'a mut dyn WindowSystem,
    pub(crate) metrics: WindowMetrics,
    pub(crate) scheduler: &'a PresentationScheduler,
    pub(crate) handle: &'a AppHandle,
    pub(crate) extensions: &'a mut Vec<Box<dyn Extension>>,
    pub(crate) background: &'a mut Option<Color>,
}

impl ProgramCtx<'_> {
    /// Installs an extension and runs its `setup` right away.
    ///
    /// Listeners it registers precede any registered after this call. An
    /// extension installed from inside another's `setup` is placed after it.
    pub fn extend<E: Extension + 'static>(&mut self, mut extension: E) -> Result<()> {
        let at = self.extensions.len();
        extension.setup(self)?;
        self.extensions.insert(at, Box::new(extension));
        Ok(())
    }

    pub fn title(&self) -> String {
        self.window_system.title()
    }

    pub fn set_title(&mut self, title: &str) {
        self.window_system.set_title(title);
    }

    /// Window position in logical units.
    pub fn position(&self) -> Vec2 {
        window_position(&*self.window_system, self.metrics)
    }

    pub fn set_position(&mut self, position: Vec2) {
        set_window_position(&mut *self.window_system, self.metrics, position);
    }

    /// Clipboard text, or an empty string when unavailable.
    pub fn clipboard(&mut self) -> String {
        clipboard_or_empty(&mut *self.window_system)
    }

    pub fn set_clipboard(&mut self, text: &str) {
        set_clipboard_logged(&mut *self.window_system, text);
    }

    pub fn background(&self) -> Option<Color> {
        *self.background
    }

    pub fn set_background(&mut self, color: Option<Color>) {
        *self.background = color;
    }

    pub fn presentation_mode(&self) -> PresentationMode {
        self.scheduler.mode()
    }

    pub fn set_presentation_mode(&self, mode: PresentationMode) {
        self.scheduler.set_mode(mode);
    }

    pub fn request_draw(&self) {
        self.handle.request_draw();
    }

    pub fn exit(&self) {
        self.handle.exit();
    }

    pub fn handle(&self) -> AppHandle {
        self.handle.clone()
    }
}

/// Background clear, enabled `before_draw` hooks in order, the program, then
/// enabled `after_draw` hooks in reverse.
pub(crate) fn run_draw_pipeline(
    program: &mut dyn Program,
    extensions: &mut [Box<dyn Extension>],
    background: Option<Color>,
    ctx: &mut FrameCtx<'_>,
) -> Result<()> {
    if let Some(color) = background {
        ctx.driver.clear(color)?;
    }

    for ext in extensions.iter_mut() {
        if ext.enabled() {
            ext.before_draw(ctx)?;
        }
    }

    program.draw(ctx)?;

    for ext in extensions.iter_mut().rev() {
        if ext.enabled() {
            ext.after_draw(ctx)?;
        }
    }

    Ok(())
}

pub(crate) fn window_position(window: &dyn WindowSystem, metrics: WindowMetrics) -> Vec2 {
    match window.position() {
        Ok((x, y)) => metrics.to_logical(x as f64, y as f64),
        Err(e) => {
            log::debug!("window position unavailable: {e:#}");
            Vec2::ZERO
        }
    }
}

pub(crate) fn set_window_position(
    window: &mut dyn WindowSystem,
    metrics: WindowMetrics,
    position: Vec2,
) {
    let (x, y) = metrics.to_platform(position);
    window.set_position(x, y);
}

pub(crate) fn clipboard_or_empty(window: &mut dyn WindowSystem) -> String {
    window.clipboard_text().unwrap_or_else(|e| {
        log::debug!("clipboard read failed: {e:#}");
        String::new()
    })
}

pub(crate) fn set_clipboard_logged(window: &mut dyn WindowSystem, text: &str) {
    if let Err(e) = window.set_clipboard_text(text) {
        log::debug!("clipboard write failed: {e:#}");
    }
}
