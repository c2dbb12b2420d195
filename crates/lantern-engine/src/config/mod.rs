//! Application configuration.

use std::time::Duration;

use crate::device::GpuInit;
use crate::paint::Color;
use crate::present::{PresentationMode, PresentationScheduler, UnfocusBehaviour};

/// Stereo rendering settings.
#[derive(Debug, Clone, PartialEq)]
pub struct VrConfig {
    /// Attempt VR initialization before the first frame.
    pub enabled: bool,
    pub near: f32,
    pub far: f32,
    /// Per-eye target size when the runtime recommends none.
    pub fallback_target_size: (u32, u32),
    /// Also draw the flat pipeline into the window after the eyes.
    pub mirror_to_window: bool,
}

impl Default for VrConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            near: 0.1,
            far: 500.0,
            fallback_target_size: (2048, 2048),
            mirror_to_window: false,
        }
    }
}

/// Window, loop and rendering settings.
///
/// Sizes and positions are logical units.
#[derive(Debug, Clone)]
pub struct Configuration {
    pub width: u32,
    pub height: u32,
    pub title: String,
    /// Initial window position; platform default when `None`.
    pub position: Option<(i32, i32)>,

    pub fullscreen: bool,
    pub resizable: bool,
    pub hide_window_decorations: bool,
    /// Show (and clear) the window before `setup` runs.
    pub show_before_setup: bool,
    pub hide_cursor: bool,

    pub unfocus_behaviour: UnfocusBehaviour,
    pub throttle_interval: Duration,
    pub manual_poll_interval: Duration,
    pub presentation_mode: PresentationMode,

    /// Cleared before every draw; `None` leaves the target untouched.
    pub background: Option<Color>,

    /// Use the headless backend instead of a native window.
    pub headless: bool,
    /// Raise the default log level to `Debug`.
    pub debug: bool,
    /// Raise the default log level to `Trace`.
    pub trace: bool,

    /// Override for whether the platform reports positions in scaled pixels.
    /// `None` trusts the backend.
    pub scaled_window_metrics: Option<bool>,

    pub vr: VrConfig,
    pub gpu: GpuInit,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            title: "lantern".to_string(),
            position: None,
            fullscreen: false,
            resizable: false,
            hide_window_decorations: false,
            show_before_setup: true,
            hide_cursor: false,
            unfocus_behaviour: UnfocusBehaviour::Normal,
            throttle_interval: PresentationScheduler::DEFAULT_THROTTLE_INTERVAL,
            manual_poll_interval: PresentationScheduler::DEFAULT_MANUAL_POLL_INTERVAL,
            presentation_mode: PresentationMode::Automatic,
            background: Some(Color::BLACK),
            headless: false,
            debug: false,
            trace: false,
            scaled_window_metrics: None,
            vr: VrConfig::default(),
            gpu: GpuInit::default(),
        }
    }
}

impl Configuration {
    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn position(mut self, x: i32, y: i32) -> Self {
        self.position = Some((x, y));
        self
    }

    pub fn fullscreen(mut self, fullscreen: bool) -> Self {
        self.fullscreen = fullscreen;
        self
    }

    pub fn resizable(mut self, resizable: bool) -> Self {
        self.resizable = resizable;
        self
    }

    pub fn hide_window_decorations(mut self, hide: bool) -> Self {
        self.hide_window_decorations = hide;
        self
    }

    pub fn show_before_setup(mut self, show: bool) -> Self {
        self.show_before_setup = show;
        self
    }

    pub fn hide_cursor(mut self, hide: bool) -> Self {
        self.hide_cursor = hide;
        self
    }

    pub fn unfocus_behaviour(mut self, behaviour: UnfocusBehaviour) -> Self {
        self.unfocus_behaviour = behaviour;
        self
    }

    pub fn throttle_interval(mut self, interval: Duration) -> Self {
        self.throttle_interval = interval;
        self
    }

    pub fn manual_poll_interval(mut self, interval: Duration) -> Self {
        self.manual_poll_interval = interval;
        self
    }

    pub fn presentation_mode(mut self, mode: PresentationMode) -> Self {
        self.presentation_mode = mode;
        self
    }

    pub fn background(mut self, color: Option<Color>) -> Self {
        self.background = color;
        self
    }

    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    pub fn scaled_window_metrics(mut self, scaled: Option<bool>) -> Self {
        self.scaled_window_metrics = scaled;
        self
    }

    pub fn vr(mut self, vr: VrConfig) -> Self {
        self.vr = vr;
        self
    }

    pub fn gpu(mut self, gpu: GpuInit) -> Self {
        self.gpu = gpu;
        self
    }

    /// Default log level implied by `debug`/`trace`.
    pub fn log_level(&self) -> log::LevelFilter {
        if self.trace {
            log::LevelFilter::Trace
        } else if self.debug {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        }
    }
}
