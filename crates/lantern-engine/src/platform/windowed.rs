use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use winit::application::ApplicationHandler;
use winit::dpi::{LogicalPosition, LogicalSize, PhysicalPosition};
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{Fullscreen, Window, WindowAttributes, WindowId};

use crate::config::Configuration;
use crate::device::WgpuDriver;
use crate::input::NativeEvent;
use crate::input::platform::winit::WinitTranslator;

use super::{Backend, WindowSystem};

/// Pumps allowed for the platform to deliver `resumed` at startup.
const STARTUP_PUMPS: usize = 32;

/// Event handler driven by `pump_app_events`; buffers translated events until
/// the loop asks for them.
struct Pump {
    attributes: Option<WindowAttributes>,
    window: Option<Arc<Window>>,
    create_error: Option<anyhow::Error>,

    translator: WinitTranslator,
    pending: Vec<NativeEvent>,
    close_requested: bool,
}

impl Pump {
    fn new(attributes: WindowAttributes) -> Self {
        Self {
            attributes: Some(attributes),
            window: None,
            create_error: None,
            translator: WinitTranslator::new(),
            pending: Vec::new(),
            close_requested: false,
        }
    }
}

impl ApplicationHandler for Pump {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let Some(attributes) = self.attributes.take() else {
            return;
        };

        match event_loop.create_window(attributes) {
            Ok(window) => {
                self.translator.set_scale_factor(window.scale_factor());
                self.window = Some(Arc::new(window));
            }
            Err(e) => {
                log::error!("failed to create window: {e}");
                self.create_error = Some(anyhow!(e).context("failed to create window"));
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if matches!(event, WindowEvent::CloseRequested) {
            self.close_requested = true;
        }

        let pending = &mut self.pending;
        self.translator.translate(&event, &mut |e| pending.push(e));
    }
}

/// winit-backed [`WindowSystem`].
///
/// winit reports positions in physical pixels, so metrics are scaled.
pub struct WinitWindow {
    event_loop: EventLoop<()>,
    pump: Pump,
    window: Arc<Window>,
    clipboard: Option<arboard::Clipboard>,
    exited: bool,
}

impl WinitWindow {
    fn clipboard(&mut self) -> Result<&mut arboard::Clipboard> {
        if self.clipboard.is_none() {
            self.clipboard = Some(arboard::Clipboard::new().context("clipboard unavailable")?);
        }
        self.clipboard.as_mut().context("clipboard unavailable")
    }
}

impl WindowSystem for WinitWindow {
    fn poll_events(&mut self, sink: &mut dyn FnMut(NativeEvent)) {
        if !self.exited {
            let status = self
                .event_loop
                .pump_app_events(Some(Duration::ZERO), &mut self.pump);

            if let PumpStatus::Exit(code) = status {
                log::debug!("event loop exited with code {code}");
                self.exited = true;
            }
        }

        self.pump.pending.drain(..).for_each(|e| sink(e));
    }

    fn should_close(&self) -> bool {
        self.exited || self.pump.close_requested
    }

    fn framebuffer_size(&self) -> (u32, u32) {
        let size = self.window.inner_size();
        (size.width, size.height)
    }

    fn content_scale(&self) -> f64 {
        self.window.scale_factor()
    }

    fn reports_scaled_metrics(&self) -> bool {
        true
    }

    fn position(&self) -> Result<(i32, i32)> {
        let p = self
            .window
            .outer_position()
            .context("window position unavailable")?;
        Ok((p.x, p.y))
    }

    fn set_position(&mut self, x: i32, y: i32) {
        self.window.set_outer_position(PhysicalPosition::new(x, y));
    }

    fn title(&self) -> String {
        self.window.title()
    }

    fn set_title(&mut self, title: &str) {
        self.window.set_title(title);
    }

    fn clipboard_text(&mut self) -> Result<String> {
        self.clipboard()?
            .get_text()
            .context("failed to read clipboard text")
    }

    fn set_clipboard_text(&mut self, text: &str) -> Result<()> {
        self.clipboard()?
            .set_text(text)
            .context("failed to write clipboard text")
    }

    fn set_cursor_visible(&mut self, visible: bool) {
        self.window.set_cursor_visible(visible);
    }

    fn set_visible(&mut self, visible: bool) {
        self.window.set_visible(visible);
    }

    fn pre_present(&mut self) {
        self.window.pre_present_notify();
    }

    fn release(&mut self) {
        // The surface still holds the window; hide it until the backend drops.
        self.window.set_visible(false);
        self.pump.window = None;
        self.clipboard = None;
        self.pump.pending.clear();
    }
}

fn window_attributes(config: &Configuration) -> WindowAttributes {
    let mut attrs = Window::default_attributes()
        .with_title(config.title.clone())
        .with_inner_size(LogicalSize::new(config.width as f64, config.height as f64))
        .with_resizable(config.resizable)
        .with_decorations(!config.hide_window_decorations)
        .with_visible(config.show_before_setup);

    if let Some((x, y)) = config.position {
        attrs = attrs.with_position(LogicalPosition::new(x as f64, y as f64));
    }

    if config.fullscreen {
        attrs = attrs.with_fullscreen(Some(Fullscreen::Borderless(None)));
    }

    attrs
}

fn build_event_loop() -> Result<EventLoop<()>> {
    #[allow(unused_mut)]
    let mut builder = EventLoop::builder();

    // The loop may run on a spawned thread (`run_async`).
    #[cfg(target_os = "windows")]
    {
        use winit::platform::windows::EventLoopBuilderExtWindows;
        builder.with_any_thread(true);
    }
    #[cfg(all(unix, not(target_os = "macos"), not(target_os = "android")))]
    {
        use winit::platform::x11::EventLoopBuilderExtX11;
        builder.with_any_thread(true);
    }

    builder.build().context("failed to create winit EventLoop")
}

pub(super) fn create(config: &Configuration) -> Result<Backend> {
    let mut event_loop = build_event_loop()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut pump = Pump::new(window_attributes(config));

    for _ in 0..STARTUP_PUMPS {
        if let PumpStatus::Exit(code) =
            event_loop.pump_app_events(Some(Duration::from_millis(10)), &mut pump)
        {
            if let Some(e) = pump.create_error.take() {
                return Err(e);
            }
            bail!("event loop exited during startup (code {code})");
        }

        if pump.window.is_some() {
            break;
        }
    }

    if let Some(e) = pump.create_error.take() {
        return Err(e);
    }
    let window = pump
        .window
        .clone()
        .context("platform never resumed; no window was created")?;

    let driver = WgpuDriver::new(Arc::clone(&window), config.gpu.clone())
        .context("GPU initialization failed")?;

    log::info!(
        "window created: {:?} at scale {}",
        window.inner_size(),
        window.scale_factor()
    );

    let system = WinitWindow {
        event_loop,
        pump,
        window,
        clipboard: None,
        exited: false,
    };

    Ok(Backend::new(Box::new(system), Box::new(driver)))
}
