use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result, anyhow, bail};

use crate::config::Configuration;
use crate::coords::{Vec2, WindowGeometry};
use crate::core::{
    AppHandle, Extension, FrameCtx, Program, ProgramCtx, Transforms, clipboard_or_empty,
    run_draw_pipeline, set_clipboard_logged, set_window_position, window_position,
};
use crate::hmd::{Eye, HmdCamera};
use crate::input::{Events, InputCapture, NativeEvent, WindowMetrics};
use crate::paint::Color;
use crate::platform::{Backend, GraphicsDriver};
use crate::present::{PresentationMode, PresentationScheduler};
use crate::time::FrameClock;
use crate::vr::{UnavailableRuntime, VrPipeline, VrRuntime, VrStatus};

/// Result of one loop iteration.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Tick {
    Continue,
    Exit,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Phase {
    Created,
    Running,
    Released,
}

/// Owns a backend and drives a [`Program`] through setup, the frame loop and
/// shutdown.
pub struct Application {
    config: Configuration,
    backend: Backend,
    program: Box<dyn Program>,
    extensions: Vec<Box<dyn Extension>>,
    events: Events,
    capture: InputCapture,
    scheduler: PresentationScheduler,
    handle: AppHandle,
    vr: VrPipeline,
    camera: HmdCamera,
    clock: FrameClock,
    geometry: WindowGeometry,
    background: Option<Color>,
    frames: u64,
    close_requested: bool,
    phase: Phase,
}

impl Application {
    /// Creates the configured backend.
    pub fn new<P: Program + 'static>(config: Configuration, program: P) -> Result<Self> {
        let backend = Backend::create(&config).context("failed to create backend")?;
        Ok(Self::with_backend(config, backend, program))
    }

    pub fn with_backend<P: Program + 'static>(
        config: Configuration,
        backend: Backend,
        program: P,
    ) -> Self {
        let scheduler = PresentationScheduler::new(
            config.presentation_mode,
            config.unfocus_behaviour,
            config.throttle_interval,
            config.manual_poll_interval,
        );
        let handle = AppHandle::new(scheduler.latch().clone());
        let vr = VrPipeline::new(Box::new(UnavailableRuntime), config.vr.clone());
        let geometry = WindowGeometry::compute(
            backend.window.framebuffer_size(),
            backend.window.content_scale(),
        );

        Self {
            background: config.background,
            config,
            backend,
            program: Box::new(program),
            extensions: Vec::new(),
            events: Events::new(),
            capture: InputCapture::new(),
            scheduler,
            handle,
            vr,
            camera: HmdCamera::new(),
            clock: FrameClock::new(),
            geometry,
            frames: 0,
            close_requested: false,
            phase: Phase::Created,
        }
    }

    /// Replaces the VR runtime. Only useful with `config.vr.enabled`.
    pub fn with_vr_runtime(mut self, runtime: Box<dyn VrRuntime>) -> Self {
        self.vr = VrPipeline::new(runtime, self.config.vr.clone());
        self
    }

    /// Runs setup, the loop and shutdown. Errors end the loop and are
    /// returned after cleanup.
    pub fn run(mut self) -> Result<()> {
        let result = self.start().and_then(|()| {
            while self.tick()? == Tick::Continue {}
            Ok(())
        });

        self.shutdown();

        if let Err(e) = &result {
            log::error!("application ended with error: {e:#}");
        }
        result
    }

    /// Pre-setup clear, cursor, then program setup (which sets up the
    /// extensions it installs).
    ///
    /// Does nothing once started.
    pub fn start(&mut self) -> Result<()> {
        if self.phase != Phase::Created {
            return Ok(());
        }
        self.phase = Phase::Running;
        self.refresh_geometry();

        if self.config.show_before_setup {
            log::debug!("clearing and displaying pre-setup");
            self.backend.window.set_visible(true);
            let color = self.background.unwrap_or(Color::BLACK);
            self.backend.driver.begin_frame(self.geometry.framebuffer)?;
            self.backend.driver.clear(color)?;
            self.backend.window.pre_present();
            self.backend.driver.present()?;
        }

        if self.config.hide_cursor {
            self.backend.window.set_cursor_visible(false);
        }

        log::debug!("calling program setup");
        {
            let metrics = self.metrics();
            let mut ctx = ProgramCtx {
                events: &self.events,
                window: self.geometry,
                window_system: &mut *self.backend.window,
                metrics,
                scheduler: &self.scheduler,
                handle: &self.handle,
                extensions: &mut self.extensions,
                background: &mut self.background,
            };
            self.program.setup(&mut ctx).context("program setup failed")?;
        }

        if !self.config.show_before_setup {
            self.backend.window.set_visible(true);
        }

        log::debug!("setup complete, {} extension(s)", self.extensions.len());
        Ok(())
    }

    /// One loop iteration. Starts the application on first use.
    pub fn tick(&mut self) -> Result<Tick> {
        match self.phase {
            Phase::Created => self.start()?,
            Phase::Running => {}
            Phase::Released => return Ok(Tick::Exit),
        }

        if self.handle.exit_requested()
            || self.close_requested
            || self.backend.window.should_close()
        {
            log::info!("exiting loop");
            return Ok(Tick::Exit);
        }

        let plan = self.scheduler.plan();
        if plan.render {
            self.draw_frame()?;
        }

        if let Some(pause) = self.scheduler.throttle(self.capture.focused()) {
            thread::sleep(pause);
        }

        if plan.explicit_delivery() {
            thread::sleep(self.scheduler.manual_poll_interval());
            self.poll_native()?;
            self.events.deliver_all()?;
        } else {
            self.poll_native()?;
        }

        Ok(Tick::Continue)
    }

    fn draw_frame(&mut self) -> Result<()> {
        if self.frames == 0 {
            self.clock.reset();
        }

        self.vr
            .ensure_initialized(&mut *self.backend.driver, &mut self.camera);
        self.refresh_geometry();

        self.backend
            .driver
            .begin_frame(self.geometry.framebuffer)
            .context("failed to begin frame")?;
        self.events.deliver_all()?;

        let time = self.clock.tick();
        let geometry = self.geometry;
        let background = self.background;

        let Self {
            backend,
            program,
            extensions,
            events,
            scheduler,
            handle,
            vr,
            camera,
            ..
        } = &mut *self;
        let events: &Events = events;
        let scheduler: &PresentationScheduler = scheduler;
        let handle: &AppHandle = handle;

        let mut draw = |driver: &mut dyn GraphicsDriver, eye: Option<Eye>, transforms: Transforms| {
            let mut ctx = FrameCtx {
                driver,
                window: geometry,
                time,
                eye,
                transforms,
                events,
                scheduler,
                handle,
            };
            run_draw_pipeline(&mut **program, extensions.as_mut_slice(), background, &mut ctx)
        };

        if vr.is_active() {
            vr.pre_draw(camera);
            vr.render_eyes(&mut *backend.driver, camera, |driver, camera, eye| {
                let transforms = Transforms {
                    view: camera.view_for(eye),
                    projection: camera.projection_for(eye),
                };
                draw(driver, Some(eye), transforms)
            })?;
            vr.submit(&mut *backend.driver);

            if vr.mirror_to_window() {
                draw(&mut *backend.driver, None, Transforms::for_window(&geometry))?;
            }
        } else {
            draw(&mut *backend.driver, None, Transforms::for_window(&geometry))?;
        }

        backend.window.pre_present();
        backend.driver.present().context("failed to present frame")?;

        self.frames += 1;
        Ok(())
    }

    fn poll_native(&mut self) -> Result<()> {
        let mut batch = Vec::new();
        self.backend.window.poll_events(&mut |event| batch.push(event));

        for event in &batch {
            self.on_native(event)?;
        }
        Ok(())
    }

    fn on_native(&mut self, event: &NativeEvent) -> Result<()> {
        match event {
            NativeEvent::FramebufferResized { .. } | NativeEvent::ScaleChanged(_) => {
                self.refresh_geometry();
            }
            NativeEvent::Refresh => {
                self.scheduler.request_draw();
                return Ok(());
            }
            NativeEvent::CloseRequested => {
                self.close_requested = true;
                return Ok(());
            }
            _ => {}
        }

        let metrics = self.metrics();
        self.capture
            .handle(event, &self.events, metrics, &self.geometry)
    }

    fn refresh_geometry(&mut self) {
        let window = &self.backend.window;
        self.geometry = WindowGeometry::compute(window.framebuffer_size(), window.content_scale());
    }

    fn metrics(&self) -> WindowMetrics {
        let scaled = self
            .config
            .scaled_window_metrics
            .unwrap_or_else(|| self.backend.window.reports_scaled_metrics());
        WindowMetrics::new(scaled, self.geometry.scale)
    }

    /// Releases the VR runtime (if active), then the window. Runs once.
    pub fn shutdown(&mut self) {
        if self.phase == Phase::Released {
            return;
        }
        self.phase = Phase::Released;

        self.vr.shutdown(&mut *self.backend.driver);
        self.backend.window.release();
        log::info!("done");
    }

    /// Seconds since the first rendered frame.
    pub fn seconds(&self) -> f64 {
        self.clock.seconds()
    }

    /// Number of frames presented so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn events(&self) -> &Events {
        &self.events
    }

    pub fn geometry(&self) -> WindowGeometry {
        self.geometry
    }

    pub fn camera(&self) -> &HmdCamera {
        &self.camera
    }

    pub fn vr_status(&self) -> VrStatus {
        self.vr.status()
    }

    pub fn focused(&self) -> bool {
        self.capture.focused()
    }

    pub fn title(&self) -> String {
        self.backend.window.title()
    }

    pub fn set_title(&mut self, title: &str) {
        self.backend.window.set_title(title);
    }

    /// Window position in logical units.
    pub fn position(&self) -> Vec2 {
        window_position(&*self.backend.window, self.metrics())
    }

    pub fn set_position(&mut self, position: Vec2) {
        let metrics = self.metrics();
        set_window_position(&mut *self.backend.window, metrics, position);
    }

    /// Clipboard text, or an empty string when unavailable.
    pub fn clipboard(&mut self) -> String {
        clipboard_or_empty(&mut *self.backend.window)
    }

    pub fn set_clipboard(&mut self, text: &str) {
        set_clipboard_logged(&mut *self.backend.window, text);
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

impl Drop for Application {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("phase", &self.phase)
            .field("frames", &self.frames)
            .field("geometry", &self.geometry)
            .field("vr", &self.vr)
            .finish_non_exhaustive()
    }
}

/// An application running on its own thread.
#[derive(Debug)]
pub struct AsyncApp {
    handle: AppHandle,
    join: JoinHandle<Result<()>>,
}

impl AsyncApp {
    pub fn handle(&self) -> AppHandle {
        self.handle.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Waits for the loop to end and returns its result.
    pub fn join(self) -> Result<()> {
        self.join
            .join()
            .map_err(|_| anyhow!("application thread panicked"))?
    }
}

/// Builds the program and the application on a thread named `lantern-app`
/// and runs it there.
///
/// Returns once the application is constructed; construction errors are
/// returned here.
pub fn run_async<P, F>(config: Configuration, make_program: F) -> Result<AsyncApp>
where
    P: Program + 'static,
    F: FnOnce() -> P + Send + 'static,
{
    let (tx, rx) = mpsc::channel();

    let join = thread::Builder::new()
        .name("lantern-app".to_string())
        .spawn(move || -> Result<()> {
            let app = Application::new(config, make_program())?;
            // The caller may have gone away; the loop still runs.
            let _ = tx.send(app.handle());
            app.run()
        })
        .context("failed to spawn application thread")?;

    match rx.recv() {
        Ok(handle) => Ok(AsyncApp { handle, join }),
        Err(_) => match join.join() {
            Ok(Err(e)) => Err(e.context("application failed to start")),
            Ok(Ok(())) => bail!("application thread ended before starting"),
            Err(_) => bail!("application thread panicked during startup"),
        },
    }
}
