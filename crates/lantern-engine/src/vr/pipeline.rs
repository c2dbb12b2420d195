use anyhow::Result;

use crate::config::VrConfig;
use crate::hmd::{Eye, HmdCamera};
use crate::platform::{GraphicsDriver, RenderTargetId};

use super::{VrError, VrRuntime};

/// Lifecycle of the stereo pipeline.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum VrStatus {
    /// VR is switched off in the configuration; never initializes.
    Disabled,
    Uninitialized,
    Initializing,
    Active,
    /// Initialization failed; flat rendering for the rest of the process.
    Failed,
    /// Shut down after being active. Never re-initialized.
    Released,
}

#[derive(Debug, Copy, Clone)]
struct EyeTargets {
    left: RenderTargetId,
    right: RenderTargetId,
}

impl EyeTargets {
    fn get(&self, eye: Eye) -> RenderTargetId {
        match eye {
            Eye::Left => self.left,
            Eye::Right => self.right,
        }
    }
}

/// Per-eye offscreen rendering and compositor submission.
pub struct VrPipeline {
    runtime: Box<dyn VrRuntime>,
    config: VrConfig,
    status: VrStatus,
    targets: Option<EyeTargets>,
}

impl VrPipeline {
    pub fn new(runtime: Box<dyn VrRuntime>, config: VrConfig) -> Self {
        let status = if config.enabled {
            VrStatus::Uninitialized
        } else {
            VrStatus::Disabled
        };

        Self {
            runtime,
            config,
            status,
            targets: None,
        }
    }

    pub fn status(&self) -> VrStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == VrStatus::Active
    }

    pub fn mirror_to_window(&self) -> bool {
        self.config.mirror_to_window
    }

    /// Initializes on the first call; later calls do nothing.
    ///
    /// Failure is logged and leaves the pipeline `Failed`; the camera is only
    /// written on success.
    pub fn ensure_initialized(&mut self, driver: &mut dyn GraphicsDriver, camera: &mut HmdCamera) {
        if self.status != VrStatus::Uninitialized {
            return;
        }

        self.status = VrStatus::Initializing;
        log::debug!("initializing VR runtime");

        let mut started = false;
        let mut allocated: Vec<RenderTargetId> = Vec::new();

        match self.try_init(driver, camera, &mut started, &mut allocated) {
            Ok(targets) => {
                self.targets = Some(targets);
                self.status = VrStatus::Active;
            }
            Err(e) => {
                log::warn!("VR disabled, rendering flat: {e}");
                for id in allocated {
                    driver.destroy_render_target(id);
                }
                if started {
                    self.runtime.shutdown();
                }
                self.status = VrStatus::Failed;
            }
        }
    }

    fn try_init(
        &mut self,
        driver: &mut dyn GraphicsDriver,
        camera: &mut HmdCamera,
        started: &mut bool,
        allocated: &mut Vec<RenderTargetId>,
    ) -> Result<EyeTargets, VrError> {
        let info = self.runtime.init()?;
        *started = true;

        let (w, h) = info
            .recommended_target_size
            .unwrap_or(self.config.fallback_target_size);
        log::info!("VR runtime {:?} ready; eye targets {w}x{h}", info.runtime_name);

        for eye in Eye::BOTH {
            let id = driver
                .create_render_target(w, h)
                .map_err(|e| VrError::RenderTarget {
                    eye,
                    reason: format!("{e:#}"),
                })?;
            allocated.push(id);
        }
        let targets = EyeTargets {
            left: allocated[0],
            right: allocated[1],
        };

        let mut staged = camera.clone();
        for eye in Eye::BOTH {
            let projection = self.runtime.projection(eye, self.config.near, self.config.far)?;
            let eye_to_head = self.runtime.eye_to_head(eye)?;
            log::debug!("{eye:?} projection: {projection}");
            log::debug!("{eye:?} eye-to-head: {eye_to_head}");
            staged.set_projection(eye, projection);
            staged.set_eye(eye, eye_to_head);
        }

        for e in driver.drain_errors() {
            log::debug!("driver error during VR init: {e}");
        }

        *camera = staged;
        Ok(targets)
    }

    /// Refreshes per-eye views from the head pose. Keeps the previous views
    /// when the pose is unavailable.
    pub fn pre_draw(&mut self, camera: &mut HmdCamera) {
        if !self.is_active() {
            return;
        }

        match self.runtime.head_pose() {
            Ok(pose) => camera.update_views(pose),
            Err(e) => log::error!("head pose query failed, keeping previous views: {e}"),
        }
    }

    /// Draws each eye into its target, Left then Right.
    ///
    /// `draw` runs with that eye's target bound and `current_eye` set. Its
    /// errors end the frame and propagate.
    pub fn render_eyes<F>(
        &mut self,
        driver: &mut dyn GraphicsDriver,
        camera: &mut HmdCamera,
        mut draw: F,
    ) -> Result<()>
    where
        F: FnMut(&mut dyn GraphicsDriver, &HmdCamera, Eye) -> Result<()>,
    {
        let Some(targets) = self.targets else {
            return Ok(());
        };

        for eye in Eye::BOTH {
            camera.set_current_eye(eye);
            driver.bind_render_target(targets.get(eye))?;
            let drawn = draw(&mut *driver, camera, eye);
            driver.unbind_render_target();
            drawn?;
        }

        Ok(())
    }

    /// Flushes the eye draws, then submits both eyes, Left then Right.
    /// Failures are logged and skipped; a failed flush skips both eyes.
    pub fn submit(&mut self, driver: &mut dyn GraphicsDriver) {
        let Some(targets) = self.targets else {
            return;
        };

        if let Err(e) = driver.flush() {
            log::error!("eye targets not flushed, skipping VR submit: {e:#}");
            return;
        }

        for eye in Eye::BOTH {
            let Some(texture) = driver.color_texture(targets.get(eye)) else {
                log::error!("{eye:?} eye target has no colour texture");
                continue;
            };
            if let Err(e) = self.runtime.submit(eye, texture) {
                log::error!("VR submit failed: {e}");
            }
        }

        for e in driver.drain_errors() {
            log::debug!("driver error after VR submit: {e}");
        }
    }

    /// Releases the runtime and eye targets once, if active.
    pub fn shutdown(&mut self, driver: &mut dyn GraphicsDriver) {
        if !self.is_active() {
            return;
        }

        log::debug!("shutting down VR runtime");
        self.runtime.shutdown();
        if let Some(targets) = self.targets.take() {
            driver.destroy_render_target(targets.left);
            driver.destroy_render_target(targets.right);
        }
        self.status = VrStatus::Released;
    }
}

impl std::fmt::Debug for VrPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VrPipeline")
            .field("status", &self.status)
            .field("targets", &self.targets)
            .finish_non_exhaustive()
    }
}
