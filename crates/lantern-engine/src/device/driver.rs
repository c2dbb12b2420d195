use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result, bail, ensure};
use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::paint::Color;
use crate::platform::{GraphicsDriver, RenderTargetId, TextureHandle};

use super::surface::{apply_resize, choose_alpha_mode, choose_surface_format, map_surface_error};
use super::{ErrorLog, GpuInit, SurfaceErrorAction};

struct OffscreenTarget {
    // Kept alive for `view`.
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

/// Commands for the frame between `begin_frame` and `present`.
struct Frame {
    encoder: wgpu::CommandEncoder,
    /// `None` when the surface could not be acquired this frame; offscreen
    /// targets still render.
    surface: Option<(wgpu::SurfaceTexture, wgpu::TextureView)>,
}

/// [`GraphicsDriver`] over a wgpu device and a window surface.
pub struct WgpuDriver {
    // Declared before `window` so the surface drops first.
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,
    offscreen_format: wgpu::TextureFormat,

    frame: Option<Frame>,
    targets: HashMap<RenderTargetId, OffscreenTarget>,
    bound: Option<RenderTargetId>,
    next_target: u64,
    errors: ErrorLog,

    _window: Arc<Window>,
}

impl WgpuDriver {
    /// Blocking wrapper around [`WgpuDriver::new_async`].
    pub fn new(window: Arc<Window>, init: GpuInit) -> Result<Self> {
        pollster::block_on(Self::new_async(window, init))
    }

    pub async fn new_async(window: Arc<Window>, init: GpuInit) -> Result<Self> {
        let size = window.inner_size();
        ensure!(size.width > 0 && size.height > 0, "window has zero size");

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(Arc::clone(&window))
            .context("failed to create wgpu surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        log::info!("using adapter {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("lantern device"),
                required_features: init.required_features,
                required_limits: init.required_limits,
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        let errors = ErrorLog::default();
        device.on_uncaptured_error(Arc::new(errors.uncaptured_handler()));

        let caps = surface.get_capabilities(&adapter);
        let format =
            choose_surface_format(&caps, init.prefer_srgb).context("no supported surface formats")?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width,
            height: size.height,
            present_mode: init.present_mode,
            alpha_mode: choose_alpha_mode(&caps, init.alpha_mode),
            view_formats: vec![],
            desired_maximum_frame_latency: init.desired_maximum_frame_latency,
        };
        surface.configure(&device, &config);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            size,
            offscreen_format: init.offscreen_format,
            frame: None,
            targets: HashMap::new(),
            bound: None,
            next_target: 1,
            errors,
            _window: window,
        })
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    fn acquire_surface(&mut self) -> Result<Option<(wgpu::SurfaceTexture, wgpu::TextureView)>> {
        if self.size.width == 0 || self.size.height == 0 {
            return Ok(None);
        }

        match self.surface.get_current_texture() {
            Ok(texture) => {
                let view = texture
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default());
                Ok(Some((texture, view)))
            }
            Err(e) => {
                let action =
                    map_surface_error(&self.surface, &self.device, &self.config, self.size, &e);
                match action {
                    SurfaceErrorAction::Fatal => bail!("surface error: {e}"),
                    SurfaceErrorAction::Reconfigured | SurfaceErrorAction::SkipFrame => {
                        log::debug!("surface frame skipped ({action:?}): {e}");
                        self.errors.push(format!("surface: {e}"));
                        Ok(None)
                    }
                }
            }
        }
    }
}

impl GraphicsDriver for WgpuDriver {
    fn begin_frame(&mut self, framebuffer: (u32, u32)) -> Result<()> {
        let (w, h) = framebuffer;
        if (w, h) != (self.size.width, self.size.height) {
            apply_resize(
                &self.surface,
                &self.device,
                &mut self.config,
                &mut self.size,
                PhysicalSize::new(w, h),
            );
        }

        if self.frame.take().is_some() {
            log::warn!("previous frame was never presented; dropping it");
        }
        self.bound = None;

        let surface = self.acquire_surface()?;
        let encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("lantern frame encoder"),
            });

        self.frame = Some(Frame { encoder, surface });
        Ok(())
    }

    fn clear(&mut self, color: Color) -> Result<()> {
        let Some(frame) = self.frame.as_mut() else {
            bail!("clear outside of a frame");
        };

        let view = match self.bound {
            Some(id) => match self.targets.get(&id) {
                Some(t) => &t.view,
                None => bail!("bound render target {id:?} no longer exists"),
            },
            None => match frame.surface.as_ref() {
                Some((_, view)) => view,
                None => return Ok(()),
            },
        };

        // Dropped right away; the clear is the whole pass.
        let _rpass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("lantern clear"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(color.into()),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        Ok(())
    }

    fn create_render_target(&mut self, width: u32, height: u32) -> Result<RenderTargetId> {
        let max = self.device.limits().max_texture_dimension_2d;
        ensure!(
            width > 0 && height > 0 && width <= max && height <= max,
            "invalid render target size {width}x{height} (max {max})"
        );

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("lantern offscreen target"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.offscreen_format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let id = RenderTargetId(self.next_target);
        self.next_target += 1;
        self.targets.insert(
            id,
            OffscreenTarget {
                _texture: texture,
                view,
            },
        );

        log::debug!("created render target {id:?} ({width}x{height})");
        Ok(id)
    }

    fn destroy_render_target(&mut self, id: RenderTargetId) {
        if self.bound == Some(id) {
            self.bound = None;
        }
        self.targets.remove(&id);
    }

    fn bind_render_target(&mut self, id: RenderTargetId) -> Result<()> {
        ensure!(self.targets.contains_key(&id), "unknown render target {id:?}");
        self.bound = Some(id);
        Ok(())
    }

    fn unbind_render_target(&mut self) {
        self.bound = None;
    }

    // wgpu exposes no raw texture names without hal interop; the handle is the
    // target id and only meaningful to a compositor bound to this driver.
    fn color_texture(&self, id: RenderTargetId) -> Option<TextureHandle> {
        self.targets.contains_key(&id).then_some(TextureHandle(id.0))
    }

    fn drain_errors(&mut self) -> Vec<String> {
        self.errors.take()
    }

    fn flush(&mut self) -> Result<()> {
        let Some(frame) = self.frame.as_mut() else {
            return Ok(());
        };

        let next = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("lantern frame encoder"),
            });
        let recorded = std::mem::replace(&mut frame.encoder, next);
        self.queue.submit(std::iter::once(recorded.finish()));
        Ok(())
    }

    fn present(&mut self) -> Result<()> {
        let Some(frame) = self.frame.take() else {
            return Ok(());
        };

        self.queue.submit(std::iter::once(frame.encoder.finish()));

        if let Some((texture, view)) = frame.surface {
            drop(view);
            texture.present();
        }

        Ok(())
    }
}
