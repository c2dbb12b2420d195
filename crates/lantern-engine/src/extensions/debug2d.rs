use std::cell::Cell;
use std::rc::Rc;

use anyhow::Result;
use glam::{Mat4, Vec3};

use crate::core::{Extension, FrameCtx, ProgramCtx};
use crate::input::{MouseEvent, Propagation};

/// Pan/zoom camera for 2D sketches.
///
/// Mouse drags pan, scrolling zooms around the cursor. Events whose
/// propagation was cancelled by an earlier listener are ignored. The view is
/// written to `transforms.view` before every draw.
#[derive(Debug)]
pub struct Debug2D {
    pub enabled: bool,
    view: Rc<Cell<Mat4>>,
}

impl Debug2D {
    pub fn new() -> Self {
        Self {
            enabled: true,
            view: Rc::new(Cell::new(Mat4::IDENTITY)),
        }
    }

    pub fn view(&self) -> Mat4 {
        self.view.get()
    }

    pub fn reset(&self) {
        self.view.set(Mat4::IDENTITY);
    }
}

impl Default for Debug2D {
    fn default() -> Self {
        Self::new()
    }
}

fn pan(view: Mat4, e: &MouseEvent) -> Mat4 {
    let scale = view.x_axis.x;
    let scale = if scale.abs() > f32::EPSILON { scale } else { 1.0 };
    let d = glam::Vec2::from(e.drag_displacement) / scale;
    view * Mat4::from_translation(Vec3::new(d.x, d.y, 0.0))
}

fn zoom(view: Mat4, e: &MouseEvent) -> Mat4 {
    let p = glam::Vec2::from(e.position);
    let factor = 1.0 + e.scroll_delta().y * 0.01;
    view * Mat4::from_translation(Vec3::new(p.x, p.y, 0.0))
        * Mat4::from_scale(Vec3::new(factor, factor, 1.0))
        * Mat4::from_translation(Vec3::new(-p.x, -p.y, 0.0))
}

impl Extension for Debug2D {
    fn enabled(&self) -> bool {
        self.enabled
    }

    fn setup(&mut self, ctx: &mut ProgramCtx<'_>) -> Result<()> {
        let view = Rc::clone(&self.view);
        ctx.events.mouse.dragged.listen(move |e| {
            if !e.propagation_cancelled() {
                view.set(pan(view.get(), e));
            }
        });

        let view = Rc::clone(&self.view);
        ctx.events.mouse.scrolled.listen(move |e| {
            if !e.propagation_cancelled() {
                view.set(zoom(view.get(), e));
            }
        });

        Ok(())
    }

    fn before_draw(&mut self, ctx: &mut FrameCtx<'_>) -> Result<()> {
        ctx.transforms.view = self.view.get();
        Ok(())
    }
}
