use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;

use crate::present::DrawLatch;

use super::ctx::{FrameCtx, ProgramCtx};

/// User program driven by the application loop.
pub trait Program {
    /// Called once, before the first frame.
    fn setup(&mut self, ctx: &mut ProgramCtx<'_>) -> Result<()> {
        let _ = ctx;
        Ok(())
    }

    /// Called once per rendered frame, and once per eye while VR is active.
    fn draw(&mut self, ctx: &mut FrameCtx<'_>) -> Result<()>;
}

/// Hook around the program's draw call.
///
/// `before_draw` hooks run in installation order, `after_draw` hooks in
/// reverse. `enabled` is checked at every call.
pub trait Extension {
    fn enabled(&self) -> bool {
        true
    }

    fn setup(&mut self, ctx: &mut ProgramCtx<'_>) -> Result<()> {
        let _ = ctx;
        Ok(())
    }

    fn before_draw(&mut self, ctx: &mut FrameCtx<'_>) -> Result<()> {
        let _ = ctx;
        Ok(())
    }

    fn after_draw(&mut self, ctx: &mut FrameCtx<'_>) -> Result<()> {
        let _ = ctx;
        Ok(())
    }
}

/// Shared extension: keep a clone to toggle or inspect it while installed.
impl<E: Extension> Extension for Rc<RefCell<E>> {
    fn enabled(&self) -> bool {
        self.borrow().enabled()
    }

    fn setup(&mut self, ctx: &mut ProgramCtx<'_>) -> Result<()> {
        self.borrow_mut().setup(ctx)
    }

    fn before_draw(&mut self, ctx: &mut FrameCtx<'_>) -> Result<()> {
        self.borrow_mut().before_draw(ctx)
    }

    fn after_draw(&mut self, ctx: &mut FrameCtx<'_>) -> Result<()> {
        self.borrow_mut().after_draw(ctx)
    }
}

/// Cross-thread handle to a running application.
///
/// Only touches atomic flags; safe to use from any thread.
#[derive(Debug, Clone)]
pub struct AppHandle {
    draw: DrawLatch,
    exit: Arc<AtomicBool>,
}

impl AppHandle {
    pub(crate) fn new(draw: DrawLatch) -> Self {
        Self {
            draw,
            exit: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Makes the next tick render, in either presentation mode.
    pub fn request_draw(&self) {
        self.draw.request();
    }

    /// Ends the loop at the next tick boundary.
    pub fn exit(&self) {
        self.exit.store(true, Ordering::Release);
    }

    pub fn exit_requested(&self) -> bool {
        self.exit.load(Ordering::Acquire)
    }
}
