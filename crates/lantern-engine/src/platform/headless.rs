use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;

use anyhow::{Context, Result, bail};

use crate::config::Configuration;
use crate::input::NativeEvent;
use crate::paint::Color;

use super::{GraphicsDriver, RenderTargetId, TextureHandle, WindowSystem};

// ── window ────────────────────────────────────────────────────────────────

struct WindowState {
    queue: VecDeque<NativeEvent>,
    close_requested: bool,
    close_after_polls: Option<usize>,

    framebuffer: (u32, u32),
    scale: f64,
    scaled_metrics: bool,
    position: (i32, i32),
    title: String,
    clipboard: Option<String>,
    cursor_visible: bool,
    visible: bool,

    polls: usize,
    pre_presents: usize,
    releases: usize,
    on_release: Option<Box<dyn FnMut()>>,
}

/// Window system with no native window.
///
/// Events come from a [`HeadlessController`]; everything else is plain state.
pub struct HeadlessWindow {
    state: Rc<RefCell<WindowState>>,
}

/// Test/driver handle to a [`HeadlessWindow`].
#[derive(Clone)]
pub struct HeadlessController {
    state: Rc<RefCell<WindowState>>,
}

impl HeadlessWindow {
    pub fn new(config: &Configuration) -> (Self, HeadlessController) {
        let state = Rc::new(RefCell::new(WindowState {
            queue: VecDeque::new(),
            close_requested: false,
            close_after_polls: None,
            framebuffer: (config.width, config.height),
            scale: 1.0,
            scaled_metrics: config.scaled_window_metrics.unwrap_or(false),
            position: config.position.unwrap_or((0, 0)),
            title: config.title.clone(),
            clipboard: Some(String::new()),
            cursor_visible: true,
            visible: config.show_before_setup,
            polls: 0,
            pre_presents: 0,
            releases: 0,
            on_release: None,
        }));

        (
            Self {
                state: Rc::clone(&state),
            },
            HeadlessController { state },
        )
    }
}

impl WindowSystem for HeadlessWindow {
    fn poll_events(&mut self, sink: &mut dyn FnMut(NativeEvent)) {
        let events: Vec<NativeEvent> = {
            let mut s = self.state.borrow_mut();
            s.polls += 1;
            let polls = s.polls;
            if s.close_after_polls.is_some_and(|n| polls >= n) {
                s.close_requested = true;
            }
            s.queue.drain(..).collect()
        };

        for ev in events {
            if ev == NativeEvent::CloseRequested {
                self.state.borrow_mut().close_requested = true;
            }
            sink(ev);
        }
    }

    fn should_close(&self) -> bool {
        self.state.borrow().close_requested
    }

    fn framebuffer_size(&self) -> (u32, u32) {
        self.state.borrow().framebuffer
    }

    fn content_scale(&self) -> f64 {
        self.state.borrow().scale
    }

    fn reports_scaled_metrics(&self) -> bool {
        self.state.borrow().scaled_metrics
    }

    fn position(&self) -> Result<(i32, i32)> {
        Ok(self.state.borrow().position)
    }

    fn set_position(&mut self, x: i32, y: i32) {
        self.state.borrow_mut().position = (x, y);
    }

    fn title(&self) -> String {
        self.state.borrow().title.clone()
    }

    fn set_title(&mut self, title: &str) {
        self.state.borrow_mut().title = title.to_string();
    }

    fn clipboard_text(&mut self) -> Result<String> {
        self.state
            .borrow()
            .clipboard
            .clone()
            .context("clipboard unavailable")
    }

    fn set_clipboard_text(&mut self, text: &str) -> Result<()> {
        let mut s = self.state.borrow_mut();
        match s.clipboard.as_mut() {
            Some(c) => {
                *c = text.to_string();
                Ok(())
            }
            None => bail!("clipboard unavailable"),
        }
    }

    fn set_cursor_visible(&mut self, visible: bool) {
        self.state.borrow_mut().cursor_visible = visible;
    }

    fn set_visible(&mut self, visible: bool) {
        self.state.borrow_mut().visible = visible;
    }

    fn pre_present(&mut self) {
        self.state.borrow_mut().pre_presents += 1;
    }

    fn release(&mut self) {
        let hook = {
            let mut s = self.state.borrow_mut();
            s.releases += 1;
            s.on_release.take()
        };
        if let Some(mut hook) = hook {
            hook();
        }
    }
}

impl HeadlessController {
    /// Queues an event for the next poll.
    pub fn push_event(&self, event: NativeEvent) {
        self.state.borrow_mut().queue.push_back(event);
    }

    pub fn push_events(&self, events: impl IntoIterator<Item = NativeEvent>) {
        self.state.borrow_mut().queue.extend(events);
    }

    pub fn request_close(&self) {
        self.state.borrow_mut().close_requested = true;
    }

    /// Requests close once `polls` polls have happened.
    pub fn close_after_polls(&self, polls: usize) {
        self.state.borrow_mut().close_after_polls = Some(polls);
    }

    /// Changes the framebuffer and content scale. Does not queue events.
    pub fn set_framebuffer(&self, width: u32, height: u32, scale: f64) {
        let mut s = self.state.borrow_mut();
        s.framebuffer = (width, height);
        s.scale = scale;
    }

    pub fn set_scaled_metrics(&self, scaled: bool) {
        self.state.borrow_mut().scaled_metrics = scaled;
    }

    /// Makes every clipboard call fail while `true`.
    pub fn fail_clipboard(&self, fail: bool) {
        let mut s = self.state.borrow_mut();
        s.clipboard = if fail { None } else { Some(String::new()) };
    }

    /// Runs once when the window is released.
    pub fn on_release(&self, hook: impl FnMut() + 'static) {
        self.state.borrow_mut().on_release = Some(Box::new(hook));
    }

    pub fn polls(&self) -> usize {
        self.state.borrow().polls
    }

    pub fn pre_presents(&self) -> usize {
        self.state.borrow().pre_presents
    }

    pub fn releases(&self) -> usize {
        self.state.borrow().releases
    }

    pub fn cursor_visible(&self) -> bool {
        self.state.borrow().cursor_visible
    }

    pub fn visible(&self) -> bool {
        self.state.borrow().visible
    }

    pub fn title(&self) -> String {
        self.state.borrow().title.clone()
    }

    pub fn position(&self) -> (i32, i32) {
        self.state.borrow().position
    }
}

impl std::fmt::Debug for HeadlessController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = self.state.borrow();
        f.debug_struct("HeadlessController")
            .field("queued", &s.queue.len())
            .field("polls", &s.polls)
            .field("releases", &s.releases)
            .finish()
    }
}

// ── driver ────────────────────────────────────────────────────────────────

/// One recorded driver call.
#[derive(Debug, Clone, PartialEq)]
pub enum DriverOp {
    BeginFrame((u32, u32)),
    Clear {
        target: Option<RenderTargetId>,
        color: Color,
    },
    CreateTarget {
        id: RenderTargetId,
        width: u32,
        height: u32,
    },
    DestroyTarget(RenderTargetId),
    Bind(RenderTargetId),
    Unbind,
    Flush,
    Present,
}

#[derive(Default)]
struct DriverState {
    ops: Vec<DriverOp>,
    targets: BTreeMap<RenderTargetId, (u32, u32)>,
    bound: Option<RenderTargetId>,
    next_id: u64,
    errors: Vec<String>,
    fail_render_targets: bool,
}

/// Graphics driver that records calls instead of rendering.
pub struct HeadlessDriver {
    state: Rc<RefCell<DriverState>>,
}

/// Shared view of a [`HeadlessDriver`]'s recorded calls.
#[derive(Clone)]
pub struct DriverJournal {
    state: Rc<RefCell<DriverState>>,
}

impl HeadlessDriver {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(DriverState {
                next_id: 1,
                ..DriverState::default()
            })),
        }
    }

    pub fn journal(&self) -> DriverJournal {
        DriverJournal {
            state: Rc::clone(&self.state),
        }
    }
}

impl Default for HeadlessDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphicsDriver for HeadlessDriver {
    fn begin_frame(&mut self, framebuffer: (u32, u32)) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.bound = None;
        s.ops.push(DriverOp::BeginFrame(framebuffer));
        Ok(())
    }

    fn clear(&mut self, color: Color) -> Result<()> {
        let mut s = self.state.borrow_mut();
        let target = s.bound;
        s.ops.push(DriverOp::Clear { target, color });
        Ok(())
    }

    fn create_render_target(&mut self, width: u32, height: u32) -> Result<RenderTargetId> {
        let mut s = self.state.borrow_mut();
        if s.fail_render_targets {
            bail!("render target allocation disabled ({width}x{height})");
        }

        let id = RenderTargetId(s.next_id);
        s.next_id += 1;
        s.targets.insert(id, (width, height));
        s.ops.push(DriverOp::CreateTarget { id, width, height });
        Ok(id)
    }

    fn destroy_render_target(&mut self, id: RenderTargetId) {
        let mut s = self.state.borrow_mut();
        if s.targets.remove(&id).is_some() {
            s.ops.push(DriverOp::DestroyTarget(id));
        }
    }

    fn bind_render_target(&mut self, id: RenderTargetId) -> Result<()> {
        let mut s = self.state.borrow_mut();
        if !s.targets.contains_key(&id) {
            bail!("unknown render target {id:?}");
        }
        s.bound = Some(id);
        s.ops.push(DriverOp::Bind(id));
        Ok(())
    }

    fn unbind_render_target(&mut self) {
        let mut s = self.state.borrow_mut();
        s.bound = None;
        s.ops.push(DriverOp::Unbind);
    }

    fn color_texture(&self, id: RenderTargetId) -> Option<TextureHandle> {
        self.state
            .borrow()
            .targets
            .contains_key(&id)
            .then_some(TextureHandle(id.0))
    }

    fn drain_errors(&mut self) -> Vec<String> {
        std::mem::take(&mut self.state.borrow_mut().errors)
    }

    fn flush(&mut self) -> Result<()> {
        self.state.borrow_mut().ops.push(DriverOp::Flush);
        Ok(())
    }

    fn present(&mut self) -> Result<()> {
        self.state.borrow_mut().ops.push(DriverOp::Present);
        Ok(())
    }
}

impl DriverJournal {
    pub fn ops(&self) -> Vec<DriverOp> {
        self.state.borrow().ops.clone()
    }

    pub fn clear_ops(&self) {
        self.state.borrow_mut().ops.clear();
    }

    pub fn count(&self, pred: impl Fn(&DriverOp) -> bool) -> usize {
        self.state.borrow().ops.iter().filter(|op| pred(op)).count()
    }

    pub fn frames(&self) -> usize {
        self.count(|op| matches!(op, DriverOp::BeginFrame(_)))
    }

    pub fn presents(&self) -> usize {
        self.count(|op| matches!(op, DriverOp::Present))
    }

    pub fn live_targets(&self) -> usize {
        self.state.borrow().targets.len()
    }

    /// Queues an error for the next `drain_errors`.
    pub fn inject_error(&self, message: impl Into<String>) {
        self.state.borrow_mut().errors.push(message.into());
    }

    pub fn pending_errors(&self) -> usize {
        self.state.borrow().errors.len()
    }

    pub fn fail_render_targets(&self, fail: bool) {
        self.state.borrow_mut().fail_render_targets = fail;
    }
}

impl std::fmt::Debug for DriverJournal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverJournal")
            .field("ops", &self.state.borrow().ops.len())
            .finish()
    }
}
