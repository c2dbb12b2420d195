use std::cell::Cell;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// When the loop renders.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum PresentationMode {
    /// Every tick renders; input is flushed by the render step.
    #[default]
    Automatic,
    /// A tick renders only after [`DrawLatch::request`]; input is flushed by
    /// an explicit delivery pass after each tick.
    Manual,
}

/// What the loop does while the window is unfocused.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum UnfocusBehaviour {
    #[default]
    Normal,
    /// Sleep a fixed interval after each rendered tick.
    Throttle,
}

/// Draw-request flag shared with other threads.
///
/// Starts set so the first tick always renders.
#[derive(Debug, Clone)]
pub struct DrawLatch(Arc<AtomicBool>);

impl DrawLatch {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Consumes the flag, returning whether it was set.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }
}

impl Default for DrawLatch {
    fn default() -> Self {
        Self::new()
    }
}

/// Decision for one native-loop tick.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct TickPlan {
    /// Mode snapshot; changes during the tick apply to the next one.
    pub mode: PresentationMode,
    pub render: bool,
}

impl TickPlan {
    /// Manual ticks end with sleep, poll and an explicit delivery pass.
    pub fn explicit_delivery(&self) -> bool {
        self.mode == PresentationMode::Manual
    }
}

/// Two-mode presentation policy plus unfocus throttling.
#[derive(Debug)]
pub struct PresentationScheduler {
    mode: Cell<PresentationMode>,
    unfocus: UnfocusBehaviour,
    throttle_interval: Duration,
    manual_poll_interval: Duration,
    latch: DrawLatch,
}

impl PresentationScheduler {
    pub const DEFAULT_THROTTLE_INTERVAL: Duration = Duration::from_millis(100);
    pub const DEFAULT_MANUAL_POLL_INTERVAL: Duration = Duration::from_millis(1);

    pub fn new(
        mode: PresentationMode,
        unfocus: UnfocusBehaviour,
        throttle_interval: Duration,
        manual_poll_interval: Duration,
    ) -> Self {
        Self {
            mode: Cell::new(mode),
            unfocus,
            throttle_interval,
            manual_poll_interval,
            latch: DrawLatch::new(),
        }
    }

    pub fn mode(&self) -> PresentationMode {
        self.mode.get()
    }

    pub fn set_mode(&self, mode: PresentationMode) {
        if self.mode.replace(mode) != mode {
            log::debug!("presentation mode set to {mode:?}");
        }
    }

    pub fn latch(&self) -> &DrawLatch {
        &self.latch
    }

    pub fn request_draw(&self) {
        self.latch.request();
    }

    pub fn manual_poll_interval(&self) -> Duration {
        self.manual_poll_interval
    }

    /// Plans the current tick.
    ///
    /// The latch is consumed whenever the tick renders, in both modes.
    pub fn plan(&self) -> TickPlan {
        let mode = self.mode.get();
        let requested = self.latch.take();

        let render = match mode {
            PresentationMode::Automatic => true,
            PresentationMode::Manual => requested,
        };

        TickPlan { mode, render }
    }

    /// Sleep owed after rendering, if any.
    pub fn throttle(&self, focused: bool) -> Option<Duration> {
        match self.unfocus {
            UnfocusBehaviour::Throttle if !focused => Some(self.throttle_interval),
            _ => None,
        }
    }
}

impl Default for PresentationScheduler {
    fn default() -> Self {
        Self::new(
            PresentationMode::Automatic,
            UnfocusBehaviour::Normal,
            Self::DEFAULT_THROTTLE_INTERVAL,
            Self::DEFAULT_MANUAL_POLL_INTERVAL,
        )
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    fn manual() -> PresentationScheduler {
        let s = PresentationScheduler::default();
        s.set_mode(PresentationMode::Manual);
        s
    }

    #[test]
    fn automatic_renders_every_tick() {
        let s = PresentationScheduler::default();
        for _ in 0..5 {
            assert!(s.plan().render);
        }
        assert!(!s.latch().is_set());
    }

    #[test]
    fn manual_renders_only_when_latched() {
        let s = manual();

        // Latch starts set.
        assert!(s.plan().render);
        assert!(!s.plan().render);
        assert!(!s.plan().render);

        s.request_draw();
        assert!(s.plan().render);
        assert!(!s.plan().render);
    }

    #[test]
    fn request_from_other_thread_renders_next_tick() {
        let s = manual();
        assert!(s.plan().render);

        let latch = s.latch().clone();
        thread::spawn(move || latch.request()).join().unwrap();

        assert!(s.plan().render);
    }

    #[test]
    fn plan_snapshots_mode() {
        let s = PresentationScheduler::default();
        let plan = s.plan();
        s.set_mode(PresentationMode::Manual);

        assert_eq!(plan.mode, PresentationMode::Automatic);
        assert!(!plan.explicit_delivery());
        assert!(s.plan().explicit_delivery());
    }

    #[test]
    fn throttle_applies_only_when_unfocused() {
        let s = PresentationScheduler::new(
            PresentationMode::Automatic,
            UnfocusBehaviour::Throttle,
            Duration::from_millis(100),
            Duration::from_millis(1),
        );
        assert_eq!(s.throttle(true), None);
        assert_eq!(s.throttle(false), Some(Duration::from_millis(100)));

        assert_eq!(PresentationScheduler::default().throttle(false), None);
    }
}
