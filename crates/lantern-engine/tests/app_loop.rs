use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Result, bail};
use glam::{Mat4, Vec3};

use lantern_engine::config::{Configuration, VrConfig};
use lantern_engine::core::{Extension, FrameCtx, Program, ProgramCtx};
use lantern_engine::extensions::Debug2D;
use lantern_engine::hmd::Eye;
use lantern_engine::input::{
    Key, KeyAction, Modifiers, MouseButton, NativeEvent, Propagation,
};
use lantern_engine::platform::{
    Backend, DriverJournal, DriverOp, HeadlessController, HeadlessDriver, HeadlessWindow,
    RenderTargetId, TextureHandle,
};
use lantern_engine::present::{PresentationMode, UnfocusBehaviour};
use lantern_engine::vr::{SimulatedRuntime, VrError, VrStatus};
use lantern_engine::{Application, Tick, run_async};

type Log = Rc<RefCell<Vec<String>>>;

struct Sketch<S, D> {
    setup: S,
    draw: D,
}

impl<S, D> Program for Sketch<S, D>
where
    S: FnMut(&mut ProgramCtx<'_>) -> Result<()>,
    D: FnMut(&mut FrameCtx<'_>) -> Result<()>,
{
    fn setup(&mut self, ctx: &mut ProgramCtx<'_>) -> Result<()> {
        (self.setup)(ctx)
    }

    fn draw(&mut self, ctx: &mut FrameCtx<'_>) -> Result<()> {
        (self.draw)(ctx)
    }
}

fn sketch<S, D>(setup: S, draw: D) -> Sketch<S, D>
where
    S: FnMut(&mut ProgramCtx<'_>) -> Result<()>,
    D: FnMut(&mut FrameCtx<'_>) -> Result<()>,
{
    Sketch { setup, draw }
}

fn draw_only<D>(draw: D) -> Sketch<impl FnMut(&mut ProgramCtx<'_>) -> Result<()>, D>
where
    D: FnMut(&mut FrameCtx<'_>) -> Result<()>,
{
    sketch(|_: &mut ProgramCtx<'_>| Ok(()), draw)
}

struct Harness {
    app: Application,
    window: HeadlessController,
    driver: DriverJournal,
}

fn base_config() -> Configuration {
    Configuration::default()
        .headless(true)
        .show_before_setup(false)
        .manual_poll_interval(Duration::ZERO)
}

fn harness<P: Program + 'static>(config: Configuration, program: P) -> Harness {
    let (window, controller) = HeadlessWindow::new(&config);
    let driver = HeadlessDriver::new();
    let journal = driver.journal();
    let app = Application::with_backend(
        config,
        Backend::new(Box::new(window), Box::new(driver)),
        program,
    );

    Harness {
        app,
        window: controller,
        driver: journal,
    }
}

fn ticks(app: &mut Application, n: usize) {
    for _ in 0..n {
        assert_eq!(app.tick().unwrap(), Tick::Continue);
    }
}

fn vr_config() -> Configuration {
    base_config().vr(VrConfig {
        enabled: true,
        ..VrConfig::default()
    })
}

#[test]
fn automatic_mode_renders_every_tick() {
    let mut h = harness(base_config(), draw_only(|_| Ok(())));

    ticks(&mut h.app, 4);

    assert_eq!(h.app.frames(), 4);
    assert_eq!(h.driver.presents(), 4);
    assert_eq!(h.window.pre_presents(), 4);
}

#[test]
fn manual_mode_renders_only_when_requested() {
    let config = base_config().presentation_mode(PresentationMode::Manual);
    let mut h = harness(config, draw_only(|_| Ok(())));

    // The latch starts set.
    ticks(&mut h.app, 3);
    assert_eq!(h.app.frames(), 1);

    h.app.request_draw();
    ticks(&mut h.app, 2);
    assert_eq!(h.app.frames(), 2);

    let handle = h.app.handle();
    thread::spawn(move || handle.request_draw()).join().unwrap();
    ticks(&mut h.app, 1);
    assert_eq!(h.app.frames(), 3);
}

#[test]
fn refresh_request_schedules_a_manual_draw() {
    let config = base_config().presentation_mode(PresentationMode::Manual);
    let mut h = harness(config, draw_only(|_| Ok(())));

    ticks(&mut h.app, 1);
    h.window.push_event(NativeEvent::Refresh);
    // Polled at the end of this tick, rendered on the next.
    ticks(&mut h.app, 1);
    assert_eq!(h.app.frames(), 1);
    ticks(&mut h.app, 1);
    assert_eq!(h.app.frames(), 2);
}

#[test]
fn mode_change_during_draw_applies_next_tick() {
    let mut h = harness(
        base_config(),
        draw_only(|ctx| {
            ctx.set_presentation_mode(PresentationMode::Manual);
            Ok(())
        }),
    );

    ticks(&mut h.app, 5);
    assert_eq!(h.app.presentation_mode(), PresentationMode::Manual);
    assert_eq!(h.app.frames(), 1);
}

#[test]
fn draw_error_ends_loop_and_releases_once() {
    let frame = Rc::new(Cell::new(0));
    let counter = Rc::clone(&frame);
    let h = harness(
        base_config(),
        draw_only(move |_| {
            counter.set(counter.get() + 1);
            if counter.get() == 3 {
                bail!("boom on frame 3");
            }
            Ok(())
        }),
    );
    h.window.close_after_polls(100);

    let err = h.app.run().unwrap_err();

    assert!(format!("{err:#}").contains("boom on frame 3"));
    assert_eq!(frame.get(), 3);
    assert_eq!(h.driver.frames(), 3);
    assert_eq!(h.driver.presents(), 2);
    assert_eq!(h.window.releases(), 1);
}

#[test]
fn listener_error_ends_loop() {
    let h = harness(
        base_config(),
        sketch(
            |ctx: &mut ProgramCtx<'_>| {
                ctx.events
                    .keyboard
                    .key_down
                    .try_listen(|_| bail!("listener failed"));
                Ok(())
            },
            |_: &mut FrameCtx<'_>| Ok(()),
        ),
    );
    h.window.push_event(NativeEvent::Key {
        key: Key::Escape,
        scan_code: 1,
        name: None,
        action: KeyAction::Press,
        modifiers: Modifiers::NONE,
    });
    h.window.close_after_polls(100);

    let err = h.app.run().unwrap_err();

    assert!(format!("{err:#}").contains("listener failed"));
    assert_eq!(h.window.releases(), 1);
}

#[test]
fn exit_from_draw_ends_loop_cleanly() {
    let frames = Rc::new(Cell::new(0));
    let counter = Rc::clone(&frames);
    let h = harness(
        base_config(),
        draw_only(move |ctx| {
            counter.set(counter.get() + 1);
            if counter.get() == 2 {
                ctx.exit();
            }
            Ok(())
        }),
    );

    h.app.run().unwrap();

    assert_eq!(frames.get(), 2);
    assert_eq!(h.window.releases(), 1);
}

#[test]
fn close_request_ends_loop_at_tick_boundary() {
    let mut h = harness(base_config(), draw_only(|_| Ok(())));

    ticks(&mut h.app, 1);
    h.window.push_event(NativeEvent::CloseRequested);
    ticks(&mut h.app, 1);

    assert_eq!(h.app.tick().unwrap(), Tick::Exit);
    assert_eq!(h.app.frames(), 2);
}

#[test]
fn drop_releases_window_exactly_once() {
    let mut h = harness(base_config(), draw_only(|_| Ok(())));
    ticks(&mut h.app, 1);

    h.app.shutdown();
    h.app.shutdown();
    drop(h.app);

    assert_eq!(h.window.releases(), 1);
}

#[test]
fn key_listeners_run_in_order_for_down_then_up() {
    let log: Log = Rc::default();
    let setup_log = Rc::clone(&log);

    let h = harness(
        base_config(),
        sketch(
            move |ctx: &mut ProgramCtx<'_>| {
                let keyboard = &ctx.events.keyboard;
                for (name, cancels) in [("L1", true), ("L2", false)] {
                    let l = Rc::clone(&setup_log);
                    keyboard.key_down.listen(move |e| {
                        let seen = e.propagation_cancelled();
                        l.borrow_mut().push(format!("{name} down {seen}"));
                        if cancels {
                            e.cancel_propagation();
                        }
                    });
                    let l = Rc::clone(&setup_log);
                    keyboard.key_up.listen(move |e| {
                        l.borrow_mut().push(format!("{name} up {}", e.name));
                    });
                }
                Ok(())
            },
            |ctx: &mut FrameCtx<'_>| {
                if ctx.time.frame_index == 2 {
                    ctx.exit();
                }
                Ok(())
            },
        ),
    );

    for action in [KeyAction::Press, KeyAction::Release] {
        h.window.push_event(NativeEvent::Key {
            key: Key::A,
            scan_code: 30,
            name: Some("a".to_string()),
            action,
            modifiers: Modifiers::NONE,
        });
    }

    h.app.run().unwrap();

    assert_eq!(
        *log.borrow(),
        vec!["L1 down false", "L2 down true", "L1 up a", "L2 up a"]
    );
}

#[test]
fn press_drag_release_delivers_drag_then_up_then_click() {
    let log: Log = Rc::default();
    let setup_log = Rc::clone(&log);

    let mut h = harness(
        base_config(),
        sketch(
            move |ctx: &mut ProgramCtx<'_>| {
                let mouse = &ctx.events.mouse;
                let l = Rc::clone(&setup_log);
                mouse.dragged.listen(move |e| {
                    let d = e.drag_displacement;
                    l.borrow_mut().push(format!("dragged {},{}", d.x, d.y));
                });
                let l = Rc::clone(&setup_log);
                mouse.button_up.listen(move |_| l.borrow_mut().push("button_up".into()));
                let l = Rc::clone(&setup_log);
                mouse.clicked.listen(move |e| {
                    let p = e.position;
                    l.borrow_mut().push(format!("clicked {},{}", p.x, p.y));
                });
                Ok(())
            },
            |_: &mut FrameCtx<'_>| Ok(()),
        ),
    );

    let button = |pressed| NativeEvent::MouseButton {
        button: MouseButton::Left,
        pressed,
        modifiers: Modifiers::NONE,
    };
    h.window.push_events([
        NativeEvent::CursorMoved { x: 10.0, y: 10.0 },
        button(true),
        NativeEvent::CursorMoved { x: 50.0, y: 10.0 },
        button(false),
    ]);

    // Captured at the end of tick 1, delivered before the draw of tick 2.
    ticks(&mut h.app, 2);

    assert_eq!(
        *log.borrow(),
        vec!["dragged 40,0", "button_up", "clicked 50,10"]
    );
}

#[test]
fn resize_recomputes_geometry_and_publishes_sized() {
    let sizes: Rc<RefCell<Vec<(f32, f32)>>> = Rc::default();
    let seen = Rc::clone(&sizes);

    let mut h = harness(
        base_config(),
        sketch(
            move |ctx: &mut ProgramCtx<'_>| {
                let seen = Rc::clone(&seen);
                ctx.events
                    .window
                    .sized
                    .listen(move |e| seen.borrow_mut().push((e.size.x, e.size.y)));
                Ok(())
            },
            |_: &mut FrameCtx<'_>| Ok(()),
        ),
    );

    ticks(&mut h.app, 1);
    h.window.set_framebuffer(801, 600, 2.0);
    h.window.push_event(NativeEvent::FramebufferResized {
        width: 801,
        height: 600,
    });
    ticks(&mut h.app, 2);

    let geometry = h.app.geometry();
    assert_eq!((geometry.width, geometry.height), (401, 300));
    assert_eq!(*sizes.borrow(), vec![(401.0, 300.0)]);
    assert_eq!(h.driver.count(|op| *op == DriverOp::BeginFrame((801, 600))), 2);
}

#[test]
fn unfocused_window_is_throttled() {
    let config = base_config()
        .unfocus_behaviour(UnfocusBehaviour::Throttle)
        .throttle_interval(Duration::from_millis(40));
    let mut h = harness(config, draw_only(|_| Ok(())));

    ticks(&mut h.app, 1);
    assert!(h.app.focused());

    h.window.push_event(NativeEvent::Focus(false));
    ticks(&mut h.app, 1);
    assert!(!h.app.focused());

    let started = Instant::now();
    ticks(&mut h.app, 1);
    assert!(started.elapsed() >= Duration::from_millis(40));
}

#[test]
fn unfocused_manual_tick_is_throttled_without_rendering() {
    let config = base_config()
        .presentation_mode(PresentationMode::Manual)
        .unfocus_behaviour(UnfocusBehaviour::Throttle)
        .throttle_interval(Duration::from_millis(40));
    let mut h = harness(config, draw_only(|_| Ok(())));

    ticks(&mut h.app, 1);
    h.window.push_event(NativeEvent::Focus(false));
    ticks(&mut h.app, 1);
    assert!(!h.app.focused());
    assert_eq!(h.app.frames(), 1);

    let started = Instant::now();
    ticks(&mut h.app, 1);
    assert!(started.elapsed() >= Duration::from_millis(40));
    assert_eq!(h.app.frames(), 1);
}

#[test]
fn startup_clears_before_setup_and_hides_cursor() {
    let config = base_config().show_before_setup(true).hide_cursor(true);
    let (window, controller) = HeadlessWindow::new(&config);
    let driver = HeadlessDriver::new();
    let journal = driver.journal();

    let presents_at_setup = Rc::new(Cell::new(usize::MAX));
    let probe = (Rc::clone(&presents_at_setup), journal.clone());
    let mut app = Application::with_backend(
        config,
        Backend::new(Box::new(window), Box::new(driver)),
        sketch(
            move |_: &mut ProgramCtx<'_>| {
                probe.0.set(probe.1.presents());
                Ok(())
            },
            |_: &mut FrameCtx<'_>| Ok(()),
        ),
    );

    app.start().unwrap();

    assert_eq!(presents_at_setup.get(), 1);
    assert!(!controller.cursor_visible());
    assert!(controller.visible());
}

struct Tagger {
    name: &'static str,
    log: Log,
}

impl Extension for Tagger {
    fn setup(&mut self, ctx: &mut ProgramCtx<'_>) -> Result<()> {
        self.log.borrow_mut().push(format!("setup {}", self.name));
        if self.name == "outer" {
            ctx.extend(Tagger {
                name: "inner",
                log: Rc::clone(&self.log),
            })?;
        }
        Ok(())
    }

    fn before_draw(&mut self, _ctx: &mut FrameCtx<'_>) -> Result<()> {
        self.log.borrow_mut().push(format!("before {}", self.name));
        Ok(())
    }

    fn after_draw(&mut self, _ctx: &mut FrameCtx<'_>) -> Result<()> {
        self.log.borrow_mut().push(format!("after {}", self.name));
        Ok(())
    }
}

#[test]
fn extensions_set_up_after_program_and_wrap_draw() {
    let log: Log = Rc::default();
    let (setup_log, draw_log) = (Rc::clone(&log), Rc::clone(&log));

    let mut h = harness(
        base_config(),
        sketch(
            move |ctx: &mut ProgramCtx<'_>| {
                setup_log.borrow_mut().push("setup program".into());
                ctx.extend(Tagger {
                    name: "outer",
                    log: Rc::clone(&setup_log),
                })?;
                Ok(())
            },
            move |_: &mut FrameCtx<'_>| {
                draw_log.borrow_mut().push("draw".into());
                Ok(())
            },
        ),
    );

    ticks(&mut h.app, 1);

    assert_eq!(
        *log.borrow(),
        vec![
            "setup program",
            "setup outer",
            "setup inner",
            "before outer",
            "before inner",
            "draw",
            "after inner",
            "after outer",
        ]
    );
}

#[test]
fn extension_installed_first_sees_drags_before_program_listeners() {
    let camera = Rc::new(RefCell::new(Debug2D::new()));
    let installed = Rc::clone(&camera);

    let mut h = harness(
        base_config(),
        sketch(
            move |ctx: &mut ProgramCtx<'_>| {
                ctx.extend(Rc::clone(&installed))?;
                ctx.events
                    .mouse
                    .dragged
                    .listen(|e| e.cancel_propagation());
                Ok(())
            },
            |_: &mut FrameCtx<'_>| Ok(()),
        ),
    );

    h.window.push_events([
        NativeEvent::CursorMoved { x: 10.0, y: 10.0 },
        NativeEvent::MouseButton {
            button: MouseButton::Left,
            pressed: true,
            modifiers: Modifiers::NONE,
        },
        NativeEvent::CursorMoved { x: 50.0, y: 10.0 },
    ]);
    ticks(&mut h.app, 2);

    let view = camera.borrow().view();
    assert_ne!(view, Mat4::IDENTITY);
    assert_eq!(view.transform_point3(Vec3::ZERO), Vec3::new(40.0, 0.0, 0.0));
}

#[test]
fn clipboard_failure_reads_as_empty_string() {
    let mut h = harness(base_config(), draw_only(|_| Ok(())));

    h.app.set_clipboard("hello");
    assert_eq!(h.app.clipboard(), "hello");

    h.window.fail_clipboard(true);
    assert_eq!(h.app.clipboard(), "");
    h.app.set_clipboard("dropped");
}

#[test]
fn window_position_and_title_round_trip() {
    let config = base_config().scaled_window_metrics(Some(true));
    let mut h = harness(config, draw_only(|_| Ok(())));
    h.window.set_framebuffer(640, 480, 2.0);
    ticks(&mut h.app, 1);

    h.app.set_position(lantern_engine::coords::Vec2::new(15.0, 25.0));
    assert_eq!(h.window.position(), (30, 50));
    assert_eq!(
        h.app.position(),
        lantern_engine::coords::Vec2::new(15.0, 25.0)
    );

    h.app.set_title("renamed");
    assert_eq!(h.app.title(), "renamed");
    assert_eq!(h.window.title(), "renamed");
}

// ── VR ────────────────────────────────────────────────────────────────────

fn eye_log() -> (Rc<RefCell<Vec<Option<Eye>>>>, impl FnMut(&mut FrameCtx<'_>) -> Result<()>) {
    let eyes: Rc<RefCell<Vec<Option<Eye>>>> = Rc::default();
    let seen = Rc::clone(&eyes);
    (eyes, move |ctx: &mut FrameCtx<'_>| {
        seen.borrow_mut().push(ctx.eye);
        Ok(())
    })
}

#[test]
fn vr_init_failure_falls_back_to_flat_rendering() {
    let runtime = SimulatedRuntime::new().failing_init(VrError::Init("no headset".into()));
    let record = runtime.record();
    let (eyes, draw) = eye_log();

    let mut h = harness(vr_config(), draw_only(draw));
    h.app = h.app.with_vr_runtime(Box::new(runtime));

    ticks(&mut h.app, 2);

    assert_eq!(h.app.vr_status(), VrStatus::Failed);
    assert_eq!(record.borrow().inits, 1);
    assert_eq!(*eyes.borrow(), vec![None, None]);
    assert_eq!(h.app.camera().current_eye(), Eye::Left);
    assert_eq!(h.driver.live_targets(), 0);
    assert_eq!(h.driver.presents(), 2);
}

#[test]
fn vr_draws_each_eye_into_its_target_and_submits_in_order() {
    let runtime = SimulatedRuntime::new().with_target_size(100, 120);
    let record = runtime.record();
    let (eyes, draw) = eye_log();

    let mut h = harness(vr_config(), draw_only(draw));
    h.app = h.app.with_vr_runtime(Box::new(runtime));

    ticks(&mut h.app, 1);

    assert_eq!(h.app.vr_status(), VrStatus::Active);
    assert_eq!(*eyes.borrow(), vec![Some(Eye::Left), Some(Eye::Right)]);
    assert_eq!(
        record.borrow().submissions,
        vec![
            (Eye::Left, TextureHandle(1)),
            (Eye::Right, TextureHandle(2)),
        ]
    );

    let clears: Vec<Option<RenderTargetId>> = h
        .driver
        .ops()
        .into_iter()
        .filter_map(|op| match op {
            DriverOp::Clear { target, .. } => Some(target),
            _ => None,
        })
        .collect();
    assert_eq!(clears, vec![Some(RenderTargetId(1)), Some(RenderTargetId(2))]);
    assert_eq!(h.app.camera().current_eye(), Eye::Right);

    let ops = h.driver.ops();
    let flush = ops.iter().position(|op| *op == DriverOp::Flush).unwrap();
    let last_unbind = ops.iter().rposition(|op| *op == DriverOp::Unbind).unwrap();
    assert!(last_unbind < flush);
    assert_eq!(ops[flush + 1..], [DriverOp::Present]);
}

#[test]
fn vr_mirror_draws_the_window_after_the_eyes() {
    let config = base_config().vr(VrConfig {
        enabled: true,
        mirror_to_window: true,
        ..VrConfig::default()
    });
    let (eyes, draw) = eye_log();

    let mut h = harness(config, draw_only(draw));
    h.app = h.app.with_vr_runtime(Box::new(SimulatedRuntime::new()));

    ticks(&mut h.app, 1);

    assert_eq!(
        *eyes.borrow(),
        vec![Some(Eye::Left), Some(Eye::Right), None]
    );
}

#[test]
fn vr_eye_transforms_follow_the_head_pose() {
    let head = Mat4::from_translation(Vec3::new(0.0, 0.0, -2.0));
    let runtime = SimulatedRuntime::new()
        .with_ipd(0.06)
        .script_poses([Ok(head), Err(VrError::Pose("tracking lost".into()))]);

    let views: Rc<RefCell<Vec<Mat4>>> = Rc::default();
    let seen = Rc::clone(&views);
    let mut h = harness(
        vr_config(),
        draw_only(move |ctx| {
            seen.borrow_mut().push(ctx.transforms.view);
            Ok(())
        }),
    );
    h.app = h.app.with_vr_runtime(Box::new(runtime));

    ticks(&mut h.app, 2);

    let left = Mat4::from_translation(Vec3::new(-0.03, 0.0, 0.0)) * head;
    let views = views.borrow();
    assert_eq!(views.len(), 4);
    assert!(views[0].abs_diff_eq(left, 1e-6));
    // Second frame's pose failed; previous views are kept.
    assert_eq!(views[2], views[0]);
    assert_eq!(h.app.camera().view_left, views[0]);
}

#[test]
fn vr_runtime_shuts_down_before_window_release() {
    let runtime = SimulatedRuntime::new();
    let record = runtime.record();

    let mut h = harness(vr_config(), draw_only(|_| Ok(())));
    h.app = h.app.with_vr_runtime(Box::new(runtime));
    ticks(&mut h.app, 1);

    let vr_down_first = Rc::new(Cell::new(false));
    let (flag, probe) = (Rc::clone(&vr_down_first), Rc::clone(&record));
    h.window
        .on_release(move || flag.set(probe.borrow().shutdowns == 1));

    drop(h.app);

    assert!(vr_down_first.get());
    assert_eq!(record.borrow().shutdowns, 1);
    assert_eq!(h.driver.live_targets(), 0);
    assert_eq!(h.window.releases(), 1);
}

// ── threading ─────────────────────────────────────────────────────────────

#[test]
fn run_async_runs_until_exit() {
    let app = run_async(base_config(), || draw_only(|_| Ok(()))).unwrap();

    let handle = app.handle();
    thread::sleep(Duration::from_millis(20));
    handle.exit();

    app.join().unwrap();
}

#[test]
fn run_async_draw_requests_cross_threads() {
    let config = base_config().presentation_mode(PresentationMode::Manual);
    let app = run_async(config, || {
        let mut frames = 0;
        draw_only(move |ctx| {
            frames += 1;
            if frames == 3 {
                ctx.exit();
            }
            Ok(())
        })
    })
    .unwrap();

    let handle = app.handle();
    while !app.is_finished() {
        handle.request_draw();
        thread::sleep(Duration::from_millis(2));
    }

    app.join().unwrap();
}
