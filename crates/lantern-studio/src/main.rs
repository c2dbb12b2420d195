use std::cell::RefCell;
use std::rc::Rc;

use anyhow::Result;
use clap::Parser;

use lantern_engine::config::VrConfig;
use lantern_engine::extensions::Debug2D;
use lantern_engine::hmd::Eye;
use lantern_engine::input::Key;
use lantern_engine::logging::{LoggingConfig, init_logging};
use lantern_engine::paint::Color;
use lantern_engine::vr::SimulatedRuntime;
use lantern_engine::{
    Application, Configuration, FrameCtx, PresentationMode, Program, ProgramCtx,
    UnfocusBehaviour,
};

/// Interactive sketch for trying out the lantern loop.
///
/// Drag to pan, scroll to zoom, Space toggles the pan/zoom camera, R resets
/// it, Escape quits.
#[derive(Parser, Debug)]
#[command(name = "lantern-studio", version)]
struct Args {
    /// Run without a native window.
    #[arg(long)]
    headless: bool,

    /// Only redraw on input instead of every tick.
    #[arg(long)]
    manual: bool,

    /// Render in stereo through the simulated headset.
    #[arg(long)]
    simulate_vr: bool,

    /// Exit after this many frames.
    #[arg(long, value_name = "N")]
    frames: Option<u64>,

    /// Throttle the loop while the window is unfocused.
    #[arg(long)]
    throttle: bool,

    #[arg(long)]
    debug: bool,

    #[arg(long)]
    trace: bool,
}

/// Headless runs have no way to close; cap them unless told otherwise.
const HEADLESS_FRAMES: u64 = 300;

struct Studio {
    frame_limit: Option<u64>,
    camera: Rc<RefCell<Debug2D>>,
}

impl Studio {
    fn new(frame_limit: Option<u64>) -> Self {
        Self {
            frame_limit,
            camera: Rc::new(RefCell::new(Debug2D::new())),
        }
    }
}

impl Program for Studio {
    fn setup(&mut self, ctx: &mut ProgramCtx<'_>) -> Result<()> {
        log::info!(
            "window {}x{} at scale {}",
            ctx.window.width,
            ctx.window.height,
            ctx.window.scale
        );
        log::debug!("clipboard holds {} chars", ctx.clipboard().chars().count());

        ctx.extend(Rc::clone(&self.camera))?;

        let handle = ctx.handle();
        let camera = Rc::clone(&self.camera);
        ctx.events.keyboard.key_down.listen(move |e| match e.key {
            Key::Escape => handle.exit(),
            Key::Space => {
                let mut camera = camera.borrow_mut();
                camera.enabled = !camera.enabled;
                log::info!("pan/zoom camera enabled: {}", camera.enabled);
                handle.request_draw();
            }
            Key::R => {
                camera.borrow().reset();
                handle.request_draw();
            }
            _ => log::debug!("key down: {} ({})", e.name, e.key),
        });

        let handle = ctx.handle();
        ctx.events.mouse.clicked.listen(move |e| {
            log::info!("{:?} click at {:?}", e.button, e.position);
            handle.request_draw();
        });

        // Manual mode only redraws when asked.
        let handle = ctx.handle();
        ctx.events.mouse.dragged.listen(move |_| handle.request_draw());
        let handle = ctx.handle();
        ctx.events.mouse.scrolled.listen(move |_| handle.request_draw());

        ctx.events.window.sized.listen(|e| {
            log::info!("window resized to {}x{}", e.size.x, e.size.y);
        });
        ctx.events.window.drop.listen(|e| {
            for file in &e.files {
                log::info!("dropped {}", file.display());
            }
        });

        Ok(())
    }

    fn draw(&mut self, ctx: &mut FrameCtx<'_>) -> Result<()> {
        let t = ctx.seconds() as f32;
        let phase = match ctx.eye {
            Some(Eye::Left) => 0.0,
            Some(Eye::Right) => 0.4,
            None => 0.2,
        };
        let zoom = ctx.transforms.view.x_axis.x.clamp(0.25, 4.0);

        let r = 0.5 + 0.5 * (t * 0.7 + phase).sin();
        let g = 0.5 + 0.5 * (t * 0.5 + phase + 2.0).sin();
        let b = (0.25 * zoom).min(1.0);
        ctx.driver.clear(Color::from_straight(r * 0.6, g * 0.6, b, 1.0))?;

        if let Some(limit) = self.frame_limit {
            let last_eye = ctx.eye.is_none_or(|eye| eye == Eye::Right);
            if last_eye && ctx.time.frame_index + 1 >= limit {
                log::info!("frame limit {limit} reached");
                ctx.exit();
            }
        }

        Ok(())
    }
}

fn configuration(args: &Args) -> Configuration {
    let mut config = Configuration::default()
        .title("lantern studio")
        .size(960, 600)
        .resizable(true)
        .headless(args.headless)
        .debug(args.debug)
        .trace(args.trace);

    if args.manual {
        config = config.presentation_mode(PresentationMode::Manual);
    }
    if args.throttle {
        config = config.unfocus_behaviour(UnfocusBehaviour::Throttle);
    }
    if args.simulate_vr {
        config = config.vr(VrConfig {
            enabled: true,
            mirror_to_window: true,
            ..VrConfig::default()
        });
    }

    config
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = configuration(&args);

    init_logging(LoggingConfig::with_level(config.log_level()));

    let frames = match (args.frames, args.headless) {
        (None, true) => Some(HEADLESS_FRAMES),
        (frames, _) => frames,
    };

    let mut app = Application::new(config, Studio::new(frames))?;
    if args.simulate_vr {
        app = app.with_vr_runtime(Box::new(SimulatedRuntime::new()));
    }

    app.run()
}
