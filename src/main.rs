use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use minifb::{Key, KeyRepeat, MouseButton, MouseMode, Window, WindowOptions};
use tidepool::config::{self, Config, Seed};
use tidepool::physics::{spawn_physics_thread, Command, PhysicsChannels};
use tidepool::renderer::{self, RenderConfig};
use tidepool::sixel::{self, SixelEncoder};
use tidepool::{FrameSnapshot, Palette, SimError};

/// Interactive stamp sizes.
struct Brush;

impl Brush {
    const DROP_RADIUS: f64 = 4.0;
    const DROP_VALUE: f64 = 0.9;
    /// Speed given to a right-drag gust, whatever the drag length.
    const WIND_SPEED: f64 = 10.0;
}

/// Command-line options.
#[derive(Debug, Default, PartialEq)]
struct Args {
    config: Option<PathBuf>,
    headless: bool,
    frames: Option<u64>,
    exact_colors: bool,
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<Args, SimError> {
    let mut out = Args::default();
    let mut it = args.into_iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--headless" => out.headless = true,
            "--exact-colors" => out.exact_colors = true,
            "--config" => {
                let path = it
                    .next()
                    .ok_or_else(|| SimError::Config("--config needs a path".into()))?;
                out.config = Some(PathBuf::from(path));
            }
            "--frames" => {
                let n = it
                    .next()
                    .ok_or_else(|| SimError::Config("--frames needs a count".into()))?;
                let n = n
                    .parse()
                    .map_err(|_| SimError::Config(format!("--frames: not a count: {n}")))?;
                out.frames = Some(n);
            }
            other => return Err(SimError::Config(format!("unknown argument: {other}"))),
        }
    }
    Ok(out)
}

/// Gust for a right-drag from `from` to `to` (grid cells), or `None` for no motion.
fn drag_wind(from: (f64, f64), to: (f64, f64)) -> Option<Seed> {
    let (dx, dy) = (to.0 - from.0, to.1 - from.1);
    let len = (dx * dx + dy * dy).sqrt();
    if len < 1e-9 {
        return None;
    }
    Some(Seed::Wind {
        x: to.0,
        y: to.1,
        dx: dx / len * Brush::WIND_SPEED,
        dy: dy / len * Brush::WIND_SPEED,
    })
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let result = parse_args(std::env::args().skip(1)).and_then(|args| {
        let cfg = config::load(args.config.as_deref());
        cfg.display.check()?;
        if args.headless {
            run_headless(&cfg, args.frames, args.exact_colors)
        } else {
            run_gui(&cfg)
        }
    });
    if let Err(e) = result {
        log::error!("{e}");
        std::process::exit(1);
    }
}

fn install_ctrlc(running: &Arc<AtomicBool>) -> Result<(), SimError> {
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .map_err(|e| SimError::Config(format!("Error setting Ctrl+C handler: {e}")))
}

/// Stop the physics thread and surface any error it returned.
fn shutdown(
    running: &AtomicBool,
    channels: PhysicsChannels,
    physics_thread: std::thread::JoinHandle<Result<(), SimError>>,
) -> Result<(), SimError> {
    running.store(false, Ordering::SeqCst);
    drop(channels);
    physics_thread
        .join()
        .map_err(|_| SimError::Config("physics thread panicked".into()))?
}

fn run_gui(cfg: &Config) -> Result<(), SimError> {
    let sim = cfg.build_state()?;
    let render_cfg = RenderConfig::scaled(sim.width(), sim.height(), cfg.display.scale);
    let (w, h) = (render_cfg.frame_width, render_cfg.frame_height);
    let palette = Palette::beach();

    let mut window = Window::new("tidepool", w, h, WindowOptions::default())
        .map_err(|e| SimError::Render(format!("failed to create window: {e}")))?;
    window.set_target_fps(cfg.display.target_fps);

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc(&running)?;

    let (channels, physics_thread) =
        spawn_physics_thread(sim, cfg.seeds(), cfg.display.clone(), running.clone());

    let mut framebuf = vec![0u32; w * h];
    let mut rgba_buf: Vec<u8> = Vec::new();
    let mut frame_count = 0u32;
    let mut last_fps_time = Instant::now();
    let mut last_snap: Option<FrameSnapshot> = None;
    let mut last_right: Option<(f64, f64)> = None;
    let mut paused = false;

    while window.is_open() && running.load(Ordering::SeqCst) {
        if window.is_key_pressed(Key::Escape, KeyRepeat::No) {
            break;
        }
        if window.is_key_pressed(Key::Space, KeyRepeat::No) {
            paused = !paused;
            let _ = channels.cmd_tx.send(Command::TogglePause);
        }
        if window.is_key_pressed(Key::R, KeyRepeat::No) {
            let _ = channels.cmd_tx.send(Command::Reset);
        }

        // --- Mouse: left drops dye, right drags wind ---
        let cell = window
            .get_mouse_pos(MouseMode::Discard)
            .map(|(mx, my)| render_cfg.pixel_to_cell(mx as f64, my as f64));
        if let Some((x, y)) = cell {
            if window.get_mouse_down(MouseButton::Left) {
                let _ = channels.cmd_tx.send(Command::Seed(Seed::Drop {
                    x,
                    y,
                    radius: Brush::DROP_RADIUS,
                    value: Brush::DROP_VALUE,
                }));
            }
        }
        if window.get_mouse_down(MouseButton::Right) {
            if let (Some(from), Some(to)) = (last_right, cell) {
                if let Some(seed) = drag_wind(from, to) {
                    let _ = channels.cmd_tx.send(Command::Seed(seed));
                }
            }
            last_right = cell;
        } else {
            last_right = None;
        }

        // --- Non-blocking: grab latest snapshot ---
        let mut snap = None;
        while let Ok(s) = channels.snap_rx.try_recv() {
            snap = Some(s);
        }
        if let Some(s) = snap {
            renderer::render_into(&mut rgba_buf, &s.density, &render_cfg, &palette);
            renderer::rgba_to_argb(&rgba_buf, &mut framebuf);
            // Return old snapshot buffer to physics thread for reuse
            if let Some(old) = last_snap.take() {
                let _ = channels.snap_return_tx.send(old);
            }
            last_snap = Some(s);
        }

        window
            .update_with_buffer(&framebuf, w, h)
            .map_err(|e| SimError::Render(e.to_string()))?;

        frame_count += 1;
        let now = Instant::now();
        if now.duration_since(last_fps_time) >= Duration::from_secs(1) {
            let step = last_snap.as_ref().map_or(0, |s| s.step);
            let state = if paused { " (paused)" } else { "" };
            window.set_title(&format!("tidepool - {frame_count} fps - step {step}{state}"));
            frame_count = 0;
            last_fps_time = now;
        }
    }

    shutdown(&running, channels, physics_thread)
}

fn run_headless(cfg: &Config, frames: Option<u64>, exact_colors: bool) -> Result<(), SimError> {
    use std::io::Write;

    let sim = cfg.build_state()?;
    let render_cfg = RenderConfig::scaled(sim.width(), sim.height(), cfg.display.scale);
    let palette = Palette::beach();
    let encoder = SixelEncoder::new(&palette);
    let frame_interval = Duration::from_secs_f64(1.0 / cfg.display.target_fps as f64);

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc(&running)?;

    let (channels, physics_thread) =
        spawn_physics_thread(sim, cfg.seeds(), cfg.display.clone(), running.clone());

    // Terminal setup
    {
        let mut out = std::io::stdout().lock();
        let _ = write!(out, "\x1b[?25l\x1b[2J"); // hide cursor, clear screen
        let _ = out.flush();
    }

    let mut rgba_buf: Vec<u8> = Vec::new();
    let mut written = 0u64;
    let mut frame_count = 0u32;
    let mut last_fps_time = Instant::now();
    let mut result = Ok(());

    while running.load(Ordering::SeqCst) && frames.map_or(true, |n| written < n) {
        let frame_start = Instant::now();

        let snap = match channels.snap_rx.recv_timeout(Duration::from_secs(1)) {
            Ok(s) => s,
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => continue,
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
        };

        renderer::render_into(&mut rgba_buf, &snap.density, &render_cfg, &palette);
        let data = if exact_colors {
            match sixel::encode_sixel(&rgba_buf, render_cfg.frame_width, render_cfg.frame_height) {
                Ok(d) => d,
                Err(e) => {
                    result = Err(e);
                    break;
                }
            }
        } else {
            encoder.encode(&rgba_buf, render_cfg.frame_width, render_cfg.frame_height)
        };
        if let Err(e) = sixel::output_frame(&data) {
            result = Err(SimError::Render(format!("stdout: {e}")));
            break;
        }
        let _ = channels.snap_return_tx.send(snap);
        written += 1;

        frame_count += 1;
        let now = Instant::now();
        if now.duration_since(last_fps_time) >= Duration::from_secs(1) {
            log::info!("{frame_count} fps, {written} frames written");
            frame_count = 0;
            last_fps_time = now;
        }

        let elapsed = frame_start.elapsed();
        if elapsed < frame_interval {
            std::thread::sleep(frame_interval - elapsed);
        }
    }

    // Terminal restore
    {
        let mut out = std::io::stdout().lock();
        let _ = write!(out, "\x1b[?25h"); // show cursor
        let _ = out.flush();
    }

    let physics = shutdown(&running, channels, physics_thread);
    result.and(physics)
}
