use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::{DisplayConfig, Seed};
use crate::error::Result;
use crate::state::{FrameSnapshot, SimState};

/// Requests from the render thread to the physics thread.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Stamp a drop or a gust before the next tick.
    Seed(Seed),
    /// Clear every field and re-apply the configured seeds.
    Reset,
    TogglePause,
}

/// Measures wall time between ticks and clamps it to the configured range.
pub struct FrameClock {
    last: Instant,
    display: DisplayConfig,
}

impl FrameClock {
    pub fn new(display: &DisplayConfig) -> Self {
        Self {
            last: Instant::now(),
            display: display.clone(),
        }
    }

    /// Seconds since the previous call, clamped to `[min_dt, max_dt]`.
    pub fn next_dt(&mut self) -> f64 {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last).as_secs_f64();
        self.last = now;
        self.display.clamp_dt(elapsed)
    }

    /// Forget the time spent paused.
    pub fn restart(&mut self) {
        self.last = Instant::now();
    }
}

/// Channels connecting the main (render) thread to the physics thread.
pub struct PhysicsChannels {
    pub cmd_tx: mpsc::Sender<Command>,
    pub snap_rx: mpsc::Receiver<FrameSnapshot>,
    pub snap_return_tx: mpsc::Sender<FrameSnapshot>,
}

/// Spawn the physics simulation thread and return its channels + join handle.
///
/// The thread ticks at most `target_fps` times a second, hands each frame over
/// a one-slot channel and reuses buffers the render thread sends back. It
/// exits when `running` is cleared, when the snapshot receiver is dropped, or
/// when a tick fails.
pub fn spawn_physics_thread(
    mut sim: SimState,
    seeds: Vec<Seed>,
    display: DisplayConfig,
    running: Arc<AtomicBool>,
) -> (PhysicsChannels, std::thread::JoinHandle<Result<()>>) {
    let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();
    let (snap_tx, snap_rx) = mpsc::sync_channel::<FrameSnapshot>(1);
    let (snap_return_tx, snap_return_rx) = mpsc::channel::<FrameSnapshot>();

    let handle = std::thread::spawn(move || {
        let (w, h) = (sim.width(), sim.height());
        let frame_period = Duration::from_secs_f64(1.0 / display.target_fps.max(1) as f64);
        let mut clock = FrameClock::new(&display);
        let mut snap_buf = FrameSnapshot::new_empty(w, h);
        let mut paused = false;

        while running.load(Ordering::SeqCst) {
            let frame_start = Instant::now();
            let mut dirty = false;
            while let Ok(cmd) = cmd_rx.try_recv() {
                match cmd {
                    Command::Seed(seed) => seed.apply(&mut sim),
                    Command::Reset => {
                        sim.reset();
                        for seed in &seeds {
                            seed.apply(&mut sim);
                        }
                        log::debug!("simulation reset");
                    }
                    Command::TogglePause => {
                        paused = !paused;
                        clock.restart();
                        log::debug!("paused={paused}");
                    }
                }
                dirty = true;
            }

            if !paused {
                let dt = clock.next_dt();
                if let Err(e) = sim.tick(dt) {
                    log::error!("tick {} failed: {e}", sim.steps() + 1);
                    return Err(e);
                }
            }

            if !paused || dirty {
                sim.snapshot_into(&mut snap_buf);
                if snap_tx.send(snap_buf).is_err() {
                    break;
                }
                snap_buf = snap_return_rx
                    .try_recv()
                    .ok()
                    .filter(|b| b.density.dims() == (w, h))
                    .unwrap_or_else(|| FrameSnapshot::new_empty(w, h));
            }

            let elapsed = frame_start.elapsed();
            if elapsed < frame_period {
                std::thread::sleep(frame_period - elapsed);
            }
        }
        Ok(())
    });

    let channels = PhysicsChannels {
        cmd_tx,
        snap_rx,
        snap_return_tx,
    };
    (channels, handle)
}
