//! # Host Game Loop
//!
//! ```text
//! Frame N:
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │ 1. BEGIN FRAME                                                      │
//! │    └─ Measure host time since the last frame                        │
//! │                                                                     │
//! │ 2. SIMULATE (world write lock)                                      │
//! │    ├─ Fixed steps: animate dynamics, Frame controllers              │
//! │    ├─ Dispatch queued events                                        │
//! │    └─ Blend dynamics for rendering                                  │
//! │                                                                     │
//! │ 3. RENDER (host callback, world read lock)                          │
//! │                                                                     │
//! │ 4. END FRAME                                                        │
//! │    └─ Record stats, sleep out the frame budget                      │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use portalis_core::{SharedWorld, World};

use crate::config::EngineConfig;

/// Target frame time for 60 FPS.
pub const TARGET_FRAME_TIME: Duration = Duration::from_micros(16_666);

/// Maximum allowed frame time before warning.
pub const MAX_FRAME_TIME: Duration = Duration::from_millis(33);

/// Configuration for the game loop.
#[derive(Clone, Debug)]
pub struct GameLoopConfig {
    /// Enable per-frame timing logs.
    pub enable_timing_logs: bool,
    /// Target frames per second. Zero runs unthrottled.
    pub target_fps: u32,
}

impl Default for GameLoopConfig {
    fn default() -> Self {
        Self {
            enable_timing_logs: false,
            target_fps: 60,
        }
    }
}

impl From<&EngineConfig> for GameLoopConfig {
    fn from(config: &EngineConfig) -> Self {
        Self {
            enable_timing_logs: config.enable_timing_logs,
            ..Self::default()
        }
    }
}

impl GameLoopConfig {
    fn frame_budget(&self) -> Option<Duration> {
        (self.target_fps > 0).then(|| Duration::from_secs_f64(1.0 / f64::from(self.target_fps)))
    }
}

/// Frame timing statistics.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameStats {
    /// Total frame time in microseconds.
    pub total_us: u64,
    /// Simulation time in microseconds.
    pub simulate_us: u64,
    /// Render callback time in microseconds.
    pub render_us: u64,
    /// Fixed steps run.
    pub steps: usize,
    /// Frame number.
    pub frame: u64,
}

/// Drives a shared world from a host thread.
pub struct GameLoop {
    world: Arc<RwLock<World>>,
    config: GameLoopConfig,
    stats: FrameStatsAccumulator,
    exit: Arc<AtomicBool>,
    frame: u64,
    last_frame: Option<Instant>,
}

impl GameLoop {
    /// Wraps `world` for looping.
    #[must_use]
    pub fn new(world: World, config: GameLoopConfig) -> Self {
        Self {
            world: Arc::new(RwLock::new(world)),
            config,
            stats: FrameStatsAccumulator::new(),
            exit: Arc::new(AtomicBool::new(false)),
            frame: 0,
            last_frame: None,
        }
    }

    /// Returns the shared world.
    #[must_use]
    pub fn world_handle(&self) -> SharedWorld {
        Arc::clone(&self.world)
    }

    /// Returns a flag that stops [`GameLoop::run`] when set.
    #[must_use]
    pub fn exit_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.exit)
    }

    /// Asks the loop to stop after the current frame.
    pub fn request_exit(&self) {
        self.exit.store(true, Ordering::Release);
    }

    /// Whether an exit was requested.
    #[must_use]
    pub fn should_exit(&self) -> bool {
        self.exit.load(Ordering::Acquire)
    }

    /// Advances the world by one host frame of `host_frame_ms`, then hands
    /// it to `render` for reading.
    pub fn frame(&mut self, host_frame_ms: f64, render: &mut impl FnMut(&World)) -> FrameStats {
        let start = Instant::now();
        let steps = self.world.write().step(host_frame_ms);
        let simulated = Instant::now();
        {
            let world = self.world.read();
            render(&world);
        }
        self.world.write().mark_rendered();
        let end = Instant::now();

        let stats = FrameStats {
            total_us: micros(end - start),
            simulate_us: micros(simulated - start),
            render_us: micros(end - simulated),
            steps,
            frame: self.frame,
        };
        self.end_frame(stats);
        stats
    }

    /// Runs frames of wall-clock length until an exit is requested.
    pub fn run(&mut self, mut render: impl FnMut(&World)) {
        info!(target_fps = self.config.target_fps, "Game loop started");
        while !self.should_exit() {
            let now = Instant::now();
            let elapsed = self.last_frame.map_or(Duration::ZERO, |last| now - last);
            self.last_frame = Some(now);

            let stats = self.frame(elapsed.as_secs_f64() * 1000.0, &mut render);
            if let Some(budget) = self.config.frame_budget() {
                let spent = Duration::from_micros(stats.total_us);
                if spent < budget {
                    std::thread::sleep(budget - spent);
                }
            }
        }
        info!(
            frames = self.stats.frames_recorded,
            avg_ms = self.stats.avg_frame_ms(),
            "Game loop stopped"
        );
    }

    fn end_frame(&mut self, stats: FrameStats) {
        if stats.total_us > micros(MAX_FRAME_TIME) {
            warn!(frame = stats.frame, total_us = stats.total_us, "Frame over budget");
        } else if self.config.enable_timing_logs {
            debug!(
                frame = stats.frame,
                total_us = stats.total_us,
                simulate_us = stats.simulate_us,
                steps = stats.steps,
                "Frame"
            );
        }
        self.stats.record(stats);
        self.frame += 1;
    }

    /// Number of completed frames.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    /// Accumulated statistics.
    #[must_use]
    pub fn stats(&self) -> &FrameStatsAccumulator {
        &self.stats
    }
}

fn micros(d: Duration) -> u64 {
    u64::try_from(d.as_micros()).unwrap_or(u64::MAX)
}

/// Accumulator for frame statistics.
#[derive(Clone, Debug)]
pub struct FrameStatsAccumulator {
    /// Total frames recorded.
    pub frames_recorded: u64,
    /// Sum of total frame times.
    pub total_us_sum: u64,
    /// Sum of simulation times.
    pub simulate_us_sum: u64,
    /// Sum of render times.
    pub render_us_sum: u64,
    /// Fixed steps run.
    pub steps_sum: u64,
    /// Min frame time.
    pub min_frame_us: u64,
    /// Max frame time.
    pub max_frame_us: u64,
    /// Frames that exceeded the 60 FPS budget.
    pub frames_over_budget: u64,
}

impl FrameStatsAccumulator {
    /// Creates an empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self {
            frames_recorded: 0,
            total_us_sum: 0,
            simulate_us_sum: 0,
            render_us_sum: 0,
            steps_sum: 0,
            min_frame_us: u64::MAX,
            max_frame_us: 0,
            frames_over_budget: 0,
        }
    }

    /// Records a frame's statistics.
    pub fn record(&mut self, stats: FrameStats) {
        self.frames_recorded += 1;
        self.total_us_sum += stats.total_us;
        self.simulate_us_sum += stats.simulate_us;
        self.render_us_sum += stats.render_us;
        self.steps_sum += stats.steps as u64;
        self.min_frame_us = self.min_frame_us.min(stats.total_us);
        self.max_frame_us = self.max_frame_us.max(stats.total_us);

        if stats.total_us > micros(TARGET_FRAME_TIME) {
            self.frames_over_budget += 1;
        }
    }

    /// Average frame time in milliseconds.
    #[must_use]
    pub fn avg_frame_ms(&self) -> f64 {
        if self.frames_recorded == 0 {
            return 0.0;
        }
        (self.total_us_sum as f64 / self.frames_recorded as f64) / 1000.0
    }

    /// Average FPS.
    #[must_use]
    pub fn avg_fps(&self) -> f64 {
        let avg_ms = self.avg_frame_ms();
        if avg_ms <= 0.0 {
            return 0.0;
        }
        1000.0 / avg_ms
    }

    /// Fraction of frames over budget.
    #[must_use]
    pub fn over_budget_ratio(&self) -> f64 {
        if self.frames_recorded == 0 {
            return 0.0;
        }
        self.frames_over_budget as f64 / self.frames_recorded as f64
    }
}

impl Default for FrameStatsAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_world, EngineConfig};

    #[test]
    fn test_game_loop_creation() {
        let game_loop = GameLoop::new(create_world(EngineConfig::default()), GameLoopConfig::default());
        assert_eq!(game_loop.frame_count(), 0);
        assert!(!game_loop.should_exit());
    }

    #[test]
    fn test_frame_cycle() {
        let mut game_loop = GameLoop::new(create_world(EngineConfig::default()), GameLoopConfig::default());
        let mut rendered = 0;
        let stats = game_loop.frame(33.4, &mut |_: &World| rendered += 1);
        assert_eq!(stats.frame, 0);
        assert_eq!(stats.steps, 2);
        assert_eq!(rendered, 1);
        assert_eq!(game_loop.frame_count(), 1);
        assert_eq!(game_loop.world_handle().read().simulation.frame, 1);
    }

    #[test]
    fn test_run_stops_on_exit() {
        let mut game_loop = GameLoop::new(
            create_world(EngineConfig::default()),
            GameLoopConfig {
                enable_timing_logs: true,
                target_fps: 0,
            },
        );
        let exit = game_loop.exit_handle();
        let mut frames = 0;
        game_loop.run(|_: &World| {
            frames += 1;
            if frames == 5 {
                exit.store(true, Ordering::Release);
            }
        });
        assert_eq!(game_loop.frame_count(), 5);
    }

    #[test]
    fn test_stats_accumulator() {
        let mut acc = FrameStatsAccumulator::new();
        for i in 0..100 {
            acc.record(FrameStats {
                total_us: 10_000 + (i * 100),
                simulate_us: 5000,
                render_us: 2000,
                steps: 1,
                frame: i,
            });
        }
        assert_eq!(acc.frames_recorded, 100);
        assert_eq!(acc.steps_sum, 100);
        assert!(acc.avg_fps() > 50.0);
        assert!(acc.avg_fps() < 100.0);
    }
}
