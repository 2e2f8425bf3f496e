//! # Fixed-Step Simulation
//!
//! Host frames arrive at arbitrary intervals; the simulation advances in
//! fixed steps and hands the renderer a blend factor for the leftover time.
//!
//! ```text
//! host frame ──► clamp ──► accumulate ──► while acc >= step {
//!                                            new_frame + animate all values
//!                                            controllers: FRAME
//!                                         }
//!                                         consume events
//!                                         render_blend(acc / step)
//! ```

use serde::{Deserialize, Serialize};
use tracing::trace;

use portalis_shared::constants::{MAX_EVENTS, MIN_MILLIS_PER_FRAME, TIME_STEP_MS};

use super::events::{Event, EventClassId, EventPayload};
use crate::ecs::{ControllerMethod, World};

/// Timing configuration of a world.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Length of one fixed step in milliseconds.
    pub time_step_ms: f64,
    /// Host frames are clamped to at most this many milliseconds.
    pub min_millis_per_frame: f64,
    /// Capacity of the event queue.
    pub event_capacity: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            time_step_ms: TIME_STEP_MS,
            min_millis_per_frame: MIN_MILLIS_PER_FRAME,
            event_capacity: MAX_EVENTS,
        }
    }
}

/// Fixed-step bookkeeping.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Simulation {
    /// Editor pause: only opted-in controllers run.
    pub editor_paused: bool,
    /// Simulated time in milliseconds.
    pub sim_time_ms: f64,
    /// Unsimulated time carried into the next frame.
    pub render_time_ms: f64,
    /// Host wall time accumulated from frame lengths.
    pub wall_time_ms: f64,
    /// Length of the last host frame.
    pub frame_millis: f64,
    /// Blend factor handed to the renderer.
    pub render_state_blend: f64,
    /// Frames per second of the last host frame.
    pub fps: f64,
    /// Fixed steps run since the world was cleared.
    pub counter: u64,
    /// Rendered frames since the world was cleared.
    pub frame: u64,
}

impl World {
    /// Advances the simulation by one host frame of `host_frame_ms`.
    ///
    /// # Returns
    ///
    /// The number of fixed steps run.
    pub fn step(&mut self, host_frame_ms: f64) -> usize {
        let time_step = self.config.time_step_ms;
        let frame_ms = host_frame_ms.max(0.0);

        self.simulation.frame_millis = frame_ms;
        self.simulation.fps = if frame_ms > 0.0 { 1000.0 / frame_ms } else { 0.0 };
        self.simulation.wall_time_ms += frame_ms;
        self.simulation.render_time_ms += frame_ms.min(self.config.min_millis_per_frame);

        let mut steps = 0;
        while time_step > 0.0 && self.simulation.render_time_ms >= time_step {
            self.for_each_dynamic(&mut |d| {
                d.new_frame();
                d.animate(time_step);
            });
            self.act_all(ControllerMethod::FRAME);
            self.simulation.counter += 1;
            self.simulation.render_time_ms -= time_step;
            self.simulation.sim_time_ms += time_step;
            steps += 1;
        }

        let consumed = self.events.consume_all();
        if consumed > 0 {
            trace!(consumed, "Dispatched simulation events");
        }

        let blend = if time_step > 0.0 {
            self.simulation.render_time_ms / time_step
        } else {
            0.0
        };
        self.simulation.render_state_blend = blend;
        self.for_each_dynamic(&mut |d| d.render_blend(blend));
        steps
    }

    /// Records that the host rendered a frame.
    pub fn mark_rendered(&mut self) {
        self.simulation.frame += 1;
    }

    /// Queues an event stamped with the current simulation time.
    pub fn emit(&mut self, class: EventClassId, payload: EventPayload) {
        let event = Event {
            class,
            timestamp_ms: self.simulation.wall_time_ms,
            sim_timestamp_ms: self.simulation.sim_time_ms,
            payload,
        };
        self.events.push(event);
    }

    /// Restores every dynamic value to its spawn value.
    pub fn reset_all_to_spawn(&mut self) {
        self.for_each_dynamic(&mut |d| d.reset_to_spawn());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steps_accumulate() {
        let mut world = World::new();
        assert_eq!(world.step(10.0), 0);
        assert_eq!(world.step(10.0), 1);
        assert!((world.simulation.render_time_ms - (20.0 - TIME_STEP_MS)).abs() < 1e-9);
        assert_eq!(world.simulation.counter, 1);
    }

    #[test]
    fn test_long_frames_are_clamped() {
        let mut world = World::new();
        let steps = world.step(5_000.0);
        let expected = MIN_MILLIS_PER_FRAME / TIME_STEP_MS;
        assert!((steps as f64 - expected).abs() <= 1.0, "{steps} steps");
        assert!(world.simulation.render_state_blend < 1.0);
        assert!((world.simulation.frame_millis - 5_000.0).abs() < 1e-9);
    }

    #[test]
    fn test_blend_in_unit_range() {
        let mut world = World::new();
        for ms in [3.0, 17.0, 33.3, 1.0, 50.0] {
            world.step(ms);
            let blend = world.simulation.render_state_blend;
            assert!((0.0..1.0).contains(&blend), "blend {blend}");
        }
    }

    #[test]
    fn test_emit_stamps_sim_time() {
        let mut world = World::new();
        world.step(20.0);
        world.emit(crate::dynamic::event_class::WORLD_LOADED, EventPayload::None);
        let events = world.events.drain();
        assert_eq!(events.len(), 1);
        assert!((events[0].sim_timestamp_ms - TIME_STEP_MS).abs() < 1e-9);
    }
}
