//! Spring position integrator for the whole-eye offset.
//!
//! Two integration modes drive the same offset, one frame at a time:
//!
//! - **Spring**: `force = -k·O`, `velocity = force·Δt`, `O = clamp(O + velocity)`.
//!   Velocity is recomputed from the displacement every step and never
//!   carried over, so this is a first-order decay toward center rather than
//!   an oscillating second-order spring. Steps continue while either
//!   velocity component exceeds the stop threshold.
//! - **Return to center**: `O = O · RETURN_SPEED` per frame until both axes
//!   are below the snap epsilon, then `O = (0, 0)` exactly and the mode
//!   reports completion.
//!
//! The modes never run together. Starting a return cancels any pending
//! spring frame, and impulses are refused while a return is in progress.
//!
//! Design note: At most one frame request is outstanding at a time. The
//! integrator owns that handle and checks it on every callback, so a frame
//! that was cancelled cannot step the offset.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::scheduler::{FrameId, FrameKind, Scheduler};
use crate::types::{Vec2, MAX_MOVEMENT};

/// Spring integration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpringConfig {
    /// Spring constant k. Typical: 0.2.
    pub stiffness: f32,

    /// Δt applied per animation step, in frames. Typical: 1.0.
    pub time_step: f32,

    /// Stepping stops once both velocity components fall below this.
    /// Typical: 0.01.
    pub stop_threshold: f32,

    /// Per-frame decay factor of the return-to-center animation. Typical: 0.9.
    pub return_speed: f32,

    /// Return-to-center snaps to exactly (0, 0) once both axes are below
    /// this. Typical: 0.1.
    pub snap_epsilon: f32,

    /// Per-axis clamp bound for the offset.
    pub max_movement: f32,

    /// Scale from acceleration delta to offset impulse while Looking.
    /// Typical: 2.0.
    pub look_gain: f32,
}

impl Default for SpringConfig {
    fn default() -> Self {
        Self {
            stiffness: 0.2,
            time_step: 1.0,
            stop_threshold: 0.01,
            return_speed: 0.9,
            snap_epsilon: 0.1,
            max_movement: MAX_MOVEMENT,
            look_gain: 2.0,
        }
    }
}

impl SpringConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("spring.stiffness", self.stiffness),
            ("spring.time_step", self.time_step),
            ("spring.stop_threshold", self.stop_threshold),
            ("spring.snap_epsilon", self.snap_epsilon),
            ("spring.max_movement", self.max_movement),
        ];
        for (field, value) in positive {
            if !(value > 0.0) {
                return Err(ConfigError::NotPositive {
                    field,
                    value: value as f64,
                });
            }
        }
        if !(self.return_speed > 0.0 && self.return_speed < 1.0) {
            return Err(ConfigError::OutOfUnitRange {
                field: "spring.return_speed",
                value: self.return_speed as f64,
            });
        }
        // k·Δt >= 1 overshoots center on the first step.
        let gain = self.stiffness * self.time_step;
        if !(gain < 1.0) {
            return Err(ConfigError::OutOfUnitRange {
                field: "spring.stiffness * spring.time_step",
                value: gain as f64,
            });
        }
        if self.look_gain < 0.0 || !self.look_gain.is_finite() {
            return Err(ConfigError::NotPositive {
                field: "spring.look_gain",
                value: self.look_gain as f64,
            });
        }
        Ok(())
    }
}

/// Which integration mode currently owns the offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpringMode {
    /// No frame pending.
    Resting,
    /// Damped spring decay in progress.
    Springing,
    /// Return-to-center in progress.
    Returning,
}

/// What a frame callback did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpringEvent {
    /// A spring step ran and another frame was requested.
    Stepped,
    /// A spring step ran and displacement is now negligible.
    Settled,
    /// A return-to-center step ran and another frame was requested.
    Returning,
    /// Return-to-center reached exactly (0, 0).
    Centered,
}

/// Owns the whole-eye offset and its frame request.
#[derive(Debug, Clone)]
pub struct SpringIntegrator {
    config: SpringConfig,
    offset: Vec2,
    velocity: Vec2,
    mode: SpringMode,
    frame: Option<FrameId>,
    steps: u64,
}

impl SpringIntegrator {
    pub fn new(config: SpringConfig) -> Self {
        Self {
            config,
            offset: Vec2::ZERO,
            velocity: Vec2::ZERO,
            mode: SpringMode::Resting,
            frame: None,
            steps: 0,
        }
    }

    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    /// Velocity of the most recent spring step.
    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    pub fn mode(&self) -> SpringMode {
        self.mode
    }

    pub fn has_pending_frame(&self) -> bool {
        self.frame.is_some()
    }

    /// Number of integration steps taken, both modes.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn config(&self) -> &SpringConfig {
        &self.config
    }

    /// Place the offset directly, clamped. Does not schedule anything.
    pub fn set_offset(&mut self, offset: Vec2) {
        self.offset = offset.clamped(self.config.max_movement);
    }

    /// Displace the offset by an acceleration delta scaled by `look_gain`
    /// and make sure the spring is stepping.
    ///
    /// The eye lags the device: x moves against the motion, y with it.
    pub fn kick(&mut self, sched: &mut Scheduler, accel_delta: [f32; 3]) -> bool {
        let gain = self.config.look_gain;
        self.impulse(sched, Vec2::new(-accel_delta[0] * gain, accel_delta[1] * gain))
    }

    /// Add `impulse` to the offset and start (or keep) spring stepping.
    /// Refused while a return-to-center is running.
    pub fn impulse(&mut self, sched: &mut Scheduler, impulse: Vec2) -> bool {
        if self.mode == SpringMode::Returning {
            trace!("impulse ignored during return to center");
            return false;
        }
        self.offset = (self.offset + impulse).clamped(self.config.max_movement);
        if self.frame.is_none() {
            self.frame = Some(sched.request_frame(FrameKind::SpringStep));
        }
        self.mode = SpringMode::Springing;
        true
    }

    /// Begin the return-to-center animation, preempting the spring.
    ///
    /// Returns true if the offset was already close enough and has been
    /// snapped to center with no frame requested.
    pub fn start_return(&mut self, sched: &mut Scheduler) -> bool {
        self.cancel_frame(sched);
        self.velocity = Vec2::ZERO;
        if self.offset.is_within(self.config.snap_epsilon) {
            self.offset = Vec2::ZERO;
            self.mode = SpringMode::Resting;
            return true;
        }
        self.mode = SpringMode::Returning;
        self.frame = Some(sched.request_frame(FrameKind::ReturnToCenter));
        debug!(x = self.offset.x, y = self.offset.y, "return to center started");
        false
    }

    /// Complete any return-to-center immediately: snap to (0, 0) and drop
    /// the pending frame.
    pub fn finish_return(&mut self, sched: &mut Scheduler) {
        self.cancel_frame(sched);
        self.offset = Vec2::ZERO;
        self.velocity = Vec2::ZERO;
        self.mode = SpringMode::Resting;
    }

    /// Stop whichever mode is running. The offset stays where it is.
    pub fn stop(&mut self, sched: &mut Scheduler) {
        self.cancel_frame(sched);
        self.mode = SpringMode::Resting;
    }

    fn cancel_frame(&mut self, sched: &mut Scheduler) {
        if let Some(id) = self.frame.take() {
            sched.cancel_frame(id);
        }
    }

    /// Frame callback. Ignores frames this integrator no longer owns.
    pub fn on_frame(
        &mut self,
        sched: &mut Scheduler,
        id: FrameId,
        kind: FrameKind,
    ) -> Option<SpringEvent> {
        if self.frame != Some(id) {
            return None;
        }
        self.frame = None;
        match kind {
            FrameKind::SpringStep => Some(self.spring_step(sched)),
            FrameKind::ReturnToCenter => Some(self.return_step(sched)),
        }
    }

    fn spring_step(&mut self, sched: &mut Scheduler) -> SpringEvent {
        let k = self.config.stiffness;
        let dt = self.config.time_step;
        let force = self.offset.scaled(-k);
        let velocity = force.scaled(dt);

        self.offset = (self.offset + velocity).clamped(self.config.max_movement);
        self.velocity = velocity;
        self.steps += 1;

        if velocity.max_abs() > self.config.stop_threshold {
            self.frame = Some(sched.request_frame(FrameKind::SpringStep));
            SpringEvent::Stepped
        } else {
            trace!(x = self.offset.x, y = self.offset.y, "spring settled");
            self.mode = SpringMode::Resting;
            SpringEvent::Settled
        }
    }

    fn return_step(&mut self, sched: &mut Scheduler) -> SpringEvent {
        self.offset = self.offset.scaled(self.config.return_speed);
        self.steps += 1;

        if self.offset.is_within(self.config.snap_epsilon) {
            self.offset = Vec2::ZERO;
            self.mode = SpringMode::Resting;
            debug!("return to center complete");
            SpringEvent::Centered
        } else {
            self.frame = Some(sched.request_frame(FrameKind::ReturnToCenter));
            SpringEvent::Returning
        }
    }
}

impl Default for SpringIntegrator {
    fn default() -> Self {
        Self::new(SpringConfig::default())
    }
}
