//! Core data types for the gaze engine.
//!
//! This module defines the inputs the engine consumes (motion and tilt
//! samples, permission status) and the outputs it publishes for the
//! presentation layer (offsets, mood, state, dizzy flag).
//!
//! Design principle: Types should make intent obvious. If a concept exists,
//! it gets a type. Never pass raw tuples across module boundaries.
//!
//! Design note: Sensor fields are `Option<f32>` because the platform sensor
//! APIs deliver nullable axes. Validation happens once, at the boundary,
//! and produces a `SampleError` that the engine logs and drops.

use serde::{Deserialize, Serialize};

use crate::error::SampleError;

/// Default clamp bound for every position offset, in presentation units.
pub const MAX_MOVEMENT: f32 = 20.0;

// ============================================================================
// INPUT SAMPLES
// ============================================================================

/// A single acceleration reading from the device motion sensor.
///
/// Ephemeral: produced by the external sensor source and consumed once by
/// the motion classifier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionSample {
    /// Monotonic timestamp in milliseconds.
    pub timestamp_ms: u64,
    /// Acceleration along x. `None` when the platform omitted the axis.
    pub x: Option<f32>,
    /// Acceleration along y.
    pub y: Option<f32>,
    /// Acceleration along z.
    pub z: Option<f32>,
}

impl MotionSample {
    /// Creates a sample with all three axes present.
    pub fn new(timestamp_ms: u64, x: f32, y: f32, z: f32) -> Self {
        Self {
            timestamp_ms,
            x: Some(x),
            y: Some(y),
            z: Some(z),
        }
    }

    /// Creates a sample that carries no acceleration data at all.
    pub fn empty(timestamp_ms: u64) -> Self {
        Self {
            timestamp_ms,
            x: None,
            y: None,
            z: None,
        }
    }

    /// Returns the acceleration triple if every axis is present and finite.
    pub fn accel(&self) -> Result<[f32; 3], SampleError> {
        Ok([
            finite_axis("x", self.x)?,
            finite_axis("y", self.y)?,
            finite_axis("z", self.z)?,
        ])
    }
}

/// A device orientation reading.
///
/// `beta` is the front-back tilt in degrees [-180, 180], `gamma` the
/// left-right tilt in degrees [-90, 90].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TiltSample {
    /// Monotonic timestamp in milliseconds.
    pub timestamp_ms: u64,
    /// Front-back tilt.
    pub beta: Option<f32>,
    /// Left-right tilt.
    pub gamma: Option<f32>,
}

impl TiltSample {
    /// Creates a tilt sample with both angles present.
    pub fn new(timestamp_ms: u64, beta: f32, gamma: f32) -> Self {
        Self {
            timestamp_ms,
            beta: Some(beta),
            gamma: Some(gamma),
        }
    }

    /// Returns `(beta, gamma)` if both angles are present and finite.
    pub fn angles(&self) -> Result<(f32, f32), SampleError> {
        Ok((
            finite_axis("beta", self.beta)?,
            finite_axis("gamma", self.gamma)?,
        ))
    }
}

fn finite_axis(name: &'static str, value: Option<f32>) -> Result<f32, SampleError> {
    match value {
        None => Err(SampleError::MissingAxis(name)),
        Some(v) if !v.is_finite() => Err(SampleError::NonFinite(name)),
        Some(v) => Ok(v),
    }
}

// ============================================================================
// POSITION
// ============================================================================

/// A 2D position offset (whole-eye displacement or pupil position).
///
/// Offsets are continuously overwritten; no history is retained.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    /// The center position.
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Clamp each axis independently to [-bound, bound].
    pub fn clamped(self, bound: f32) -> Self {
        Self {
            x: self.x.clamp(-bound, bound),
            y: self.y.clamp(-bound, bound),
        }
    }

    /// Scale both axes by `factor`.
    pub fn scaled(self, factor: f32) -> Self {
        Self {
            x: self.x * factor,
            y: self.y * factor,
        }
    }

    /// Largest absolute component.
    pub fn max_abs(&self) -> f32 {
        self.x.abs().max(self.y.abs())
    }

    /// True when both components are strictly below `epsilon` in magnitude.
    pub fn is_within(&self, epsilon: f32) -> bool {
        self.x.abs() < epsilon && self.y.abs() < epsilon
    }

    /// True when both components lie inside the closed clamp bounds.
    pub fn is_bounded(&self, bound: f32) -> bool {
        self.x.abs() <= bound && self.y.abs() <= bound
    }
}

impl std::ops::Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

// ============================================================================
// BEHAVIOR
// ============================================================================

/// Discrete movement category produced by the motion classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MotionClass {
    /// Movement below the movement threshold.
    Idle,
    /// Noticeable movement. Drives Static → Looking.
    Move,
    /// Violent movement. Drives anything → Dizzy.
    Shake,
}

/// Which subsystem currently owns the eyes' motion.
///
/// Exactly one is active at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorState {
    /// Device at rest. Idle gaze patterns and mood selection run.
    Static,
    /// Device moving. Spring offset follows the motion.
    Looking,
    /// Device shaken. Time-bounded; always returns to Looking.
    Dizzy,
}

impl BehaviorState {
    /// Returns true if `self → next` is one of the edges the state machine
    /// may take.
    pub fn can_transition_to(self, next: BehaviorState) -> bool {
        use BehaviorState::*;
        matches!(
            (self, next),
            (Static, Looking)
                | (Static, Dizzy)
                | (Looking, Dizzy)
                | (Looking, Static)
                | (Dizzy, Looking)
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            BehaviorState::Static => "static",
            BehaviorState::Looking => "looking",
            BehaviorState::Dizzy => "dizzy",
        }
    }
}

/// Cosmetic expression label consumed by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mood {
    #[default]
    Normal,
    Happy,
    Sleepy,
    Surprised,
    Angry,
}

impl Mood {
    /// Moods a startle reaction may show on Static → Looking.
    pub const STARTLE: [Mood; 2] = [Mood::Surprised, Mood::Angry];
}

/// Orientation permission as reported by the external permission flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionStatus {
    /// Not asked yet.
    #[default]
    Prompt,
    Granted,
    Denied,
}

// ============================================================================
// OUTPUTS
// ============================================================================

/// A state change taken by the behavior state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Transition {
    /// Virtual time at which the transition happened.
    pub at_ms: u64,
    pub from: BehaviorState,
    pub to: BehaviorState,
}

/// Everything the presentation layer needs to draw one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EyesOutput {
    /// Virtual time the snapshot was taken at.
    pub at_ms: u64,
    /// Target position for each eye's inner pupil.
    pub pupil_offset: Vec2,
    /// Spring-driven displacement of the whole eye.
    pub eye_offset: Vec2,
    pub mood: Mood,
    pub state: BehaviorState,
    pub is_dizzy_visual: bool,
}

impl EyesOutput {
    /// True when the drawable content differs, ignoring the timestamp.
    pub fn differs_from(&self, other: &EyesOutput) -> bool {
        self.pupil_offset != other.pupil_offset
            || self.eye_offset != other.eye_offset
            || self.mood != other.mood
            || self.state != other.state
            || self.is_dizzy_visual != other.is_dizzy_visual
    }
}
