//! Gaze Engine Library
//!
//! A sensor-driven behavior kernel for a pair of animated eyes. Raw
//! acceleration and tilt streams go in; a small set of render-ready outputs
//! comes out: pupil offset, whole-eye offset, mood and the dizzy flag.
//!
//! # Design Philosophy
//!
//! - **One owner per output**: every output has exactly one writer in any
//!   behavior state, and the state machine hands ownership over explicitly.
//! - **Explicit time**: timers and animation frames run on an injectable
//!   virtual clock, so the whole engine is deterministic under test.
//! - **Injectable randomness**: sequence picks, mood delays and the startle
//!   cue draw from a `RandomSource` the caller controls.
//! - **Drop, don't fail**: malformed samples are skipped and logged; nothing
//!   past construction returns an error.
//!
//! # Example
//!
//! ```
//! use gaze_engine::{BehaviorEngine, EngineConfig, MotionSample, SeededRandom};
//!
//! let mut engine =
//!     BehaviorEngine::with_random(EngineConfig::default(), Box::new(SeededRandom::new(7)), 0)
//!         .unwrap();
//!
//! engine.on_motion(&MotionSample::new(0, 0.0, 0.0, 9.8));
//! engine.on_motion(&MotionSample::new(16, 40.0, 0.0, 9.8));
//! assert!(engine.output().is_dizzy_visual);
//! ```

pub mod classifier;
pub mod engine;
pub mod error;
pub mod idle_pattern;
pub mod mood;
pub mod orientation;
pub mod random;
pub mod scheduler;
pub mod spring;
pub mod types;


// Re-export commonly used types
pub use engine::{BehaviorConfig, BehaviorEngine, EngineConfig, EngineStats};
pub use error::{ConfigError, GazeError, SampleError};
pub use random::{RandomSource, ScriptedRandom, SeededRandom};
pub use types::{
    BehaviorState, EyesOutput, MotionClass, MotionSample, Mood, PermissionStatus, TiltSample,
    Transition, Vec2, MAX_MOVEMENT,
};
