//! Behavior state machine tying every stage together.
//!
//! This module owns the single mutable behavior state (Static / Looking /
//! Dizzy) and decides which subsystem may write which output:
//!
//! | State   | Eye offset            | Pupil offset                 | Mood            |
//! |---------|-----------------------|------------------------------|-----------------|
//! | Static  | spring, until settled | idle player or orientation   | mood selector   |
//! | Looking | spring integrator     | orientation (if granted)     | startle cue     |
//! | Dizzy   | return to center      | orientation (if granted)     | Normal          |
//!
//! # Architecture
//!
//! Work happens only inside three kinds of callback: a sensor sample
//! (`on_motion`, `on_tilt`), a timer firing (driven by `advance_to`), and an
//! animation frame (`on_animation_frame`). Each callback first fires every
//! timer due at or before its timestamp, so events interleave on one
//! virtual timeline.
//!
//! Every transition runs `exit(old)` before `enter(new)`. `exit` cancels
//! every timer the outgoing owner holds, so an incoming owner never shares
//! an output with a stale callback. The one carry-over is the spring: a
//! displacement left behind by Looking keeps decaying in Static until it
//! settles, since nothing else in Static writes the eye offset.
//!
//! # Failure model
//! - A malformed motion or tilt sample is dropped and logged at trace level
//! - Denied permission just leaves the orientation mapper inactive
//! - Nothing here returns an error once the engine is built

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::classifier::{ClassifierConfig, MotionClassifier};
use crate::error::{ConfigError, GazeError};
use crate::idle_pattern::{IdlePatternConfig, IdlePatternPlayer, IdleStep};
use crate::mood::{MoodConfig, MoodSelector};
use crate::orientation::{OrientationConfig, OrientationMapper};
use crate::random::{RandomSource, SeededRandom};
use crate::scheduler::{Scheduler, TimerId, TimerKind};
use crate::spring::{SpringConfig, SpringEvent, SpringIntegrator};
use crate::types::*;

/// Looking falls back to Static once the time since the last Move/Shake
/// exceeds this.
pub const STATIC_TIMEOUT_MS: u64 = 1000;

/// Fixed length of the Dizzy state.
pub const DIZZY_DURATION_MS: u64 = 800;

/// How long the startle mood shows on Static → Looking.
pub const STARTLE_DURATION_MS: u64 = 1000;

/// Timing of the state machine itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Quiet time that must be exceeded to return Looking to Static
    /// (milliseconds).
    pub static_timeout_ms: u64,

    /// Dizzy duration (milliseconds). Dizzy always lasts exactly this long
    /// unless `restart_dizzy_on_shake` is set.
    pub dizzy_duration_ms: u64,

    /// Duration of the startle mood cue (milliseconds).
    pub startle_duration_ms: u64,

    /// Whether a shake during Dizzy restarts the Dizzy timer.
    pub restart_dizzy_on_shake: bool,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            static_timeout_ms: STATIC_TIMEOUT_MS,
            dizzy_duration_ms: DIZZY_DURATION_MS,
            startle_duration_ms: STARTLE_DURATION_MS,
            restart_dizzy_on_shake: false,
        }
    }
}

impl BehaviorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("behavior.static_timeout_ms", self.static_timeout_ms),
            ("behavior.dizzy_duration_ms", self.dizzy_duration_ms),
            ("behavior.startle_duration_ms", self.startle_duration_ms),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(ConfigError::NotPositive { field, value: 0.0 });
            }
        }
        Ok(())
    }
}

/// Configuration for the complete engine.
///
/// Bundles every sub-component configuration. Partial JSON documents are
/// accepted; anything not named keeps its default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub classifier: ClassifierConfig,
    pub behavior: BehaviorConfig,
    pub spring: SpringConfig,
    pub idle: IdlePatternConfig,
    pub mood: MoodConfig,
    pub orientation: OrientationConfig,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.classifier.validate()?;
        self.behavior.validate()?;
        self.spring.validate()?;
        self.idle.validate(self.spring.max_movement)?;
        self.mood.validate()?;
        self.orientation.validate()?;
        Ok(())
    }

    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> crate::error::Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> crate::error::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| GazeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }
}

/// Counters for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    pub motion_samples: u64,
    pub dropped_motion_samples: u64,
    pub tilt_samples: u64,
    pub dropped_tilt_samples: u64,
    pub frames: u64,
    pub transitions: u64,
}

#[derive(Debug, Clone, Copy)]
struct StartleCue {
    mood: Mood,
    timer: TimerId,
}

/// The behavior state machine and owner of every output.
pub struct BehaviorEngine {
    config: BehaviorConfig,
    sched: Scheduler,
    rng: Box<dyn RandomSource>,

    // Stages
    classifier: MotionClassifier,
    spring: SpringIntegrator,
    idle: IdlePatternPlayer,
    mood: MoodSelector,
    orientation: OrientationMapper,

    // State
    state: BehaviorState,
    pupil_offset: Vec2,
    is_dizzy_visual: bool,
    startle: Option<StartleCue>,
    dizzy_timer: Option<TimerId>,
    static_timer: Option<TimerId>,
    last_motion_ms: Option<u64>,
    idle_preempted: bool,
    shut_down: bool,

    // Diagnostics
    transitions: Vec<Transition>,
    stats: EngineStats,
}

impl BehaviorEngine {
    /// Build an engine seeded from OS entropy, clock starting at `start_ms`.
    pub fn new(config: EngineConfig, start_ms: u64) -> Result<Self, ConfigError> {
        Self::with_random(config, Box::new(SeededRandom::from_entropy()), start_ms)
    }

    /// Build an engine with an explicit random source.
    ///
    /// The engine starts in Static, so the idle player and mood selector
    /// are already running when this returns.
    pub fn with_random(
        config: EngineConfig,
        rng: Box<dyn RandomSource>,
        start_ms: u64,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let EngineConfig {
            classifier,
            behavior,
            spring,
            idle,
            mood,
            orientation,
        } = config;

        let mut engine = Self {
            config: behavior,
            sched: Scheduler::starting_at(start_ms),
            rng,
            classifier: MotionClassifier::new(classifier),
            spring: SpringIntegrator::new(spring),
            idle: IdlePatternPlayer::new(idle),
            mood: MoodSelector::new(mood),
            orientation: OrientationMapper::new(orientation),
            state: BehaviorState::Static,
            pupil_offset: Vec2::ZERO,
            is_dizzy_visual: false,
            startle: None,
            dizzy_timer: None,
            static_timer: None,
            last_motion_ms: None,
            idle_preempted: false,
            shut_down: false,
            transitions: Vec::new(),
            stats: EngineStats::default(),
        };
        engine.enter(BehaviorState::Static, None);
        info!(start_ms, "gaze engine started");
        Ok(engine)
    }

    // ------------------------------------------------------------------
    // External callbacks
    // ------------------------------------------------------------------

    /// Fire every timer due at or before `now_ms` and move the clock there.
    pub fn advance_to(&mut self, now_ms: u64) {
        if self.shut_down {
            return;
        }
        if now_ms < self.sched.now_ms() {
            warn!(
                now_ms,
                clock_ms = self.sched.now_ms(),
                "timestamp behind clock, handled at clock time"
            );
            return;
        }
        while let Some((id, kind)) = self.sched.pop_due(now_ms) {
            self.on_timer(id, kind);
        }
        self.sched.advance_clock(now_ms);
    }

    /// Sensor callback for an acceleration sample.
    ///
    /// Returns the classification, or `None` if the sample was dropped or
    /// the engine is shut down.
    pub fn on_motion(&mut self, sample: &MotionSample) -> Option<MotionClass> {
        if self.shut_down {
            return None;
        }
        self.advance_to(sample.timestamp_ms);
        self.stats.motion_samples += 1;

        let classification = match self.classifier.classify(sample) {
            Ok(c) => c,
            Err(err) => {
                self.stats.dropped_motion_samples += 1;
                trace!(%err, ts = sample.timestamp_ms, "motion sample dropped");
                return None;
            }
        };

        match classification.class {
            MotionClass::Idle => {}
            MotionClass::Move => {
                self.note_motion();
                match self.state {
                    BehaviorState::Static => {
                        self.transition(BehaviorState::Looking);
                        self.spring.kick(&mut self.sched, classification.delta);
                    }
                    BehaviorState::Looking => {
                        self.spring.kick(&mut self.sched, classification.delta);
                    }
                    BehaviorState::Dizzy => {}
                }
            }
            MotionClass::Shake => {
                self.note_motion();
                match self.state {
                    BehaviorState::Dizzy => self.shake_while_dizzy(),
                    _ => self.transition(BehaviorState::Dizzy),
                }
            }
        }
        Some(classification.class)
    }

    /// Sensor callback for an orientation sample.
    ///
    /// Returns the new pupil offset when the mapper is active and the
    /// sample is complete.
    pub fn on_tilt(&mut self, sample: &TiltSample) -> Option<Vec2> {
        if self.shut_down {
            return None;
        }
        self.advance_to(sample.timestamp_ms);
        self.stats.tilt_samples += 1;

        match self.orientation.map(sample) {
            Ok(Some(offset)) => {
                self.pupil_offset = offset;
                if self.idle.is_running() {
                    self.idle.stop(&mut self.sched);
                    self.idle_preempted = true;
                    debug!("orientation took over the pupils");
                }
                Some(offset)
            }
            Ok(None) => None,
            Err(err) => {
                self.stats.dropped_tilt_samples += 1;
                trace!(%err, ts = sample.timestamp_ms, "tilt sample dropped");
                None
            }
        }
    }

    /// Record the outcome of the external permission flow.
    pub fn set_permission(&mut self, status: PermissionStatus) {
        if self.shut_down {
            return;
        }
        let was = self.orientation.permission();
        self.orientation.set_permission(status);
        if was != status {
            info!(?status, "orientation permission changed");
        }
        // Hand the pupils back to the idle player if orientation took them.
        // A Sleepy mood suppresses new idle sequences.
        if status != PermissionStatus::Granted
            && self.idle_preempted
            && self.state == BehaviorState::Static
            && self.mood.mood() != Mood::Sleepy
        {
            self.start_idle();
        }
    }

    /// Animation frame callback.
    pub fn on_animation_frame(&mut self, now_ms: u64) {
        if self.shut_down {
            return;
        }
        self.advance_to(now_ms);
        self.stats.frames += 1;

        for (id, kind) in self.sched.take_frames() {
            match self.spring.on_frame(&mut self.sched, id, kind) {
                Some(SpringEvent::Centered) => {
                    debug!(state = self.state.label(), "eye offset centered");
                }
                Some(_) | None => {}
            }
        }
    }

    /// Drive frames at a fixed cadence up to and including `until_ms`.
    pub fn run_until(&mut self, until_ms: u64, frame_interval_ms: u64) {
        let step = frame_interval_ms.max(1);
        let mut t = self.sched.now_ms();
        while t < until_ms && !self.shut_down {
            t = (t + step).min(until_ms);
            self.on_animation_frame(t);
        }
    }

    /// Cancel every timer and frame request. Later callbacks are ignored.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.idle.stop(&mut self.sched);
        self.mood.stop(&mut self.sched);
        self.spring.stop(&mut self.sched);
        self.cancel_startle();
        self.cancel_timer(TimerSlot::Dizzy);
        self.cancel_timer(TimerSlot::Static);
        self.sched.clear_all();
        self.shut_down = true;
        info!("gaze engine shut down");
    }

    // ------------------------------------------------------------------
    // Outputs
    // ------------------------------------------------------------------

    pub fn output(&self) -> EyesOutput {
        EyesOutput {
            at_ms: self.sched.now_ms(),
            pupil_offset: self.pupil_offset,
            eye_offset: self.spring.offset(),
            mood: self.mood(),
            state: self.state,
            is_dizzy_visual: self.is_dizzy_visual,
        }
    }

    pub fn state(&self) -> BehaviorState {
        self.state
    }

    /// Published mood: the startle cue while it shows, otherwise the mood
    /// selector's (which is Normal outside Static).
    pub fn mood(&self) -> Mood {
        match self.startle {
            Some(cue) => cue.mood,
            None => self.mood.mood(),
        }
    }

    pub fn pupil_offset(&self) -> Vec2 {
        self.pupil_offset
    }

    pub fn eye_offset(&self) -> Vec2 {
        self.spring.offset()
    }

    pub fn is_dizzy_visual(&self) -> bool {
        self.is_dizzy_visual
    }

    pub fn permission(&self) -> PermissionStatus {
        self.orientation.permission()
    }

    pub fn now_ms(&self) -> u64 {
        self.sched.now_ms()
    }

    pub fn last_motion_ms(&self) -> Option<u64> {
        self.last_motion_ms
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.sched
    }

    pub fn spring(&self) -> &SpringIntegrator {
        &self.spring
    }

    pub fn idle_player(&self) -> &IdlePatternPlayer {
        &self.idle
    }

    pub fn mood_selector(&self) -> &MoodSelector {
        &self.mood
    }

    /// Transitions recorded since the last drain.
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn drain_transitions(&mut self) -> Vec<Transition> {
        std::mem::take(&mut self.transitions)
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    fn transition(&mut self, to: BehaviorState) {
        let from = self.state;
        debug_assert!(from.can_transition_to(to), "illegal edge {from:?} -> {to:?}");

        self.exit(from);
        self.state = to;
        let at_ms = self.sched.now_ms();
        self.transitions.push(Transition { at_ms, from, to });
        self.stats.transitions += 1;
        debug!(at_ms, from = from.label(), to = to.label(), "behavior transition");
        self.enter(to, Some(from));
    }

    fn exit(&mut self, state: BehaviorState) {
        match state {
            BehaviorState::Static => {
                self.idle.stop(&mut self.sched);
                self.mood.stop(&mut self.sched);
            }
            BehaviorState::Looking => {
                // The spring keeps its frame; Dizzy preempts it with a return.
                self.cancel_startle();
            }
            BehaviorState::Dizzy => {
                self.cancel_timer(TimerSlot::Dizzy);
                self.spring.finish_return(&mut self.sched);
                self.is_dizzy_visual = false;
            }
        }
    }

    fn enter(&mut self, state: BehaviorState, from: Option<BehaviorState>) {
        match state {
            BehaviorState::Static => {
                self.cancel_timer(TimerSlot::Static);
                self.start_idle();
                self.mood.start(&mut self.sched, &mut *self.rng);
            }
            BehaviorState::Looking => match from {
                Some(BehaviorState::Static) => self.start_startle(),
                Some(BehaviorState::Dizzy) => self.rearm_static_timer(),
                _ => {}
            },
            BehaviorState::Dizzy => {
                self.is_dizzy_visual = true;
                self.arm_dizzy_timer();
                self.spring.start_return(&mut self.sched);
            }
        }
    }

    fn shake_while_dizzy(&mut self) {
        if self.config.restart_dizzy_on_shake {
            debug!("shake during dizzy, timer restarted");
            self.arm_dizzy_timer();
        } else {
            trace!("shake during dizzy ignored");
        }
    }

    fn on_timer(&mut self, id: TimerId, kind: TimerKind) {
        match kind {
            TimerKind::DizzyExpired => {
                if self.dizzy_timer == Some(id) {
                    self.dizzy_timer = None;
                    self.transition(BehaviorState::Looking);
                }
            }
            TimerKind::StaticTimeout => {
                if self.static_timer == Some(id) {
                    self.static_timer = None;
                    if self.state == BehaviorState::Looking {
                        self.transition(BehaviorState::Static);
                    }
                }
            }
            TimerKind::StartleExpired => {
                if self.startle.map(|cue| cue.timer) == Some(id) {
                    self.startle = None;
                    debug!("startle over");
                }
            }
            TimerKind::WaypointHold => {
                let mood = self.mood.mood();
                match self.idle.on_timer(&mut self.sched, &mut *self.rng, id, mood) {
                    Some(IdleStep::Waypoint(offset)) | Some(IdleStep::Suppressed(offset)) => {
                        self.pupil_offset = offset;
                    }
                    None => {}
                }
            }
            TimerKind::SleepyOnset => {
                self.mood.on_timer(id);
            }
        }
    }

    // ------------------------------------------------------------------
    // Timer ownership
    // ------------------------------------------------------------------

    fn note_motion(&mut self) {
        self.last_motion_ms = Some(self.sched.now_ms());
        self.rearm_static_timer();
    }

    /// One static-timeout timer, due the first millisecond past
    /// `static_timeout_ms` after the last Move/Shake. Replaces any pending
    /// one.
    fn rearm_static_timer(&mut self) {
        self.cancel_timer(TimerSlot::Static);
        let Some(last) = self.last_motion_ms else {
            return;
        };
        let due = last
            .saturating_add(self.config.static_timeout_ms)
            .saturating_add(1);
        self.static_timer = Some(self.sched.set_deadline(due, TimerKind::StaticTimeout));
    }

    fn arm_dizzy_timer(&mut self) {
        self.cancel_timer(TimerSlot::Dizzy);
        self.dizzy_timer = Some(
            self.sched
                .set_timeout(self.config.dizzy_duration_ms, TimerKind::DizzyExpired),
        );
    }

    fn cancel_timer(&mut self, slot: TimerSlot) {
        let handle = match slot {
            TimerSlot::Dizzy => self.dizzy_timer.take(),
            TimerSlot::Static => self.static_timer.take(),
        };
        if let Some(id) = handle {
            self.sched.clear_timeout(id);
        }
    }

    fn start_startle(&mut self) {
        self.cancel_startle();
        let pick = self.rng.pick_index(Mood::STARTLE.len());
        let mood = Mood::STARTLE[pick];
        let timer = self
            .sched
            .set_timeout(self.config.startle_duration_ms, TimerKind::StartleExpired);
        self.startle = Some(StartleCue { mood, timer });
        debug!(?mood, "startled");
    }

    fn cancel_startle(&mut self) {
        if let Some(cue) = self.startle.take() {
            self.sched.clear_timeout(cue.timer);
        }
    }

    fn start_idle(&mut self) {
        self.idle_preempted = false;
        self.idle.start(&mut self.sched, &mut *self.rng);
    }
}

#[derive(Debug, Clone, Copy)]
enum TimerSlot {
    Dizzy,
    Static,
}

impl std::fmt::Debug for BehaviorEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BehaviorEngine")
            .field("state", &self.state)
            .field("now_ms", &self.sched.now_ms())
            .field("output", &self.output())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::ScriptedRandom;
    use pretty_assertions::assert_eq;

    fn engine_with(values: Vec<f64>) -> BehaviorEngine {
        BehaviorEngine::with_random(
            EngineConfig::default(),
            Box::new(ScriptedRandom::new(values)),
            0,
        )
        .unwrap()
    }

    fn still(ts: u64) -> MotionSample {
        MotionSample::new(ts, 0.0, 0.0, 9.8)
    }

    #[test]
    fn test_config_default_is_valid() {
        let config = EngineConfig::default();
        assert_eq!(config.behavior.static_timeout_ms, 1000);
        assert_eq!(config.behavior.dizzy_duration_ms, 800);
        assert!(!config.behavior.restart_dizzy_on_shake);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_partial_json() {
        let config = EngineConfig::from_json_str(
            r#"{ "behavior": { "restart_dizzy_on_shake": true }, "mood": { "sleepy_delay_min_ms": 2000, "sleepy_delay_max_ms": 3000 } }"#,
        )
        .unwrap();
        assert!(config.behavior.restart_dizzy_on_shake);
        assert_eq!(config.behavior.dizzy_duration_ms, 800);
        assert_eq!(config.mood.sleepy_delay_min_ms, 2000);
        assert_eq!(config.idle.sequences.len(), 6);
    }

    #[test]
    fn test_config_json_rejects_invalid() {
        let err = EngineConfig::from_json_str(r#"{ "classifier": { "shake_threshold": 0.1 } }"#)
            .unwrap_err();
        assert!(matches!(err, GazeError::Config(ConfigError::ThresholdOrder { .. })));

        let err = EngineConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, GazeError::Json(_)));
    }

    #[test]
    fn test_config_missing_file() {
        let err = EngineConfig::from_json_file("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, GazeError::Io { .. }));
    }

    #[test]
    fn test_engine_starts_static_with_idle_and_mood() {
        let engine = engine_with(vec![0.0]);
        assert_eq!(engine.state(), BehaviorState::Static);
        assert_eq!(engine.mood(), Mood::Normal);
        assert!(engine.idle_player().is_running());
        assert!(engine.mood_selector().is_pending());
        assert!(engine.transitions().is_empty());
    }

    #[test]
    fn test_first_waypoint_shows_after_its_hold() {
        let mut engine = engine_with(vec![0.0]);
        assert_eq!(engine.pupil_offset(), Vec2::ZERO);
        engine.advance_to(499);
        assert_eq!(engine.pupil_offset(), Vec2::ZERO);
        engine.advance_to(500);
        assert_eq!(engine.pupil_offset(), Vec2::new(-15.0, 0.0));
    }

    #[test]
    fn test_move_enters_looking_with_startle() {
        // idle pick, mood delay, then startle pick 0.9 -> Angry
        let mut engine = engine_with(vec![0.0, 0.0, 0.9]);
        engine.on_motion(&still(0));
        assert_eq!(
            engine.on_motion(&MotionSample::new(20, 2.0, 0.0, 9.8)),
            Some(MotionClass::Move)
        );
        assert_eq!(engine.state(), BehaviorState::Looking);
        assert_eq!(engine.mood(), Mood::Angry);
        assert!(!engine.idle_player().is_running());
        assert!(!engine.mood_selector().is_pending());
        assert_eq!(engine.eye_offset(), Vec2::new(-4.0, 0.0));
    }

    #[test]
    fn test_startle_reverts_after_duration() {
        let mut engine = engine_with(vec![0.0, 0.0, 0.1]);
        engine.on_motion(&still(0));
        engine.on_motion(&MotionSample::new(100, 1.0, 0.0, 9.8));
        assert_eq!(engine.mood(), Mood::Surprised);

        // Keep moving so the static timeout does not end Looking first.
        engine.on_motion(&MotionSample::new(600, 2.0, 0.0, 9.8));
        engine.advance_to(1099);
        assert_eq!(engine.mood(), Mood::Surprised);
        engine.advance_to(1100);
        assert_eq!(engine.mood(), Mood::Normal);
        assert_eq!(engine.state(), BehaviorState::Looking);
    }

    #[test]
    fn test_looking_returns_to_static_after_timeout() {
        let mut engine = engine_with(vec![0.0]);
        engine.on_motion(&still(0));
        engine.on_motion(&MotionSample::new(100, 1.0, 0.0, 9.8));
        engine.on_motion(&MotionSample::new(150, 1.0, 0.0, 9.8));

        // Exactly the timeout is not enough; it has to be exceeded.
        engine.advance_to(1100);
        assert_eq!(engine.state(), BehaviorState::Looking);
        engine.advance_to(1101);
        assert_eq!(engine.state(), BehaviorState::Static);
        assert_eq!(engine.mood(), Mood::Normal);
        assert!(engine.idle_player().is_running());
        assert!(engine.mood_selector().is_pending());
    }

    #[test]
    fn test_idle_samples_do_not_leave_static() {
        let mut engine = engine_with(vec![0.0]);
        for i in 0..200 {
            assert_eq!(engine.on_motion(&still(i * 20)), Some(MotionClass::Idle));
        }
        assert_eq!(engine.state(), BehaviorState::Static);
        assert!(engine.transitions().is_empty());
    }

    #[test]
    fn test_shake_enters_dizzy() {
        let mut engine = engine_with(vec![0.0]);
        engine.on_motion(&still(0));
        engine.on_motion(&MotionSample::new(20, 30.0, 0.0, 9.8));
        assert_eq!(engine.state(), BehaviorState::Dizzy);
        assert!(engine.is_dizzy_visual());
        assert_eq!(engine.mood(), Mood::Normal);
        assert!(!engine.idle_player().is_running());
        assert!(engine.scheduler().has_timer(TimerKind::DizzyExpired));
    }

    #[test]
    fn test_move_during_dizzy_is_ignored() {
        let mut engine = engine_with(vec![0.0]);
        engine.on_motion(&still(0));
        engine.on_motion(&MotionSample::new(20, 30.0, 0.0, 9.8));
        engine.on_motion(&MotionSample::new(40, 29.0, 0.0, 9.8));
        assert_eq!(engine.state(), BehaviorState::Dizzy);
        assert_eq!(engine.eye_offset(), Vec2::ZERO);
    }

    #[test]
    fn test_dizzy_exits_to_looking_then_static() {
        let mut engine = engine_with(vec![0.0]);
        engine.on_motion(&still(0));
        engine.on_motion(&MotionSample::new(20, 30.0, 0.0, 9.8));

        engine.advance_to(819);
        assert_eq!(engine.state(), BehaviorState::Dizzy);
        engine.advance_to(820);
        assert_eq!(engine.state(), BehaviorState::Looking);
        assert!(!engine.is_dizzy_visual());
        assert_eq!(engine.mood(), Mood::Normal);

        engine.advance_to(1020);
        assert_eq!(engine.state(), BehaviorState::Looking);
        engine.advance_to(1021);
        assert_eq!(engine.state(), BehaviorState::Static);

        let edges: Vec<_> = engine.drain_transitions().iter().map(|t| (t.from, t.to)).collect();
        assert_eq!(
            edges,
            vec![
                (BehaviorState::Static, BehaviorState::Dizzy),
                (BehaviorState::Dizzy, BehaviorState::Looking),
                (BehaviorState::Looking, BehaviorState::Static),
            ]
        );
    }

    #[test]
    fn test_shake_during_dizzy_does_not_extend_by_default() {
        let mut engine = engine_with(vec![0.0]);
        engine.on_motion(&still(0));
        engine.on_motion(&MotionSample::new(100, 30.0, 0.0, 9.8));
        engine.on_motion(&MotionSample::new(600, -30.0, 0.0, 9.8));
        engine.advance_to(900);
        assert_eq!(engine.state(), BehaviorState::Looking);
    }

    #[test]
    fn test_shake_during_dizzy_restarts_when_configured() {
        let mut config = EngineConfig::default();
        config.behavior.restart_dizzy_on_shake = true;
        let mut engine =
            BehaviorEngine::with_random(config, Box::new(ScriptedRandom::new(vec![0.0])), 0)
                .unwrap();
        engine.on_motion(&still(0));
        engine.on_motion(&MotionSample::new(100, 30.0, 0.0, 9.8));
        engine.on_motion(&MotionSample::new(600, -30.0, 0.0, 9.8));

        engine.advance_to(900);
        assert_eq!(engine.state(), BehaviorState::Dizzy);
        assert!(engine.scheduler().has_timer(TimerKind::DizzyExpired));
        engine.advance_to(1400);
        assert_eq!(engine.state(), BehaviorState::Looking);
    }

    #[test]
    fn test_dropped_sample_changes_nothing() {
        let mut engine = engine_with(vec![0.0]);
        engine.on_motion(&still(0));
        assert_eq!(engine.on_motion(&MotionSample::empty(20)), None);
        assert_eq!(engine.state(), BehaviorState::Static);
        assert_eq!(engine.stats().dropped_motion_samples, 1);
    }

    #[test]
    fn test_tilt_overrides_idle_when_granted() {
        let mut engine = engine_with(vec![0.0]);
        assert_eq!(engine.on_tilt(&TiltSample::new(10, 60.0, 45.0)), None);
        assert!(engine.idle_player().is_running());

        engine.set_permission(PermissionStatus::Granted);
        let offset = engine.on_tilt(&TiltSample::new(20, 60.0, 45.0));
        assert_eq!(offset, Some(Vec2::new(-10.0, 0.0)));
        assert_eq!(engine.pupil_offset(), Vec2::new(-10.0, 0.0));
        assert!(!engine.idle_player().is_running());
        assert!(!engine.scheduler().has_timer(TimerKind::WaypointHold));
    }

    #[test]
    fn test_revoked_permission_restarts_idle() {
        let mut engine = engine_with(vec![0.0]);
        engine.set_permission(PermissionStatus::Granted);
        engine.on_tilt(&TiltSample::new(20, 60.0, 45.0));
        assert!(!engine.idle_player().is_running());

        engine.set_permission(PermissionStatus::Denied);
        assert!(engine.idle_player().is_running());
        assert_eq!(engine.pupil_offset(), Vec2::new(-10.0, 0.0));

        engine.advance_to(519);
        assert_eq!(engine.pupil_offset(), Vec2::new(-10.0, 0.0));
        engine.advance_to(520);
        assert_eq!(engine.pupil_offset(), Vec2::new(-15.0, 0.0));
    }

    #[test]
    fn test_revoked_permission_while_sleepy_keeps_idle_stopped() {
        let mut config = EngineConfig::default();
        config.mood.sleepy_delay_min_ms = 2_000;
        config.mood.sleepy_delay_max_ms = 3_000;
        let mut engine =
            BehaviorEngine::with_random(config, Box::new(ScriptedRandom::new(vec![0.0])), 0)
                .unwrap();

        engine.set_permission(PermissionStatus::Granted);
        engine.on_tilt(&TiltSample::new(10, 60.0, 45.0));
        engine.advance_to(2_500);
        assert_eq!(engine.mood(), Mood::Sleepy);
        assert!(!engine.idle_player().is_running());

        engine.set_permission(PermissionStatus::Denied);
        assert!(!engine.idle_player().is_running());
        assert_eq!(engine.idle_player().sequences_started(), 1);
        assert!(!engine.scheduler().has_timer(TimerKind::WaypointHold));
        assert_eq!(engine.pupil_offset(), Vec2::new(-10.0, 0.0));
    }

    #[test]
    fn test_shutdown_cancels_everything() {
        let mut engine = engine_with(vec![0.0]);
        engine.on_motion(&still(0));
        engine.on_motion(&MotionSample::new(20, 2.0, 0.0, 9.8));
        engine.shutdown();
        assert_eq!(engine.scheduler().pending_timers(), 0);
        assert_eq!(engine.scheduler().pending_frames(), 0);
        assert!(engine.is_shut_down());

        assert_eq!(engine.on_motion(&MotionSample::new(40, 50.0, 0.0, 9.8)), None);
        engine.advance_to(10_000);
        assert_eq!(engine.state(), BehaviorState::Looking);
    }

    #[test]
    fn test_backwards_timestamp_handled_at_clock() {
        let mut engine = engine_with(vec![0.0]);
        engine.advance_to(500);
        assert_eq!(engine.on_motion(&still(100)), Some(MotionClass::Idle));
        assert_eq!(engine.now_ms(), 500);
    }
}
