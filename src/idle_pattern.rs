//! Idle gaze pattern player.
//!
//! While the device rests, the pupils wander along scripted waypoint
//! sequences. Each waypoint carries its own hold: it is published as the
//! pupil offset once that much time has passed since the previous waypoint
//! began. When the last waypoint of a sequence has been published a new
//! sequence is picked at random from the catalog and started straight away.
//!
//! Two things stop the chain:
//! - the owner calls `stop` (state left Static, or orientation took over)
//! - the mood is Sleepy when a sequence ends; no new sequence starts
//!
//! Design note: Each waypoint hold is a single one-shot timer. The player
//! keeps exactly one handle and cancels it in `stop`, so two chains can
//! never run at once.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::random::RandomSource;
use crate::scheduler::{Scheduler, TimerId, TimerKind};
use crate::types::{Mood, Vec2};

/// Shortest hold used by the built-in catalog.
pub const MIN_CURATED_HOLD_MS: u64 = 200;

/// Longest hold used by the built-in catalog.
pub const MAX_CURATED_HOLD_MS: u64 = 800;

/// One stop on a gaze path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub offset: Vec2,
    /// Time after the previous waypoint began before this one shows.
    pub hold_ms: u64,
}

impl Waypoint {
    pub const fn new(x: f32, y: f32, hold_ms: u64) -> Self {
        Self {
            offset: Vec2::new(x, y),
            hold_ms,
        }
    }
}

/// A named, immutable gaze path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaypointSequence {
    pub name: String,
    pub waypoints: Vec<Waypoint>,
}

impl WaypointSequence {
    pub fn new(name: impl Into<String>, waypoints: Vec<Waypoint>) -> Self {
        Self {
            name: name.into(),
            waypoints,
        }
    }

    /// Sum of all hold durations.
    pub fn total_duration_ms(&self) -> u64 {
        self.waypoints.iter().map(|w| w.hold_ms).sum()
    }
}

/// The six curated sequences.
pub fn default_catalog() -> Vec<WaypointSequence> {
    vec![
        WaypointSequence::new(
            "scan",
            vec![
                Waypoint::new(-15.0, 0.0, 500),
                Waypoint::new(-5.0, 0.0, 300),
                Waypoint::new(5.0, 0.0, 300),
                Waypoint::new(15.0, 0.0, 500),
                Waypoint::new(0.0, 0.0, 400),
            ],
        ),
        WaypointSequence::new(
            "glance_left",
            vec![
                Waypoint::new(0.0, 0.0, 400),
                Waypoint::new(-18.0, -3.0, 600),
                Waypoint::new(-12.0, 2.0, 200),
                Waypoint::new(0.0, 0.0, 500),
            ],
        ),
        WaypointSequence::new(
            "glance_right",
            vec![
                Waypoint::new(0.0, 0.0, 400),
                Waypoint::new(18.0, -3.0, 600),
                Waypoint::new(12.0, 2.0, 200),
                Waypoint::new(0.0, 0.0, 500),
            ],
        ),
        WaypointSequence::new(
            "look_up",
            vec![
                Waypoint::new(0.0, -8.0, 300),
                Waypoint::new(0.0, -18.0, 800),
                Waypoint::new(6.0, -15.0, 400),
                Waypoint::new(-6.0, -15.0, 400),
                Waypoint::new(0.0, 0.0, 300),
            ],
        ),
        WaypointSequence::new(
            "roll",
            vec![
                Waypoint::new(12.0, 0.0, 200),
                Waypoint::new(8.0, 10.0, 200),
                Waypoint::new(-8.0, 10.0, 200),
                Waypoint::new(-12.0, 0.0, 200),
                Waypoint::new(-8.0, -10.0, 200),
                Waypoint::new(8.0, -10.0, 300),
            ],
        ),
        WaypointSequence::new(
            "curious",
            vec![
                Waypoint::new(4.0, 6.0, 700),
                Waypoint::new(10.0, 12.0, 800),
                Waypoint::new(-4.0, 8.0, 300),
                Waypoint::new(-14.0, -4.0, 600),
                Waypoint::new(0.0, 0.0, 400),
            ],
        ),
    ]
}

/// Catalog of sequences the player picks from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdlePatternConfig {
    pub sequences: Vec<WaypointSequence>,
}

impl Default for IdlePatternConfig {
    fn default() -> Self {
        Self {
            sequences: default_catalog(),
        }
    }
}

impl IdlePatternConfig {
    /// Every sequence must be non-empty, every hold non-zero and every
    /// waypoint inside `bound`.
    pub fn validate(&self, bound: f32) -> Result<(), ConfigError> {
        if self.sequences.is_empty() {
            return Err(ConfigError::EmptyCatalog);
        }
        for sequence in &self.sequences {
            if sequence.waypoints.is_empty() {
                return Err(ConfigError::EmptySequence(sequence.name.clone()));
            }
            for (index, waypoint) in sequence.waypoints.iter().enumerate() {
                if waypoint.hold_ms == 0 {
                    return Err(ConfigError::ZeroHold {
                        sequence: sequence.name.clone(),
                        index,
                    });
                }
                if !waypoint.offset.is_bounded(bound) {
                    return Err(ConfigError::WaypointOutOfBounds {
                        sequence: sequence.name.clone(),
                        index,
                        bound,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Outcome of a waypoint hold expiring.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IdleStep {
    /// Publish this offset; the player keeps running.
    Waypoint(Vec2),
    /// Publish this final offset; the sequence ended while Sleepy and the
    /// player is stopped.
    Suppressed(Vec2),
}

#[derive(Debug, Clone, Copy)]
struct Cursor {
    sequence: usize,
    waypoint: usize,
}

/// Plays catalog sequences back to back.
#[derive(Debug, Clone)]
pub struct IdlePatternPlayer {
    catalog: Vec<WaypointSequence>,
    cursor: Option<Cursor>,
    timer: Option<TimerId>,
    sequences_started: u64,
}

impl IdlePatternPlayer {
    pub fn new(config: IdlePatternConfig) -> Self {
        Self {
            catalog: config.sequences,
            cursor: None,
            timer: None,
            sequences_started: 0,
        }
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_some()
    }

    /// Name of the sequence being played.
    pub fn current_sequence(&self) -> Option<&str> {
        self.cursor
            .map(|c| self.catalog[c.sequence].name.as_str())
    }

    /// Index of the waypoint whose hold is running.
    pub fn current_waypoint(&self) -> Option<usize> {
        self.cursor.map(|c| c.waypoint)
    }

    pub fn sequences_started(&self) -> u64 {
        self.sequences_started
    }

    pub fn catalog(&self) -> &[WaypointSequence] {
        &self.catalog
    }

    /// Start a fresh random sequence, replacing whatever was playing.
    ///
    /// Nothing is published yet: the first waypoint shows once its hold
    /// has elapsed. Returns false if the catalog is empty.
    pub fn start(&mut self, sched: &mut Scheduler, rng: &mut dyn RandomSource) -> bool {
        self.stop(sched);
        if self.catalog.is_empty() {
            return false;
        }
        let sequence = rng.pick_index(self.catalog.len());
        self.sequences_started += 1;
        debug!(
            sequence = %self.catalog[sequence].name,
            duration_ms = self.catalog[sequence].total_duration_ms(),
            "idle sequence started"
        );
        self.arm(sched, Cursor { sequence, waypoint: 0 });
        true
    }

    fn arm(&mut self, sched: &mut Scheduler, cursor: Cursor) {
        let hold_ms = self.catalog[cursor.sequence].waypoints[cursor.waypoint].hold_ms;
        self.cursor = Some(cursor);
        self.timer = Some(sched.set_timeout(hold_ms, TimerKind::WaypointHold));
    }

    /// Timer callback for a finished hold. Ignores timers it does not own.
    pub fn on_timer(
        &mut self,
        sched: &mut Scheduler,
        rng: &mut dyn RandomSource,
        id: TimerId,
        mood: Mood,
    ) -> Option<IdleStep> {
        if self.timer != Some(id) {
            return None;
        }
        self.timer = None;
        let cursor = self.cursor?;

        let offset = self.catalog[cursor.sequence].waypoints[cursor.waypoint].offset;
        trace!(waypoint = cursor.waypoint, x = offset.x, y = offset.y, "idle waypoint");

        let next = cursor.waypoint + 1;
        if next < self.catalog[cursor.sequence].waypoints.len() {
            self.arm(
                sched,
                Cursor {
                    sequence: cursor.sequence,
                    waypoint: next,
                },
            );
            return Some(IdleStep::Waypoint(offset));
        }

        if mood == Mood::Sleepy {
            debug!("sleepy, idle chain suppressed");
            self.cursor = None;
            return Some(IdleStep::Suppressed(offset));
        }
        self.start(sched, rng);
        Some(IdleStep::Waypoint(offset))
    }

    /// Cancel the pending hold. Safe to call when not running.
    pub fn stop(&mut self, sched: &mut Scheduler) {
        if let Some(id) = self.timer.take() {
            sched.clear_timeout(id);
        }
        self.cursor = None;
    }
}

impl Default for IdlePatternPlayer {
    fn default() -> Self {
        Self::new(IdlePatternConfig::default())
    }
}
