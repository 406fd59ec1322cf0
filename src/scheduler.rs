//! Virtual clock with cancellable one-shot timers and animation frames.
//!
//! The engine is single-threaded and event-driven: work happens only inside
//! a sensor callback, a timer firing or an animation frame. All waiting is
//! expressed as a scheduled callback, and every scheduled callback has a
//! handle that its owner keeps and can cancel.
//!
//! Design note: Timers are kept in a `BTreeMap` keyed by `(due_ms, id)`.
//! Ids grow monotonically, so timers that fall due at the same instant fire
//! in the order they were scheduled. The clock only moves forward.

use std::collections::{BTreeMap, HashMap};

use tracing::trace;

/// Handle to a pending one-shot timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// Handle to a pending animation-frame request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(u64);

/// What a timer means when it fires. Dispatched by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Dizzy has lasted its full duration.
    DizzyExpired,
    /// Time since the last Move/Shake reached the static timeout.
    StaticTimeout,
    /// The startle mood cue is over.
    StartleExpired,
    /// The current idle waypoint has been held long enough.
    WaypointHold,
    /// The mood selector's delayed Sleepy transition.
    SleepyOnset,
}

/// What an animation-frame request drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// One damped-spring integration step.
    SpringStep,
    /// One return-to-center decay step.
    ReturnToCenter,
}

/// Timer and frame bookkeeping for one engine.
#[derive(Debug, Default)]
pub struct Scheduler {
    now_ms: u64,
    next_id: u64,
    timers: BTreeMap<(u64, u64), TimerKind>,
    timer_index: HashMap<TimerId, (u64, u64)>,
    frames: BTreeMap<FrameId, FrameKind>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a scheduler whose clock starts at `now_ms`.
    pub fn starting_at(now_ms: u64) -> Self {
        Self {
            now_ms,
            ..Self::default()
        }
    }

    /// Current virtual time.
    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Moves the clock forward. Returns false if `now_ms` lies in the past,
    /// in which case the clock is left untouched.
    pub fn advance_clock(&mut self, now_ms: u64) -> bool {
        if now_ms < self.now_ms {
            return false;
        }
        self.now_ms = now_ms;
        true
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Schedules `kind` to fire `delay_ms` after the current time.
    pub fn set_timeout(&mut self, delay_ms: u64, kind: TimerKind) -> TimerId {
        self.set_deadline(self.now_ms.saturating_add(delay_ms), kind)
    }

    /// Schedules `kind` to fire at absolute time `due_ms`. A deadline in the
    /// past fires at the next opportunity.
    pub fn set_deadline(&mut self, due_ms: u64, kind: TimerKind) -> TimerId {
        let raw = self.next_id();
        let id = TimerId(raw);
        let key = (due_ms.max(self.now_ms), raw);
        self.timers.insert(key, kind);
        self.timer_index.insert(id, key);
        trace!(?kind, due_ms = key.0, "timer armed");
        id
    }

    /// Cancels a pending timer. Returns false if it already fired or was
    /// cancelled.
    pub fn clear_timeout(&mut self, id: TimerId) -> bool {
        match self.timer_index.remove(&id) {
            Some(key) => self.timers.remove(&key).is_some(),
            None => false,
        }
    }

    /// Due time of a pending timer.
    pub fn deadline(&self, id: TimerId) -> Option<u64> {
        self.timer_index.get(&id).map(|(due, _)| *due)
    }

    /// Pops the earliest timer due at or before `until_ms`, moving the clock
    /// to its due time.
    pub fn pop_due(&mut self, until_ms: u64) -> Option<(TimerId, TimerKind)> {
        let (&key, _) = self.timers.iter().next()?;
        if key.0 > until_ms {
            return None;
        }
        let kind = self.timers.remove(&key)?;
        let id = TimerId(key.1);
        self.timer_index.remove(&id);
        self.now_ms = self.now_ms.max(key.0);
        Some((id, kind))
    }

    /// Due time of the earliest pending timer.
    pub fn next_deadline(&self) -> Option<u64> {
        self.timers.keys().next().map(|(due, _)| *due)
    }

    /// Requests a callback on the next animation frame.
    pub fn request_frame(&mut self, kind: FrameKind) -> FrameId {
        let id = FrameId(self.next_id());
        self.frames.insert(id, kind);
        id
    }

    /// Cancels a pending frame request.
    pub fn cancel_frame(&mut self, id: FrameId) -> bool {
        self.frames.remove(&id).is_some()
    }

    /// Takes every pending frame request in request order. Callbacks that
    /// want another frame must request it again.
    pub fn take_frames(&mut self) -> Vec<(FrameId, FrameKind)> {
        std::mem::take(&mut self.frames).into_iter().collect()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    pub fn pending_frames(&self) -> usize {
        self.frames.len()
    }

    /// True if a timer of this kind is pending.
    pub fn has_timer(&self, kind: TimerKind) -> bool {
        self.timers.values().any(|k| *k == kind)
    }

    /// Drops every pending timer and frame request.
    pub fn clear_all(&mut self) {
        self.timers.clear();
        self.timer_index.clear();
        self.frames.clear();
    }
}
