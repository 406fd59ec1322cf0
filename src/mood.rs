//! Mood selection while the device rests.
//!
//! Policy: on start the mood is Normal, and a single transition to Sleepy
//! is scheduled after a uniformly random delay in `[min, max)`. Nothing
//! else changes the mood while Static. Stopping clears the pending timer
//! and puts the mood back to Normal.
//!
//! The startle reaction on Static → Looking is not a mood policy; the
//! behavior engine owns that cue.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;
use crate::random::RandomSource;
use crate::scheduler::{Scheduler, TimerId, TimerKind};
use crate::types::Mood;

/// Parameters for the delayed-Sleepy policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoodConfig {
    /// Inclusive lower bound of the sleepy delay. Typical: 10 s.
    pub sleepy_delay_min_ms: u64,
    /// Exclusive upper bound of the sleepy delay. Typical: 30 s.
    pub sleepy_delay_max_ms: u64,
}

impl Default for MoodConfig {
    fn default() -> Self {
        Self {
            sleepy_delay_min_ms: 10_000,
            sleepy_delay_max_ms: 30_000,
        }
    }
}

impl MoodConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sleepy_delay_max_ms <= self.sleepy_delay_min_ms {
            return Err(ConfigError::EmptyDelayRange {
                min_ms: self.sleepy_delay_min_ms,
                max_ms: self.sleepy_delay_max_ms,
            });
        }
        Ok(())
    }
}

/// Owns the mood while Static.
#[derive(Debug, Clone)]
pub struct MoodSelector {
    config: MoodConfig,
    mood: Mood,
    sleepy_timer: Option<TimerId>,
}

impl MoodSelector {
    pub fn new(config: MoodConfig) -> Self {
        Self {
            config,
            mood: Mood::Normal,
            sleepy_timer: None,
        }
    }

    pub fn mood(&self) -> Mood {
        self.mood
    }

    /// True while the Sleepy transition is still pending.
    pub fn is_pending(&self) -> bool {
        self.sleepy_timer.is_some()
    }

    /// Reset to Normal and schedule the Sleepy transition. Returns the
    /// chosen delay.
    pub fn start(&mut self, sched: &mut Scheduler, rng: &mut dyn RandomSource) -> u64 {
        self.stop(sched);
        let delay = rng.range_ms(self.config.sleepy_delay_min_ms, self.config.sleepy_delay_max_ms);
        self.sleepy_timer = Some(sched.set_timeout(delay, TimerKind::SleepyOnset));
        debug!(delay_ms = delay, "sleepy transition scheduled");
        delay
    }

    /// Timer callback. Returns the new mood if this was our timer.
    pub fn on_timer(&mut self, id: TimerId) -> Option<Mood> {
        if self.sleepy_timer != Some(id) {
            return None;
        }
        self.sleepy_timer = None;
        self.mood = Mood::Sleepy;
        debug!("mood -> sleepy");
        Some(self.mood)
    }

    /// Cancel the pending transition and force Normal.
    pub fn stop(&mut self, sched: &mut Scheduler) {
        if let Some(id) = self.sleepy_timer.take() {
            sched.clear_timeout(id);
        }
        self.mood = Mood::Normal;
    }
}

impl Default for MoodSelector {
    fn default() -> Self {
        Self::new(MoodConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::ScriptedRandom;

    #[test]
    fn test_config_validation() {
        assert!(MoodConfig::default().validate().is_ok());
        let inverted = MoodConfig {
            sleepy_delay_min_ms: 5_000,
            sleepy_delay_max_ms: 5_000,
        };
        assert_eq!(
            inverted.validate(),
            Err(ConfigError::EmptyDelayRange {
                min_ms: 5_000,
                max_ms: 5_000
            })
        );
    }

    #[test]
    fn test_start_is_normal_then_sleepy_after_delay() {
        let mut sched = Scheduler::new();
        let mut rng = ScriptedRandom::new(vec![0.25]);
        let mut selector = MoodSelector::default();

        let delay = selector.start(&mut sched, &mut rng);
        assert_eq!(delay, 15_000);
        assert_eq!(selector.mood(), Mood::Normal);

        assert!(sched.pop_due(14_999).is_none());
        let (id, kind) = sched.pop_due(15_000).unwrap();
        assert_eq!(kind, TimerKind::SleepyOnset);
        assert_eq!(selector.on_timer(id), Some(Mood::Sleepy));
        assert_eq!(selector.mood(), Mood::Sleepy);
        assert!(!selector.is_pending());
    }

    #[test]
    fn test_delay_bounds() {
        let mut sched = Scheduler::new();
        let mut selector = MoodSelector::default();

        let mut low = ScriptedRandom::new(vec![0.0]);
        assert_eq!(selector.start(&mut sched, &mut low), 10_000);

        let mut high = ScriptedRandom::new(vec![1.0]);
        assert_eq!(selector.start(&mut sched, &mut high), 29_999);
        assert_eq!(sched.pending_timers(), 1);
    }

    #[test]
    fn test_stop_cancels_and_resets() {
        let mut sched = Scheduler::new();
        let mut rng = ScriptedRandom::new(vec![0.0]);
        let mut selector = MoodSelector::default();
        selector.start(&mut sched, &mut rng);
        let (id, _) = sched.pop_due(u64::MAX).unwrap();
        selector.on_timer(id);
        assert_eq!(selector.mood(), Mood::Sleepy);

        selector.start(&mut sched, &mut rng);
        selector.stop(&mut sched);
        assert_eq!(selector.mood(), Mood::Normal);
        assert_eq!(sched.pending_timers(), 0);
    }

    #[test]
    fn test_stale_timer_ignored() {
        let mut sched = Scheduler::new();
        let mut rng = ScriptedRandom::new(vec![0.0]);
        let mut selector = MoodSelector::default();
        selector.start(&mut sched, &mut rng);
        let stale = sched.set_timeout(1, TimerKind::SleepyOnset);
        assert_eq!(selector.on_timer(stale), None);
        assert_eq!(selector.mood(), Mood::Normal);
    }
}
