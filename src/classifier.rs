//! Motion classification.
//!
//! Converts successive acceleration samples into a movement magnitude and
//! buckets it into `Idle`, `Move` or `Shake`.
//!
//! Design: stateful, O(1) per sample.
//! - Magnitude is the L1 norm of the per-axis delta to the previous sample
//! - Only the last accepted sample is kept
//! - A malformed sample is rejected without touching that state
//!
//! Why the delta and not the raw magnitude:
//! Gravity dominates the raw reading and changes only with orientation.
//! Differencing removes it without needing a gravity estimate.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{ConfigError, SampleError};
use crate::types::{MotionClass, MotionSample};

/// Movement magnitude above which a sample counts as `Move`.
pub const MOVEMENT_THRESHOLD: f32 = 0.5;

/// Movement magnitude above which a sample counts as `Shake`.
pub const SHAKE_THRESHOLD: f32 = 25.0;

/// Thresholds for motion classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Magnitude strictly above this is at least `Move`. Typical: 0.5.
    pub movement_threshold: f32,

    /// Magnitude strictly above this is `Shake`. Typical: 25.
    /// Must exceed `movement_threshold`.
    pub shake_threshold: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            movement_threshold: MOVEMENT_THRESHOLD,
            shake_threshold: SHAKE_THRESHOLD,
        }
    }
}

impl ClassifierConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.movement_threshold > 0.0) {
            return Err(ConfigError::NotPositive {
                field: "classifier.movement_threshold",
                value: self.movement_threshold as f64,
            });
        }
        if !(self.shake_threshold > self.movement_threshold) {
            return Err(ConfigError::ThresholdOrder {
                movement: self.movement_threshold,
                shake: self.shake_threshold,
            });
        }
        Ok(())
    }

    /// Bucket a movement magnitude.
    pub fn classify_magnitude(&self, magnitude: f32) -> MotionClass {
        if magnitude > self.shake_threshold {
            MotionClass::Shake
        } else if magnitude > self.movement_threshold {
            MotionClass::Move
        } else {
            MotionClass::Idle
        }
    }
}

/// Sum of absolute per-axis differences.
pub fn movement_magnitude(previous: [f32; 3], current: [f32; 3]) -> f32 {
    (current[0] - previous[0]).abs()
        + (current[1] - previous[1]).abs()
        + (current[2] - previous[2]).abs()
}

/// Result of classifying one accepted sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub class: MotionClass,
    pub magnitude: f32,
    /// Per-axis delta to the previous sample.
    pub delta: [f32; 3],
}

/// Stateful classifier over a sample stream.
#[derive(Debug, Clone)]
pub struct MotionClassifier {
    config: ClassifierConfig,
    last: Option<[f32; 3]>,
    accepted: u64,
    dropped: u64,
}

impl MotionClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self {
            config,
            last: None,
            accepted: 0,
            dropped: 0,
        }
    }

    /// Classify a sample against the previous accepted one.
    ///
    /// The first accepted sample has nothing to compare with and is `Idle`.
    /// A sample with a missing or non-finite axis is rejected and the
    /// last-sample state is left as it was.
    pub fn classify(&mut self, sample: &MotionSample) -> Result<Classification, SampleError> {
        let accel = match sample.accel() {
            Ok(accel) => accel,
            Err(err) => {
                self.dropped += 1;
                return Err(err);
            }
        };

        let (delta, magnitude) = match self.last {
            Some(prev) => (
                [accel[0] - prev[0], accel[1] - prev[1], accel[2] - prev[2]],
                movement_magnitude(prev, accel),
            ),
            None => ([0.0; 3], 0.0),
        };
        let class = self.config.classify_magnitude(magnitude);

        self.last = Some(accel);
        self.accepted += 1;

        trace!(ts = sample.timestamp_ms, magnitude, ?class, "motion classified");
        Ok(Classification {
            class,
            magnitude,
            delta,
        })
    }

    /// Forget the previous sample.
    pub fn reset(&mut self) {
        self.last = None;
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Last accepted acceleration triple.
    pub fn last_sample(&self) -> Option<[f32; 3]> {
        self.last
    }

    pub fn accepted_count(&self) -> u64 {
        self.accepted
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped
    }
}

impl Default for MotionClassifier {
    fn default() -> Self {
        Self::new(ClassifierConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample(ts: u64, x: f32, y: f32, z: f32) -> MotionSample {
        MotionSample::new(ts, x, y, z)
    }

    #[test]
    fn test_config_default() {
        let config = ClassifierConfig::default();
        assert_eq!(config.movement_threshold, 0.5);
        assert_eq!(config.shake_threshold, 25.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_rejects_inverted_thresholds() {
        let config = ClassifierConfig {
            movement_threshold: 5.0,
            shake_threshold: 2.0,
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ThresholdOrder { .. })
        ));
    }

    #[test]
    fn test_classify_magnitude_boundaries() {
        let config = ClassifierConfig::default();
        assert_eq!(config.classify_magnitude(0.0), MotionClass::Idle);
        assert_eq!(config.classify_magnitude(0.5), MotionClass::Idle);
        assert_eq!(config.classify_magnitude(0.51), MotionClass::Move);
        assert_eq!(config.classify_magnitude(25.0), MotionClass::Move);
        assert_eq!(config.classify_magnitude(25.01), MotionClass::Shake);
    }

    #[test]
    fn test_movement_magnitude_is_l1() {
        let m = movement_magnitude([1.0, 2.0, 3.0], [0.0, 4.0, 3.5]);
        assert!((m - 3.5).abs() < 1e-6);
    }

    #[test]
    fn test_first_sample_is_idle() {
        let mut classifier = MotionClassifier::default();
        let result = classifier.classify(&sample(0, 40.0, -40.0, 9.8)).unwrap();
        assert_eq!(result.class, MotionClass::Idle);
        assert_eq!(result.magnitude, 0.0);
        assert_eq!(classifier.last_sample(), Some([40.0, -40.0, 9.8]));
    }

    #[test]
    fn test_magnitude_sequence_idle_idle_shake() {
        let mut classifier = MotionClassifier::default();
        classifier.classify(&sample(0, 0.0, 0.0, 0.0)).unwrap();

        // Deltas of 0.1, 0.2 and 30.0.
        let a = classifier.classify(&sample(20, 0.1, 0.0, 0.0)).unwrap();
        let b = classifier.classify(&sample(40, 0.1, 0.2, 0.0)).unwrap();
        let c = classifier.classify(&sample(60, 15.1, 0.2, -15.0)).unwrap();

        assert_eq!(a.class, MotionClass::Idle);
        assert_eq!(b.class, MotionClass::Idle);
        assert_eq!(c.class, MotionClass::Shake);
        assert!((c.magnitude - 30.0).abs() < 1e-4);
    }

    #[test]
    fn test_move_classification() {
        let mut classifier = MotionClassifier::default();
        classifier.classify(&sample(0, 0.0, 0.0, 9.8)).unwrap();
        let result = classifier.classify(&sample(20, 1.0, 0.5, 9.8)).unwrap();
        assert_eq!(result.class, MotionClass::Move);
        assert_eq!(result.delta, [1.0, 0.5, 0.0]);
    }

    #[test]
    fn test_malformed_sample_keeps_state() {
        let mut classifier = MotionClassifier::default();
        classifier.classify(&sample(0, 1.0, 1.0, 1.0)).unwrap();

        let mut broken = sample(20, 90.0, 90.0, 90.0);
        broken.z = None;
        assert_eq!(
            classifier.classify(&broken),
            Err(SampleError::MissingAxis("z"))
        );
        assert_eq!(classifier.last_sample(), Some([1.0, 1.0, 1.0]));
        assert_eq!(classifier.dropped_count(), 1);

        // The next good sample is compared against the last good one.
        let result = classifier.classify(&sample(40, 1.0, 1.0, 1.2)).unwrap();
        assert_eq!(result.class, MotionClass::Idle);
    }

    #[test]
    fn test_reset_forgets_previous() {
        let mut classifier = MotionClassifier::default();
        classifier.classify(&sample(0, 0.0, 0.0, 0.0)).unwrap();
        classifier.reset();
        let result = classifier.classify(&sample(20, 50.0, 0.0, 0.0)).unwrap();
        assert_eq!(result.class, MotionClass::Idle);
    }

    proptest! {
        #[test]
        fn prop_identical_samples_are_idle(
            x in -100.0f32..100.0,
            y in -100.0f32..100.0,
            z in -100.0f32..100.0,
            repeats in 1usize..50,
        ) {
            let mut classifier = MotionClassifier::default();
            for i in 0..repeats {
                let result = classifier.classify(&sample(i as u64 * 20, x, y, z)).unwrap();
                prop_assert_eq!(result.class, MotionClass::Idle);
            }
        }
    }
}
