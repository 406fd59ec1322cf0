//! Orientation mapping from device tilt to pupil offset.
//!
//! A secondary input path that bypasses the behavior state machine: each
//! tilt sample maps linearly onto a pupil offset.
//!
//! ```text
//! x = clamp(-gamma / 90 * 20, ±20)
//! y = clamp(-(beta - 60) / 180 * 20, ±20)
//! ```
//!
//! The 60° baseline recenters the front-back axis on the angle a phone is
//! usually held at.
//!
//! The mapper is only active while orientation permission is Granted.
//! Denial is not an error: the engine falls back to the idle pattern player.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{ConfigError, SampleError};
use crate::types::{PermissionStatus, TiltSample, Vec2};

/// Linear tilt → offset mapping parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrientationConfig {
    /// Output range and clamp bound of the pupil offset. Typical: 20.
    pub pupil_range: f32,

    /// Left-right tilt (gamma) that maps to the full range. Typical: 90°.
    pub gamma_full_scale: f32,

    /// Front-back tilt (beta) that maps to the full range. Typical: 180°.
    pub beta_full_scale: f32,

    /// Front-back tilt treated as looking straight ahead. Typical: 60°.
    pub beta_baseline: f32,
}

impl Default for OrientationConfig {
    fn default() -> Self {
        Self {
            pupil_range: 20.0,
            gamma_full_scale: 90.0,
            beta_full_scale: 180.0,
            beta_baseline: 60.0,
        }
    }
}

impl OrientationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("orientation.pupil_range", self.pupil_range),
            ("orientation.gamma_full_scale", self.gamma_full_scale),
            ("orientation.beta_full_scale", self.beta_full_scale),
        ];
        for (field, value) in positive {
            if !(value > 0.0) {
                return Err(ConfigError::NotPositive {
                    field,
                    value: value as f64,
                });
            }
        }
        Ok(())
    }

    /// Pure mapping from angles to a clamped offset.
    pub fn map_angles(&self, beta: f32, gamma: f32) -> Vec2 {
        let range = self.pupil_range;
        let x = -gamma / self.gamma_full_scale * range;
        let y = -(beta - self.beta_baseline) / self.beta_full_scale * range;
        Vec2::new(x, y).clamped(range)
    }
}

/// Maps tilt samples to pupil offsets when permitted.
#[derive(Debug, Clone)]
pub struct OrientationMapper {
    config: OrientationConfig,
    permission: PermissionStatus,
    last_offset: Option<Vec2>,
    mapped: u64,
}

impl OrientationMapper {
    pub fn new(config: OrientationConfig) -> Self {
        Self {
            config,
            permission: PermissionStatus::Prompt,
            last_offset: None,
            mapped: 0,
        }
    }

    pub fn permission(&self) -> PermissionStatus {
        self.permission
    }

    /// Record the outcome of the external permission flow.
    pub fn set_permission(&mut self, status: PermissionStatus) {
        self.permission = status;
        if status != PermissionStatus::Granted {
            self.last_offset = None;
        }
    }

    pub fn is_active(&self) -> bool {
        self.permission == PermissionStatus::Granted
    }

    /// Most recent mapped offset while active.
    pub fn last_offset(&self) -> Option<Vec2> {
        self.last_offset
    }

    pub fn mapped_count(&self) -> u64 {
        self.mapped
    }

    /// Map a tilt sample.
    ///
    /// `Ok(None)` when permission is not Granted; `Err` when the sample is
    /// missing an angle or carries a non-finite one.
    pub fn map(&mut self, sample: &TiltSample) -> Result<Option<Vec2>, SampleError> {
        if !self.is_active() {
            return Ok(None);
        }
        let (beta, gamma) = sample.angles()?;
        let offset = self.config.map_angles(beta, gamma);
        self.last_offset = Some(offset);
        self.mapped += 1;
        trace!(beta, gamma, x = offset.x, y = offset.y, "tilt mapped");
        Ok(Some(offset))
    }
}

impl Default for OrientationMapper {
    fn default() -> Self {
        Self::new(OrientationConfig::default())
    }
}
