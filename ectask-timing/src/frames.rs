use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TimingError {
    #[error("frame period must be a positive, finite number of milliseconds (got {0})")]
    NonPositiveFramePeriod(f64),
}

/// Display refresh period in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FramePeriod(f64);

impl FramePeriod {
    pub fn new(ms: f64) -> Result<Self, TimingError> {
        if ms.is_finite() && ms > 0.0 {
            Ok(Self(ms))
        } else {
            Err(TimingError::NonPositiveFramePeriod(ms))
        }
    }

    pub fn from_refresh_hz(hz: f64) -> Result<Self, TimingError> {
        Self::new(1000.0 / hz)
    }

    pub fn ms(&self) -> f64 {
        self.0
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.0 / 1000.0)
    }

    pub fn frames_to_ms(&self, frames: u32) -> f64 {
        frames as f64 * self.0
    }
}

/// An exposure that can actually be scheduled: a whole number of frames,
/// with its millisecond equivalent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Exposure {
    pub frames: u32,
    pub ms: f64,
}

// Absorbs float error when a value that is already on the grid is re-divided.
const GRID_EPSILON: f64 = 1e-9;

/// Rounds `ms` down to the frame grid, never below one frame.
pub fn quantize_to_frames(ms: f64, period: FramePeriod) -> Exposure {
    let raw = (ms / period.ms() + GRID_EPSILON).floor();
    let frames = if raw.is_finite() && raw >= 1.0 {
        raw.min(u32::MAX as f64) as u32
    } else {
        1
    };
    Exposure {
        frames,
        ms: period.frames_to_ms(frames),
    }
}
