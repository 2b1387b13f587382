use std::time::Duration;

use ectask_core::{Direction, Token, TokenSet};
use ectask_timing::FramePeriod;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    pub refresh_hz: f64,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self { refresh_hz: 60.0 }
    }
}

impl FrameConfig {
    pub fn period(&self) -> Result<FramePeriod, ConfigError> {
        Ok(FramePeriod::from_refresh_hz(self.refresh_hz)?)
    }
}

/// Two-alternative keys: one for "left", one for "right".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseKeys {
    pub left: String,
    pub right: String,
}

impl Default for ResponseKeys {
    fn default() -> Self {
        Self {
            left: "f".to_string(),
            right: "j".to_string(),
        }
    }
}

impl ResponseKeys {
    pub fn for_side(&self, side: Direction) -> Token {
        match side {
            Direction::Left => Token::new(&self.left),
            Direction::Right => Token::new(&self.right),
        }
    }

    pub fn token_set(&self) -> TokenSet {
        [self.left.as_str(), self.right.as_str()].into_iter().collect()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let (left, right) = (Token::new(&self.left), Token::new(&self.right));
        if left.as_str().is_empty() || right.as_str().is_empty() {
            return Err(ConfigError::EmptyTokenSet);
        }
        if left == right {
            return Err(ConfigError::DuplicateResponseKeys(left.to_string()));
        }
        Ok(())
    }
}

/// Vertical line pair geometry, in pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineGeometry {
    pub base_len: u32,
    pub delta_len: u32,
    pub jitter_len: u32,
}

impl Default for LineGeometry {
    fn default() -> Self {
        Self {
            base_len: 120,
            delta_len: 10,
            jitter_len: 8,
        }
    }
}

/// Settings of the 2-down/1-up exposure staircase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExposureStaircaseConfig {
    pub start_ms: f64,
    /// Lower clamp, in whole frames.
    pub min_frames: u32,
    pub max_ms: f64,
    pub step_down_ms: f64,
    pub step_up_ms: f64,
}

impl ExposureStaircaseConfig {
    /// Checks the exposure range on the given frame grid and the step sizes.
    pub fn validate(&self, period: FramePeriod) -> Result<(), ConfigError> {
        if self.min_frames == 0 {
            return Err(ConfigError::ExposureMinZero);
        }
        let min_ms = period.frames_to_ms(self.min_frames);
        if !(min_ms <= self.max_ms) {
            return Err(ConfigError::ExposureRange {
                min_ms,
                max_ms: self.max_ms,
            });
        }
        for step in [self.step_down_ms, self.step_up_ms] {
            if !(step > 0.0) {
                return Err(ConfigError::NonPositiveStep(step));
            }
        }
        Ok(())
    }
}

impl Default for ExposureStaircaseConfig {
    fn default() -> Self {
        Self {
            start_ms: 220.0,
            min_frames: 1,
            max_ms: 600.0,
            step_down_ms: 10.0,
            step_up_ms: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineDiscriminationConfig {
    pub practice_trials: usize,
    pub test_trials: usize,
    pub fixation_ms: u64,
    pub pre_mask_ms: u64,
    pub mask_total_ms: u64,
    pub mask_segments: u32,
    pub practice_staircase: ExposureStaircaseConfig,
    pub test_staircase: ExposureStaircaseConfig,
    pub response_timeout_ms: u64,
    pub feedback_ms: u64,
    pub inter_trial_interval_ms: u64,
    pub keys: ResponseKeys,
    pub geometry: LineGeometry,
}

impl Default for LineDiscriminationConfig {
    fn default() -> Self {
        Self {
            practice_trials: 7,
            test_trials: 35,
            fixation_ms: 250,
            pre_mask_ms: 100,
            mask_total_ms: 650,
            mask_segments: 8,
            practice_staircase: ExposureStaircaseConfig::default(),
            test_staircase: ExposureStaircaseConfig::default(),
            response_timeout_ms: 6000,
            feedback_ms: 650,
            inter_trial_interval_ms: 220,
            keys: ResponseKeys::default(),
            geometry: LineGeometry::default(),
        }
    }
}

impl LineDiscriminationConfig {
    pub fn validate(&self, period: FramePeriod) -> Result<(), ConfigError> {
        self.keys.validate()?;
        if self.mask_segments == 0 {
            return Err(ConfigError::NoMaskSegments);
        }
        self.practice_staircase.validate(period)?;
        self.test_staircase.validate(period)
    }

    /// Mask segment durations: equal shares, the last one takes the remainder.
    pub fn mask_schedule(&self) -> Vec<Duration> {
        let segments = self.mask_segments.max(1) as u64;
        let share = self.mask_total_ms / segments;
        let last = self.mask_total_ms - share * (segments - 1);
        (0..segments)
            .map(|i| Duration::from_millis(if i + 1 == segments { last } else { share }))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DigitSpanConfig {
    /// Span of each practice trial, in order.
    pub practice_spans: Vec<usize>,
    pub digit_ms: u64,
    pub gap_ms: u64,
    pub start_span: usize,
    pub max_span: usize,
    pub trials_per_span: usize,
    pub entry_timeout_ms: u64,
    pub feedback_ms: u64,
    pub practice_inter_trial_interval_ms: u64,
    pub test_inter_trial_interval_ms: u64,
}

impl Default for DigitSpanConfig {
    fn default() -> Self {
        Self {
            practice_spans: vec![3, 4, 4],
            digit_ms: 900,
            gap_ms: 250,
            start_span: 3,
            max_span: 12,
            trials_per_span: 2,
            entry_timeout_ms: 60_000,
            feedback_ms: 650,
            practice_inter_trial_interval_ms: 350,
            test_inter_trial_interval_ms: 250,
        }
    }
}

impl DigitSpanConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_span_range(self.start_span, self.max_span, self.trials_per_span)
    }

    /// Upper bound on test trials: every level run to completion.
    pub fn max_test_trials(&self) -> usize {
        self.max_span
            .saturating_add(1)
            .saturating_sub(self.start_span)
            .saturating_mul(self.trials_per_span)
    }
}

pub(crate) fn check_span_range(
    start_span: usize,
    max_span: usize,
    trials_per_span: usize,
) -> Result<(), ConfigError> {
    if trials_per_span == 0 {
        return Err(ConfigError::TrialsPerSpanZero);
    }
    if start_span == 0 {
        return Err(ConfigError::StartSpanZero);
    }
    if start_span > max_span {
        return Err(ConfigError::EmptySpanRange {
            start: start_span,
            max: max_span,
        });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlankerConfig {
    pub practice_trials: usize,
    pub test_trials: usize,
    pub fixation_ms: u64,
    pub inter_trial_interval_ms: u64,
    pub response_timeout_ms: u64,
    pub feedback_ms: u64,
    pub flankers_each_side: usize,
    pub keys: ResponseKeys,
}

impl Default for FlankerConfig {
    fn default() -> Self {
        Self {
            practice_trials: 7,
            test_trials: 25,
            fixation_ms: 400,
            inter_trial_interval_ms: 600,
            response_timeout_ms: 2500,
            feedback_ms: 500,
            flankers_each_side: 2,
            keys: ResponseKeys::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub frames: FrameConfig,
    pub line_discrimination: LineDiscriminationConfig,
    pub digit_span: DigitSpanConfig,
    pub flanker: FlankerConfig,
    pub renderer_watchdog_ms: u64,
    pub calibration_frames: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            frames: FrameConfig::default(),
            line_discrimination: LineDiscriminationConfig::default(),
            digit_span: DigitSpanConfig::default(),
            flanker: FlankerConfig::default(),
            renderer_watchdog_ms: 2000,
            calibration_frames: 120,
        }
    }
}

impl SessionConfig {
    /// Checks everything that can be checked before the first block.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let period = self.frames.period()?;
        self.line_discrimination.validate(period)?;
        self.digit_span.validate()?;
        self.flanker.keys.validate()?;
        Ok(())
    }
}
