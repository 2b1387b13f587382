//! Adaptive difficulty controllers.
//!
//! Both variants consume one boolean per trial and expose the difficulty
//! level for the next trial. Only the ascending-span variant can stop a block.

use std::fmt;

use ectask_timing::{Exposure, FramePeriod, quantize_to_frames};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{ExposureStaircaseConfig, check_span_range};
use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum StopReason {
    NoCorrectAtSpan { span: usize, trials_per_span: usize },
    ReachedMaxSpan { limit: usize },
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::NoCorrectAtSpan {
                span,
                trials_per_span,
            } => write!(f, "0/{trials_per_span} at span {span}"),
            StopReason::ReachedMaxSpan { limit } => {
                write!(f, "Reached max span limit ({limit})")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Continue,
    Stop(StopReason),
}

pub trait AdaptiveController {
    type Level: Copy;

    /// Difficulty for the next trial.
    fn level(&self) -> Self::Level;

    /// Feeds one trial outcome; may end the block.
    fn record(&mut self, correct: bool) -> Decision;
}

/// Span staircase for digit span: each level gets `trials_per_span` trials,
/// any success moves up one, total failure ends the test.
#[derive(Debug, Clone)]
pub struct AscendingSpan {
    start_span: usize,
    max_span_limit: usize,
    trials_per_span: usize,
    current_span: usize,
    max_span_achieved: usize,
    correct_at_current: usize,
    trials_at_current: usize,
}

impl AscendingSpan {
    pub fn new(
        start_span: usize,
        max_span_limit: usize,
        trials_per_span: usize,
    ) -> Result<Self, ConfigError> {
        check_span_range(start_span, max_span_limit, trials_per_span)?;
        Ok(Self {
            start_span,
            max_span_limit,
            trials_per_span,
            current_span: start_span,
            max_span_achieved: start_span - 1,
            correct_at_current: 0,
            trials_at_current: 0,
        })
    }

    pub fn current_span(&self) -> usize {
        self.current_span
    }

    /// Last level with at least one correct trial, or `start_span - 1`.
    pub fn max_span_achieved(&self) -> usize {
        self.max_span_achieved
    }

    pub fn correct_at_current(&self) -> usize {
        self.correct_at_current
    }

    pub fn start_span(&self) -> usize {
        self.start_span
    }
}

impl AdaptiveController for AscendingSpan {
    type Level = usize;

    fn level(&self) -> usize {
        self.current_span
    }

    fn record(&mut self, correct: bool) -> Decision {
        self.trials_at_current += 1;
        if correct {
            self.correct_at_current += 1;
        }
        if self.trials_at_current < self.trials_per_span {
            return Decision::Continue;
        }

        let span = self.current_span;
        if self.correct_at_current == 0 {
            debug!(span, "no correct trials at span; stopping");
            return Decision::Stop(StopReason::NoCorrectAtSpan {
                span,
                trials_per_span: self.trials_per_span,
            });
        }

        self.max_span_achieved = self.max_span_achieved.max(span);
        self.current_span = span.saturating_add(1);
        self.correct_at_current = 0;
        self.trials_at_current = 0;
        debug!(achieved = span, next = self.current_span, "span passed");

        if span >= self.max_span_limit {
            Decision::Stop(StopReason::ReachedMaxSpan {
                limit: self.max_span_limit,
            })
        } else {
            Decision::Continue
        }
    }
}

/// 2-down/1-up exposure staircase for the masked line task. The exposure is
/// always kept on the frame grid.
#[derive(Debug, Clone)]
pub struct TwoDownOneUp {
    period: FramePeriod,
    min_ms: f64,
    max_ms: f64,
    step_down_ms: f64,
    step_up_ms: f64,
    exposure: Exposure,
    consecutive_correct: u32,
}

impl TwoDownOneUp {
    pub fn new(config: &ExposureStaircaseConfig, period: FramePeriod) -> Result<Self, ConfigError> {
        config.validate(period)?;
        let min_ms = period.frames_to_ms(config.min_frames);
        Ok(Self {
            period,
            min_ms,
            max_ms: config.max_ms,
            step_down_ms: config.step_down_ms,
            step_up_ms: config.step_up_ms,
            exposure: quantize_to_frames(config.start_ms.clamp(min_ms, config.max_ms), period),
            consecutive_correct: 0,
        })
    }

    pub fn exposure(&self) -> Exposure {
        self.exposure
    }

    pub fn consecutive_correct(&self) -> u32 {
        self.consecutive_correct
    }

    fn settle(&mut self, ms: f64) {
        self.exposure = quantize_to_frames(ms.clamp(self.min_ms, self.max_ms), self.period);
    }
}

impl AdaptiveController for TwoDownOneUp {
    type Level = Exposure;

    fn level(&self) -> Exposure {
        self.exposure
    }

    fn record(&mut self, correct: bool) -> Decision {
        let mut ms = self.exposure.ms;
        if correct {
            self.consecutive_correct += 1;
            if self.consecutive_correct >= 2 {
                ms -= self.step_down_ms;
                self.consecutive_correct = 0;
            }
        } else {
            self.consecutive_correct = 0;
            ms += self.step_up_ms;
        }
        let before = self.exposure;
        self.settle(ms);
        if before != self.exposure {
            debug!(
                from_ms = before.ms,
                to_ms = self.exposure.ms,
                frames = self.exposure.frames,
                "exposure adjusted"
            );
        }
        Decision::Continue
    }
}
