use ectask_timing::TimingError;
use thiserror::Error;

/// Configuration defects. Raised when a block starts, before any stimulus.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("trials per span must be at least 1")]
    TrialsPerSpanZero,

    #[error("start span must be at least 1")]
    StartSpanZero,

    #[error("span range is empty: start {start} > max {max}")]
    EmptySpanRange { start: usize, max: usize },

    #[error("exposure range is empty: min {min_ms} ms > max {max_ms} ms")]
    ExposureRange { min_ms: f64, max_ms: f64 },

    #[error("exposure minimum must be at least one frame")]
    ExposureMinZero,

    #[error("staircase step must be positive (got {0} ms)")]
    NonPositiveStep(f64),

    #[error("response key set is empty")]
    EmptyTokenSet,

    #[error("left and right response keys must differ (both {0:?})")]
    DuplicateResponseKeys(String),

    #[error("mask needs at least one segment")]
    NoMaskSegments,

    #[error(transparent)]
    Timing(#[from] TimingError),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("renderer did not finish {stimulus} within {waited_ms} ms")]
    RendererStalled {
        stimulus: &'static str,
        waited_ms: u128,
    },

    #[error("renderer failed")]
    Render(#[source] anyhow::Error),
}

impl From<TimingError> for EngineError {
    fn from(err: TimingError) -> Self {
        EngineError::Config(ConfigError::Timing(err))
    }
}
