pub mod block;
pub mod config;
pub mod display;
pub mod error;
pub mod plan;
pub mod scoring;
pub mod session;
pub mod staircase;
pub mod tasks;

pub use block::{
    BlockOutcome, BlockSpec, ConditionSource, Planned, Staircased, TrialContext, TrialLog,
    TrialProcedure, run_block,
};
pub use config::{
    DigitSpanConfig, ExposureStaircaseConfig, FlankerConfig, FrameConfig, LineDiscriminationConfig,
    LineGeometry, ResponseKeys, SessionConfig,
};
pub use display::{PacedRenderer, Presentation, Renderer, Surface};
pub use error::{ConfigError, EngineError};
pub use plan::{FLANKER_CELLS, FlankerCell, counterbalanced, flanker_plan};
pub use scoring::{DigitSpanSummary, FlankerSummary, LineDiscriminationSummary, TaskSummary};
pub use session::{Session, SessionOutput, StudyId};
pub use staircase::{AdaptiveController, AscendingSpan, Decision, StopReason, TwoDownOneUp};
pub use tasks::{CognitiveTask, DigitSpan, Flanker, LineDiscrimination, TaskOutput};
