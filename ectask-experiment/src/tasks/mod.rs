//! The three cognitive tasks. Each one is a [`TrialProcedure`] for its block
//! runs and a [`CognitiveTask`] that strings practice and test together.
//!
//! [`TrialProcedure`]: crate::block::TrialProcedure

mod digit;
mod flanker;
mod line;

use std::future::Future;

use ectask_core::{TaskKind, TrialRecord};
use ectask_timing::Timer;
use rand::Rng;
use serde::Serialize;

use crate::block::{BlockOutcome, TrialContext};
use crate::display::Renderer;
use crate::error::EngineError;
use crate::scoring::TaskSummary;

pub use digit::DigitSpan;
pub use flanker::Flanker;
pub use line::LineDiscrimination;

/// What one task hands to the session: every trial it ran and the summary of
/// its test block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskOutput {
    pub task: &'static str,
    pub blocks: Vec<BlockOutcome>,
    pub trials: Vec<TrialRecord>,
    pub summary: TaskSummary,
}

pub trait CognitiveTask {
    fn kind(&self) -> TaskKind;

    /// Checks the configuration, runs the practice block then the test
    /// block, and scores the test block.
    fn run<T: Timer, D: Renderer, R: Rng>(
        &mut self,
        ctx: &mut TrialContext<T, D, R>,
    ) -> impl Future<Output = Result<TaskOutput, EngineError>>;
}
