use std::time::Duration;

use ectask_core::{Block, ConditionParams, StimulusDescriptor, TaskKind, TrialRecord};
use ectask_timing::Timer;
use rand::Rng;

use super::{CognitiveTask, TaskOutput};
use crate::block::{BlockSpec, Planned, TrialContext, TrialLog, TrialProcedure, run_block};
use crate::config::FlankerConfig;
use crate::display::Renderer;
use crate::error::EngineError;
use crate::plan::{FlankerCell, flanker_plan};
use crate::scoring;

/// Arrow flanker task. Conditions come from a counterbalanced plan drawn
/// once per block; reaction time runs from arrow onset to the key event.
#[derive(Debug, Clone)]
pub struct Flanker {
    config: FlankerConfig,
}

impl Flanker {
    pub fn new(config: FlankerConfig) -> Self {
        Self { config }
    }

    fn block_spec(&self, block: Block) -> BlockSpec {
        let (trial_count, feedback) = match block {
            Block::Practice => (self.config.practice_trials, true),
            Block::Test => (self.config.test_trials, false),
        };
        BlockSpec {
            block,
            trial_count,
            feedback,
            feedback_duration: Duration::from_millis(self.config.feedback_ms),
            inter_trial_interval: Duration::from_millis(self.config.inter_trial_interval_ms),
        }
    }
}

impl TrialProcedure for Flanker {
    type Condition = FlankerCell;

    fn task(&self) -> TaskKind {
        TaskKind::Flanker
    }

    async fn run_trial<T: Timer, D: Renderer, R: Rng>(
        &mut self,
        ctx: &mut TrialContext<T, D, R>,
        block: Block,
        trial_index: usize,
        cell: FlankerCell,
    ) -> Result<TrialRecord, EngineError> {
        let stimulus =
            StimulusDescriptor::arrows(cell.target, cell.congruency, self.config.flankers_each_side);
        let expected = self.config.keys.for_side(cell.target);

        ctx.show_for(
            &StimulusDescriptor::Fixation,
            Duration::from_millis(self.config.fixation_ms),
        )
        .await?;

        let pending = ctx.input.arm(
            self.config.keys.token_set(),
            Duration::from_millis(self.config.response_timeout_ms),
        );
        ctx.hold(&stimulus)?;
        let onset = ctx.now();
        let captured = pending.resolve().await;
        let reaction_time_ms = captured.latency_ms(onset);

        Ok(TrialRecord::new(
            TaskKind::Flanker,
            block,
            trial_index,
            ConditionParams::Flanker {
                congruency: cell.congruency,
                target: cell.target,
            },
            stimulus,
            expected,
            captured.into_response(),
            reaction_time_ms,
        ))
    }
}

impl CognitiveTask for Flanker {
    fn kind(&self) -> TaskKind {
        TaskKind::Flanker
    }

    async fn run<T: Timer, D: Renderer, R: Rng>(
        &mut self,
        ctx: &mut TrialContext<T, D, R>,
    ) -> Result<TaskOutput, EngineError> {
        self.config.keys.validate()?;

        let mut log = TrialLog::new();
        let mut blocks = Vec::with_capacity(2);
        for block in [Block::Practice, Block::Test] {
            let spec = self.block_spec(block);
            let mut source = Planned::new(flanker_plan(spec.trial_count, &mut ctx.rng));
            blocks.push(run_block(&mut *self, &mut source, ctx, &spec, &mut log).await?);
        }

        let summary = scoring::flanker(log.block(Block::Test));
        Ok(TaskOutput {
            task: TaskKind::Flanker.identifier(),
            blocks,
            trials: log.into_records(),
            summary,
        })
    }
}
