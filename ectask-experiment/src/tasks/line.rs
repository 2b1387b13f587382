use std::time::Duration;

use ectask_core::{Block, ConditionParams, Direction, StimulusDescriptor, TaskKind, TrialRecord};
use ectask_timing::{Exposure, FramePeriod, Timer};
use rand::Rng;

use super::{CognitiveTask, TaskOutput};
use crate::block::{BlockSpec, Staircased, TrialContext, TrialLog, TrialProcedure, run_block};
use crate::config::LineDiscriminationConfig;
use crate::display::{Presentation, Renderer};
use crate::error::EngineError;
use crate::scoring;
use crate::staircase::TwoDownOneUp;

/// Masked line-length discrimination (inspection time). Exposure follows a
/// 2-down/1-up staircase in both blocks, restarted at each block.
#[derive(Debug, Clone)]
pub struct LineDiscrimination {
    config: LineDiscriminationConfig,
    period: FramePeriod,
}

impl LineDiscrimination {
    pub fn new(config: LineDiscriminationConfig, period: FramePeriod) -> Self {
        Self { config, period }
    }

    fn draw_lines<R: Rng>(&self, rng: &mut R) -> (Direction, StimulusDescriptor) {
        let longer_side = if rng.random_bool(0.5) {
            Direction::Left
        } else {
            Direction::Right
        };
        let geometry = &self.config.geometry;
        let jitter = i64::from(geometry.jitter_len);
        let base = (i64::from(geometry.base_len) + rng.random_range(-jitter..=jitter)).max(1) as u32;
        let longer = base + geometry.delta_len;
        let (left_len, right_len) = match longer_side {
            Direction::Left => (longer, base),
            Direction::Right => (base, longer),
        };
        (
            longer_side,
            StimulusDescriptor::Lines {
                left_len,
                right_len,
            },
        )
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

impl TrialProcedure for LineDiscrimination {
    type Condition = Exposure;

    fn task(&self) -> TaskKind {
        TaskKind::LineDiscrimination
    }

    async fn run_trial<T: Timer, D: Renderer, R: Rng>(
        &mut self,
        ctx: &mut TrialContext<T, D, R>,
        block: Block,
        trial_index: usize,
        exposure: Exposure,
    ) -> Result<TrialRecord, EngineError> {
        let (longer_side, stimulus) = self.draw_lines(&mut ctx.rng);
        let expected = self.config.keys.for_side(longer_side);

        ctx.show_for(
            &StimulusDescriptor::Fixation,
            Duration::from_millis(self.config.fixation_ms),
        )
        .await?;
        let seed = ctx.rng.random();
        ctx.show_for(
            &StimulusDescriptor::LineMask { seed },
            Duration::from_millis(self.config.pre_mask_ms),
        )
        .await?;
        ctx.show(&stimulus, Presentation::Frames(exposure.frames))
            .await?;
        for segment in self.config.mask_schedule() {
            let seed = ctx.rng.random();
            ctx.show_for(&StimulusDescriptor::LineMask { seed }, segment)
                .await?;
        }

        let pending = ctx.input.arm(
            self.config.keys.token_set(),
            Duration::from_millis(self.config.response_timeout_ms),
        );
        ctx.hold(&StimulusDescriptor::ResponsePrompt { block, trial_index })?;
        let captured = pending.resolve().await;

        Ok(TrialRecord::new(
            TaskKind::LineDiscrimination,
            block,
            trial_index,
            ConditionParams::LineDiscrimination {
                exposure_ms: exposure.ms,
                exposure_frames: exposure.frames,
                longer_side,
            },
            stimulus,
            expected,
            captured.into_response(),
            None,
        ))
    }
}

impl CognitiveTask for LineDiscrimination {
    fn kind(&self) -> TaskKind {
        TaskKind::LineDiscrimination
    }

    async fn run<T: Timer, D: Renderer, R: Rng>(
        &mut self,
        ctx: &mut TrialContext<T, D, R>,
    ) -> Result<TaskOutput, EngineError> {
        self.config.validate(self.period)?;
        let practice = TwoDownOneUp::new(&self.config.practice_staircase, self.period)?;
        let test = TwoDownOneUp::new(&self.config.test_staircase, self.period)?;

        let mut log = TrialLog::new();
        let mut blocks = Vec::with_capacity(2);
        for (block, controller) in [(Block::Practice, practice), (Block::Test, test)] {
            let spec = self.block_spec(block);
            let mut source = Staircased::new(controller);
            blocks.push(run_block(&mut *self, &mut source, ctx, &spec, &mut log).await?);
        }

        let summary = scoring::line_discrimination(log.block(Block::Test));
        Ok(TaskOutput {
            task: TaskKind::LineDiscrimination.identifier(),
            blocks,
            trials: log.into_records(),
            summary,
        })
    }
}
