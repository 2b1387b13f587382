use std::time::Duration;

use ectask_core::{Block, ConditionParams, StimulusDescriptor, TaskKind, Token, TrialRecord};
use ectask_timing::Timer;
use rand::Rng;

use super::{CognitiveTask, TaskOutput};
use crate::block::{
    BlockSpec, Planned, Staircased, TrialContext, TrialLog, TrialProcedure, run_block,
};
use crate::config::DigitSpanConfig;
use crate::display::Renderer;
use crate::error::EngineError;
use crate::scoring;
use crate::staircase::AscendingSpan;

/// Forward digit span. Practice runs a fixed list of spans with feedback; the
/// test climbs one span at a time until a level is failed outright.
#[derive(Debug, Clone)]
pub struct DigitSpan {
    config: DigitSpanConfig,
}

impl DigitSpan {
    pub fn new(config: DigitSpanConfig) -> Self {
        Self { config }
    }

    fn block_spec(&self, block: Block, trial_count: usize) -> BlockSpec {
        let (feedback, iti_ms) = match block {
            Block::Practice => (true, self.config.practice_inter_trial_interval_ms),
            Block::Test => (false, self.config.test_inter_trial_interval_ms),
        };
        BlockSpec {
            block,
            trial_count,
            feedback,
            feedback_duration: Duration::from_millis(self.config.feedback_ms),
            inter_trial_interval: Duration::from_millis(iti_ms),
        }
    }
}

fn sequence_token(digits: &[u8]) -> Token {
    Token::new(digits.iter().map(|d| char::from(b'0' + d)).collect::<String>())
}

impl TrialProcedure for DigitSpan {
    type Condition = usize;

    fn task(&self) -> TaskKind {
        TaskKind::DigitSpan
    }

    async fn run_trial<T: Timer, D: Renderer, R: Rng>(
        &mut self,
        ctx: &mut TrialContext<T, D, R>,
        block: Block,
        trial_index: usize,
        span: usize,
    ) -> Result<TrialRecord, EngineError> {
        let digits: Vec<u8> = (0..span).map(|_| ctx.rng.random_range(0..=9)).collect();
        let digit_time = Duration::from_millis(self.config.digit_ms);
        let gap = Duration::from_millis(self.config.gap_ms);
        for &digit in &digits {
            ctx.show_for(&StimulusDescriptor::Digit { digit }, digit_time)
                .await?;
            ctx.show_for(&StimulusDescriptor::Blank, gap).await?;
        }

        let pending = ctx
            .input
            .arm_entry(span, Duration::from_millis(self.config.entry_timeout_ms));
        ctx.hold(&StimulusDescriptor::EntryPrompt { max_len: span })?;
        let captured = pending.resolve().await;

        let expected = sequence_token(&digits);
        Ok(TrialRecord::new(
            TaskKind::DigitSpan,
            block,
            trial_index,
            ConditionParams::DigitSpan { span },
            StimulusDescriptor::DigitSequence { digits },
            expected,
            captured.into_response(),
            None,
        ))
    }
}

impl CognitiveTask for DigitSpan {
    fn kind(&self) -> TaskKind {
        TaskKind::DigitSpan
    }

    async fn run<T: Timer, D: Renderer, R: Rng>(
        &mut self,
        ctx: &mut TrialContext<T, D, R>,
    ) -> Result<TaskOutput, EngineError> {
        let staircase = AscendingSpan::new(
            self.config.start_span,
            self.config.max_span,
            self.config.trials_per_span,
        )?;

        let mut log = TrialLog::new();
        let practice_spans = self.config.practice_spans.clone();
        let practice_spec = self.block_spec(Block::Practice, practice_spans.len());
        let practice = run_block(
            &mut *self,
            &mut Planned::new(practice_spans),
            ctx,
            &practice_spec,
            &mut log,
        )
        .await?;

        let test_spec = self.block_spec(Block::Test, self.config.max_test_trials());
        let mut source = Staircased::new(staircase);
        let test = run_block(&mut *self, &mut source, ctx, &test_spec, &mut log).await?;

        let staircase = source.into_controller();
        let summary = scoring::digit_span(
            log.block(Block::Test),
            staircase.max_span_achieved(),
            test.stop.clone(),
        );
        Ok(TaskOutput {
            task: TaskKind::DigitSpan.identifier(),
            blocks: vec![practice, test],
            trials: log.into_records(),
            summary,
        })
    }
}
