//! Block runner: drives one practice or test block trial by trial.

use std::future::Future;
use std::time::Duration;

use ectask_core::{Block, StimulusDescriptor, TaskKind, TrialRecord};
use ectask_timing::{InputBus, Timer};
use rand::Rng;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::display::{Presentation, Renderer};
use crate::error::EngineError;
use crate::staircase::{AdaptiveController, Decision, StopReason};

/// Everything a trial needs to talk to the outside world.
pub struct TrialContext<T, D, R> {
    pub timer: T,
    pub renderer: D,
    pub input: InputBus,
    pub rng: R,
    watchdog: Duration,
}

impl<T: Timer, D: Renderer, R: Rng> TrialContext<T, D, R> {
    /// `watchdog` is the slack granted to the renderer on top of the
    /// nominal duration of each presentation.
    pub fn new(timer: T, renderer: D, input: InputBus, rng: R, watchdog: Duration) -> Self {
        Self {
            timer,
            renderer,
            input,
            rng,
            watchdog,
        }
    }

    pub fn now(&self) -> Instant {
        self.timer.now()
    }

    /// Shows `stimulus` for `presentation`. A renderer that has not signalled
    /// completion after the nominal duration plus the watchdog slack is fatal.
    pub async fn show(
        &mut self,
        stimulus: &StimulusDescriptor,
        presentation: Presentation,
    ) -> Result<(), EngineError> {
        let limit = presentation.nominal(self.timer.frame_period()) + self.watchdog;
        match tokio::time::timeout(limit, self.renderer.show(stimulus, presentation)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(EngineError::Render(err)),
            Err(_) => Err(EngineError::RendererStalled {
                stimulus: stimulus.label(),
                waited_ms: limit.as_millis(),
            }),
        }
    }

    pub async fn show_for(
        &mut self,
        stimulus: &StimulusDescriptor,
        duration: Duration,
    ) -> Result<(), EngineError> {
        self.show(stimulus, Presentation::from_duration(duration))
            .await
    }

    pub fn hold(&mut self, stimulus: &StimulusDescriptor) -> Result<(), EngineError> {
        self.renderer.hold(stimulus).map_err(EngineError::Render)
    }

    pub async fn delay(&self, duration: Duration) {
        self.timer.delay(duration).await
    }
}

/// Supplies the condition of each trial and hears back its outcome.
pub trait ConditionSource {
    type Condition;

    /// `None` once the source has nothing more to give.
    fn next_condition(&mut self) -> Option<Self::Condition>;

    fn observe(&mut self, correct: bool) -> Decision;
}

/// Pre-committed plan, consumed in order.
#[derive(Debug, Clone)]
pub struct Planned<C> {
    plan: std::vec::IntoIter<C>,
}

impl<C> Planned<C> {
    pub fn new(plan: Vec<C>) -> Self {
        Self {
            plan: plan.into_iter(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.plan.len()
    }
}

impl<C> ConditionSource for Planned<C> {
    type Condition = C;

    fn next_condition(&mut self) -> Option<C> {
        self.plan.next()
    }

    fn observe(&mut self, _correct: bool) -> Decision {
        Decision::Continue
    }
}

/// Conditions produced trial by trial by an adaptive controller.
#[derive(Debug, Clone)]
pub struct Staircased<A> {
    controller: A,
    stopped: Option<StopReason>,
}

impl<A: AdaptiveController> Staircased<A> {
    pub fn new(controller: A) -> Self {
        Self {
            controller,
            stopped: None,
        }
    }

    pub fn controller(&self) -> &A {
        &self.controller
    }

    pub fn into_controller(self) -> A {
        self.controller
    }
}

impl<A: AdaptiveController> ConditionSource for Staircased<A> {
    type Condition = A::Level;

    fn next_condition(&mut self) -> Option<A::Level> {
        match self.stopped {
            Some(_) => None,
            None => Some(self.controller.level()),
        }
    }

    fn observe(&mut self, correct: bool) -> Decision {
        let decision = self.controller.record(correct);
        if let Decision::Stop(reason) = &decision {
            self.stopped = Some(reason.clone());
        }
        decision
    }
}

/// Runs one trial of a task: the fixed stimulus sequence and the response.
pub trait TrialProcedure {
    type Condition;

    fn task(&self) -> TaskKind;

    fn run_trial<T: Timer, D: Renderer, R: Rng>(
        &mut self,
        ctx: &mut TrialContext<T, D, R>,
        block: Block,
        trial_index: usize,
        condition: Self::Condition,
    ) -> impl Future<Output = Result<TrialRecord, EngineError>>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlockSpec {
    pub block: Block,
    pub trial_count: usize,
    pub feedback: bool,
    pub feedback_duration: Duration,
    pub inter_trial_interval: Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockOutcome {
    pub block: Block,
    pub trials_run: usize,
    pub stop: Option<StopReason>,
}

/// Task-scoped, append-only list of trial records.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TrialLog(Vec<TrialRecord>);

impl TrialLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn append(&mut self, record: TrialRecord) {
        debug_assert!(
            self.0
                .iter()
                .rev()
                .find(|r| r.block == record.block)
                .is_none_or(|last| last.trial_index < record.trial_index),
            "trial indices must increase within a block"
        );
        self.0.push(record);
    }

    pub fn records(&self) -> &[TrialRecord] {
        &self.0
    }

    pub fn block(&self, block: Block) -> impl Iterator<Item = &TrialRecord> {
        self.0.iter().filter(move |r| r.block == block)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_records(self) -> Vec<TrialRecord> {
        self.0
    }
}

/// Runs up to `spec.trial_count` trials, appending one record per trial.
///
/// The block ends early when the source runs dry or the adaptive controller
/// signals a stop; in the latter case neither feedback nor the inter-trial
/// interval follow the last trial.
pub async fn run_block<P, S, T, D, R>(
    procedure: &mut P,
    source: &mut S,
    ctx: &mut TrialContext<T, D, R>,
    spec: &BlockSpec,
    log: &mut TrialLog,
) -> Result<BlockOutcome, EngineError>
where
    P: TrialProcedure,
    S: ConditionSource<Condition = P::Condition>,
    T: Timer,
    D: Renderer,
    R: Rng,
{
    let task = procedure.task();
    info!(%task, block = %spec.block, trials = spec.trial_count, "block started");

    let mut trials_run = 0;
    let mut stop = None;
    for trial_index in 1..=spec.trial_count {
        let Some(condition) = source.next_condition() else {
            break;
        };
        let record = procedure
            .run_trial(ctx, spec.block, trial_index, condition)
            .await?;
        let correct = record.correct;
        debug!(
            %task,
            block = %spec.block,
            trial = trial_index,
            correct,
            timeout = record.timed_out(),
            rt_ms = record.reaction_time_ms,
            "trial finished"
        );
        log.append(record);
        trials_run += 1;

        if let Decision::Stop(reason) = source.observe(correct) {
            info!(%task, block = %spec.block, %reason, "block stopped early");
            stop = Some(reason);
            break;
        }

        if spec.feedback {
            ctx.show_for(&StimulusDescriptor::Feedback { correct }, spec.feedback_duration)
                .await?;
        }
        ctx.hold(&StimulusDescriptor::Blank)?;
        ctx.delay(spec.inter_trial_interval).await;
    }

    info!(%task, block = %spec.block, trials_run, "block finished");
    Ok(BlockOutcome {
        block: spec.block,
        trials_run,
        stop,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::PacedRenderer;
    use crate::display::Surface;
    use crate::staircase::AscendingSpan;
    use ectask_core::{ConditionParams, Response, Token};
    use ectask_timing::{FramePeriod, FrameTimer};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[derive(Default)]
    struct Shown(Vec<&'static str>);

    impl Surface for Shown {
        fn draw(&mut self, stimulus: &StimulusDescriptor) -> anyhow::Result<()> {
            self.0.push(stimulus.label());
            Ok(())
        }
    }

    type Ctx = TrialContext<FrameTimer, PacedRenderer<Shown, FrameTimer>, StdRng>;

    fn context() -> Ctx {
        let timer = FrameTimer::new(FramePeriod::new(10.0).unwrap());
        let renderer = PacedRenderer::new(Shown::default(), timer.clone());
        TrialContext::new(
            timer,
            renderer,
            InputBus::default(),
            StdRng::seed_from_u64(3),
            Duration::from_millis(100),
        )
    }

    /// Answers from a fixed script; a span condition is echoed into the record.
    struct Scripted {
        outcomes: Vec<bool>,
    }

    impl TrialProcedure for Scripted {
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
            ctx.show_for(&StimulusDescriptor::Fixation, Duration::from_millis(50))
                .await?;
            let correct = self.outcomes[trial_index - 1];
            let response = Response::Token(Token::new(if correct { "1" } else { "2" }));
            Ok(TrialRecord::new(
                TaskKind::DigitSpan,
                block,
                trial_index,
                ConditionParams::DigitSpan { span },
                StimulusDescriptor::Blank,
                Token::new("1"),
                response,
                None,
            ))
        }
    }

    fn spec(trial_count: usize, feedback: bool) -> BlockSpec {
        BlockSpec {
            block: Block::Test,
            trial_count,
            feedback,
            feedback_duration: Duration::from_millis(30),
            inter_trial_interval: Duration::from_millis(20),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn empty_block_runs_nothing() {
        let mut ctx = context();
        let mut log = TrialLog::new();
        let mut procedure = Scripted { outcomes: vec![] };
        let outcome = run_block(
            &mut procedure,
            &mut Planned::new(vec![3, 3]),
            &mut ctx,
            &spec(0, true),
            &mut log,
        )
        .await
        .unwrap();
        assert_eq!(outcome.trials_run, 0);
        assert!(log.is_empty());
        assert!(ctx.renderer.surface().0.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn planned_block_runs_every_trial_with_feedback_and_iti() {
        let mut ctx = context();
        let mut log = TrialLog::new();
        let mut procedure = Scripted {
            outcomes: vec![true, false],
        };
        let start = Instant::now();
        let outcome = run_block(
            &mut procedure,
            &mut Planned::new(vec![3, 4]),
            &mut ctx,
            &spec(2, true),
            &mut log,
        )
        .await
        .unwrap();

        assert_eq!(outcome.trials_run, 2);
        assert_eq!(outcome.stop, None);
        let indices: Vec<usize> = log.records().iter().map(|r| r.trial_index).collect();
        assert_eq!(indices, vec![1, 2]);
        assert_eq!(
            ctx.renderer.surface().0,
            vec!["fixation", "feedback", "blank", "fixation", "feedback", "blank"]
        );
        // (50 + 30 + 20) per trial.
        assert_eq!(Instant::now() - start, Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn adaptive_stop_ends_the_block_at_once() {
        let mut ctx = context();
        let mut log = TrialLog::new();
        let mut procedure = Scripted {
            outcomes: vec![true, true, false, false, true, true],
        };
        let mut source = Staircased::new(AscendingSpan::new(3, 12, 2).unwrap());
        let outcome = run_block(&mut procedure, &mut source, &mut ctx, &spec(20, false), &mut log)
            .await
            .unwrap();

        assert_eq!(outcome.trials_run, 4);
        assert_eq!(
            outcome.stop,
            Some(StopReason::NoCorrectAtSpan {
                span: 4,
                trials_per_span: 2
            })
        );
        assert_eq!(source.next_condition(), None);
        assert_eq!(source.into_controller().max_span_achieved(), 3);
        let spans: Vec<ConditionParams> = log.records().iter().map(|r| r.condition.clone()).collect();
        assert_eq!(spans[0], ConditionParams::DigitSpan { span: 3 });
        assert_eq!(spans[3], ConditionParams::DigitSpan { span: 4 });
        // No blank after the stopping trial.
        assert_eq!(ctx.renderer.surface().0.last(), Some(&"fixation"));
    }

    struct Stuck;

    impl Renderer for Stuck {
        async fn show(
            &mut self,
            _stimulus: &StimulusDescriptor,
            _presentation: Presentation,
        ) -> anyhow::Result<()> {
            std::future::pending::<()>().await;
            Ok(())
        }

        fn hold(&mut self, _stimulus: &StimulusDescriptor) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_renderer_is_fatal() {
        let timer = FrameTimer::new(FramePeriod::new(10.0).unwrap());
        let mut ctx = TrialContext::new(
            timer,
            Stuck,
            InputBus::default(),
            StdRng::seed_from_u64(0),
            Duration::from_millis(500),
        );
        let err = ctx
            .show(&StimulusDescriptor::Fixation, Presentation::Millis(250))
            .await
            .unwrap_err();
        match err {
            EngineError::RendererStalled {
                stimulus,
                waited_ms,
            } => {
                assert_eq!(stimulus, "fixation");
                assert_eq!(waited_ms, 750);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
