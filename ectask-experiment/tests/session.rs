use std::time::Duration;

use ectask_core::{Block, Congruency, Direction, StimulusDescriptor, TaskKind};
use ectask_experiment::{
    CognitiveTask, ConfigError, EngineError, Flanker, FlankerConfig, LineDiscrimination,
    LineDiscriminationConfig, PacedRenderer, Session, SessionConfig, StopReason, Surface,
    TaskSummary, TrialContext,
};
use ectask_timing::{FramePeriod, FrameTimer, InputBus, InputEvent};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::time::Instant;

/// Scripted participant sitting behind the display: it watches what is drawn
/// and answers through the input bus once a response is invited.
struct Participant {
    bus: InputBus,
    /// Longest digit span recalled correctly.
    span_capacity: usize,
    /// Answer the line task wrongly on purpose.
    contrary: bool,
    /// Never press anything.
    silent: bool,
    longer: Option<Direction>,
    digits: Vec<u8>,
}

impl Participant {
    fn new(bus: InputBus) -> Self {
        Self {
            bus,
            span_capacity: 5,
            contrary: false,
            silent: false,
            longer: None,
            digits: Vec::new(),
        }
    }

    fn press_after(&self, after: Duration, keys: Vec<String>) {
        if self.silent {
            return;
        }
        let bus = self.bus.clone();
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            for key in keys {
                bus.publish(InputEvent::press(&key));
            }
        });
    }
}

fn key(side: Direction) -> String {
    match side {
        Direction::Left => "f".to_string(),
        Direction::Right => "j".to_string(),
    }
}

impl Surface for Participant {
    fn draw(&mut self, stimulus: &StimulusDescriptor) -> anyhow::Result<()> {
        match stimulus {
            StimulusDescriptor::Lines {
                left_len,
                right_len,
            } => {
                self.longer = Some(if left_len > right_len {
                    Direction::Left
                } else {
                    Direction::Right
                });
            }
            StimulusDescriptor::ResponsePrompt { .. } => {
                if let Some(side) = self.longer.take() {
                    let side = if self.contrary { side.opposite() } else { side };
                    self.press_after(Duration::from_millis(300), vec![key(side)]);
                }
            }
            StimulusDescriptor::Digit { digit } => self.digits.push(*digit),
            StimulusDescriptor::EntryPrompt { max_len } => {
                let mut keys: Vec<String> = std::mem::take(&mut self.digits)
                    .iter()
                    .map(|d| d.to_string())
                    .collect();
                if *max_len > self.span_capacity {
                    keys.swap_remove(0);
                }
                keys.push("enter".to_string());
                self.press_after(Duration::from_millis(1500), keys);
            }
            StimulusDescriptor::Arrows { target, flank, .. } => {
                let rt = if target == flank { 450 } else { 520 };
                self.press_after(Duration::from_millis(rt), vec![key(*target)]);
            }
            _ => {}
        }
        Ok(())
    }
}

type Ctx = TrialContext<FrameTimer, PacedRenderer<Participant, FrameTimer>, StdRng>;

fn sixty_hz() -> FrameTimer {
    FrameTimer::new(FramePeriod::from_refresh_hz(60.0).unwrap())
}

fn context(refresh_hz: f64, participant: impl FnOnce(&mut Participant)) -> Ctx {
    let bus = InputBus::default();
    let mut who = Participant::new(bus.clone());
    participant(&mut who);
    let timer = FrameTimer::new(FramePeriod::from_refresh_hz(refresh_hz).unwrap());
    let renderer = PacedRenderer::new(who, timer.clone());
    TrialContext::new(
        timer,
        renderer,
        bus,
        StdRng::seed_from_u64(21),
        Duration::from_millis(2000),
    )
}

#[tokio::test(start_paused = true)]
async fn full_session_runs_every_task_in_order() {
    let bus = InputBus::default();
    let timer = sixty_hz();
    let renderer = PacedRenderer::new(Participant::new(bus.clone()), timer.clone());
    let mut session = Session::new(
        SessionConfig::default(),
        timer,
        renderer,
        bus,
        StdRng::seed_from_u64(7),
    )
    .unwrap();

    let output = session.run().await.unwrap();

    let order: Vec<&str> = output.tasks.iter().map(|t| t.task).collect();
    assert_eq!(
        order,
        vec![
            "inspection_time_line_masked",
            "digit_span_forward",
            "flanker_arrows_2afc"
        ]
    );
    assert_eq!(output.study_id.as_str().len(), 6);
    assert_eq!(output.calibration.samples, 120);
    assert!((output.calibration.effective_fps - 60.0).abs() < 0.1);

    let line = output.task(TaskKind::LineDiscrimination).unwrap();
    assert_eq!(line.trials.len(), 7 + 35);
    let TaskSummary::LineDiscrimination(summary) = &line.summary else {
        panic!("wrong summary kind");
    };
    assert_eq!(summary.n_trials, 35);
    assert_eq!(summary.accuracy, 1.0);
    // A perfect observer drives the exposure to the one-frame floor.
    let threshold = summary.threshold_ms.unwrap();
    assert!(threshold < 100.0, "threshold {threshold}");
    for trial in &line.trials {
        assert_eq!(trial.reaction_time_ms, None);
    }

    let digit = output.task(TaskKind::DigitSpan).unwrap();
    let practice = digit.trials.iter().filter(|t| t.block == Block::Practice).count();
    assert_eq!(practice, 3);
    let TaskSummary::DigitSpan(summary) = &digit.summary else {
        panic!("wrong summary kind");
    };
    assert_eq!(summary.max_span, 5);
    assert_eq!(summary.n_trials, 8);
    assert_eq!(summary.accuracy, 0.75);
    assert_eq!(
        summary.stop_reason,
        Some(StopReason::NoCorrectAtSpan {
            span: 6,
            trials_per_span: 2
        })
    );
    assert_eq!(digit.blocks[1].trials_run, 8);

    let flanker = output.task(TaskKind::Flanker).unwrap();
    assert_eq!(flanker.trials.len(), 7 + 25);
    let TaskSummary::Flanker(summary) = &flanker.summary else {
        panic!("wrong summary kind");
    };
    assert_eq!(summary.n_trials, 25);
    assert_eq!(summary.n_timeouts, 0);
    assert_eq!(summary.accuracy, 1.0);
    assert!((summary.mean_rt_congruent_ms.unwrap() - 450.0).abs() < 1e-6);
    assert!((summary.mean_rt_incongruent_ms.unwrap() - 520.0).abs() < 1e-6);
    assert!((summary.interference_ms.unwrap() - 70.0).abs() < 1e-6);

    let json: serde_json::Value = serde_json::from_str(&output.to_json().unwrap()).unwrap();
    assert_eq!(json["study_id"], output.study_id.as_str());
    let digit_summary = &json["tasks"][1]["summary"];
    assert_eq!(digit_summary["task"], "digit_span");
    assert_eq!(
        digit_summary["stop_reason"],
        serde_json::json!({
            "reason": "no_correct_at_span",
            "span": 6,
            "trials_per_span": 2
        })
    );
}

#[tokio::test(start_paused = true)]
async fn trial_indices_restart_per_block_and_increase() {
    let mut ctx = context(60.0, |_| {});
    let config = FlankerConfig {
        practice_trials: 4,
        test_trials: 9,
        ..FlankerConfig::default()
    };
    let output = Flanker::new(config).run(&mut ctx).await.unwrap();

    for block in [Block::Practice, Block::Test] {
        let indices: Vec<usize> = output
            .trials
            .iter()
            .filter(|t| t.block == block)
            .map(|t| t.trial_index)
            .collect();
        let expected: Vec<usize> = match block {
            Block::Practice => (1..=4).collect(),
            Block::Test => (1..=9).collect(),
        };
        assert_eq!(indices, expected);
    }

    let test: Vec<_> = output.trials.iter().filter(|t| t.block == Block::Test).collect();
    let congruent = test
        .iter()
        .filter(|t| t.congruency() == Some(Congruency::Congruent))
        .count();
    assert!(congruent == 4 || congruent == 5, "congruent {congruent}");
}

#[tokio::test(start_paused = true)]
async fn silent_participant_times_out_every_flanker_trial() {
    let mut ctx = context(60.0, |p| p.silent = true);
    let config = FlankerConfig {
        practice_trials: 2,
        test_trials: 6,
        ..FlankerConfig::default()
    };
    let start = Instant::now();
    let output = Flanker::new(config).run(&mut ctx).await.unwrap();

    let TaskSummary::Flanker(summary) = &output.summary else {
        panic!("wrong summary kind");
    };
    assert_eq!(summary.n_trials, 6);
    assert_eq!(summary.n_timeouts, 6);
    assert_eq!(summary.accuracy, 0.0);
    assert_eq!(summary.mean_rt_congruent_ms, None);
    assert_eq!(summary.interference_ms, None);
    assert!(output.trials.iter().all(|t| !t.correct && t.reaction_time_ms.is_none()));

    // Practice: fixation + window + feedback + ITI; test drops the feedback.
    let practice = 2 * (400 + 2500 + 500 + 600);
    let test = 6 * (400 + 2500 + 600);
    assert_eq!(
        Instant::now() - start,
        Duration::from_millis(practice + test)
    );
    assert_eq!(ctx.input.listeners(), 0);
}

#[tokio::test(start_paused = true)]
async fn wrong_answers_push_the_exposure_up_to_its_ceiling() {
    // 100 Hz keeps every 10 ms step on the frame grid.
    let mut ctx = context(100.0, |p| p.contrary = true);
    let config = LineDiscriminationConfig {
        practice_trials: 0,
        test_trials: 50,
        ..LineDiscriminationConfig::default()
    };
    let period = FramePeriod::from_refresh_hz(100.0).unwrap();
    let output = LineDiscrimination::new(config, period)
        .run(&mut ctx)
        .await
        .unwrap();

    let exposures: Vec<f64> = output.trials.iter().filter_map(|t| t.exposure_ms()).collect();
    assert_eq!(exposures.len(), 50);
    assert!(exposures.windows(2).all(|w| w[1] >= w[0]));
    assert!((exposures[0] - 220.0).abs() < 1e-6);
    assert!((exposures[49] - 600.0).abs() < 1e-6);
    let TaskSummary::LineDiscrimination(summary) = &output.summary else {
        panic!("wrong summary kind");
    };
    assert_eq!(summary.accuracy, 0.0);
    // Last 24 trials: 480..=590 then twelve at the 600 ms ceiling.
    assert!((summary.threshold_ms.unwrap() - 595.0).abs() < 1e-6);
}

#[tokio::test(start_paused = true)]
async fn malformed_configuration_fails_before_any_stimulus() {
    let mut ctx = context(60.0, |_| {});
    let config = LineDiscriminationConfig {
        test_staircase: ectask_experiment::ExposureStaircaseConfig {
            step_down_ms: -5.0,
            ..Default::default()
        },
        ..LineDiscriminationConfig::default()
    };
    let period = FramePeriod::from_refresh_hz(60.0).unwrap();
    let err = LineDiscrimination::new(config, period)
        .run(&mut ctx)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Config(_)), "{err}");
    assert!(ctx.renderer.surface().digits.is_empty());
    assert!(ctx.renderer.surface().longer.is_none());
}

#[tokio::test(start_paused = true)]
async fn session_rejects_a_broken_digit_span_config_up_front() {
    let bus = InputBus::default();
    let timer = sixty_hz();
    let renderer = PacedRenderer::new(Participant::new(bus.clone()), timer.clone());
    let mut config = SessionConfig::default();
    config.digit_span.trials_per_span = 0;

    let Err(err) = Session::new(config, timer, renderer, bus, StdRng::seed_from_u64(7)) else {
        panic!("session accepted trials_per_span = 0");
    };
    assert_eq!(err, ConfigError::TrialsPerSpanZero);
}
