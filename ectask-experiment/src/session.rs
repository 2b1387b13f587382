//! Session driver: calibration, the three tasks in order, then debrief.

use std::fmt;
use std::time::Duration;

use ectask_core::{Phase, TaskKind};
use ectask_timing::{CalibrationStats, InputBus, Timer};
use rand::Rng;
use serde::Serialize;
use tracing::info;

use crate::block::TrialContext;
use crate::config::SessionConfig;
use crate::display::Renderer;
use crate::error::{ConfigError, EngineError};
use crate::tasks::{CognitiveTask, DigitSpan, Flanker, LineDiscrimination, TaskOutput};

const STUDY_ID_LEN: usize = 6;
const STUDY_ID_ALPHABET: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Short uppercase base-36 code correlating one run with external records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct StudyId(String);

impl StudyId {
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let id = (0..STUDY_ID_LEN)
            .map(|_| char::from(STUDY_ID_ALPHABET[rng.random_range(0..STUDY_ID_ALPHABET.len())]))
            .collect();
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StudyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Payload handed to the result collector once every task has run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionOutput {
    pub study_id: StudyId,
    pub calibration: CalibrationStats,
    pub tasks: Vec<TaskOutput>,
}

impl SessionOutput {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn task(&self, kind: TaskKind) -> Option<&TaskOutput> {
        self.tasks.iter().find(|t| t.task == kind.identifier())
    }
}

/// Owns the session state and walks the phases in order. Nothing is shared
/// ambiently: the trial context travels explicitly into every task.
pub struct Session<T, D, R> {
    config: SessionConfig,
    ctx: TrialContext<T, D, R>,
    phase: Phase,
}

impl<T: Timer, D: Renderer, R: Rng> Session<T, D, R> {
    pub fn new(
        config: SessionConfig,
        timer: T,
        renderer: D,
        input: InputBus,
        rng: R,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let watchdog = Duration::from_millis(config.renderer_watchdog_ms);
        Ok(Self {
            ctx: TrialContext::new(timer, renderer, input, rng, watchdog),
            config,
            phase: Phase::default(),
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn context(&self) -> &TrialContext<T, D, R> {
        &self.ctx
    }

    pub fn into_context(self) -> TrialContext<T, D, R> {
        self.ctx
    }

    pub async fn run(&mut self) -> Result<SessionOutput, EngineError> {
        let study_id = StudyId::generate(&mut self.ctx.rng);
        info!(%study_id, "session started");

        let mut calibration = CalibrationStats::default();
        let mut tasks = Vec::with_capacity(3);
        loop {
            match self.phase {
                Phase::Calibration => calibration = self.calibrate().await,
                Phase::Task(kind) => tasks.push(self.run_task(kind).await?),
                Phase::Debrief => info!(%study_id, tasks = tasks.len(), "session complete"),
            }
            match self.phase.next() {
                Some(next) => self.phase = next,
                None => break,
            }
        }

        Ok(SessionOutput {
            study_id,
            calibration,
            tasks,
        })
    }

    async fn calibrate(&mut self) -> CalibrationStats {
        let stats = self.ctx.timer.calibrate(self.config.calibration_frames).await;
        info!(
            ms_per_frame = stats.average_frame_ms(),
            hz = stats.effective_fps,
            jitter_ms = stats.jitter_ns / 1_000_000.0,
            samples = stats.samples,
            "calibration finished"
        );
        stats
    }

    async fn run_task(&mut self, kind: TaskKind) -> Result<TaskOutput, EngineError> {
        info!(task = %kind, "task started");
        let output = match kind {
            TaskKind::LineDiscrimination => {
                let period = self.config.frames.period()?;
                LineDiscrimination::new(self.config.line_discrimination.clone(), period)
                    .run(&mut self.ctx)
                    .await?
            }
            TaskKind::DigitSpan => {
                DigitSpan::new(self.config.digit_span.clone())
                    .run(&mut self.ctx)
                    .await?
            }
            TaskKind::Flanker => {
                Flanker::new(self.config.flanker.clone())
                    .run(&mut self.ctx)
                    .await?
            }
        };
        info!(task = %kind, trials = output.trials.len(), "task finished");
        Ok(output)
    }
}
