use std::fmt;

use serde::{Deserialize, Serialize};

use crate::input::Token;
use crate::stimulus::{Congruency, Direction, StimulusDescriptor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    LineDiscrimination,
    DigitSpan,
    Flanker,
}

impl TaskKind {
    /// Identifier used in the session payload.
    pub fn identifier(&self) -> &'static str {
        match self {
            TaskKind::LineDiscrimination => "inspection_time_line_masked",
            TaskKind::DigitSpan => "digit_span_forward",
            TaskKind::Flanker => "flanker_arrows_2afc",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Block {
    Practice,
    Test,
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Block::Practice => f.write_str("Practice"),
            Block::Test => f.write_str("Test"),
        }
    }
}

/// Condition a trial ran under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "task", rename_all = "snake_case")]
pub enum ConditionParams {
    LineDiscrimination {
        exposure_ms: f64,
        exposure_frames: u32,
        longer_side: Direction,
    },
    DigitSpan {
        span: usize,
    },
    Flanker {
        congruency: Congruency,
        target: Direction,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Response {
    Token(Token),
    Timeout,
}

impl Response {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Response::Timeout)
    }

    pub fn token(&self) -> Option<&Token> {
        match self {
            Response::Token(token) => Some(token),
            Response::Timeout => None,
        }
    }
}

/// Recorded result per trial. Built once through [`TrialRecord::new`] and
/// never changed afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub task: TaskKind,
    pub block: Block,
    pub trial_index: usize,
    pub condition: ConditionParams,
    pub stimulus: StimulusDescriptor,
    pub expected: Token,
    pub response: Response,
    pub correct: bool,
    pub reaction_time_ms: Option<f64>,
}

impl TrialRecord {
    /// `correct` is derived from `response` and `expected`; a timeout is
    /// always incorrect and never carries a reaction time.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        task: TaskKind,
        block: Block,
        trial_index: usize,
        condition: ConditionParams,
        stimulus: StimulusDescriptor,
        expected: Token,
        response: Response,
        reaction_time_ms: Option<f64>,
    ) -> Self {
        let correct = response.token() == Some(&expected);
        let reaction_time_ms = if response.is_timeout() {
            None
        } else {
            reaction_time_ms.map(|rt| rt.max(0.0))
        };
        Self {
            task,
            block,
            trial_index,
            condition,
            stimulus,
            expected,
            response,
            correct,
            reaction_time_ms,
        }
    }

    pub fn timed_out(&self) -> bool {
        self.response.is_timeout()
    }

    pub fn congruency(&self) -> Option<Congruency> {
        match self.condition {
            ConditionParams::Flanker { congruency, .. } => Some(congruency),
            _ => None,
        }
    }

    pub fn exposure_ms(&self) -> Option<f64> {
        match self.condition {
            ConditionParams::LineDiscrimination { exposure_ms, .. } => Some(exposure_ms),
            _ => None,
        }
    }
}
