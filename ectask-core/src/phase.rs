use serde::{Deserialize, Serialize};

use crate::trial::TaskKind;

/// Session phases, walked in order by the session driver.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", content = "task", rename_all = "snake_case")]
pub enum Phase {
    Calibration,
    Task(TaskKind),
    Debrief,
}

impl Default for Phase {
    fn default() -> Self {
        Phase::Calibration
    }
}

impl Phase {
    pub fn next(&self) -> Option<Self> {
        use Phase::*;
        Some(match self {
            Calibration => Task(TaskKind::LineDiscrimination),
            Task(TaskKind::LineDiscrimination) => Task(TaskKind::DigitSpan),
            Task(TaskKind::DigitSpan) => Task(TaskKind::Flanker),
            Task(TaskKind::Flanker) => Debrief,
            Debrief => return None,
        })
    }

    pub fn requires_calibration(&self) -> bool {
        matches!(self, Phase::Calibration)
    }

    pub fn task(&self) -> Option<TaskKind> {
        match self {
            Phase::Task(kind) => Some(*kind),
            _ => None,
        }
    }
}
