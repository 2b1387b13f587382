use serde::{Deserialize, Serialize};

use crate::trial::Block;

/// Left/right, used for line sides and arrow headings alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Left,
    Right,
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    pub fn arrow(self) -> char {
        match self {
            Direction::Left => '←',
            Direction::Right => '→',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Congruency {
    Congruent,
    Incongruent,
}

/// Declarative description of one screen. The renderer owns every pixel;
/// the engine only ever produces and records these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StimulusDescriptor {
    Fixation,
    Blank,
    /// Random-line mask. `seed` pins the pattern so a replay draws the same lines.
    LineMask {
        seed: u64,
    },
    /// Two vertical lines, lengths in pixels.
    Lines {
        left_len: u32,
        right_len: u32,
    },
    Digit {
        digit: u8,
    },
    /// Whole digit-span sequence, as recorded for the trial.
    DigitSequence {
        digits: Vec<u8>,
    },
    Arrows {
        target: Direction,
        flank: Direction,
        flankers_each_side: usize,
    },
    ResponsePrompt {
        block: Block,
        trial_index: usize,
    },
    EntryPrompt {
        max_len: usize,
    },
    Feedback {
        correct: bool,
    },
}

impl StimulusDescriptor {
    pub fn arrows(target: Direction, congruency: Congruency, flankers_each_side: usize) -> Self {
        let flank = match congruency {
            Congruency::Congruent => target,
            Congruency::Incongruent => target.opposite(),
        };
        StimulusDescriptor::Arrows {
            target,
            flank,
            flankers_each_side,
        }
    }

    /// Short name used in log lines.
    pub fn label(&self) -> &'static str {
        match self {
            StimulusDescriptor::Fixation => "fixation",
            StimulusDescriptor::Blank => "blank",
            StimulusDescriptor::LineMask { .. } => "line_mask",
            StimulusDescriptor::Lines { .. } => "lines",
            StimulusDescriptor::Digit { .. } => "digit",
            StimulusDescriptor::DigitSequence { .. } => "digit_sequence",
            StimulusDescriptor::Arrows { .. } => "arrows",
            StimulusDescriptor::ResponsePrompt { .. } => "response_prompt",
            StimulusDescriptor::EntryPrompt { .. } => "entry_prompt",
            StimulusDescriptor::Feedback { .. } => "feedback",
        }
    }

    /// Text rendering of an arrow row, e.g. `←←→←←`. `None` for other stimuli.
    pub fn arrow_row(&self) -> Option<String> {
        match self {
            StimulusDescriptor::Arrows {
                target,
                flank,
                flankers_each_side,
            } => {
                let side: String = std::iter::repeat_n(flank.arrow(), *flankers_each_side).collect();
                Some(format!("{side}{}{side}", target.arrow()))
            }
            _ => None,
        }
    }
}
