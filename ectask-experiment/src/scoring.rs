//! Task summaries computed from test-block trial records.
//!
//! Every function here is pure and does not care about record order; the
//! line task's tail is picked by `trial_index`, not by position.

use ectask_core::{Congruency, TrialRecord};
use serde::Serialize;

use crate::staircase::StopReason;

/// Number of final test trials the exposure threshold is read from.
pub const THRESHOLD_TAIL: usize = 24;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "task", rename_all = "snake_case")]
pub enum TaskSummary {
    LineDiscrimination(LineDiscriminationSummary),
    DigitSpan(DigitSpanSummary),
    Flanker(FlankerSummary),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LineDiscriminationSummary {
    pub n_trials: usize,
    pub accuracy: f64,
    /// Median exposure over the last [`THRESHOLD_TAIL`] test trials.
    pub threshold_ms: Option<f64>,
}

impl LineDiscriminationSummary {
    pub fn from_trials<'a>(trials: impl IntoIterator<Item = &'a TrialRecord>) -> Self {
        let mut trials: Vec<&TrialRecord> = trials.into_iter().collect();
        if trials.is_empty() {
            return Self::default();
        }
        trials.sort_by_key(|t| t.trial_index);

        let tail = &trials[trials.len().saturating_sub(THRESHOLD_TAIL)..];
        let mut exposures: Vec<f64> = tail.iter().filter_map(|t| t.exposure_ms()).collect();
        exposures.sort_by(f64::total_cmp);

        Self {
            n_trials: trials.len(),
            accuracy: proportion(trials.iter().filter(|t| t.correct).count(), trials.len()),
            threshold_ms: median(&exposures),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DigitSpanSummary {
    pub n_trials: usize,
    pub accuracy: f64,
    pub max_span: usize,
    pub stop_reason: Option<StopReason>,
}

impl DigitSpanSummary {
    pub fn from_trials<'a>(
        trials: impl IntoIterator<Item = &'a TrialRecord>,
        max_span: usize,
        stop_reason: Option<StopReason>,
    ) -> Self {
        let (n_trials, n_correct) = trials
            .into_iter()
            .fold((0, 0), |(n, c), t| (n + 1, c + usize::from(t.correct)));
        Self {
            n_trials,
            accuracy: proportion(n_correct, n_trials),
            max_span,
            stop_reason,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FlankerSummary {
    pub n_trials: usize,
    pub n_timeouts: usize,
    pub accuracy: f64,
    pub mean_rt_congruent_ms: Option<f64>,
    pub mean_rt_incongruent_ms: Option<f64>,
    pub interference_ms: Option<f64>,
}

impl FlankerSummary {
    pub fn from_trials<'a>(trials: impl IntoIterator<Item = &'a TrialRecord>) -> Self {
        let mut n_trials = 0;
        let mut n_timeouts = 0;
        let mut n_correct = 0;
        let mut congruent_rts = Vec::new();
        let mut incongruent_rts = Vec::new();

        for trial in trials {
            n_trials += 1;
            if trial.timed_out() {
                n_timeouts += 1;
                continue;
            }
            if !trial.correct {
                continue;
            }
            n_correct += 1;
            let Some(rt) = trial.reaction_time_ms else {
                continue;
            };
            match trial.congruency() {
                Some(Congruency::Congruent) => congruent_rts.push(rt),
                Some(Congruency::Incongruent) => incongruent_rts.push(rt),
                None => {}
            }
        }

        let mean_rt_congruent_ms = mean(&congruent_rts);
        let mean_rt_incongruent_ms = mean(&incongruent_rts);
        let interference_ms = mean_rt_incongruent_ms
            .zip(mean_rt_congruent_ms)
            .map(|(incongruent, congruent)| incongruent - congruent);

        Self {
            n_trials,
            n_timeouts,
            accuracy: proportion(n_correct, n_trials),
            mean_rt_congruent_ms,
            mean_rt_incongruent_ms,
            interference_ms,
        }
    }
}

pub fn line_discrimination<'a>(trials: impl IntoIterator<Item = &'a TrialRecord>) -> TaskSummary {
    TaskSummary::LineDiscrimination(LineDiscriminationSummary::from_trials(trials))
}

pub fn digit_span<'a>(
    trials: impl IntoIterator<Item = &'a TrialRecord>,
    max_span: usize,
    stop_reason: Option<StopReason>,
) -> TaskSummary {
    TaskSummary::DigitSpan(DigitSpanSummary::from_trials(trials, max_span, stop_reason))
}

pub fn flanker<'a>(trials: impl IntoIterator<Item = &'a TrialRecord>) -> TaskSummary {
    TaskSummary::Flanker(FlankerSummary::from_trials(trials))
}

fn proportion(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        None
    } else {
        Some(data.iter().sum::<f64>() / data.len() as f64)
    }
}

/// Median of sorted data. Even-length input averages the two middle values.
fn median(sorted: &[f64]) -> Option<f64> {
    let n = sorted.len();
    match n {
        0 => None,
        _ if n % 2 == 1 => Some(sorted[n / 2]),
        _ => Some((sorted[n / 2 - 1] + sorted[n / 2]) / 2.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ectask_core::{
        Block, ConditionParams, Direction, Response, StimulusDescriptor, TaskKind, Token,
    };

    fn flanker_trial(
        index: usize,
        congruency: Congruency,
        response: Option<&str>,
        rt: Option<f64>,
    ) -> TrialRecord {
        TrialRecord::new(
            TaskKind::Flanker,
            Block::Test,
            index,
            ConditionParams::Flanker {
                congruency,
                target: Direction::Left,
            },
            StimulusDescriptor::arrows(Direction::Left, congruency, 2),
            Token::new("f"),
            response.map_or(Response::Timeout, |key| Response::Token(Token::new(key))),
            rt,
        )
    }

    fn line_trial(index: usize, exposure_ms: f64, correct: bool) -> TrialRecord {
        TrialRecord::new(
            TaskKind::LineDiscrimination,
            Block::Test,
            index,
            ConditionParams::LineDiscrimination {
                exposure_ms,
                exposure_frames: (exposure_ms / 10.0) as u32,
                longer_side: Direction::Right,
            },
            StimulusDescriptor::Lines {
                left_len: 120,
                right_len: 130,
            },
            Token::new("j"),
            Response::Token(Token::new(if correct { "j" } else { "f" })),
            None,
        )
    }

    #[test]
    fn flanker_interference_from_correct_trials() {
        let trials = vec![
            flanker_trial(1, Congruency::Congruent, Some("f"), Some(500.0)),
            flanker_trial(2, Congruency::Incongruent, Some("f"), Some(560.0)),
            flanker_trial(3, Congruency::Incongruent, None, None),
        ];
        let summary = FlankerSummary::from_trials(&trials);
        assert!((summary.accuracy - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(summary.mean_rt_congruent_ms, Some(500.0));
        assert_eq!(summary.mean_rt_incongruent_ms, Some(560.0));
        assert_eq!(summary.interference_ms, Some(60.0));
        assert_eq!(summary.n_trials, 3);
        assert_eq!(summary.n_timeouts, 1);
    }

    #[test]
    fn flanker_errors_do_not_enter_the_means() {
        let trials = vec![
            flanker_trial(1, Congruency::Congruent, Some("f"), Some(400.0)),
            flanker_trial(2, Congruency::Congruent, Some("j"), Some(900.0)),
        ];
        let summary = FlankerSummary::from_trials(&trials);
        assert_eq!(summary.accuracy, 0.5);
        assert_eq!(summary.mean_rt_congruent_ms, Some(400.0));
        assert_eq!(summary.mean_rt_incongruent_ms, None);
        assert_eq!(summary.interference_ms, None);
    }

    #[test]
    fn empty_inputs_give_neutral_summaries() {
        let none: Vec<TrialRecord> = Vec::new();
        assert_eq!(FlankerSummary::from_trials(&none), FlankerSummary::default());
        let line = LineDiscriminationSummary::from_trials(&none);
        assert_eq!(line.accuracy, 0.0);
        assert_eq!(line.threshold_ms, None);
        let digit = DigitSpanSummary::from_trials(&none, 2, None);
        assert_eq!(digit.accuracy, 0.0);
        assert_eq!(digit.max_span, 2);
    }

    #[test]
    fn threshold_averages_the_middle_pair() {
        let trials: Vec<TrialRecord> = (1..=24)
            .map(|i| line_trial(i, if i % 2 == 0 { 140.0 } else { 130.0 }, true))
            .collect();
        let summary = LineDiscriminationSummary::from_trials(&trials);
        assert_eq!(summary.threshold_ms, Some(135.0));
        assert_eq!(summary.accuracy, 1.0);
    }

    #[test]
    fn threshold_reads_only_the_last_trials_by_index() {
        let mut trials: Vec<TrialRecord> = (1..=35)
            .map(|i| line_trial(i, if i <= 11 { 500.0 } else { 100.0 }, i % 5 != 0))
            .collect();
        trials.reverse();
        let summary = LineDiscriminationSummary::from_trials(&trials);
        assert_eq!(summary.threshold_ms, Some(100.0));
        assert_eq!(summary.n_trials, 35);
        assert!((summary.accuracy - 28.0 / 35.0).abs() < 1e-12);
    }

    #[test]
    fn short_blocks_use_every_trial() {
        let trials = vec![
            line_trial(1, 200.0, true),
            line_trial(2, 180.0, false),
            line_trial(3, 190.0, true),
        ];
        let summary = LineDiscriminationSummary::from_trials(&trials);
        assert_eq!(summary.threshold_ms, Some(190.0));
    }

    #[test]
    fn digit_span_accuracy_and_stop_reason() {
        let trial = |index, correct: bool| {
            TrialRecord::new(
                TaskKind::DigitSpan,
                Block::Test,
                index,
                ConditionParams::DigitSpan { span: 3 },
                StimulusDescriptor::DigitSequence {
                    digits: vec![1, 2, 3],
                },
                Token::new("123"),
                Response::Token(Token::new(if correct { "123" } else { "12" })),
                None,
            )
        };
        let trials = vec![trial(1, true), trial(2, true), trial(3, false), trial(4, false)];
        let reason = StopReason::NoCorrectAtSpan {
            span: 4,
            trials_per_span: 2,
        };
        let summary = DigitSpanSummary::from_trials(&trials, 3, Some(reason.clone()));
        assert_eq!(summary.accuracy, 0.5);
        assert_eq!(summary.max_span, 3);
        assert_eq!(summary.stop_reason, Some(reason));
    }
}
