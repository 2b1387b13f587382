//! Simulated participant for unattended runs.
//!
//! Sits between the engine and the real renderer, watches every screen, and
//! answers through the input bus the way a plausible observer would.

use std::time::Duration;

use ectask_core::{Direction, StimulusDescriptor};
use ectask_experiment::{Presentation, Renderer, ResponseKeys};
use ectask_timing::{FramePeriod, InputBus, InputEvent};
use rand::Rng;
use rand::rngs::StdRng;
use tracing::debug;

/// Exposure (ms) at which line judgements are 75% correct.
const LINE_MIDPOINT_MS: f64 = 60.0;
const LINE_SLOPE_MS: f64 = 12.0;
const FLANKER_BASE_RT_MS: f64 = 430.0;
const FLANKER_INTERFERENCE_MS: f64 = 60.0;
const FLANKER_ERROR_RATE: f64 = 0.04;

pub struct SimulatedParticipant<D> {
    inner: D,
    bus: InputBus,
    period: FramePeriod,
    rng: StdRng,
    line_keys: ResponseKeys,
    flanker_keys: ResponseKeys,
    span_capacity: usize,
    longer: Option<Direction>,
    exposure_ms: f64,
    digits: Vec<u8>,
}

impl<D: Renderer> SimulatedParticipant<D> {
    pub fn new(
        inner: D,
        bus: InputBus,
        period: FramePeriod,
        line_keys: ResponseKeys,
        flanker_keys: ResponseKeys,
        mut rng: StdRng,
    ) -> Self {
        let span_capacity = rng.random_range(5..=8);
        debug!(span_capacity, "simulated participant ready");
        Self {
            inner,
            bus,
            period,
            rng,
            line_keys,
            flanker_keys,
            span_capacity,
            longer: None,
            exposure_ms: 0.0,
            digits: Vec::new(),
        }
    }

    /// Probability of judging the line pair correctly: from chance (0.5)
    /// towards 1 along a logistic curve in exposure.
    fn line_accuracy(exposure_ms: f64) -> f64 {
        0.5 + 0.5 / (1.0 + (-(exposure_ms - LINE_MIDPOINT_MS) / LINE_SLOPE_MS).exp())
    }

    fn press_after(&self, after_ms: f64, keys: Vec<String>) {
        let bus = self.bus.clone();
        let after = Duration::from_secs_f64(after_ms.max(0.0) / 1000.0);
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            for key in keys {
                bus.publish(InputEvent::press(&key));
            }
        });
    }

    fn react(&mut self, stimulus: &StimulusDescriptor) {
        match stimulus {
            StimulusDescriptor::ResponsePrompt { .. } => {
                let Some(side) = self.longer.take() else {
                    return;
                };
                let correct = self.rng.random_bool(Self::line_accuracy(self.exposure_ms));
                let side = if correct { side } else { side.opposite() };
                let delay = self.rng.random_range(400.0..900.0);
                self.press_after(delay, vec![self.line_keys.for_side(side).to_string()]);
            }
            StimulusDescriptor::EntryPrompt { max_len } => {
                let mut keys: Vec<String> = std::mem::take(&mut self.digits)
                    .iter()
                    .map(|d| d.to_string())
                    .collect();
                let recalled = *max_len <= self.span_capacity
                    || (*max_len == self.span_capacity + 1 && self.rng.random_bool(0.5));
                if !recalled {
                    // Loses the tail of the sequence.
                    keys.pop();
                }
                keys.push("enter".to_string());
                let delay = 800.0 + 350.0 * *max_len as f64;
                self.press_after(delay, keys);
            }
            StimulusDescriptor::Arrows { target, flank, .. } => {
                let mut rt = FLANKER_BASE_RT_MS + self.rng.random_range(0.0..150.0);
                if target != flank {
                    rt += FLANKER_INTERFERENCE_MS;
                }
                let side = if self.rng.random_bool(FLANKER_ERROR_RATE) {
                    target.opposite()
                } else {
                    *target
                };
                self.press_after(rt, vec![self.flanker_keys.for_side(side).to_string()]);
            }
            _ => {}
        }
    }
}

impl<D: Renderer> Renderer for SimulatedParticipant<D> {
    async fn show(
        &mut self,
        stimulus: &StimulusDescriptor,
        presentation: Presentation,
    ) -> anyhow::Result<()> {
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
                self.exposure_ms = presentation.nominal(self.period).as_secs_f64() * 1000.0;
            }
            StimulusDescriptor::Digit { digit } => self.digits.push(*digit),
            _ => {}
        }
        self.inner.show(stimulus, presentation).await
    }

    fn hold(&mut self, stimulus: &StimulusDescriptor) -> anyhow::Result<()> {
        self.inner.hold(stimulus)?;
        self.react(stimulus);
        Ok(())
    }
}
