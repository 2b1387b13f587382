//! Stimulus display contract.
//!
//! The engine never draws. It hands a [`StimulusDescriptor`] and a duration
//! to a [`Renderer`] and waits for the completion signal.

use std::future::Future;
use std::time::Duration;

use ectask_core::StimulusDescriptor;
use ectask_timing::{FramePeriod, Timer};

/// How long a stimulus stays up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presentation {
    Millis(u64),
    Frames(u32),
}

impl Presentation {
    pub fn from_duration(duration: Duration) -> Self {
        Presentation::Millis(duration.as_millis() as u64)
    }

    /// Expected wall-clock length on a display with the given refresh period.
    pub fn nominal(&self, period: FramePeriod) -> Duration {
        match *self {
            Presentation::Millis(ms) => Duration::from_millis(ms),
            Presentation::Frames(frames) => period.duration() * frames,
        }
    }
}

pub trait Renderer {
    /// Displays `stimulus` and resolves once `presentation` has elapsed.
    fn show(
        &mut self,
        stimulus: &StimulusDescriptor,
        presentation: Presentation,
    ) -> impl Future<Output = anyhow::Result<()>>;

    /// Displays `stimulus` and leaves it up until the next call.
    fn hold(&mut self, stimulus: &StimulusDescriptor) -> anyhow::Result<()>;
}

/// Something that can put a descriptor on screen right now.
pub trait Surface {
    fn draw(&mut self, stimulus: &StimulusDescriptor) -> anyhow::Result<()>;
}

/// Renderer that draws on a [`Surface`] and paces durations with a [`Timer`]:
/// millisecond presentations wait on the wall clock, frame presentations on
/// refresh ticks.
#[derive(Debug)]
pub struct PacedRenderer<S, T> {
    surface: S,
    timer: T,
}

impl<S: Surface, T: Timer> PacedRenderer<S, T> {
    pub fn new(surface: S, timer: T) -> Self {
        Self { surface, timer }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn into_surface(self) -> S {
        self.surface
    }
}

impl<S: Surface, T: Timer> Renderer for PacedRenderer<S, T> {
    async fn show(
        &mut self,
        stimulus: &StimulusDescriptor,
        presentation: Presentation,
    ) -> anyhow::Result<()> {
        self.surface.draw(stimulus)?;
        match presentation {
            Presentation::Millis(ms) => self.timer.delay(Duration::from_millis(ms)).await,
            Presentation::Frames(frames) => self.timer.delay_frames(frames).await,
        }
        Ok(())
    }

    fn hold(&mut self, stimulus: &StimulusDescriptor) -> anyhow::Result<()> {
        self.surface.draw(stimulus)
    }
}
