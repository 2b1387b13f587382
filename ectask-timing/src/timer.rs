use std::collections::VecDeque;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::{Instant, Interval, MissedTickBehavior};

use crate::frames::FramePeriod;

/// Clock and suspension points for the trial engine.
///
/// `delay` is wall-clock paced; `delay_frames` is paced by display refresh
/// ticks. Both resume exactly once and cannot be cancelled by the engine.
pub trait Timer: Clone {
    fn now(&self) -> Instant;

    fn elapsed(&self, since: Instant) -> Duration {
        self.now().saturating_duration_since(since)
    }

    fn delay(&self, duration: Duration) -> impl Future<Output = ()>;

    fn delay_frames(&mut self, frames: u32) -> impl Future<Output = ()>;

    fn frame_period(&self) -> FramePeriod;

    fn calibration_stats(&self) -> CalibrationStats;

    /// Runs `frames` refresh ticks and reports what was measured.
    fn calibrate(&mut self, frames: u32) -> impl Future<Output = CalibrationStats> {
        async move {
            self.delay_frames(frames).await;
            self.calibration_stats()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalibrationStats {
    pub samples: usize,
    pub average_frame_time_ns: f64,
    pub jitter_ns: f64,
    pub min_frame_time_ns: f64,
    pub max_frame_time_ns: f64,
    pub effective_fps: f64,
}

impl CalibrationStats {
    pub fn from_frame_times<'a>(frame_times: impl IntoIterator<Item = &'a Duration>) -> Self {
        let times: Vec<f64> = frame_times
            .into_iter()
            .map(|d| d.as_nanos() as f64)
            .collect();
        if times.is_empty() {
            return Self::default();
        }
        let avg = times.iter().sum::<f64>() / times.len() as f64;
        let var = times.iter().map(|x| (x - avg).powi(2)).sum::<f64>() / times.len() as f64;
        let min = times.iter().copied().fold(f64::INFINITY, f64::min);
        let max = times.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        CalibrationStats {
            samples: times.len(),
            average_frame_time_ns: avg,
            jitter_ns: var.sqrt(),
            min_frame_time_ns: min,
            max_frame_time_ns: max,
            effective_fps: if avg > 0.0 { 1e9 / avg } else { 0.0 },
        }
    }

    pub fn average_frame_ms(&self) -> f64 {
        self.average_frame_time_ns / 1_000_000.0
    }
}

/// Tokio-backed timer that paces frame waits on a fixed refresh grid and
/// keeps a rolling window of measured frame times.
#[derive(Debug)]
pub struct FrameTimer {
    period: FramePeriod,
    // Created lazily: an interval needs a running runtime.
    ticker: Option<Interval>,
    frame_times: VecDeque<Duration>,
    max_samples: usize,
}

impl FrameTimer {
    pub fn new(period: FramePeriod) -> Self {
        Self {
            period,
            ticker: None,
            frame_times: VecDeque::with_capacity(1000),
            max_samples: 1000,
        }
    }

    pub fn frame_times(&self) -> impl Iterator<Item = &Duration> {
        self.frame_times.iter()
    }
}

impl Clone for FrameTimer {
    fn clone(&self) -> Self {
        Self {
            period: self.period,
            ticker: None,
            frame_times: self.frame_times.clone(),
            max_samples: self.max_samples,
        }
    }
}

impl Timer for FrameTimer {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn delay(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    async fn delay_frames(&mut self, frames: u32) {
        if frames == 0 {
            return;
        }
        let period = self.period.duration();
        let ticker = self.ticker.get_or_insert_with(|| {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });
        // A wait always spans whole frames counted from now.
        ticker.reset();

        let mut last = Instant::now();
        for _ in 0..frames {
            ticker.tick().await;
            let now = Instant::now();
            if self.frame_times.len() >= self.max_samples {
                self.frame_times.pop_front();
            }
            self.frame_times.push_back(now.saturating_duration_since(last));
            last = now;
        }
    }

    fn frame_period(&self) -> FramePeriod {
        self.period
    }

    fn calibration_stats(&self) -> CalibrationStats {
        CalibrationStats::from_frame_times(&self.frame_times)
    }
}
