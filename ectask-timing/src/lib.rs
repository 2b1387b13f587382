pub mod capture;
pub mod frames;
pub mod timer;

pub use capture::{Captured, InputBus, InputEvent, PendingEntry, PendingResponse};
pub use frames::{Exposure, FramePeriod, TimingError, quantize_to_frames};
pub use timer::{CalibrationStats, FrameTimer, Timer};
