//! Collaborators the session drives but does not implement.

use crate::RenderState;
use artrack_core::{MarkerObservation, RgbImageView};
use std::time::{Duration, Instant};

/// Pixel-level square marker detector.
pub trait MarkerDetector {
    /// Markers visible in `frame`, corners in TL, TR, BR, BL order.
    fn detect(&mut self, frame: &RgbImageView<'_>) -> Vec<MarkerObservation>;
}

/// Draws the camera frame and the anchored content.
pub trait Renderer {
    fn render(&mut self, frame: &RgbImageView<'_>, state: &RenderState);

    /// Called before the first frame and whenever the frame size changes.
    fn on_resize(&mut self, _width: u32, _height: u32) {}

    /// The user asked to quit (window closed, escape pressed).
    fn should_close(&self) -> bool;
}

/// Monotonic session time.
pub trait Clock {
    fn now(&self) -> Duration;
}

/// Wall-clock time since construction.
#[derive(Clone, Copy, Debug)]
pub struct MonotonicClock {
    started: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Timestamps at a fixed frame rate, advancing one frame per call.
///
/// Used when replaying recorded frames, where wall-clock time is meaningless.
#[derive(Debug)]
pub struct FixedRateClock {
    frame_period: Duration,
    frame: std::cell::Cell<u32>,
}

impl FixedRateClock {
    pub fn new(fps: f64) -> Self {
        let frame_period = if fps > 0.0 && fps.is_finite() {
            Duration::from_secs_f64(1.0 / fps)
        } else {
            Duration::ZERO
        };
        Self {
            frame_period,
            frame: std::cell::Cell::new(0),
        }
    }
}

impl Clock for FixedRateClock {
    fn now(&self) -> Duration {
        let i = self.frame.get();
        self.frame.set(i.saturating_add(1));
        self.frame_period * i
    }
}
