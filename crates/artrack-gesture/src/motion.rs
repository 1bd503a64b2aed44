//! Swipe recognition from the recent trajectory of the hand centre.

use crate::{GestureEvent, GestureKind};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionParams {
    /// Samples kept; older ones are dropped.
    pub capacity: usize,
    pub min_samples: usize,
    /// Oldest-to-newest displacement must exceed this (pixels).
    pub min_distance: f64,
    /// ...within strictly less than this time.
    #[serde(with = "millis")]
    pub max_duration: Duration,
    /// Displacement giving full confidence.
    pub confidence_scale: f64,
}

impl Default for MotionParams {
    fn default() -> Self {
        Self {
            capacity: 10,
            min_samples: 3,
            min_distance: 50.0,
            max_duration: Duration::from_millis(1000),
            confidence_scale: 100.0,
        }
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Sample {
    position: Point2<f64>,
    timestamp: Duration,
}

/// Bounded FIFO of timestamped hand positions; the oldest sample is dropped
/// when full.
#[derive(Clone, Debug)]
pub struct HandHistory {
    capacity: usize,
    samples: VecDeque<Sample>,
}

impl HandHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, position: Point2<f64>, timestamp: Duration) {
        if self.capacity == 0 {
            return;
        }
        while self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(Sample {
            position,
            timestamp,
        });
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Positions, oldest first.
    pub fn positions(&self) -> impl Iterator<Item = Point2<f64>> + '_ {
        self.samples.iter().map(|s| s.position)
    }

    fn span(&self) -> Option<(&Sample, &Sample)> {
        Some((self.samples.front()?, self.samples.back()?))
    }
}

/// Tracks hand positions and reports a swipe once the hand has moved far
/// enough, fast enough.
#[derive(Clone, Debug)]
pub struct MotionGestureTracker {
    params: MotionParams,
    history: HandHistory,
}

impl Default for MotionGestureTracker {
    fn default() -> Self {
        Self::new(MotionParams::default())
    }
}

impl MotionGestureTracker {
    pub fn new(params: MotionParams) -> Self {
        Self {
            params,
            history: HandHistory::new(params.capacity),
        }
    }

    pub fn params(&self) -> &MotionParams {
        &self.params
    }

    pub fn history(&self) -> &HandHistory {
        &self.history
    }

    /// Retained positions, oldest first.
    pub fn trajectory(&self) -> impl Iterator<Item = Point2<f64>> + '_ {
        self.history.positions()
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }

    /// Record a hand position; returns a swipe when the retained history
    /// forms one. The history is cleared after a swipe.
    pub fn update(&mut self, position: Point2<f64>, timestamp: Duration) -> Option<GestureEvent> {
        self.history.push(position, timestamp);
        let event = self.swipe()?;
        log::debug!(
            "{} over {} samples (confidence {:.2})",
            event.kind,
            self.history.len(),
            event.confidence
        );
        self.history.clear();
        Some(event)
    }

    fn swipe(&self) -> Option<GestureEvent> {
        if self.history.len() < self.params.min_samples.max(2) {
            return None;
        }
        let (first, last) = self.history.span()?;
        let delta = last.position - first.position;
        let distance = delta.norm();
        let elapsed = last.timestamp.saturating_sub(first.timestamp);
        if distance <= self.params.min_distance || elapsed >= self.params.max_duration {
            return None;
        }

        let kind = if delta.x.abs() > delta.y.abs() {
            if delta.x > 0.0 {
                GestureKind::SwipeRight
            } else {
                GestureKind::SwipeLeft
            }
        } else if delta.y > 0.0 {
            GestureKind::SwipeDown
        } else {
            GestureKind::SwipeUp
        };
        let confidence = if self.params.confidence_scale > 0.0 {
            (distance / self.params.confidence_scale).min(1.0)
        } else {
            1.0
        };
        Some(GestureEvent {
            kind,
            position: last.position,
            timestamp: last.timestamp,
            confidence: confidence as f32,
        })
    }
}
