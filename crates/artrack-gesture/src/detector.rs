use crate::{ClassifierParams, GestureEvent, HandShapeClassifier, MotionGestureTracker, MotionParams};
use artrack_core::RgbImageView;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    pub classifier: ClassifierParams,
    pub motion: MotionParams,
}

/// Shape and swipe recognition over a stream of frames.
#[derive(Clone, Debug, Default)]
pub struct GestureDetector {
    classifier: HandShapeClassifier,
    tracker: MotionGestureTracker,
}

impl GestureDetector {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            classifier: HandShapeClassifier::new(config.classifier),
            tracker: MotionGestureTracker::new(config.motion),
        }
    }

    pub fn classifier(&self) -> &HandShapeClassifier {
        &self.classifier
    }

    pub fn tracker(&self) -> &MotionGestureTracker {
        &self.tracker
    }

    pub fn reset(&mut self) {
        self.tracker.clear();
    }

    /// Gesture events for one frame: a shape event per plausible hand,
    /// followed by any swipe completed by the hand centres.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip_all, fields(t = ?now)))]
    pub fn detect(&mut self, frame: &RgbImageView<'_>, now: Duration) -> Vec<GestureEvent> {
        let mut events = Vec::new();
        for region in self.classifier.find_hand_regions(frame) {
            events.extend(self.classifier.classify_region(&region, now));
            events.extend(self.tracker.update(region.center(), now));
        }
        events
    }
}
