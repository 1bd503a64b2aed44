//! Hand gesture recognition from colour frames.
//!
//! The pipeline is colour based: pixels are thresholded in HSV against a
//! skin range, the mask is cleaned with morphology, and each external
//! contour is a hand candidate. The outline's convexity defects (the gaps
//! between fingers) decide the static shape; the motion of the hand centre
//! across frames decides swipes.
//!
//! ```no_run
//! use artrack_core::RgbImage;
//! use artrack_gesture::GestureDetector;
//! use std::time::Duration;
//!
//! let frame = RgbImage::filled(640, 480, [0, 0, 0]);
//! let mut detector = GestureDetector::default();
//! for event in detector.detect(&frame.view(), Duration::from_millis(33)) {
//!     println!("{} at {:?}", event.kind, event.position);
//! }
//! ```

mod color;
mod contour;
mod detector;
mod hull;
mod morphology;
mod motion;
mod shape;
mod trigger;
mod types;

pub use color::{rgb_to_hsv, skin_mask, SkinRange};
pub use contour::{bounding_rect, contour_area, find_external_contours};
pub use detector::{GestureConfig, GestureDetector};
pub use hull::{convex_hull_indices, convexity_defects, ConvexityDefect};
pub use morphology::{close, dilate, erode, open, Kernel};
pub use motion::{HandHistory, MotionGestureTracker, MotionParams};
pub use shape::{segment_skin, ClassifierParams, HandRegion, HandShapeClassifier, ShapePolicy};
pub use trigger::{FistTrigger, TriggerParams};
pub use types::{GestureEvent, GestureKind};
