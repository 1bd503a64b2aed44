use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Recognised gesture kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GestureKind {
    /// Spread fingers.
    Open,
    /// Fist.
    Closed,
    Pointing,
    SwipeLeft,
    SwipeRight,
    SwipeUp,
    SwipeDown,
    None,
}

impl GestureKind {
    /// Label for overlays and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Pointing => "pointing",
            Self::SwipeLeft => "swipe-left",
            Self::SwipeRight => "swipe-right",
            Self::SwipeUp => "swipe-up",
            Self::SwipeDown => "swipe-down",
            Self::None => "none",
        }
    }

    pub fn is_swipe(&self) -> bool {
        matches!(
            self,
            Self::SwipeLeft | Self::SwipeRight | Self::SwipeUp | Self::SwipeDown
        )
    }
}

impl std::fmt::Display for GestureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A gesture at an image position. `timestamp` is the session-relative time
/// of the frame it was recognised in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GestureEvent {
    pub kind: GestureKind,
    pub position: Point2<f64>,
    pub timestamp: Duration,
    /// In `[0, 1]`.
    pub confidence: f32,
}
