//! Fist detection used to start the model animation.

use crate::{find_external_contours, segment_skin, HandRegion, SkinRange};
use artrack_core::RgbImageView;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerParams {
    pub skin: SkinRange,
    pub kernel_size: usize,
    /// The largest skin contour must exceed this area (square pixels).
    pub min_area: f64,
    pub defect_depth: f64,
    /// Fires when at most this many significant defects are found.
    pub max_defects: usize,
}

impl Default for TriggerParams {
    fn default() -> Self {
        Self {
            skin: SkinRange {
                lower: [0, 48, 80],
                upper: [20, 255, 255],
            },
            kernel_size: 7,
            min_area: 8000.0,
            defect_depth: 20.0,
            max_defects: 1,
        }
    }
}

/// Answers "is a closed fist in view" for the largest skin blob, with no
/// shape filtering beyond its area.
#[derive(Clone, Copy, Debug, Default)]
pub struct FistTrigger {
    pub params: TriggerParams,
}

impl FistTrigger {
    pub fn new(params: TriggerParams) -> Self {
        Self { params }
    }

    pub fn detect(&self, frame: &RgbImageView<'_>) -> bool {
        let p = &self.params;
        let mask = segment_skin(frame, &p.skin, p.kernel_size);
        let Some(largest) = find_external_contours(&mask)
            .into_iter()
            .map(HandRegion::from_contour)
            .max_by(|a, b| a.area.total_cmp(&b.area))
        else {
            return false;
        };
        if largest.area <= p.min_area {
            return false;
        }
        match largest.significant_defects(p.defect_depth) {
            Some(n) if n <= p.max_defects => {
                log::debug!("fist detected (area {:.0}, {n} defects)", largest.area);
                true
            }
            _ => false,
        }
    }
}
