//! Static hand shape classification from a single frame.

use crate::{
    bounding_rect, close, contour_area, convex_hull_indices, convexity_defects,
    find_external_contours, open, skin_mask, GestureEvent, GestureKind, Kernel, SkinRange,
};
use artrack_core::{GrayImage, Rect, RgbImageView};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Maps the number of significant convexity defects to a shape.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapePolicy {
    /// Minimum defect depth (pixels) for a defect to count.
    pub defect_depth: f64,
    pub open_min_defects: usize,
    pub closed_max_defects: usize,
    pub pointing_defects: usize,
}

impl Default for ShapePolicy {
    fn default() -> Self {
        Self {
            defect_depth: 20.0,
            open_min_defects: 4,
            closed_max_defects: 1,
            pointing_defects: 2,
        }
    }
}

impl ShapePolicy {
    pub fn classify(&self, significant_defects: usize) -> GestureKind {
        if significant_defects >= self.open_min_defects {
            GestureKind::Open
        } else if significant_defects <= self.closed_max_defects {
            GestureKind::Closed
        } else if significant_defects == self.pointing_defects {
            GestureKind::Pointing
        } else {
            GestureKind::None
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierParams {
    pub skin: SkinRange,
    /// Side of the elliptical kernel used to clean the skin mask.
    pub kernel_size: usize,
    /// Contour area bounds (exclusive), in square pixels.
    pub min_area: f64,
    pub max_area: f64,
    /// Bounding box width / height bounds (exclusive).
    pub min_aspect: f64,
    pub max_aspect: f64,
    /// Reported for every shape event.
    pub confidence: f32,
    pub policy: ShapePolicy,
}

impl Default for ClassifierParams {
    fn default() -> Self {
        Self {
            skin: SkinRange::default(),
            kernel_size: 5,
            min_area: 1000.0,
            max_area: 50000.0,
            min_aspect: 0.5,
            max_aspect: 2.0,
            confidence: 0.8,
            policy: ShapePolicy::default(),
        }
    }
}

/// A candidate hand: one external skin contour.
#[derive(Clone, Debug, PartialEq)]
pub struct HandRegion {
    pub contour: Vec<Point2<i32>>,
    pub bbox: Rect,
    pub area: f64,
}

impl HandRegion {
    pub fn from_contour(contour: Vec<Point2<i32>>) -> Self {
        let bbox = bounding_rect(&contour);
        let area = contour_area(&contour);
        Self {
            contour,
            bbox,
            area,
        }
    }

    /// Centre of the bounding box, in pixels.
    pub fn center(&self) -> Point2<f64> {
        let (x, y) = self.bbox.center();
        Point2::new(x, y)
    }

    /// Number of convexity defects deeper than `min_depth`, or `None` when
    /// the hull is too small to have defects.
    pub fn significant_defects(&self, min_depth: f64) -> Option<usize> {
        let hull = convex_hull_indices(&self.contour);
        if hull.len() < 4 {
            return None;
        }
        Some(
            convexity_defects(&self.contour, &hull)
                .iter()
                .filter(|d| d.depth > min_depth)
                .count(),
        )
    }
}

/// Skin mask cleaned by an opening followed by a closing.
pub fn segment_skin(frame: &RgbImageView<'_>, skin: &SkinRange, kernel_size: usize) -> GrayImage {
    let kernel = Kernel::ellipse(kernel_size);
    let mask = skin_mask(frame, skin);
    close(&open(&mask, &kernel), &kernel)
}

/// Classifies the hand as open, closed or pointing from its outline.
#[derive(Clone, Copy, Debug, Default)]
pub struct HandShapeClassifier {
    pub params: ClassifierParams,
}

impl HandShapeClassifier {
    pub fn new(params: ClassifierParams) -> Self {
        Self { params }
    }

    fn plausible(&self, region: &HandRegion) -> bool {
        let p = &self.params;
        let aspect_ok = region
            .bbox
            .aspect_ratio()
            .is_some_and(|a| a > p.min_aspect && a < p.max_aspect);
        region.area > p.min_area && region.area < p.max_area && aspect_ok
    }

    /// Skin regions passing the area and aspect filters, largest first.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip_all))]
    pub fn find_hand_regions(&self, frame: &RgbImageView<'_>) -> Vec<HandRegion> {
        let mask = segment_skin(frame, &self.params.skin, self.params.kernel_size);
        let mut regions: Vec<HandRegion> = find_external_contours(&mask)
            .into_iter()
            .map(HandRegion::from_contour)
            .filter(|r| self.plausible(r))
            .collect();
        regions.sort_by(|a, b| b.area.total_cmp(&a.area));
        log::trace!("{} hand candidates", regions.len());
        regions
    }

    /// Shape event for one region; `None` when the outline is inconclusive.
    pub fn classify_region(&self, region: &HandRegion, now: Duration) -> Option<GestureEvent> {
        let count = region.significant_defects(self.params.policy.defect_depth)?;
        let kind = self.params.policy.classify(count);
        if kind == GestureKind::None {
            log::trace!("{count} defects: no shape");
            return None;
        }
        Some(GestureEvent {
            kind,
            position: region.center(),
            timestamp: now,
            confidence: self.params.confidence,
        })
    }

    /// Shape of the largest plausible hand in `frame`.
    pub fn classify(&self, frame: &RgbImageView<'_>, now: Duration) -> Option<GestureEvent> {
        let regions = self.find_hand_regions(frame);
        let event = self.classify_region(regions.first()?, now);
        if let Some(e) = &event {
            log::debug!("hand shape {} at ({:.0}, {:.0})", e.kind, e.position.x, e.position.y);
        }
        event
    }
}
