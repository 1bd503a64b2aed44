//! Colour conversion and skin segmentation.

use artrack_core::{GrayImage, RgbImageView};
use serde::{Deserialize, Serialize};

/// RGB to 8-bit HSV: `H` in `[0, 180)` (degrees / 2), `S` and `V` in `[0, 255]`.
pub fn rgb_to_hsv(rgb: [u8; 3]) -> [u8; 3] {
    let [r, g, b] = rgb.map(|c| c as f32);
    let v = r.max(g).max(b);
    let min = r.min(g).min(b);
    let diff = v - min;

    let s = if v > 0.0 { diff * 255.0 / v } else { 0.0 };
    let h = if diff == 0.0 {
        0.0
    } else if v == r {
        60.0 * (g - b) / diff
    } else if v == g {
        120.0 + 60.0 * (b - r) / diff
    } else {
        240.0 + 60.0 * (r - g) / diff
    };
    let h = if h < 0.0 { h + 360.0 } else { h };
    let h8 = (h / 2.0).round() as u32 % 180;

    [h8 as u8, s.round() as u8, v as u8]
}

/// Inclusive HSV box, 8-bit convention of [`rgb_to_hsv`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkinRange {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

impl Default for SkinRange {
    fn default() -> Self {
        Self {
            lower: [0, 20, 70],
            upper: [20, 255, 255],
        }
    }
}

impl SkinRange {
    pub fn contains(&self, hsv: [u8; 3]) -> bool {
        (0..3).all(|i| hsv[i] >= self.lower[i] && hsv[i] <= self.upper[i])
    }
}

/// Binary mask (0 / 255) of pixels inside `range`.
pub fn skin_mask(frame: &RgbImageView<'_>, range: &SkinRange) -> GrayImage {
    let data = frame
        .data
        .chunks_exact(3)
        .map(|px| {
            if range.contains(rgb_to_hsv([px[0], px[1], px[2]])) {
                255
            } else {
                0
            }
        })
        .collect();
    GrayImage {
        width: frame.width,
        height: frame.height,
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_hues() {
        assert_eq!(rgb_to_hsv([255, 0, 0]), [0, 255, 255]);
        assert_eq!(rgb_to_hsv([0, 255, 0]), [60, 255, 255]);
        assert_eq!(rgb_to_hsv([0, 0, 255]), [120, 255, 255]);
        assert_eq!(rgb_to_hsv([0, 0, 0]), [0, 0, 0]);
        assert_eq!(rgb_to_hsv([128, 128, 128]), [0, 0, 128]);
    }

    #[test]
    fn skin_tone_is_in_default_range() {
        let hsv = rgb_to_hsv([220, 170, 140]);
        assert!(SkinRange::default().contains(hsv), "{hsv:?}");
        assert!(!SkinRange::default().contains(rgb_to_hsv([30, 60, 200])));
    }
}
