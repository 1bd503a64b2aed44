//! Sub-pixel corner refinement.
//!
//! For the true corner `q`, every image gradient `g(p)` inside a small window
//! is orthogonal to `p - q`. Summing `g gᵀ (p - q) = 0` over a
//! Gaussian-weighted window gives a 2×2 system that is iterated until the
//! shift is below `epsilon`.

use crate::SubPixParams;
use artrack_core::{sample_bilinear, GrayImageView};
use nalgebra::{Matrix2, Point2, Vector2};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Refine every corner in place.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(img, corners), fields(n = corners.len()))
)]
pub fn refine_corners(img: &GrayImageView<'_>, corners: &mut [Point2<f64>], params: &SubPixParams) {
    let weights = window_weights(params.half_window);
    for c in corners.iter_mut() {
        *c = refine_one(img, *c, params, &weights);
    }
}

fn window_weights(half: usize) -> Vec<f64> {
    let n = 2 * half + 1;
    let h = half.max(1) as f64;
    let coeff = 1.0 / (h * h);
    let axis: Vec<f64> = (0..n)
        .map(|i| {
            let d = i as f64 - half as f64;
            (-d * d * coeff).exp()
        })
        .collect();
    let mut w = Vec::with_capacity(n * n);
    for wy in &axis {
        for wx in &axis {
            w.push(wx * wy);
        }
    }
    w
}

fn refine_one(
    img: &GrayImageView<'_>,
    start: Point2<f64>,
    params: &SubPixParams,
    weights: &[f64],
) -> Point2<f64> {
    let half = params.half_window as i64;
    let n = (2 * half + 1) as usize;
    let eps2 = params.epsilon * params.epsilon;
    let mut c = start;

    for _ in 0..params.max_iterations {
        let mut a = 0.0;
        let mut b = 0.0;
        let mut cc = 0.0;
        let mut bb1 = 0.0;
        let mut bb2 = 0.0;

        for j in -half..=half {
            for i in -half..=half {
                let x = c.x + i as f64;
                let y = c.y + j as f64;
                let gx = sample_bilinear(img, x + 1.0, y) - sample_bilinear(img, x - 1.0, y);
                let gy = sample_bilinear(img, x, y + 1.0) - sample_bilinear(img, x, y - 1.0);
                let m = weights[(j + half) as usize * n + (i + half) as usize];

                let gxx = gx * gx * m;
                let gxy = gx * gy * m;
                let gyy = gy * gy * m;
                let (px, py) = (i as f64, j as f64);

                a += gxx;
                b += gxy;
                cc += gyy;
                bb1 += gxx * px + gxy * py;
                bb2 += gxy * px + gyy * py;
            }
        }

        let Some(inv) = Matrix2::new(a, b, b, cc).try_inverse() else {
            break;
        };
        let shift = inv * Vector2::new(bb1, bb2);
        let next = c + shift;
        if next.x < 0.0
            || next.y < 0.0
            || next.x >= img.width as f64
            || next.y >= img.height as f64
        {
            break;
        }
        c = next;
        if shift.norm_squared() <= eps2 {
            break;
        }
    }

    // A corner that drifts out of its window is rejected.
    let w = params.half_window as f64;
    if (c.x - start.x).abs() > w || (c.y - start.y).abs() > w {
        start
    } else {
        c
    }
}
