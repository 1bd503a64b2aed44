//! Convex hull and convexity defects of a contour.

use nalgebra::Point2;

/// A concavity between two consecutive hull vertices.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConvexityDefect {
    /// Contour indices of the hull vertices bounding the defect.
    pub start: usize,
    pub end: usize,
    /// Contour index of the point farthest from the hull edge.
    pub farthest: usize,
    /// Distance of `farthest` from the hull edge, in pixels.
    pub depth: f64,
}

fn cross(o: Point2<i32>, a: Point2<i32>, b: Point2<i32>) -> i64 {
    (a.x - o.x) as i64 * (b.y - o.y) as i64 - (a.y - o.y) as i64 * (b.x - o.x) as i64
}

/// Half of Andrew's monotone chain over pre-sorted indices.
fn chain<'a>(contour: &[Point2<i32>], order: impl Iterator<Item = &'a usize>) -> Vec<usize> {
    let mut out: Vec<usize> = Vec::new();
    for &i in order {
        while out.len() >= 2
            && cross(contour[out[out.len() - 2]], contour[out[out.len() - 1]], contour[i]) <= 0
        {
            out.pop();
        }
        out.push(i);
    }
    // The last point of each chain starts the other one.
    out.pop();
    out
}

/// Contour indices of the convex hull vertices (collinear points dropped),
/// sorted ascending so they follow the contour.
pub fn convex_hull_indices(contour: &[Point2<i32>]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..contour.len()).collect();
    order.sort_by_key(|&i| (contour[i].x, contour[i].y, i));
    order.dedup_by_key(|i| contour[*i]);
    if order.len() < 3 {
        return order;
    }

    let mut hull = chain(contour, order.iter());
    hull.extend(chain(contour, order.iter().rev()));
    hull.sort_unstable();
    hull.dedup();
    hull
}

/// One defect per hull edge that skips contour points: the contour point
/// farthest from the edge's supporting line.
///
/// Needs at least four hull vertices; fewer yields no defects.
pub fn convexity_defects(contour: &[Point2<i32>], hull: &[usize]) -> Vec<ConvexityDefect> {
    let n = contour.len();
    if hull.len() < 4 {
        return Vec::new();
    }

    let mut defects = Vec::new();
    for (k, &start) in hull.iter().enumerate() {
        let end = hull[(k + 1) % hull.len()];
        let span = (end + n - start) % n;
        if span < 2 {
            continue;
        }

        let a = contour[start];
        let b = contour[end];
        let (ex, ey) = ((b.x - a.x) as f64, (b.y - a.y) as f64);
        let len = (ex * ex + ey * ey).sqrt();

        let mut best = (start, 0.0);
        for off in 1..span {
            let i = (start + off) % n;
            let p = contour[i];
            let (px, py) = ((p.x - a.x) as f64, (p.y - a.y) as f64);
            let d = if len > 0.0 {
                (ex * py - ey * px).abs() / len
            } else {
                (px * px + py * py).sqrt()
            };
            if d > best.1 {
                best = (i, d);
            }
        }
        if best.1 > 0.0 {
            defects.push(ConvexityDefect {
                start,
                end,
                farthest: best.0,
                depth: best.1,
            });
        }
    }
    defects
}
