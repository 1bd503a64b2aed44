//! Outer contours of binary masks.
//!
//! Foreground is 8-connected (background therefore 4-connected). Only the
//! outer border of each outermost component is traced; components that sit
//! inside a hole of another component are skipped.

use artrack_core::{GrayImage, Rect};
use nalgebra::Point2;
use std::collections::VecDeque;

/// Neighbour offsets; increasing index turns counter-clockwise on screen
/// (x right, y down), starting east.
const DIRS: [(i32, i32); 8] = [
    (1, 0),
    (1, -1),
    (0, -1),
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

struct Grid<'a> {
    mask: &'a GrayImage,
}

impl Grid<'_> {
    #[inline]
    fn is_fg(&self, x: i32, y: i32) -> bool {
        x >= 0
            && y >= 0
            && (x as usize) < self.mask.width
            && (y as usize) < self.mask.height
            && self.mask.data[y as usize * self.mask.width + x as usize] != 0
    }
}

fn direction(from: Point2<i32>, to: Point2<i32>) -> usize {
    let d = (to.x - from.x, to.y - from.y);
    DIRS.iter().position(|&o| o == d).unwrap_or(0)
}

fn step(p: Point2<i32>, d: usize) -> Point2<i32> {
    Point2::new(p.x + DIRS[d].0, p.y + DIRS[d].1)
}

/// Follow the outer border starting at the component's top-most, left-most
/// pixel. Returns every border pixel visited, in order.
fn trace_outer(grid: &Grid<'_>, p0: Point2<i32>) -> Vec<Point2<i32>> {
    // Clockwise from west; north-side neighbours of p0 are background.
    let Some(p1) = (0..8)
        .map(|k| step(p0, (4 + 8 - k) % 8))
        .find(|p| grid.is_fg(p.x, p.y))
    else {
        return vec![p0];
    };

    let mut contour = Vec::new();
    let (mut p2, mut p3) = (p1, p0);
    loop {
        let d2 = direction(p3, p2);
        let p4 = (1..=8)
            .map(|k| step(p3, (d2 + k) % 8))
            .find(|p| grid.is_fg(p.x, p.y))
            .unwrap_or(p2);
        contour.push(p3);
        if p4 == p0 && p3 == p1 {
            break;
        }
        p2 = p3;
        p3 = p4;
    }
    contour
}

/// Keep only points where the chain direction changes.
fn compress_chain(points: Vec<Point2<i32>>) -> Vec<Point2<i32>> {
    let n = points.len();
    if n <= 2 {
        return points;
    }
    (0..n)
        .filter(|&i| {
            let prev = points[(i + n - 1) % n];
            let next = points[(i + 1) % n];
            points[i] - prev != next - points[i]
        })
        .map(|i| points[i])
        .collect()
}

/// Background 4-reachable from outside the image (with a one-pixel margin).
fn outside_background(grid: &Grid<'_>, w: i32, h: i32) -> Vec<bool> {
    let pw = (w + 2) as usize;
    let ph = (h + 2) as usize;
    let mut seen = vec![false; pw * ph];
    let mut queue = VecDeque::from([(0i32, 0i32)]);
    seen[0] = true;
    while let Some((x, y)) = queue.pop_front() {
        for (dx, dy) in [(1, 0), (-1, 0), (0, 1), (0, -1)] {
            let (nx, ny) = (x + dx, y + dy);
            if nx < 0 || ny < 0 || nx >= w + 2 || ny >= h + 2 {
                continue;
            }
            let idx = ny as usize * pw + nx as usize;
            if seen[idx] || grid.is_fg(nx - 1, ny - 1) {
                continue;
            }
            seen[idx] = true;
            queue.push_back((nx, ny));
        }
    }
    seen
}

/// Outer contours of all outermost components, compressed to their corner
/// points, ordered by the raster position of their first pixel.
pub fn find_external_contours(mask: &GrayImage) -> Vec<Vec<Point2<i32>>> {
    let grid = Grid { mask };
    let (w, h) = (mask.width as i32, mask.height as i32);
    let outside = outside_background(&grid, w, h);
    let pw = (w + 2) as usize;

    let mut labelled = vec![false; mask.width * mask.height];
    let mut contours = Vec::new();
    let mut queue = VecDeque::new();

    for y in 0..h {
        for x in 0..w {
            let idx = y as usize * mask.width + x as usize;
            if labelled[idx] || !grid.is_fg(x, y) {
                continue;
            }

            // Flood the component; note whether it touches outside background.
            let mut external = false;
            labelled[idx] = true;
            queue.push_back((x, y));
            while let Some((cx, cy)) = queue.pop_front() {
                for (dx, dy) in [(1, 0), (-1, 0), (0, 1), (0, -1)] {
                    let (px, py) = ((cx + dx + 1) as usize, (cy + dy + 1) as usize);
                    if outside[py * pw + px] {
                        external = true;
                    }
                }
                for &(dx, dy) in &DIRS {
                    let (nx, ny) = (cx + dx, cy + dy);
                    if grid.is_fg(nx, ny) {
                        let nidx = ny as usize * mask.width + nx as usize;
                        if !labelled[nidx] {
                            labelled[nidx] = true;
                            queue.push_back((nx, ny));
                        }
                    }
                }
            }

            if external {
                contours.push(compress_chain(trace_outer(&grid, Point2::new(x, y))));
            }
        }
    }
    contours
}

/// Unsigned polygon area (shoelace) of a closed contour.
pub fn contour_area(contour: &[Point2<i32>]) -> f64 {
    let n = contour.len();
    if n < 3 {
        return 0.0;
    }
    let twice: i64 = (0..n)
        .map(|i| {
            let a = contour[i];
            let b = contour[(i + 1) % n];
            a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64
        })
        .sum();
    twice.abs() as f64 / 2.0
}

/// Smallest pixel rectangle containing every contour point.
pub fn bounding_rect(contour: &[Point2<i32>]) -> Rect {
    let Some(first) = contour.first() else {
        return Rect {
            x: 0,
            y: 0,
            width: 0,
            height: 0,
        };
    };
    let (mut x0, mut y0, mut x1, mut y1) = (first.x, first.y, first.x, first.y);
    for p in contour {
        x0 = x0.min(p.x);
        y0 = y0.min(p.y);
        x1 = x1.max(p.x);
        y1 = y1.max(p.y);
    }
    Rect {
        x: x0,
        y: y0,
        width: x1 - x0 + 1,
        height: y1 - y0 + 1,
    }
}
