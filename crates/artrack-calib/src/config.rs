use artrack_core::LeastSquaresParams;
use nalgebra::Point3;
use serde::{Deserialize, Serialize};

/// Checkerboard geometry: number of *inner* corners and square size.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoardSpec {
    pub inner_cols: usize,
    pub inner_rows: usize,
    pub square_size: f64,
}

impl Default for BoardSpec {
    fn default() -> Self {
        Self {
            inner_cols: 9,
            inner_rows: 6,
            square_size: 0.025,
        }
    }
}

impl BoardSpec {
    pub fn corner_count(&self) -> usize {
        self.inner_cols * self.inner_rows
    }

    /// Board-frame corner positions `(col * s, row * s, 0)`, row-major.
    pub fn object_points(&self) -> Vec<Point3<f64>> {
        (0..self.inner_rows)
            .flat_map(|r| {
                (0..self.inner_cols).map(move |c| {
                    Point3::new(c as f64 * self.square_size, r as f64 * self.square_size, 0.0)
                })
            })
            .collect()
    }
}

/// Gradient-orthogonality corner refinement window and stop criteria.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubPixParams {
    pub half_window: usize,
    pub max_iterations: usize,
    pub epsilon: f64,
}

impl Default for SubPixParams {
    fn default() -> Self {
        Self {
            half_window: 11,
            max_iterations: 30,
            epsilon: 0.1,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverParams {
    /// Refine `k1, k2, p1, p2` (and `k3` unless fixed); otherwise pinhole only.
    pub estimate_distortion: bool,
    pub fix_k3: bool,
    pub least_squares: LeastSquaresParams,
}

impl Default for SolverParams {
    fn default() -> Self {
        Self {
            estimate_distortion: true,
            fix_k3: false,
            least_squares: LeastSquaresParams::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    pub board: BoardSpec,
    pub required_views: usize,
    pub subpix: SubPixParams,
    pub solver: SolverParams,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            board: BoardSpec::default(),
            required_views: 20,
            subpix: SubPixParams::default(),
            solver: SolverParams::default(),
        }
    }
}
