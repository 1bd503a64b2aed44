//! Nonlinear least squares for small reprojection problems.
//!
//! Calibration refinement (intrinsics + per-view poses) and single-marker
//! pose refinement both describe their residuals through [`ResidualModel`]
//! and are minimised by the `levenberg_marquardt` crate.

use levenberg_marquardt::{LeastSquaresProblem, LevenbergMarquardt};
use nalgebra::{storage::Owned, DMatrix, DVector, Dyn};
use serde::{Deserialize, Serialize};

/// A nonlinear least-squares problem `min ||r(p)||²`.
pub trait ResidualModel {
    fn residuals(&self, params: &DVector<f64>) -> DVector<f64>;

    /// Jacobian `dr/dp`; central differences unless overridden.
    fn jacobian(&self, params: &DVector<f64>) -> DMatrix<f64> {
        numeric_jacobian(|p| self.residuals(p), params)
    }
}

/// Central-difference Jacobian with step `1e-6 * max(|p_i|, 1)`.
pub fn numeric_jacobian<F>(f: F, params: &DVector<f64>) -> DMatrix<f64>
where
    F: Fn(&DVector<f64>) -> DVector<f64>,
{
    let r0 = f(params);
    let mut jac = DMatrix::<f64>::zeros(r0.len(), params.len());
    let mut p = params.clone();
    for j in 0..params.len() {
        let h = 1e-6 * params[j].abs().max(1.0);
        let orig = p[j];
        p[j] = orig + h;
        let rp = f(&p);
        p[j] = orig - h;
        let rm = f(&p);
        p[j] = orig;
        jac.set_column(j, &((rp - rm) / (2.0 * h)));
    }
    jac
}

/// Stopping criteria handed to the Levenberg–Marquardt driver.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeastSquaresParams {
    /// Relative reduction of the sum of squares.
    pub ftol: f64,
    /// Relative change of the parameters.
    pub xtol: f64,
    /// Orthogonality between residuals and Jacobian columns.
    pub gtol: f64,
    /// Residual evaluations allowed per parameter.
    pub patience: usize,
}

impl Default for LeastSquaresParams {
    fn default() -> Self {
        Self {
            ftol: 1e-12,
            xtol: 1e-12,
            gtol: 1e-12,
            patience: 100,
        }
    }
}

/// RMS is taken over scalar residuals.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LeastSquaresReport {
    /// Residual evaluations spent by the driver.
    pub iterations: usize,
    pub initial_rms: f64,
    pub final_rms: f64,
    pub converged: bool,
}

fn rms(r: &DVector<f64>) -> f64 {
    if r.is_empty() {
        0.0
    } else {
        r.norm() / (r.len() as f64).sqrt()
    }
}

struct LmProblem<'a, M: ?Sized> {
    model: &'a M,
    params: DVector<f64>,
}

impl<M: ResidualModel + ?Sized> LeastSquaresProblem<f64, Dyn, Dyn> for LmProblem<'_, M> {
    type ResidualStorage = Owned<f64, Dyn>;
    type JacobianStorage = Owned<f64, Dyn, Dyn>;
    type ParameterStorage = Owned<f64, Dyn>;

    fn set_params(&mut self, x: &DVector<f64>) {
        self.params.clone_from(x);
    }

    fn params(&self) -> DVector<f64> {
        self.params.clone()
    }

    fn residuals(&self) -> Option<DVector<f64>> {
        Some(self.model.residuals(&self.params))
    }

    fn jacobian(&self) -> Option<DMatrix<f64>> {
        Some(self.model.jacobian(&self.params))
    }
}

/// Minimise the model starting from `initial`; returns the refined
/// parameters and a short report.
pub fn solve_least_squares<M: ResidualModel + ?Sized>(
    model: &M,
    initial: DVector<f64>,
    params: &LeastSquaresParams,
) -> (DVector<f64>, LeastSquaresReport) {
    let n = initial.len();
    let initial_rms = rms(&model.residuals(&initial));

    let lm = LevenbergMarquardt::new()
        .with_ftol(params.ftol)
        .with_xtol(params.xtol)
        .with_gtol(params.gtol)
        .with_patience(params.patience.max(1));
    let (problem, report) = lm.minimize(LmProblem {
        model,
        params: initial,
    });
    let solution = problem.params;
    let final_rms = rms(&model.residuals(&solution));

    log::debug!(
        "least squares: {} params, {} evaluations, rms {:.6} -> {:.6} ({:?})",
        n,
        report.number_of_evaluations,
        initial_rms,
        final_rms,
        report.termination
    );

    let report = LeastSquaresReport {
        iterations: report.number_of_evaluations,
        initial_rms,
        final_rms,
        converged: report.termination.was_successful(),
    };
    (solution, report)
}
