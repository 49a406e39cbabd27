//! Levenberg–Marquardt least squares with an analytic Jacobian.
//!
//! Covariance follows the curve-fit convention: `(JᵀJ)⁻¹ · SSR / (n − p)`,
//! evaluated at the accepted parameters. With no degrees of freedom left the
//! covariance is reported as infinite rather than estimated.

use super::DenseMatrix;
use faer::linalg::solvers::{DenseSolveCore, Solve};

/// Square root of machine epsilon, the default step and reduction tolerance.
pub const DEFAULT_TOLERANCE: f64 = 1.490_116_119_384_765_6e-8;
pub const DEFAULT_MAX_ITERATIONS: usize = 200;

const INITIAL_LAMBDA: f64 = 1.0e-3;
const MIN_LAMBDA: f64 = 1.0e-12;
const MAX_LAMBDA: f64 = 1.0e16;
const LAMBDA_FACTOR: f64 = 10.0;
const DIAGONAL_FLOOR_RATIO: f64 = 1.0e-12;
/// Smallest usable LU pivot relative to the matrix infinity norm.
const SINGULAR_PIVOT_RATIO: f64 = 1.0e-14;

pub trait LeastSquaresModel {
    fn parameter_count(&self) -> usize;

    fn evaluate(&self, x: f64, parameters: &[f64]) -> f64;

    /// Writes ∂f/∂pᵢ at `x` into `gradient`.
    fn gradient(&self, x: f64, parameters: &[f64], gradient: &mut [f64]);
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LevenbergError {
    #[error("x has {x_len} points but y has {y_len}")]
    DimensionMismatch { x_len: usize, y_len: usize },
    #[error("expected {expected} initial parameters, got {actual}")]
    ParameterCountMismatch { expected: usize, actual: usize },
    #[error("{points} points cannot constrain {parameters} parameters")]
    Underdetermined { points: usize, parameters: usize },
    #[error("residuals became non-finite at iteration {iteration}")]
    NonFiniteResidual { iteration: usize },
    #[error("no convergence after {iterations} iterations")]
    MaxIterations { iterations: usize },
    #[error("damping grew past {lambda:e} without reducing the residual")]
    DampingExhausted { lambda: f64 },
    #[error("covariance could not be estimated: normal matrix is singular or ill-conditioned")]
    SingularCovariance,
    #[error("covariance diagonal is negative or non-finite at parameter {index}")]
    InvalidCovariance { index: usize },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevenbergMarquardt {
    pub max_iterations: usize,
    pub reduction_tolerance: f64,
    pub step_tolerance: f64,
}

impl Default for LevenbergMarquardt {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            reduction_tolerance: DEFAULT_TOLERANCE,
            step_tolerance: DEFAULT_TOLERANCE,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LevenbergSolution {
    pub parameters: Vec<f64>,
    pub covariance: DenseMatrix,
    pub standard_errors: Vec<f64>,
    pub residual_sum_of_squares: f64,
    pub degrees_of_freedom: usize,
    pub iterations: usize,
}

impl LevenbergMarquardt {
    pub fn minimize<M: LeastSquaresModel>(
        &self,
        model: &M,
        x: &[f64],
        y: &[f64],
        initial: &[f64],
    ) -> Result<LevenbergSolution, LevenbergError> {
        let parameter_count = model.parameter_count();
        if x.len() != y.len() {
            return Err(LevenbergError::DimensionMismatch {
                x_len: x.len(),
                y_len: y.len(),
            });
        }
        if initial.len() != parameter_count {
            return Err(LevenbergError::ParameterCountMismatch {
                expected: parameter_count,
                actual: initial.len(),
            });
        }
        if x.len() < parameter_count {
            return Err(LevenbergError::Underdetermined {
                points: x.len(),
                parameters: parameter_count,
            });
        }

        let mut parameters = initial.to_vec();
        let mut cost = residual_sum_of_squares(model, x, y, &parameters);
        if !cost.is_finite() {
            return Err(LevenbergError::NonFiniteResidual { iteration: 0 });
        }

        let mut lambda = INITIAL_LAMBDA;
        for iteration in 1..=self.max_iterations {
            let (normal, gradient) = normal_equations(model, x, y, &parameters);
            let floor = diagonal_floor(&normal);

            loop {
                let mut damped = normal.clone();
                for index in 0..parameter_count {
                    damped[(index, index)] += lambda * normal[(index, index)].max(floor);
                }

                let step = match solve_normal(&damped, &gradient) {
                    Some(step) => step,
                    None => {
                        lambda = raise_lambda(lambda)?;
                        continue;
                    }
                };

                let candidate: Vec<f64> = parameters
                    .iter()
                    .zip(&step)
                    .map(|(value, delta)| value + delta)
                    .collect();
                let candidate_cost = residual_sum_of_squares(model, x, y, &candidate);
                let step_is_small = self.step_is_small(&parameters, &step);

                if candidate_cost.is_finite() && candidate_cost < cost {
                    let reduction = (cost - candidate_cost) / cost;
                    parameters = candidate;
                    cost = candidate_cost;
                    lambda = (lambda / LAMBDA_FACTOR).max(MIN_LAMBDA);

                    if reduction <= self.reduction_tolerance || step_is_small || cost == 0.0 {
                        return finish(model, x, y, parameters, cost, iteration);
                    }
                    break;
                }

                if step_is_small {
                    return finish(model, x, y, parameters, cost, iteration);
                }
                lambda = raise_lambda(lambda)?;
            }
        }

        Err(LevenbergError::MaxIterations {
            iterations: self.max_iterations,
        })
    }

    fn step_is_small(&self, parameters: &[f64], step: &[f64]) -> bool {
        parameters.iter().zip(step).all(|(value, delta)| {
            delta.abs() <= self.step_tolerance * (value.abs() + self.step_tolerance)
        })
    }
}

fn raise_lambda(lambda: f64) -> Result<f64, LevenbergError> {
    let raised = lambda * LAMBDA_FACTOR;
    if raised > MAX_LAMBDA {
        return Err(LevenbergError::DampingExhausted { lambda: raised });
    }
    Ok(raised)
}

fn finish<M: LeastSquaresModel>(
    model: &M,
    x: &[f64],
    y: &[f64],
    parameters: Vec<f64>,
    cost: f64,
    iterations: usize,
) -> Result<LevenbergSolution, LevenbergError> {
    let parameter_count = parameters.len();
    let (normal, _) = normal_equations(model, x, y, &parameters);
    let mut covariance = invert_normal(&normal).ok_or(LevenbergError::SingularCovariance)?;
    let degrees_of_freedom = x.len() - parameter_count;

    let scale = if degrees_of_freedom > 0 {
        cost / degrees_of_freedom as f64
    } else {
        f64::INFINITY
    };

    let mut standard_errors = Vec::with_capacity(parameter_count);
    for row in 0..parameter_count {
        let variance = covariance[(row, row)];
        if !variance.is_finite() || variance < 0.0 {
            return Err(LevenbergError::InvalidCovariance { index: row });
        }
        for col in 0..parameter_count {
            covariance[(row, col)] *= scale;
        }
        standard_errors.push((variance * scale).sqrt());
    }

    Ok(LevenbergSolution {
        parameters,
        covariance,
        standard_errors,
        residual_sum_of_squares: cost,
        degrees_of_freedom,
        iterations,
    })
}

fn residual_sum_of_squares<M: LeastSquaresModel>(
    model: &M,
    x: &[f64],
    y: &[f64],
    parameters: &[f64],
) -> f64 {
    x.iter()
        .zip(y)
        .map(|(xi, yi)| {
            let residual = yi - model.evaluate(*xi, parameters);
            residual * residual
        })
        .sum()
}

/// Builds `JᵀJ` and `Jᵀr` for the current parameters.
fn normal_equations<M: LeastSquaresModel>(
    model: &M,
    x: &[f64],
    y: &[f64],
    parameters: &[f64],
) -> (DenseMatrix, Vec<f64>) {
    let parameter_count = parameters.len();
    let mut normal = DenseMatrix::zeros(parameter_count, parameter_count);
    let mut gradient = vec![0.0; parameter_count];
    let mut row = vec![0.0; parameter_count];

    for (xi, yi) in x.iter().zip(y) {
        model.gradient(*xi, parameters, &mut row);
        let residual = yi - model.evaluate(*xi, parameters);
        for i in 0..parameter_count {
            gradient[i] += row[i] * residual;
            for j in 0..parameter_count {
                normal[(i, j)] += row[i] * row[j];
            }
        }
    }

    (normal, gradient)
}

fn has_usable_pivots(matrix: &DenseMatrix, upper: faer::MatRef<'_, f64>) -> bool {
    let norm = (0..matrix.nrows())
        .map(|row| {
            (0..matrix.ncols())
                .map(|col| matrix[(row, col)].abs())
                .sum::<f64>()
        })
        .fold(0.0_f64, f64::max);
    if !norm.is_finite() || norm == 0.0 {
        return false;
    }
    (0..upper.nrows()).all(|index| upper[(index, index)].abs() > SINGULAR_PIVOT_RATIO * norm)
}

/// Solves `matrix · step = rhs`; `None` when the matrix is numerically singular.
fn solve_normal(matrix: &DenseMatrix, rhs: &[f64]) -> Option<Vec<f64>> {
    let lu = matrix.partial_piv_lu();
    if !has_usable_pivots(matrix, lu.U()) {
        return None;
    }
    let rhs = DenseMatrix::from_fn(rhs.len(), 1, |row, _| rhs[row]);
    let solution = lu.solve(rhs.as_ref());
    let step: Vec<f64> = (0..solution.nrows())
        .map(|row| solution[(row, 0)])
        .collect();
    step.iter().all(|value| value.is_finite()).then_some(step)
}

fn invert_normal(matrix: &DenseMatrix) -> Option<DenseMatrix> {
    let lu = matrix.partial_piv_lu();
    if !has_usable_pivots(matrix, lu.U()) {
        return None;
    }
    let inverse = lu.inverse();
    (0..inverse.nrows())
        .all(|row| (0..inverse.ncols()).all(|col| inverse[(row, col)].is_finite()))
        .then_some(inverse)
}

fn diagonal_floor(normal: &DenseMatrix) -> f64 {
    let largest = (0..normal.nrows())
        .map(|index| normal[(index, index)].abs())
        .fold(0.0_f64, f64::max);
    if largest > 0.0 {
        largest * DIAGONAL_FLOOR_RATIO
    } else {
        DIAGONAL_FLOOR_RATIO
    }
}
