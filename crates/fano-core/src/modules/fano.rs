//! Single Fano lineshape fit over a trimmed window.
//!
//! The lineshape is `A · ((q + Ω)² + d) / (1 + Ω²)` with
//! `Ω = 2 (E − E₀) / Γ`. Parameters are ordered as
//! [`FANO_PARAMETER_NAMES`]: peak, gamma, q, amplitude, damping.

use crate::domain::{
    ErrorKind, FANO_PARAMETER_NAMES, FanoError, FanoResult, FitResult, TrimRange,
};
use crate::numerics::{LeastSquaresModel, LevenbergMarquardt};

pub const MIN_FIT_POINTS: usize = 5;

const DEFAULT_GAMMA_GUESS: f64 = 10.0;
const DEFAULT_Q_GUESS: f64 = 5.0;
const DEFAULT_AMPLITUDE_GUESS: f64 = 0.6;
const DEFAULT_DAMPING_GUESS: f64 = 1.0;
const FLAT_WINDOW_RELATIVE: f64 = 1.0e-12;

pub fn fano_value(x: f64, parameters: &[f64; 5]) -> f64 {
    FanoModel.evaluate(x, parameters)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FanoModel;

impl LeastSquaresModel for FanoModel {
    fn parameter_count(&self) -> usize {
        FANO_PARAMETER_NAMES.len()
    }

    fn evaluate(&self, x: f64, parameters: &[f64]) -> f64 {
        let [peak, gamma, q, amplitude, damping] = unpack(parameters);
        let omega = 2.0 * (x - peak) / gamma;
        amplitude * ((q + omega).powi(2) + damping) / (1.0 + omega * omega)
    }

    fn gradient(&self, x: f64, parameters: &[f64], gradient: &mut [f64]) {
        let [peak, gamma, q, amplitude, damping] = unpack(parameters);
        let omega = 2.0 * (x - peak) / gamma;
        let numerator = (q + omega).powi(2) + damping;
        let denominator = 1.0 + omega * omega;

        let d_omega =
            amplitude * (2.0 * (q + omega) * denominator - 2.0 * omega * numerator)
                / (denominator * denominator);

        gradient[0] = d_omega * (-2.0 / gamma);
        gradient[1] = d_omega * (-omega / gamma);
        gradient[2] = amplitude * 2.0 * (q + omega) / denominator;
        gradient[3] = numerator / denominator;
        gradient[4] = amplitude / denominator;
    }
}

fn unpack(parameters: &[f64]) -> [f64; 5] {
    [
        parameters[0],
        parameters[1],
        parameters[2],
        parameters[3],
        parameters[4],
    ]
}

/// Starting point for the optimizer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FanoGuess {
    pub peak: f64,
    pub gamma: f64,
    pub q: f64,
    pub amplitude: f64,
    pub damping: f64,
}

impl FanoGuess {
    /// Peak at the brightest trimmed sample; shape parameters fixed.
    pub fn from_window(wavelength: &[f64], intensity: &[f64]) -> Self {
        let peak = intensity
            .iter()
            .enumerate()
            .fold(None, |best: Option<(usize, f64)>, (index, value)| match best {
                Some((_, best_value)) if best_value >= *value => best,
                _ => Some((index, *value)),
            })
            .and_then(|(index, _)| wavelength.get(index).copied())
            .unwrap_or_default();

        Self {
            peak,
            gamma: DEFAULT_GAMMA_GUESS,
            q: DEFAULT_Q_GUESS,
            amplitude: DEFAULT_AMPLITUDE_GUESS,
            damping: DEFAULT_DAMPING_GUESS,
        }
    }

    pub fn to_array(self) -> [f64; 5] {
        [self.peak, self.gamma, self.q, self.amplitude, self.damping]
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FanoFitter {
    pub solver: LevenbergMarquardt,
}

impl FanoFitter {
    pub fn new(solver: LevenbergMarquardt) -> Self {
        Self { solver }
    }

    /// Fits the inclusive `range` of the spectrum.
    ///
    /// Bad ranges and non-finite input are errors. Anything the optimizer
    /// cannot finish yields [`FitResult::failed`].
    pub fn fit(
        &self,
        wavelength: &[f64],
        intensity: &[f64],
        range: TrimRange,
        guess: Option<FanoGuess>,
    ) -> FanoResult<FitResult> {
        let (x, y) = trim_window(wavelength, intensity, range)?;
        let guess = guess.unwrap_or_else(|| FanoGuess::from_window(x, y));

        if is_featureless(y) {
            tracing::warn!(range = %range, "fit window is flat; reporting a failed fit");
            return Ok(FitResult::failed(range));
        }

        let solution = match self.solver.minimize(&FanoModel, x, y, &guess.to_array()) {
            Ok(solution) => solution,
            Err(error) => {
                tracing::warn!(range = %range, "fano fit did not converge: {error}");
                return Ok(FitResult::failed(range));
            }
        };

        if solution.parameters.iter().any(|value| !value.is_finite()) {
            tracing::warn!(range = %range, "fano fit produced non-finite parameters");
            return Ok(FitResult::failed(range));
        }

        let errors = FANO_PARAMETER_NAMES
            .iter()
            .zip(&solution.standard_errors)
            .map(|(name, error)| (name.to_string(), *error))
            .collect();

        tracing::debug!(
            range = %range,
            iterations = solution.iterations,
            residual = solution.residual_sum_of_squares,
            "fano fit converged"
        );

        Ok(FitResult {
            peak_wavelength: solution.parameters[0],
            gamma: solution.parameters[1],
            q: solution.parameters[2],
            amplitude: solution.parameters[3],
            damping_factor: solution.parameters[4],
            peak_error: solution.standard_errors[0],
            errors,
            converged: true,
            trim_range: range,
        })
    }
}

pub fn fit_fano(
    wavelength: &[f64],
    intensity: &[f64],
    range: TrimRange,
    guess: Option<FanoGuess>,
) -> FanoResult<FitResult> {
    FanoFitter::default().fit(wavelength, intensity, range, guess)
}

/// Inclusive slices for `range`, validated in order: bounds, width, finiteness.
pub fn trim_window<'a>(
    wavelength: &'a [f64],
    intensity: &'a [f64],
    range: TrimRange,
) -> FanoResult<(&'a [f64], &'a [f64])> {
    if wavelength.len() != intensity.len() {
        return Err(FanoError::new(
            ErrorKind::SpectrumLengthMismatch,
            format!(
                "wavelength has {} points but intensity has {}",
                wavelength.len(),
                intensity.len()
            ),
        ));
    }
    if range.start > range.end || range.end >= wavelength.len() {
        return Err(FanoError::new(
            ErrorKind::InvalidTrimRange,
            format!(
                "trim range {} is outside a spectrum of {} points",
                range,
                wavelength.len()
            ),
        ));
    }
    if range.width() < MIN_FIT_POINTS {
        return Err(FanoError::new(
            ErrorKind::InsufficientData,
            format!(
                "trim range {} holds {} points; at least {} are needed",
                range,
                range.width(),
                MIN_FIT_POINTS
            ),
        ));
    }

    let x = &wavelength[range.start..=range.end];
    let y = &intensity[range.start..=range.end];
    if let Some(offset) = x
        .iter()
        .zip(y)
        .position(|(xi, yi)| !xi.is_finite() || !yi.is_finite())
    {
        return Err(FanoError::new(
            ErrorKind::NonFiniteData,
            format!("non-finite sample at index {}", range.start + offset),
        ));
    }

    Ok((x, y))
}

fn is_featureless(y: &[f64]) -> bool {
    let (low, high) = y
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(low, high), value| {
            (low.min(*value), high.max(*value))
        });
    high - low <= FLAT_WINDOW_RELATIVE * high.abs().max(low.abs()).max(1.0)
}

#[cfg(test)]
mod tests {
    use super::{FanoFitter, FanoGuess, FanoModel, fano_value, fit_fano};
    use crate::domain::{ErrorKind, TrimRange};
    use crate::numerics::{LeastSquaresModel, LevenbergMarquardt};

    const TRUTH: [f64; 5] = [550.0, 8.0, 2.0, 0.4, 0.5];

    fn synthetic() -> (Vec<f64>, Vec<f64>) {
        let wavelength: Vec<f64> = (0..121).map(|index| 520.0 + index as f64 * 0.5).collect();
        let intensity = wavelength
            .iter()
            .map(|x| fano_value(*x, &TRUTH))
            .collect();
        (wavelength, intensity)
    }

    #[test]
    fn analytic_gradient_matches_finite_differences() {
        let parameters = [551.0, 7.5, 1.7, 0.45, 0.3];
        let mut analytic = [0.0; 5];
        for x in [540.0, 549.3, 551.0, 556.8] {
            FanoModel.gradient(x, &parameters, &mut analytic);
            for index in 0..5 {
                let step = 1.0e-6 * parameters[index].abs().max(1.0);
                let mut forward = parameters;
                let mut backward = parameters;
                forward[index] += step;
                backward[index] -= step;
                let numeric = (FanoModel.evaluate(x, &forward)
                    - FanoModel.evaluate(x, &backward))
                    / (2.0 * step);
                assert!(
                    (analytic[index] - numeric).abs() <= 1.0e-6 * numeric.abs().max(1.0),
                    "parameter {index} at {x}: analytic {} numeric {numeric}",
                    analytic[index]
                );
            }
        }
    }

    #[test]
    fn exact_synthetic_curve_is_recovered() {
        let (wavelength, intensity) = synthetic();
        let guess = FanoGuess {
            peak: 551.0,
            gamma: 9.0,
            q: 1.8,
            amplitude: 0.45,
            damping: 0.6,
        };

        let result = fit_fano(&wavelength, &intensity, TrimRange::new(0, 120), Some(guess))
            .expect("valid window should fit");

        assert!(result.converged);
        for (fitted, truth) in result.parameters().iter().zip(TRUTH) {
            assert!((fitted - truth).abs() <= 1.0e-6, "{fitted} vs {truth}");
        }
        assert_eq!(result.peak_error, result.errors["peak"]);
        assert!(result.errors.values().all(|error| *error < 1.0e-6));
        assert_eq!(result.trim_range, TrimRange::new(0, 120));
    }

    #[test]
    fn default_guess_uses_brightest_sample() {
        let guess = FanoGuess::from_window(&[1.0, 2.0, 3.0, 4.0], &[0.1, 0.9, 0.9, 0.2]);
        assert_eq!(guess.to_array(), [2.0, 10.0, 5.0, 0.6, 1.0]);
    }

    #[test]
    fn flat_window_is_a_failed_fit_not_an_error() {
        let wavelength: Vec<f64> = (0..30).map(|index| 500.0 + index as f64).collect();
        let intensity = vec![1.0; 30];

        let result = fit_fano(&wavelength, &intensity, TrimRange::new(3, 25), None)
            .expect("flat input should be recovered");

        assert!(!result.converged);
        assert!(result.parameters().iter().all(|value| *value == 0.0));
        assert!(result.errors.values().all(|value| *value == 0.0));
        assert_eq!(result.trim_range, TrimRange::new(3, 25));
    }

    #[test]
    fn optimizer_failure_is_reported_as_zeroed_result() {
        let (wavelength, intensity) = synthetic();
        let fitter = FanoFitter::new(LevenbergMarquardt {
            max_iterations: 1,
            ..LevenbergMarquardt::default()
        });
        let guess = FanoGuess {
            peak: 545.0,
            gamma: 15.0,
            q: 5.0,
            amplitude: 0.6,
            damping: 1.0,
        };

        let result = fitter
            .fit(&wavelength, &intensity, TrimRange::new(4, 110), Some(guess))
            .expect("optimizer failure is not an error");

        assert!(!result.converged);
        assert!(result.parameters().iter().all(|value| *value == 0.0));
        assert_eq!(result.peak_error, 0.0);
        assert_eq!(result.errors.len(), 5);
        assert!(result.errors.values().all(|value| *value == 0.0));
        assert_eq!(result.trim_range, TrimRange::new(4, 110));
    }

    #[test]
    fn window_validation_runs_in_order() {
        let (wavelength, intensity) = synthetic();

        let error = fit_fano(&wavelength, &intensity, TrimRange::new(10, 121), None)
            .expect_err("end past the data should fail");
        assert_eq!(error.kind(), ErrorKind::InvalidTrimRange);

        let error = fit_fano(&wavelength, &intensity, TrimRange::new(10, 9), None)
            .expect_err("inverted range should fail");
        assert_eq!(error.kind(), ErrorKind::InvalidTrimRange);

        let error = fit_fano(&wavelength, &intensity, TrimRange::new(10, 13), None)
            .expect_err("four points should fail");
        assert_eq!(error.kind(), ErrorKind::InsufficientData);

        let mut poisoned = intensity.clone();
        poisoned[12] = f64::NAN;
        let error = fit_fano(&wavelength, &poisoned, TrimRange::new(10, 14), None)
            .expect_err("NaN in window should fail");
        assert_eq!(error.kind(), ErrorKind::NonFiniteData);
        assert!(error.message().contains("index 12"));
    }

    #[test]
    fn five_points_leave_no_degrees_of_freedom() {
        let (wavelength, intensity) = synthetic();
        let guess = FanoGuess {
            peak: 550.0,
            gamma: 8.0,
            q: 2.0,
            amplitude: 0.4,
            damping: 0.5,
        };

        let result = fit_fano(&wavelength, &intensity, TrimRange::new(58, 62), Some(guess))
            .expect("five points should be accepted");
        if result.converged {
            assert!(result.errors.values().all(|error| !error.is_finite()));
        }
    }
}
