pub mod levenberg;

pub use levenberg::{
    LeastSquaresModel, LevenbergError, LevenbergMarquardt, LevenbergSolution,
};

use faer::Mat;

pub type DenseMatrix = Mat<f64>;
