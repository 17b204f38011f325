//! Channel estimation.
//!
//! This module recovers an estimate of the MIMO channel from the
//! observations of a semi-unitary training sequence.

use crate::{
    linalg::{self, CMatrix},
    pilot,
};
use thiserror::Error;

/// Channel estimation error.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Error)]
pub enum Error {
    /// The training sequence does not satisfy `X X^T = I`.
    #[error("the {rows}x{cols} training sequence is not semi-unitary")]
    NonUnitaryTrainingSequence {
        /// Rows of the training sequence.
        rows: usize,
        /// Columns of the training sequence.
        cols: usize,
    },
    /// The pilot observations do not have one column per pilot symbol.
    #[error("pilot observations have {observed} columns but the pilot has {expected}")]
    DimensionMismatch {
        /// Number of columns of the training sequence.
        expected: usize,
        /// Number of columns of the observations.
        observed: usize,
    },
}

/// Channel estimation algorithm.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum Estimator {
    /// Least-squares estimation.
    #[default]
    LeastSquares,
}

/// Estimates the channel from pilot observations.
///
/// The training sequence `x_pilot` (size `n_t x n_pilot`) must be
/// semi-unitary and `y_pilot` (size `n_r x n_pilot`) contains the received
/// pilots. For least squares the estimate is `Y X^H`, which is exact in the
/// absence of noise.
pub fn estimate(x_pilot: &CMatrix, y_pilot: &CMatrix, estimator: Estimator) -> Result<CMatrix, Error> {
    if !pilot::is_semi_unitary(x_pilot) {
        let (rows, cols) = x_pilot.dim();
        return Err(Error::NonUnitaryTrainingSequence { rows, cols });
    }
    if x_pilot.ncols() != y_pilot.ncols() {
        return Err(Error::DimensionMismatch {
            expected: x_pilot.ncols(),
            observed: y_pilot.ncols(),
        });
    }
    match estimator {
        Estimator::LeastSquares => Ok(y_pilot.dot(&linalg::hermitian(x_pilot))),
    }
}

/// Returns the mean squared error of a channel estimate.
///
/// This is `|vec(H) - vec(H_hat)|^2 / (n_r n_t)`.
pub fn mean_squared_error(h: &CMatrix, h_hat: &CMatrix) -> f64 {
    let error = linalg::vec(h) - linalg::vec(h_hat);
    error.iter().map(|x| x.norm_sqr()).sum::<f64>() / h.len() as f64
}
