//! Pilot design.
//!
//! The training sequence is an `n_t x n_pilot` matrix `P` with orthonormal
//! rows, so that `P P^T = I`. It is built from a random permutation of the
//! identity, extended with zero columns up to the pilot length.

use crate::linalg::{self, CMatrix};
use num_complex::Complex;
use rand::{seq::SliceRandom, Rng};
use thiserror::Error;

/// Pilot design error.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Error)]
pub enum Error {
    /// The pilot is shorter than the number of transmit antennas.
    #[error("pilot length {n_pilot} is smaller than the number of transmit antennas {n_t}")]
    InsufficientPilotLength {
        /// Requested pilot length.
        n_pilot: usize,
        /// Number of transmit antennas.
        n_t: usize,
    },
}

/// Generates a semi-unitary pilot matrix.
///
/// Returns an `n_t x n_pilot` matrix `P` satisfying `P P^T = I`. The first
/// `n_t` columns form a random permutation matrix and the remaining columns
/// are zero.
///
/// # Examples
/// ```
/// # use mimo_link::{pilot::*, rand::*};
/// let mut rng = Rng::seed_from_u64(0);
/// let p = generate_pilot(&mut rng, 4, 6).unwrap();
/// assert_eq!(p.dim(), (4, 6));
/// assert!(generate_pilot(&mut rng, 4, 1).is_err());
/// ```
///
/// # Panics
///
/// Panics if the constructed matrix is not semi-unitary, which cannot happen
/// unless the construction is broken.
pub fn generate_pilot<R: Rng>(rng: &mut R, n_t: usize, n_pilot: usize) -> Result<CMatrix, Error> {
    if n_pilot < n_t {
        return Err(Error::InsufficientPilotLength { n_pilot, n_t });
    }
    let mut permutation: Vec<usize> = (0..n_t).collect();
    permutation.shuffle(rng);
    // Q = I[:, permutation], P = Q [I 0]
    let mut p = CMatrix::zeros((n_t, n_pilot));
    for (column, &row) in permutation.iter().enumerate() {
        p[[row, column]] = Complex::new(1.0, 0.0);
    }
    assert!(is_semi_unitary(&p));
    Ok(p)
}

/// Checks whether `P P^T` is close to the identity.
pub fn is_semi_unitary(p: &CMatrix) -> bool {
    let n = p.nrows();
    linalg::allclose(&p.dot(&p.t()), &linalg::eye(n, n))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::rand::{Rng, SeedableRng};

    #[test]
    fn semi_unitary() {
        let mut rng = Rng::seed_from_u64(42);
        for n_t in 1..=8 {
            for n_pilot in n_t..=(n_t + 5) {
                let p = generate_pilot(&mut rng, n_t, n_pilot).unwrap();
                assert_eq!(p.dim(), (n_t, n_pilot));
                assert!(is_semi_unitary(&p));
                // Padding columns are zero
                assert!(p.columns().into_iter().skip(n_t).flatten().all(|x| x.norm() == 0.0));
            }
        }
    }

    #[test]
    fn insufficient_length() {
        let mut rng = Rng::seed_from_u64(42);
        assert_eq!(
            generate_pilot(&mut rng, 4, 1),
            Err(Error::InsufficientPilotLength { n_pilot: 1, n_t: 4 })
        );
    }

    #[test]
    fn not_semi_unitary() {
        let mut p = linalg::eye(2, 3);
        p[[1, 1]] = Complex::new(2.0, 0.0);
        assert!(!is_semi_unitary(&p));
    }
}
