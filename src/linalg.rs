//! Dense complex linear algebra.
//!
//! This module contains the small set of matrix routines needed by the link
//! simulation: Hermitian transposes, matrix inversion by Gauss-Jordan
//! reduction, the Moore-Penrose pseudo-inverse of full-rank matrices, norms
//! and singular values. The matrices involved are tiny (a few antennas per
//! side), so straightforward algorithms over [`ndarray`] are used.

use ndarray::{Array1, Array2, ArrayBase, Data, Ix2};
use num_complex::Complex;
use num_traits::{One, Zero};
use thiserror::Error;

mod gauss;
mod svd;

pub use svd::singular_values;

/// Complex matrix type used throughout the crate.
pub type CMatrix = Array2<Complex<f64>>;

/// Linear algebra error.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Error)]
pub enum Error {
    /// The matrix is singular or too ill-conditioned to be inverted.
    #[error("{rows}x{cols} matrix is singular or ill-conditioned")]
    Singular {
        /// Number of rows of the offending matrix.
        rows: usize,
        /// Number of columns of the offending matrix.
        cols: usize,
    },
    /// The matrix is not square.
    #[error("{rows}x{cols} matrix is not square")]
    NotSquare {
        /// Number of rows of the offending matrix.
        rows: usize,
        /// Number of columns of the offending matrix.
        cols: usize,
    },
}

/// Returns the conjugate transpose of a matrix.
pub fn hermitian<S>(a: &ArrayBase<S, Ix2>) -> CMatrix
where
    S: Data<Elem = Complex<f64>>,
{
    a.t().mapv(|x| x.conj())
}

/// Returns a (possibly rectangular) identity matrix.
///
/// The element `(j, j)` is one for `j < min(rows, cols)`, and every other
/// element is zero.
pub fn eye(rows: usize, cols: usize) -> CMatrix {
    Array2::from_shape_fn((rows, cols), |(j, k)| {
        if j == k {
            Complex::one()
        } else {
            Complex::zero()
        }
    })
}

/// Inverts a square matrix.
///
/// The inverse is computed by Gauss-Jordan reduction with partial pivoting.
/// An error is returned if the matrix is not square or if a pivot is
/// negligible relative to the magnitude of the matrix entries.
pub fn inverse<S>(a: &ArrayBase<S, Ix2>) -> Result<CMatrix, Error>
where
    S: Data<Elem = Complex<f64>>,
{
    let (n, m) = a.dim();
    if n != m {
        return Err(Error::NotSquare { rows: n, cols: m });
    }
    // A = [A I]
    let mut augmented = Array2::zeros((n, 2 * n));
    for ((j, k), &x) in a.indexed_iter() {
        augmented[[j, k]] = x;
    }
    for j in 0..n {
        augmented[[j, n + j]] = Complex::one();
    }
    gauss::gauss_jordan(&mut augmented).map_err(|_| Error::Singular { rows: n, cols: n })?;
    Ok(augmented.slice(ndarray::s![.., n..]).to_owned())
}

/// Computes the Moore-Penrose pseudo-inverse of a full-rank matrix.
///
/// For a tall (or square) matrix with full column rank this is
/// `(A^H A)^{-1} A^H`, and for a wide matrix with full row rank it is
/// `A^H (A A^H)^{-1}`. Rank-deficient matrices give a [`Error::Singular`].
pub fn pinv<S>(a: &ArrayBase<S, Ix2>) -> Result<CMatrix, Error>
where
    S: Data<Elem = Complex<f64>>,
{
    let (rows, cols) = a.dim();
    let ah = hermitian(a);
    let gram_inverse = |g: CMatrix| inverse(&g).map_err(|_| Error::Singular { rows, cols });
    if rows >= cols {
        Ok(gram_inverse(ah.dot(a))?.dot(&ah))
    } else {
        Ok(ah.dot(&gram_inverse(a.dot(&ah))?))
    }
}

/// Returns the Frobenius norm of a matrix.
pub fn frobenius_norm<S>(a: &ArrayBase<S, Ix2>) -> f64
where
    S: Data<Elem = Complex<f64>>,
{
    a.iter().map(|x| x.norm_sqr()).sum::<f64>().sqrt()
}

/// Flattens a matrix in column-major order.
pub fn vec<S>(a: &ArrayBase<S, Ix2>) -> Array1<Complex<f64>>
where
    S: Data<Elem = Complex<f64>>,
{
    a.t().iter().cloned().collect()
}

/// Returns the real part of the diagonal of a square matrix.
pub fn real_diagonal<S>(a: &ArrayBase<S, Ix2>) -> Vec<f64>
where
    S: Data<Elem = Complex<f64>>,
{
    a.diag().iter().map(|x| x.re).collect()
}

/// Checks whether two matrices are element-wise close.
///
/// The tolerance rule is `|a - b| <= atol + rtol * |b|` with `rtol = 1e-5`
/// and `atol = 1e-8`.
pub fn allclose<S, T>(a: &ArrayBase<S, Ix2>, b: &ArrayBase<T, Ix2>) -> bool
where
    S: Data<Elem = Complex<f64>>,
    T: Data<Elem = Complex<f64>>,
{
    a.dim() == b.dim()
        && a
            .iter()
            .zip(b.iter())
            .all(|(x, y)| (x - y).norm() <= 1e-8 + 1e-5 * y.norm())
}

#[cfg(test)]
mod test {
    use super::*;
    use ndarray::arr2;

    fn c(re: f64, im: f64) -> Complex<f64> {
        Complex::new(re, im)
    }

    #[test]
    fn invert_2x2() {
        let a = arr2(&[[c(1.0, 1.0), c(2.0, 0.0)], [c(0.0, -1.0), c(3.0, 0.5)]]);
        let a_inv = inverse(&a).unwrap();
        assert!(allclose(&a.dot(&a_inv), &eye(2, 2)));
        assert!(allclose(&a_inv.dot(&a), &eye(2, 2)));
    }

    #[test]
    fn singular_matrix() {
        let a = arr2(&[[c(1.0, 0.0), c(2.0, 0.0)], [c(2.0, 0.0), c(4.0, 0.0)]]);
        assert_eq!(inverse(&a), Err(Error::Singular { rows: 2, cols: 2 }));
    }

    #[test]
    fn not_square() {
        let a = eye(2, 3);
        assert_eq!(inverse(&a), Err(Error::NotSquare { rows: 2, cols: 3 }));
    }

    #[test]
    fn pinv_tall_and_wide() {
        let tall = arr2(&[
            [c(1.0, 0.0), c(0.0, 1.0)],
            [c(2.0, -1.0), c(1.0, 0.0)],
            [c(0.0, 0.0), c(3.0, 2.0)],
        ]);
        let p = pinv(&tall).unwrap();
        assert_eq!(p.dim(), (2, 3));
        assert!(allclose(&p.dot(&tall), &eye(2, 2)));
        let wide = hermitian(&tall);
        let p = pinv(&wide).unwrap();
        assert_eq!(p.dim(), (3, 2));
        assert!(allclose(&wide.dot(&p), &eye(2, 2)));
    }

    #[test]
    fn column_major_vec() {
        let a = arr2(&[[c(1.0, 0.0), c(2.0, 0.0)], [c(3.0, 0.0), c(4.0, 0.0)]]);
        let v = vec(&a);
        let re: Vec<f64> = v.iter().map(|x| x.re).collect();
        assert_eq!(re, vec![1.0, 3.0, 2.0, 4.0]);
        assert!((frobenius_norm(&a) - 30.0_f64.sqrt()).abs() < 1e-12);
    }
}
