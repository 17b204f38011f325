//! Singular values by one-sided Jacobi rotations.

use ndarray::{ArrayBase, Data, Ix2};
use num_complex::Complex;

const MAX_SWEEPS: usize = 60;
const TOLERANCE: f64 = 1e-15;

/// Computes the singular values of a complex matrix.
///
/// The singular values are returned in decreasing order. Only the
/// `min(rows, cols)` largest values are returned.
///
/// The computation uses the Hestenes one-sided Jacobi method: pairs of
/// columns are rotated until all of them are mutually orthogonal, at which
/// point the column norms are the singular values.
pub fn singular_values<S>(a: &ArrayBase<S, Ix2>) -> Vec<f64>
where
    S: Data<Elem = Complex<f64>>,
{
    let (rows, cols) = a.dim();
    let mut u = a.to_owned();
    for _ in 0..MAX_SWEEPS {
        let mut rotated = false;
        for p in 0..cols {
            for q in (p + 1)..cols {
                let alpha: f64 = u.column(p).iter().map(|x| x.norm_sqr()).sum();
                let beta: f64 = u.column(q).iter().map(|x| x.norm_sqr()).sum();
                let gamma: Complex<f64> = u
                    .column(p)
                    .iter()
                    .zip(u.column(q).iter())
                    .map(|(x, y)| x.conj() * y)
                    .sum();
                let gamma_norm = gamma.norm();
                if gamma_norm <= TOLERANCE * (alpha * beta).sqrt() || gamma_norm == 0.0 {
                    continue;
                }
                rotated = true;
                // Remove the phase of gamma from column q, then apply a real
                // Jacobi rotation.
                let phase = gamma / gamma_norm;
                let zeta = (beta - alpha) / (2.0 * gamma_norm);
                let t = zeta.signum() / (zeta.abs() + (1.0 + zeta * zeta).sqrt());
                let c = 1.0 / (1.0 + t * t).sqrt();
                let s = c * t;
                for j in 0..rows {
                    let up = u[[j, p]];
                    let vq = u[[j, q]] * phase.conj();
                    u[[j, p]] = up * c - vq * s;
                    u[[j, q]] = up * s + vq * c;
                }
            }
        }
        if !rotated {
            break;
        }
    }
    let mut values: Vec<f64> = u
        .columns()
        .into_iter()
        .map(|col| col.iter().map(|x| x.norm_sqr()).sum::<f64>().sqrt())
        .collect();
    values.sort_by(|a, b| b.total_cmp(a));
    values.truncate(rows.min(cols));
    values
}

#[cfg(test)]
mod test {
    use super::*;
    use ndarray::arr2;

    fn c(re: f64, im: f64) -> Complex<f64> {
        Complex::new(re, im)
    }

    #[test]
    fn diagonal() {
        let a = arr2(&[
            [c(0.0, 3.0), c(0.0, 0.0)],
            [c(0.0, 0.0), c(-5.0, 0.0)],
        ]);
        let s = singular_values(&a);
        assert!((s[0] - 5.0).abs() < 1e-12);
        assert!((s[1] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn energy_is_preserved() {
        let a = arr2(&[
            [c(1.0, 2.0), c(0.5, -1.0), c(2.0, 0.0)],
            [c(-1.0, 0.3), c(0.0, 1.0), c(1.5, 1.5)],
        ]);
        let s = singular_values(&a);
        assert_eq!(s.len(), 2);
        assert!(s[0] >= s[1]);
        let frobenius: f64 = a.iter().map(|x| x.norm_sqr()).sum();
        let energy: f64 = s.iter().map(|x| x * x).sum();
        assert!((frobenius - energy).abs() < 1e-9);
    }

    #[test]
    fn rank_one() {
        // Outer product of [1, 1] and [1, 2]
        let a = arr2(&[[c(1.0, 0.0), c(2.0, 0.0)], [c(1.0, 0.0), c(2.0, 0.0)]]);
        let s = singular_values(&a);
        assert!((s[0] - 10.0_f64.sqrt()).abs() < 1e-9);
        assert!(s[1].abs() < 1e-9);
    }
}
