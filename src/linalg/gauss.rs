use ndarray::{s, Array2};
use num_complex::Complex;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Error {
    NotInvertible,
}

// Pivots smaller than this (relative to the largest entry) are treated as
// zero.
const PIVOT_TOLERANCE: f64 = 1e-12;

/// Reduces the n x m matrix (m >= n) so that its left n x n block becomes the
/// identity.
pub fn gauss_jordan(array: &mut Array2<Complex<f64>>) -> Result<(), Error> {
    let (n, m) = array.dim();
    let scale = array
        .slice(s![.., ..n])
        .iter()
        .map(|x| x.norm())
        .fold(0.0, f64::max);
    if scale == 0.0 || !scale.is_finite() {
        return Err(Error::NotInvertible);
    }

    // Reduce to upper triangular with ones on diagonal
    for j in 0..n {
        // Partial pivoting: largest element in the current column
        let (k, pivot_norm) = array
            .slice(s![j.., j])
            .iter()
            .enumerate()
            .map(|(t, x)| (j + t, x.norm()))
            .fold((j, -1.0), |best, cur| if cur.1 > best.1 { cur } else { best });
        if pivot_norm <= PIVOT_TOLERANCE * scale {
            return Err(Error::NotInvertible);
        }

        if k != j {
            // Swap rows j and k
            for t in j..m {
                array.swap([j, t], [k, t]);
            }
        }

        // Make a 1 by dividing
        let x = array[[j, j]];
        for t in j..m {
            array[[j, t]] /= x;
        }

        // Subtract to rows below to make zeros below diagonal
        for t in (j + 1)..n {
            let x = array[[t, j]];
            if x.norm_sqr() != 0.0 {
                for u in j..m {
                    let y = array[[j, u]];
                    array[[t, u]] -= x * y;
                }
            }
        }
    }

    // Reduce to identity
    for j in (0..n).rev() {
        // Subtract to rows above to make zeros above diagonal
        for t in 0..j {
            let x = array[[t, j]];
            if x.norm_sqr() != 0.0 {
                for u in j..m {
                    let y = array[[j, u]];
                    array[[t, u]] -= x * y;
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use ndarray::arr2;

    #[test]
    fn gauss() {
        let c = |re: f64| Complex::new(re, 0.0);
        let mut a = arr2(&[
            [c(0.0), c(2.0), c(1.0), c(0.0)],
            [c(4.0), c(0.0), c(0.0), c(1.0)],
        ]);
        gauss_jordan(&mut a).unwrap();
        let expected = arr2(&[
            [c(1.0), c(0.0), c(0.0), c(0.25)],
            [c(0.0), c(1.0), c(0.5), c(0.0)],
        ]);
        assert_eq!(&a, &expected);
    }

    #[test]
    fn zero_matrix() {
        let mut a = Array2::<Complex<f64>>::zeros((3, 6));
        assert_eq!(gauss_jordan(&mut a), Err(Error::NotInvertible));
    }
}
