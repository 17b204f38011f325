//! Linear MIMO equalization.
//!
//! This module computes zero-forcing and MMSE combining matrices from a
//! channel estimate, together with the receive SNR of each spatial stream.
//! All SNRs here are linear (not dB).

use crate::linalg::{self, CMatrix};
use clap::ValueEnum;
use enum_iterator::Sequence;
use num_complex::Complex;
use thiserror::Error;

/// Equalizer error.
#[derive(Debug, Copy, Clone, PartialEq, Error)]
pub enum Error {
    /// The MMSE equalizer needs a positive SNR.
    #[error("invalid equalizer parameter: rho = {rho}")]
    InvalidEqualizerParameter {
        /// Offending SNR value.
        rho: f64,
    },
    /// A matrix inversion failed.
    #[error("channel inversion error: {0}")]
    ChannelInversionError(#[from] linalg::Error),
}

/// Equalization algorithm.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, ValueEnum, Sequence)]
#[clap(rename_all = "UPPER")]
pub enum Algorithm {
    /// Zero-forcing.
    Zf,
    /// Minimum mean square error.
    Mmse,
}

impl std::str::FromStr for Algorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Algorithm, String> {
        Ok(match s {
            "ZF" => Algorithm::Zf,
            "MMSE" => Algorithm::Mmse,
            _ => Err(format!("invalid equalizer {s}"))?,
        })
    }
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(
            f,
            "{}",
            match self {
                Algorithm::Zf => "ZF",
                Algorithm::Mmse => "MMSE",
            }
        )
    }
}

/// Equalizer output.
#[derive(Debug, Clone, PartialEq)]
pub struct Equalization {
    /// Combining matrix, of size `n_t x n_r`.
    pub w: CMatrix,
    /// Receive SNR of each of the `n_t` streams (linear).
    pub rx_snr: Vec<f64>,
}

/// Computes the combining matrix for a channel estimate.
///
/// `rho` is the transmit SNR (linear). For ZF the combining matrix is the
/// pseudo-inverse of `h_hat` and the stream SNRs are
/// `rho / diag(Re((H^H H)^-1))`. For MMSE the combining matrix is
/// `H^H (H H^H + I / rho)^-1` and the stream SNRs are
/// `rho / diag(Re(W W^H))`; `rho` must be positive.
///
/// # Examples
/// ```
/// # use mimo_link::{equalizer::*, linalg};
/// let h = linalg::eye(2, 2);
/// let eq = equalize(&h, Algorithm::Zf, 100.0).unwrap();
/// assert!(linalg::allclose(&eq.w, &h));
/// assert!(eq.rx_snr.iter().all(|&snr| (snr - 100.0).abs() < 1e-9));
/// ```
pub fn equalize(h_hat: &CMatrix, algorithm: Algorithm, rho: f64) -> Result<Equalization, Error> {
    let hh = linalg::hermitian(h_hat);
    match algorithm {
        Algorithm::Zf => {
            let w = linalg::pinv(h_hat)?;
            let gram_inverse = linalg::inverse(&hh.dot(h_hat))?;
            let rx_snr = linalg::real_diagonal(&gram_inverse)
                .into_iter()
                .map(|d| rho / d)
                .collect();
            Ok(Equalization { w, rx_snr })
        }
        Algorithm::Mmse => {
            if !(rho > 0.0) {
                return Err(Error::InvalidEqualizerParameter { rho });
            }
            let n_r = h_hat.nrows();
            let regularized = h_hat.dot(&hh) + linalg::eye(n_r, n_r) * Complex::new(1.0 / rho, 0.0);
            let w = hh.dot(&linalg::inverse(&regularized)?);
            let rx_snr = linalg::real_diagonal(&w.dot(&linalg::hermitian(&w)))
                .into_iter()
                .map(|d| rho / d)
                .collect();
            Ok(Equalization { w, rx_snr })
        }
    }
}

/// Computes the post-equalization SINR of each stream.
///
/// This is an empirical cross-check of [`Equalization::rx_snr`]: for stream
/// `j` it is the power of the desired term `(W H)_jj` over the residual
/// inter-stream interference plus the noise enhanced by row `j` of `W`,
/// assuming unit-energy symbols and noise power `1 / rho` per receive
/// antenna. It coincides with the analytic value for ZF.
pub fn post_equalization_snr(w: &CMatrix, h: &CMatrix, rho: f64) -> Vec<f64> {
    let wh = w.dot(h);
    wh.rows()
        .into_iter()
        .zip(w.rows())
        .enumerate()
        .map(|(j, (wh_row, w_row))| {
            let signal = wh_row[j].norm_sqr();
            let interference: f64 = wh_row
                .iter()
                .enumerate()
                .filter(|&(l, _)| l != j)
                .map(|(_, x)| x.norm_sqr())
                .sum();
            let noise: f64 = w_row.iter().map(|x| x.norm_sqr()).sum::<f64>() / rho;
            signal / (interference + noise)
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        channel::fading_channel,
        rand::{Rng, SeedableRng},
    };

    #[test]
    fn zero_forcing_inverts_channel() {
        let mut rng = Rng::seed_from_u64(11);
        for (n_r, n_t) in [(1, 1), (2, 2), (4, 4), (4, 2)] {
            let h = fading_channel(&mut rng, n_r, n_t, 0.01, 0.0, 8.0).unwrap();
            let eq = equalize(&h, Algorithm::Zf, 10.0).unwrap();
            assert_eq!(eq.w.dim(), (n_t, n_r));
            assert_eq!(eq.rx_snr.len(), n_t);
            let n_t_eye = linalg::eye(n_t, n_t);
            let wh = eq.w.dot(&h);
            assert!(wh
                .iter()
                .zip(n_t_eye.iter())
                .all(|(a, b)| (a - b).norm() < 1e-8));
        }
    }

    #[test]
    fn zero_forcing_snr_cross_check() {
        let mut rng = Rng::seed_from_u64(12);
        let h = fading_channel(&mut rng, 4, 4, 0.5, 1.0, 0.0).unwrap();
        let rho = 1000.0;
        let eq = equalize(&h, Algorithm::Zf, rho).unwrap();
        let empirical = post_equalization_snr(&eq.w, &h, rho);
        for (a, b) in eq.rx_snr.iter().zip(empirical.iter()) {
            assert!((a - b).abs() / a < 1e-6);
        }
    }

    #[test]
    fn mmse_approaches_zero_forcing() {
        let mut rng = Rng::seed_from_u64(13);
        let h = fading_channel(&mut rng, 3, 3, 0.5, 0.0, 0.0).unwrap();
        let zf = equalize(&h, Algorithm::Zf, 1e12).unwrap();
        let mmse = equalize(&h, Algorithm::Mmse, 1e12).unwrap();
        assert_eq!(mmse.w.dim(), (3, 3));
        assert!(zf
            .w
            .iter()
            .zip(mmse.w.iter())
            .all(|(a, b)| (a - b).norm() < 1e-4));
    }

    #[test]
    fn mmse_requires_positive_rho() {
        let h = linalg::eye(2, 2);
        assert_eq!(
            equalize(&h, Algorithm::Mmse, 0.0),
            Err(Error::InvalidEqualizerParameter { rho: 0.0 })
        );
        assert!(equalize(&h, Algorithm::Mmse, -1.0).is_err());
        assert!(equalize(&h, Algorithm::Zf, 0.0).is_ok());
    }

    #[test]
    fn singular_channel() {
        let h = CMatrix::zeros((2, 2));
        assert!(matches!(
            equalize(&h, Algorithm::Zf, 10.0),
            Err(Error::ChannelInversionError(_))
        ));
    }

    #[test]
    fn algorithm_names() {
        for algorithm in enum_iterator::all::<Algorithm>() {
            assert_eq!(algorithm.to_string().parse::<Algorithm>().unwrap(), algorithm);
        }
        assert!("LMMSE".parse::<Algorithm>().is_err());
    }
}
