//! Finite-precision quantization of baseband samples.
//!
//! The receiver can optionally discretize the received samples to `b` bits
//! per real dimension. The real and imaginary parts are quantized
//! independently with a Lloyd-Max quantizer designed for a Gaussian source
//! matched to the empirical mean and standard deviation of the samples.

use crate::linalg::CMatrix;
use num_complex::Complex;
use std::f64::consts::{FRAC_1_SQRT_2, PI};

/// Default iteration budget for the Lloyd-Max design.
pub const DEFAULT_MAX_ITERATIONS: usize = 100;

/// Receiver quantizer.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Quantizer {
    bits: Option<u32>,
    max_iterations: usize,
}

impl Quantizer {
    /// Creates a quantizer with infinite precision (the identity).
    pub fn infinite() -> Quantizer {
        Quantizer {
            bits: None,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    /// Creates a quantizer with `bits` bits per real dimension.
    ///
    /// # Panics
    ///
    /// Panics if `bits` is zero or larger than 16.
    pub fn new(bits: u32, max_iterations: usize) -> Quantizer {
        assert!((1..=16).contains(&bits));
        Quantizer {
            bits: Some(bits),
            max_iterations,
        }
    }

    /// Returns the number of bits per real dimension, or `None` for infinite
    /// precision.
    pub fn bits(&self) -> Option<u32> {
        self.bits
    }

    /// Quantizes a matrix of complex samples.
    pub fn quantize(&self, samples: &CMatrix) -> CMatrix {
        let Some(bits) = self.bits else {
            return samples.clone();
        };
        let re: Vec<f64> = samples.iter().map(|x| x.re).collect();
        let im: Vec<f64> = samples.iter().map(|x| x.im).collect();
        let re = lloyd_max(&re, bits, self.max_iterations);
        let im = lloyd_max(&im, bits, self.max_iterations);
        let values = re
            .into_iter()
            .zip(im)
            .map(|(re, im)| Complex::new(re, im))
            .collect();
        CMatrix::from_shape_vec(samples.raw_dim(), values).unwrap()
    }
}

impl Default for Quantizer {
    fn default() -> Quantizer {
        Quantizer::infinite()
    }
}

/// Scalar quantizer given by its decision thresholds and representative
/// levels.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarQuantizer {
    // Inner thresholds (one less than the number of representatives). The
    // outer thresholds are -inf and +inf.
    thresholds: Vec<f64>,
    representatives: Vec<f64>,
}

impl ScalarQuantizer {
    /// Returns the inner decision thresholds.
    pub fn thresholds(&self) -> &[f64] {
        &self.thresholds
    }

    /// Returns the representative levels.
    pub fn representatives(&self) -> &[f64] {
        &self.representatives
    }

    /// Maps a value to its representative level.
    pub fn quantize(&self, x: f64) -> f64 {
        self.representatives[self.thresholds.partition_point(|&t| t <= x)]
    }

    fn mse(&self, x: &[f64]) -> f64 {
        x.iter().map(|&a| (a - self.quantize(a)).powi(2)).sum::<f64>() / x.len() as f64
    }
}

/// Designs a Lloyd-Max quantizer for a standard normal source.
///
/// The `2^bits` starting representatives are spread uniformly over the range
/// of `training`. Each iteration places the thresholds at the midpoints of
/// adjacent representatives and moves each representative to the conditional
/// mean of the standard normal density in its cell. The design with the
/// lowest mean squared error on `training` is returned.
///
/// # Panics
///
/// Panics if `training` is empty.
pub fn design(training: &[f64], bits: u32, max_iterations: usize) -> ScalarQuantizer {
    assert!(!training.is_empty());
    let levels = 1usize << bits;
    let min = training.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = training.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let step = (max - min) / levels as f64;
    let mut representatives: Vec<f64> = (0..levels)
        .map(|j| min + 0.5 * step + j as f64 * step)
        .collect();

    let mut best: Option<(f64, ScalarQuantizer)> = None;
    for _ in 0..max_iterations {
        let thresholds: Vec<f64> = representatives
            .windows(2)
            .map(|w| 0.5 * (w[0] + w[1]))
            .collect();
        representatives = (0..levels)
            .map(|j| {
                let lower = if j == 0 { f64::NEG_INFINITY } else { thresholds[j - 1] };
                let upper = if j == levels - 1 { f64::INFINITY } else { thresholds[j] };
                conditional_mean(lower, upper)
            })
            .collect();
        let candidate = ScalarQuantizer {
            thresholds,
            representatives: representatives.clone(),
        };
        let loss = candidate.mse(training);
        match &best {
            Some((min_loss, _)) if *min_loss <= loss => (),
            _ => best = Some((loss, candidate)),
        }
    }
    match best {
        Some((_, quantizer)) => quantizer,
        // No iterations: quantize with the starting representatives.
        None => ScalarQuantizer {
            thresholds: representatives
                .windows(2)
                .map(|w| 0.5 * (w[0] + w[1]))
                .collect(),
            representatives,
        },
    }
}

/// Quantizes real samples with a Lloyd-Max quantizer.
///
/// The samples are standardized with their empirical mean and standard
/// deviation, quantized with a quantizer from [`design`], and mapped back to
/// the original scale. Constant inputs are returned unchanged.
pub fn lloyd_max(x: &[f64], bits: u32, max_iterations: usize) -> Vec<f64> {
    if x.is_empty() {
        return Vec::new();
    }
    let n = x.len() as f64;
    let mean = x.iter().sum::<f64>() / n;
    let std = (x.iter().map(|a| (a - mean).powi(2)).sum::<f64>() / n).sqrt();
    if !(std > 0.0) {
        return x.to_vec();
    }
    let z: Vec<f64> = x.iter().map(|a| (a - mean) / std).collect();
    let quantizer = design(&z, bits, max_iterations);
    z.iter()
        .map(|&a| quantizer.quantize(a) * std + mean)
        .collect()
}

fn normal_pdf(x: f64) -> f64 {
    if x.is_infinite() {
        0.0
    } else {
        (-0.5 * x * x).exp() / (2.0 * PI).sqrt()
    }
}

// Upper tail probability of the standard normal.
fn normal_q(x: f64) -> f64 {
    0.5 * erfc(x * FRAC_1_SQRT_2)
}

// Probability of the standard normal in (a, b), computed on the side that
// avoids cancellation.
fn normal_mass(a: f64, b: f64) -> f64 {
    if a >= 0.0 {
        normal_q(a) - normal_q(b)
    } else {
        normal_q(-b) - normal_q(-a)
    }
}

// Conditional mean of the standard normal restricted to (a, b).
fn conditional_mean(a: f64, b: f64) -> f64 {
    let mass = normal_mass(a, b);
    if mass > 1e-300 {
        (normal_pdf(a) - normal_pdf(b)) / mass
    } else if a.is_finite() && b.is_finite() {
        0.5 * (a + b)
    } else if a.is_finite() {
        a
    } else {
        b
    }
}

// Complementary error function with fractional error below 1.2e-7
// (Chebyshev fit from Numerical Recipes).
fn erfc(x: f64) -> f64 {
    let z = x.abs();
    let t = 1.0 / (1.0 + 0.5 * z);
    let poly = -z * z - 1.26551223
        + t * (1.00002368
            + t * (0.37409196
                + t * (0.09678418
                    + t * (-0.18628806
                        + t * (0.27886807
                            + t * (-1.13520398
                                + t * (1.48851587 + t * (-0.82215223 + t * 0.17087277))))))));
    let r = t * poly.exp();
    if x >= 0.0 {
        r
    } else {
        2.0 - r
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::rand::{Rng, SeedableRng};
    use rand_distr::{Distribution, Normal};

    fn gaussian_samples(n: usize, seed: u64) -> Vec<f64> {
        let mut rng = Rng::seed_from_u64(seed);
        let distr = Normal::new(0.0, 1.0).unwrap();
        (0..n).map(|_| distr.sample(&mut rng)).collect()
    }

    #[test]
    fn erfc_values() {
        assert!((erfc(0.0) - 1.0).abs() < 1e-7);
        assert!((erfc(1.0) - 0.157_299_207).abs() < 1e-7);
        assert!((erfc(-1.0) - 1.842_700_793).abs() < 1e-7);
    }

    #[test]
    fn one_bit_levels() {
        // The optimal 1-bit quantizer for N(0, 1) has levels +/- sqrt(2 / pi)
        let x = gaussian_samples(10000, 0);
        let q = design(&x, 1, DEFAULT_MAX_ITERATIONS);
        let expected = (2.0 / PI).sqrt();
        assert_eq!(q.representatives().len(), 2);
        assert!((q.representatives()[0] + expected).abs() < 0.02);
        assert!((q.representatives()[1] - expected).abs() < 0.02);
        assert!(q.thresholds()[0].abs() < 0.05);
    }

    #[test]
    fn mse_decreases_with_bits() {
        let x = gaussian_samples(5000, 1);
        let mse = |bits| {
            let y = lloyd_max(&x, bits, DEFAULT_MAX_ITERATIONS);
            x.iter().zip(y.iter()).map(|(a, b)| (a - b).powi(2)).sum::<f64>() / x.len() as f64
        };
        let (m1, m2, m4) = (mse(1), mse(2), mse(4));
        assert!(m1 > m2);
        assert!(m2 > m4);
        // Lloyd-Max distortion for 2 bits on a unit Gaussian is about 0.1175
        assert!((m2 - 0.1175).abs() < 0.01);
    }

    #[test]
    fn number_of_levels() {
        let x = gaussian_samples(2000, 2);
        let mut y = lloyd_max(&x, 3, 50);
        y.sort_by(|a, b| a.total_cmp(b));
        y.dedup();
        assert!(y.len() <= 8);
    }

    #[test]
    fn infinite_is_identity() {
        let samples = crate::linalg::eye(3, 5) * Complex::new(0.3, -1.2);
        assert_eq!(Quantizer::infinite().quantize(&samples), samples);
    }

    #[test]
    fn deterministic() {
        let samples = CMatrix::from_shape_fn((4, 25), |(j, k)| {
            Complex::new((j * k) as f64 * 0.1 - 1.0, (j + k) as f64 * -0.05)
        });
        let quantizer = Quantizer::new(2, 30);
        let a = quantizer.quantize(&samples);
        let b = quantizer.quantize(&samples);
        assert_eq!(a, b);
        assert_eq!(a.dim(), (4, 25));
    }

    #[test]
    fn constant_input() {
        assert_eq!(lloyd_max(&[0.5; 10], 2, 10), vec![0.5; 10]);
    }
}
