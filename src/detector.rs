//! Symbol detection.
//!
//! This module maps equalized (noisy) symbols back to alphabet indices. The
//! [`Detector`] trait abstracts over detection strategies. The default is the
//! [`MaximumLikelihood`] detector, which is exact under additive Gaussian
//! noise. An unsupervised clustering detector is available in [`kmeans`].

use crate::alphabet::Alphabet;
use num_complex::Complex;

pub mod factory;
pub mod kmeans;

/// Symbol detector.
///
/// This trait is used to form detector trait objects, so that detection
/// strategies can be swapped in the link simulation.
pub trait Detector: std::fmt::Debug + Send + Sync {
    /// Detects a sequence of received symbols.
    fn detect(&self, symbols: &[Complex<f64>], alphabet: &Alphabet) -> Detection;
}

/// Detector output.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Detected alphabet indices.
    pub indices: Vec<usize>,
    /// Canonical coordinates of the detected symbols.
    pub symbols: Vec<Complex<f64>>,
    /// Bits of the detected symbols, concatenated.
    pub bits: Vec<u8>,
}

impl Detection {
    /// Builds a detection from alphabet indices.
    ///
    /// # Panics
    ///
    /// Panics if some index is not smaller than the alphabet order.
    pub fn from_indices(indices: Vec<usize>, alphabet: &Alphabet) -> Detection {
        let symbols = indices.iter().map(|&m| alphabet.symbol(m).x()).collect();
        let bits = indices
            .iter()
            .flat_map(|&m| alphabet.symbol(m).bits().iter().cloned())
            .collect();
        Detection {
            indices,
            symbols,
            bits,
        }
    }
}

/// Maximum likelihood detector.
///
/// Selects for each received value the alphabet symbol at minimum Euclidean
/// distance. Ties are resolved in favour of the lowest index.
#[derive(Debug, Clone, Default)]
pub struct MaximumLikelihood {}

impl MaximumLikelihood {
    /// Creates a new maximum likelihood detector.
    pub fn new() -> MaximumLikelihood {
        MaximumLikelihood::default()
    }
}

impl Detector for MaximumLikelihood {
    fn detect(&self, symbols: &[Complex<f64>], alphabet: &Alphabet) -> Detection {
        let centroids: Vec<Complex<f64>> = alphabet.symbols().iter().map(|s| s.x()).collect();
        let indices = symbols.iter().map(|&x| nearest(x, &centroids)).collect();
        Detection::from_indices(indices, alphabet)
    }
}

// Index of the centroid closest to x, lowest index on ties.
fn nearest(x: Complex<f64>, centroids: &[Complex<f64>]) -> usize {
    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (m, &c) in centroids.iter().enumerate() {
        let distance = (x - c).norm_sqr();
        if distance < best_distance {
            best = m;
            best_distance = distance;
        }
    }
    best
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::alphabet::Family;

    #[test]
    fn exact_symbols() {
        let alphabet = Alphabet::new(Family::Qam, 16).unwrap();
        let symbols: Vec<_> = alphabet.symbols().iter().map(|s| s.x()).collect();
        let detection = MaximumLikelihood::new().detect(&symbols, &alphabet);
        assert_eq!(detection.indices, (0..16).collect::<Vec<_>>());
        assert_eq!(detection.symbols, symbols);
        assert_eq!(detection.bits.len(), 64);
        assert_eq!(&detection.bits[4..8], alphabet.symbol(1).bits());
    }

    #[test]
    fn nearest_symbol() {
        let alphabet = Alphabet::new(Family::Qam, 4).unwrap();
        let detection = MaximumLikelihood::new().detect(
            &[Complex::new(0.9, 0.2), Complex::new(-0.1, -3.0)],
            &alphabet,
        );
        // Symbols are ordered (-,-), (-,+), (+,+), (+,-)
        assert_eq!(detection.indices, vec![2, 0]);
    }

    #[test]
    fn ties_go_to_lowest_index() {
        let alphabet = Alphabet::new(Family::Qam, 4).unwrap();
        // The origin is equidistant from the four symbols
        let detection = MaximumLikelihood::new().detect(&[Complex::new(0.0, 0.0)], &alphabet);
        assert_eq!(detection.indices, vec![0]);
    }
}
