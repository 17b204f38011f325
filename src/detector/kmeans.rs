//! Clustering detector.
//!
//! This detector runs k-means clustering on the received samples. The
//! cluster centers are initialized at the alphabet coordinates, so that each
//! cluster keeps the index of the symbol it started from. The centers then
//! move to the means of the received clusters.

use super::{nearest, Detection, Detector};
use crate::alphabet::Alphabet;
use num_complex::Complex;
use num_traits::Zero;

/// Default maximum number of k-means iterations.
pub const DEFAULT_MAX_ITERATIONS: usize = 50;

/// K-means clustering detector.
#[derive(Debug, Clone)]
pub struct KMeans {
    max_iterations: usize,
}

impl KMeans {
    /// Creates a new clustering detector.
    pub fn new(max_iterations: usize) -> KMeans {
        KMeans { max_iterations }
    }
}

impl Default for KMeans {
    fn default() -> KMeans {
        KMeans::new(DEFAULT_MAX_ITERATIONS)
    }
}

impl Detector for KMeans {
    fn detect(&self, symbols: &[Complex<f64>], alphabet: &Alphabet) -> Detection {
        let mut centers: Vec<Complex<f64>> = alphabet.symbols().iter().map(|s| s.x()).collect();
        let mut assignment: Vec<usize> = symbols.iter().map(|&x| nearest(x, &centers)).collect();
        for _ in 0..self.max_iterations {
            let mut sums = vec![Complex::<f64>::zero(); centers.len()];
            let mut counts = vec![0usize; centers.len()];
            for (&x, &m) in symbols.iter().zip(assignment.iter()) {
                sums[m] += x;
                counts[m] += 1;
            }
            // Empty clusters keep their center
            for ((center, sum), &count) in centers.iter_mut().zip(sums).zip(counts.iter()) {
                if count > 0 {
                    *center = sum / count as f64;
                }
            }
            let new_assignment: Vec<usize> =
                symbols.iter().map(|&x| nearest(x, &centers)).collect();
            if new_assignment == assignment {
                break;
            }
            assignment = new_assignment;
        }
        Detection::from_indices(assignment, alphabet)
    }
}
