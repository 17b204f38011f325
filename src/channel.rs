//! Channel simulation.
//!
//! This module contains the large-scale path loss model, the generation of
//! the fading MIMO channel matrix, and the simulation of complex AWGN.

use crate::linalg::{self, CMatrix};
use crate::util::{db, linear};
use ndarray::{Array2, ArrayBase, DataMut, Ix2};
use num_complex::Complex;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use thiserror::Error;

/// Speed of light in m/s.
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Channel model error.
#[derive(Debug, Copy, Clone, PartialEq, Error)]
pub enum Error {
    /// The large-scale gain is not in the interval (0, 1), which indicates a
    /// near-field or otherwise unphysical configuration.
    #[error("unphysical large-scale gain {gain} (distance {distance} m)")]
    UnphysicalGain {
        /// Computed linear gain.
        gain: f64,
        /// Distance used in the computation.
        distance: f64,
    },
    /// The Rician K-factor or the shadowing standard deviation is negative
    /// or not finite.
    #[error("invalid fading parameters (K = {k_factor}, shadowing std = {shadowing_std_db} dB)")]
    InvalidFadingParameter {
        /// Rician K-factor.
        k_factor: f64,
        /// Shadowing standard deviation in dB.
        shadowing_std_db: f64,
    },
}

/// Computes the large-scale gain of a link.
///
/// The gain follows the free-space law `G = Gt Gr (lambda / (4 pi d))^exp`,
/// with `lambda` the wavelength at `carrier_frequency` (in Hz) and `d` the
/// `distance` in meters. Antenna gains are linear. An error is returned
/// unless `0 < G < 1`.
///
/// # Examples
/// ```
/// # use mimo_link::channel::large_scale_gain;
/// let g = large_scale_gain(100.0, 1.8e6, 1.0, 1.0, 2.0).unwrap();
/// assert!(g > 0.0 && g < 1.0);
/// assert!(large_scale_gain(1.0, 1.8e6, 1.0, 1.0, 2.0).is_err());
/// ```
pub fn large_scale_gain(
    distance: f64,
    carrier_frequency: f64,
    gain_tx: f64,
    gain_rx: f64,
    path_loss_exponent: f64,
) -> Result<f64, Error> {
    let wavelength = SPEED_OF_LIGHT / carrier_frequency;
    let gain = gain_tx
        * gain_rx
        * (wavelength / (4.0 * std::f64::consts::PI * distance)).powf(path_loss_exponent);
    if gain > 0.0 && gain < 1.0 {
        Ok(gain)
    } else {
        Err(Error::UnphysicalGain { gain, distance })
    }
}

/// Draws a fading MIMO channel matrix.
///
/// The matrix has size `n_r x n_t`. Each entry gets its own large-scale gain,
/// obtained by degrading `gain` by log-normal shadowing with standard
/// deviation `shadowing_std_db` (in dB). The small-scale fading is Rician
/// with factor `k_factor`: the real and imaginary parts are independent
/// Gaussians with mean `sqrt(K / (K + 1))` and variance `1 / (K + 1)`, scaled
/// by `sqrt(G_ij / 2)`. A factor `K = 0` gives Rayleigh fading.
pub fn fading_channel<R: Rng>(
    rng: &mut R,
    n_r: usize,
    n_t: usize,
    gain: f64,
    k_factor: f64,
    shadowing_std_db: f64,
) -> Result<CMatrix, Error> {
    let invalid = Error::InvalidFadingParameter {
        k_factor,
        shadowing_std_db,
    };
    if !(k_factor >= 0.0 && k_factor.is_finite())
        || !(shadowing_std_db >= 0.0 && shadowing_std_db.is_finite())
    {
        return Err(invalid);
    }
    let shadowing = Normal::new(0.0, shadowing_std_db).map_err(|_| invalid)?;
    let small_scale = Normal::new(
        (k_factor / (k_factor + 1.0)).sqrt(),
        (1.0 / (k_factor + 1.0)).sqrt(),
    )
    .map_err(|_| invalid)?;
    let gain_db = db(gain);
    let gains = Array2::from_shape_simple_fn((n_r, n_t), || {
        linear(gain_db - shadowing.sample(rng))
    });
    let re = Array2::from_shape_simple_fn((n_r, n_t), || small_scale.sample(rng));
    let im = Array2::from_shape_simple_fn((n_r, n_t), || small_scale.sample(rng));
    Ok(Array2::from_shape_fn((n_r, n_t), |idx| {
        (gains[idx] / 2.0).sqrt() * Complex::new(re[idx], im[idx])
    }))
}

/// Returns the identity channel of size `n_r x n_t`.
pub fn identity_channel(n_r: usize, n_t: usize) -> CMatrix {
    linalg::eye(n_r, n_t)
}

/// Returns the eigenmodes of a channel.
///
/// The eigenmodes are the squared singular values of the channel matrix, in
/// decreasing order.
pub fn eigenmodes(h: &CMatrix) -> Vec<f64> {
    linalg::singular_values(h)
        .into_iter()
        .map(|s| s * s)
        .collect()
}

/// Complex AWGN channel simulation.
///
/// This struct is used to add circularly-symmetric complex Gaussian noise
/// to symbols.
#[derive(Debug, Clone)]
pub struct AwgnChannel {
    distr: Normal<f64>,
}

impl AwgnChannel {
    /// Creates a new AWGN channel.
    ///
    /// The channel noise has total variance `noise_power`, split evenly
    /// between the real and the imaginary part.
    ///
    /// # Panics
    ///
    /// This function panics if `noise_power` is negative or not finite.
    pub fn new(noise_power: f64) -> AwgnChannel {
        assert!(noise_power >= 0.0);
        AwgnChannel {
            distr: Normal::new(0.0, (0.5 * noise_power).sqrt()).unwrap(),
        }
    }

    /// Draws a matrix of noise samples.
    pub fn sample<R: Rng>(&self, rng: &mut R, rows: usize, cols: usize) -> CMatrix {
        // Real parts are drawn first, then imaginary parts.
        let re = Array2::from_shape_simple_fn((rows, cols), || self.distr.sample(rng));
        let im = Array2::from_shape_simple_fn((rows, cols), || self.distr.sample(rng));
        Array2::from_shape_fn((rows, cols), |idx| Complex::new(re[idx], im[idx]))
    }

    /// Adds noise to a matrix of symbols.
    ///
    /// The noise is added in-place to `symbols`. An [Rng] is used as
    /// source of randomness.
    pub fn add_noise<R: Rng, S>(&self, rng: &mut R, symbols: &mut ArrayBase<S, Ix2>)
    where
        S: DataMut<Elem = Complex<f64>>,
    {
        let (rows, cols) = symbols.dim();
        *symbols += &self.sample(rng, rows, cols);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::rand::{Rng, SeedableRng};

    #[test]
    fn free_space_gain() {
        // lambda = 1 m, d = 1 / (4 pi) * 10 m gives G = 0.01
        let d = 10.0 / (4.0 * std::f64::consts::PI);
        let g = large_scale_gain(d, SPEED_OF_LIGHT, 1.0, 1.0, 2.0).unwrap();
        assert!((g - 0.01).abs() < 1e-12);
        assert!(matches!(
            large_scale_gain(1e-3, SPEED_OF_LIGHT, 1.0, 1.0, 2.0),
            Err(Error::UnphysicalGain { .. })
        ));
    }

    #[test]
    fn rician_mean() {
        let mut rng = Rng::seed_from_u64(0);
        let k_factor = 3.0;
        let h = fading_channel(&mut rng, 200, 200, 0.5, k_factor, 0.0).unwrap();
        let mean = h.iter().map(|x| x.re).sum::<f64>() / h.len() as f64;
        let expected = (0.25f64).sqrt() * (k_factor / (k_factor + 1.0)).sqrt();
        assert!((mean - expected).abs() < 0.01);
    }

    #[test]
    fn rayleigh_power() {
        let mut rng = Rng::seed_from_u64(1);
        let h = fading_channel(&mut rng, 300, 300, 0.1, 0.0, 0.0).unwrap();
        let power = h.iter().map(|x| x.norm_sqr()).sum::<f64>() / h.len() as f64;
        assert!((power - 0.1).abs() < 0.005);
    }

    #[test]
    fn invalid_fading() {
        let mut rng = Rng::seed_from_u64(1);
        assert!(fading_channel(&mut rng, 2, 2, 0.1, -1.0, 8.0).is_err());
        assert!(matches!(
            fading_channel(&mut rng, 2, 2, 0.1, 0.0, -8.0),
            Err(Error::InvalidFadingParameter { .. })
        ));
        assert!(fading_channel(&mut rng, 2, 2, 0.1, 0.0, f64::NAN).is_err());
        assert!(fading_channel(&mut rng, 2, 2, 0.1, 0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn identity_eigenmodes() {
        let modes = eigenmodes(&identity_channel(3, 3));
        assert_eq!(modes.len(), 3);
        assert!(modes.iter().all(|&x| (x - 1.0).abs() < 1e-12));
    }

    #[test]
    fn noise_power() {
        let channel = AwgnChannel::new(2.0);
        let mut rng = Rng::seed_from_u64(2);
        let n = channel.sample(&mut rng, 100, 1000);
        let power = n.iter().map(|x| x.norm_sqr()).sum::<f64>() / n.len() as f64;
        assert!((power - 2.0).abs() < 0.05);
    }

    #[test]
    fn zero_noise() {
        let channel = AwgnChannel::new(0.0);
        let mut rng = Rng::seed_from_u64(3);
        let mut symbols = linalg::eye(4, 16);
        let symbols_orig = symbols.clone();
        channel.add_noise(&mut rng, &mut symbols);
        assert_eq!(&symbols, &symbols_orig);
    }

    #[test]
    #[should_panic]
    fn negative_noise_power() {
        let _channel = AwgnChannel::new(-3.5);
    }
}
