//! # Reproducible random streams
//!
//! This module uses the [`ChaCha8Rng`] RNG from the [rand_chacha] crate
//! to achieve reproducible random number generation. A simulation is driven
//! by a single seed. The setup stream (stream 0) is used for everything that
//! is drawn once per sweep (payload, channel matrix, pilots), while each
//! codeword transmission gets an independent stream derived from its SNR
//! point and codeword index, so that results do not depend on the order in
//! which parallel tasks run.
//!
//! # Examples
//! ```
//! # use mimo_link::rand::*;
//! let mut a = codeword_rng(42, 3, 17);
//! let mut b = codeword_rng(42, 3, 17);
//! assert_eq!(a.next_u64(), b.next_u64());
//! let mut c = codeword_rng(42, 3, 18);
//! assert_ne!(codeword_rng(42, 3, 17).next_u64(), c.next_u64());
//! ```
use rand_chacha::ChaCha8Rng;
pub use rand_chacha::rand_core::SeedableRng;
pub use rand_core::RngCore;

/// The RNG used in throughout this crate for algorithms using pseudorandom
/// generation.
pub type Rng = ChaCha8Rng;

/// Returns the setup stream for a seed.
///
/// This stream is used for the draws that happen once per sweep.
pub fn setup_rng(seed: u64) -> Rng {
    Rng::seed_from_u64(seed)
}

/// Returns the stream for a single codeword transmission.
///
/// The stream number is built from the index of the SNR point and the index
/// of the codeword, and never collides with the setup stream.
///
/// # Panics
///
/// Panics if `snr_index` or `codeword` do not fit in 31 and 32 bits
/// respectively.
pub fn codeword_rng(seed: u64, snr_index: usize, codeword: usize) -> Rng {
    let snr_index = u64::try_from(snr_index).unwrap();
    let codeword = u64::try_from(codeword).unwrap();
    assert!(snr_index < 1 << 31);
    assert!(codeword < 1 << 32);
    let mut rng = Rng::seed_from_u64(seed);
    rng.set_stream(((snr_index + 1) << 32) | codeword);
    rng
}
