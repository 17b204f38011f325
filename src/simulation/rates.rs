//! Bit rate and bandwidth bookkeeping.
//!
//! Each codeword is sent in one transmission time interval (TTI) of 1 ms
//! over OFDM subcarriers of 15 kHz. The subcarrier count per spatial stream
//! is the smallest one able to carry the codeword, and the resulting spectral
//! efficiency is used to convert between SNR and Eb/N0.

use crate::util::db;

/// Subcarrier spacing in Hz.
pub const SUBCARRIER_SPACING: f64 = 15e3;
/// Transmission time interval in seconds.
pub const TTI: f64 = 1e-3;
/// Eb/N0 below which reliable communication is impossible (Shannon limit),
/// in dB.
pub const SHANNON_LIMIT_EBN0_DB: f64 = -1.59;

// Integer versions of the constants above
const SUBCARRIER_SPACING_HZ: u64 = 15_000;
const TTIS_PER_SECOND: u64 = 1_000;

/// Rate parameters of a link.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Rates {
    /// Number of spatial streams, `min(n_r, n_t)`.
    pub streams: usize,
    /// Bit rate per stream in bps.
    pub bit_rate_per_stream: f64,
    /// Number of OFDM subcarriers per stream.
    pub subcarriers: usize,
    /// Spectral efficiency per stream in bits/s/Hz.
    pub spectral_efficiency: f64,
}

impl Rates {
    /// Computes the rate parameters.
    ///
    /// `codeword_size` is in bits and `bits_per_symbol` is the modulation
    /// order `k`.
    ///
    /// # Panics
    ///
    /// Panics if any of the arguments is zero.
    pub fn new(codeword_size: usize, bits_per_symbol: usize, n_r: usize, n_t: usize) -> Rates {
        let streams = n_r.min(n_t);
        assert!(codeword_size > 0 && bits_per_symbol > 0 && streams > 0);
        let bits_per_second = codeword_size as u64 * TTIS_PER_SECOND;
        let subcarriers = bits_per_second
            .div_ceil(streams as u64 * bits_per_symbol as u64 * SUBCARRIER_SPACING_HZ)
            as usize;
        let bit_rate_per_stream = codeword_size as f64 / TTI / streams as f64;
        Rates {
            streams,
            bit_rate_per_stream,
            subcarriers,
            spectral_efficiency: bit_rate_per_stream / (subcarriers as f64 * SUBCARRIER_SPACING),
        }
    }

    /// Converts an SNR in dB to Eb/N0 in dB.
    pub fn ebn0_db(&self, snr_db: f64) -> f64 {
        snr_db - db(self.spectral_efficiency)
    }
}

/// Returns whether an Eb/N0 (in dB) is below the Shannon limit.
pub fn is_outage(ebn0_db: f64) -> bool {
    ebn0_db < SHANNON_LIMIT_EBN0_DB
}
