//! Simulation configuration.
//!
//! The configuration of a sweep is an immutable record. It is validated when
//! the [`Sweep`](super::sweep::Sweep) is built.

use super::Error;
use crate::{
    alphabet::{Alphabet, Family},
    channel,
    detector::factory::DetectorImplementation,
    equalizer,
    frame::{Checksum, FrameCodec},
    pilot,
    quantizer::Quantizer,
    util::linear,
};
use clap::ValueEnum;

/// Channel model.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Default, ValueEnum)]
#[clap(rename_all = "UPPER")]
pub enum ChannelModel {
    /// Rician fading with large-scale path loss and log-normal shadowing.
    #[default]
    Fading,
    /// Identity channel, with one ideal path between each pair of
    /// same-index antennas.
    Identity,
}

impl std::str::FromStr for ChannelModel {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "FADING" => ChannelModel::Fading,
            "IDENTITY" => ChannelModel::Identity,
            _ => return Err("invalid channel model"),
        })
    }
}

impl std::fmt::Display for ChannelModel {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                ChannelModel::Fading => "FADING",
                ChannelModel::Identity => "IDENTITY",
            }
        )
    }
}

/// Payload source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Uniformly random bits, drawn from the setup stream.
    Random {
        /// Number of bits.
        size: usize,
    },
    /// Fixed bits (values 0 and 1).
    Bits(Vec<u8>),
}

impl Payload {
    /// Builds a payload from bytes, unpacking each byte MSB first.
    ///
    /// # Examples
    /// ```
    /// # use mimo_link::simulation::config::Payload;
    /// assert_eq!(
    ///     Payload::from_bytes(&[0xa0]),
    ///     Payload::Bits(vec![1, 0, 1, 0, 0, 0, 0, 0])
    /// );
    /// ```
    pub fn from_bytes(bytes: &[u8]) -> Payload {
        Payload::Bits(
            bytes
                .iter()
                .flat_map(|&byte| (0..8).rev().map(move |j| (byte >> j) & 1))
                .collect(),
        )
    }
}

/// Link simulation configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    /// Constellation family.
    pub family: Family,
    /// Constellation order `M`.
    pub order: usize,
    /// Codeword size in bits (rounded up to a multiple of `log2(M)`).
    pub codeword_size: usize,
    /// Checksum polynomial.
    pub crc_polynomial: u64,
    /// Checksum length in bits.
    pub crc_length: usize,
    /// Pilot sequence length.
    pub n_pilot: usize,
    /// Number of receive antennas.
    pub n_r: usize,
    /// Number of transmit antennas.
    pub n_t: usize,
    /// Channel model.
    pub channel: ChannelModel,
    /// Carrier frequency in Hz.
    pub carrier_frequency: f64,
    /// Transmitter to receiver distance in meters.
    pub distance: f64,
    /// Transmit antenna gain (linear).
    pub antenna_gain_tx: f64,
    /// Receive antenna gain (linear).
    pub antenna_gain_rx: f64,
    /// Path loss exponent.
    pub path_loss_exponent: f64,
    /// Shadowing standard deviation in dB.
    pub shadowing_std_db: f64,
    /// Rician K-factor.
    pub k_factor: f64,
    /// Receiver quantizer.
    pub quantizer: Quantizer,
    /// Equalization algorithm.
    pub equalizer: equalizer::Algorithm,
    /// Symbol detector.
    pub detector: DetectorImplementation,
    /// Transmit SNRs in dB.
    pub tx_snrs_db: Vec<f64>,
    /// Seed of all the random streams.
    pub seed: u64,
    /// Replaces the channel by the identity for the data (debugging aid).
    ///
    /// The pilots still go through the channel, so channel estimation and
    /// its statistics are not affected.
    pub perfect_csi: bool,
    /// Number of worker threads (`None` uses all the CPUs).
    pub threads: Option<usize>,
    /// Payload to transmit.
    pub payload: Payload,
}

impl Default for SimulationConfig {
    fn default() -> SimulationConfig {
        SimulationConfig {
            family: Family::Qam,
            order: 64,
            codeword_size: 1024,
            crc_polynomial: 0b1001_0011,
            crc_length: 24,
            n_pilot: 4,
            n_r: 4,
            n_t: 4,
            channel: ChannelModel::Fading,
            carrier_frequency: 1.8e6,
            distance: 100.0,
            antenna_gain_tx: 1.0,
            antenna_gain_rx: 1.0,
            path_loss_exponent: 2.0,
            shadowing_std_db: 8.0,
            k_factor: 0.0,
            quantizer: Quantizer::infinite(),
            equalizer: equalizer::Algorithm::Mmse,
            detector: DetectorImplementation::Ml,
            tx_snrs_db: vec![3.0, 10.0, 20.0, 30.0, 40.0, 45.0, 50.0, 60.0, 70.0, 80.0],
            seed: 7,
            perfect_csi: false,
            threads: None,
            payload: Payload::Random { size: 10_000 },
        }
    }
}

impl SimulationConfig {
    /// Checks the configuration.
    ///
    /// All the errors that do not depend on random draws are detected here.
    ///
    /// # Examples
    /// ```
    /// # use mimo_link::simulation::config::SimulationConfig;
    /// assert!(SimulationConfig::default().validate().is_ok());
    /// let config = SimulationConfig {
    ///     n_pilot: 1,
    ///     ..SimulationConfig::default()
    /// };
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), Error> {
        if self.n_r == 0 || self.n_t == 0 {
            return Err(Error::NoAntennas {
                n_r: self.n_r,
                n_t: self.n_t,
            });
        }
        if self.tx_snrs_db.is_empty() {
            return Err(Error::EmptySnrList);
        }
        if let Some(&tx_snr_db) = self.tx_snrs_db.iter().find(|snr| !snr.is_finite()) {
            return Err(Error::NonFiniteSnr { tx_snr_db });
        }
        match &self.payload {
            Payload::Random { size: 0 } => return Err(Error::EmptyPayload),
            Payload::Bits(bits) if bits.is_empty() => return Err(Error::EmptyPayload),
            _ => (),
        }
        let alphabet = Alphabet::new(self.family, self.order)?;
        self.frame_codec(&alphabet)?;
        if self.n_pilot < self.n_t {
            return Err(pilot::Error::InsufficientPilotLength {
                n_pilot: self.n_pilot,
                n_t: self.n_t,
            }
            .into());
        }
        if self.equalizer == equalizer::Algorithm::Mmse {
            if let Some(rho) = self
                .tx_snrs_db
                .iter()
                .map(|&snr| linear(snr))
                .find(|rho| !(*rho > 0.0))
            {
                return Err(equalizer::Error::InvalidEqualizerParameter { rho }.into());
            }
        }
        if self.channel == ChannelModel::Fading {
            self.large_scale_gain()?;
        }
        Ok(())
    }

    /// Returns the codeword size rounded up to a multiple of the bits per
    /// symbol of `alphabet`.
    pub fn codeword_size(&self, alphabet: &Alphabet) -> usize {
        let k = alphabet.bits_per_symbol();
        self.codeword_size.div_ceil(k) * k
    }

    /// Builds the frame codec for `alphabet`.
    pub fn frame_codec(&self, alphabet: &Alphabet) -> Result<FrameCodec, Error> {
        let checksum = Checksum::new(
            self.crc_polynomial,
            self.crc_length,
            self.codeword_size(alphabet),
        )?;
        Ok(FrameCodec::new(checksum, self.n_t)?)
    }

    /// Returns the large-scale gain of the fading channel.
    pub fn large_scale_gain(&self) -> Result<f64, channel::Error> {
        channel::large_scale_gain(
            self.distance,
            self.carrier_frequency,
            self.antenna_gain_tx,
            self.antenna_gain_rx,
            self.path_loss_exponent,
        )
    }

    /// Returns the number of worker threads.
    pub fn threads(&self) -> usize {
        self.threads.unwrap_or_else(num_cpus::get)
    }
}
