//! Link simulation.
//!
//! This module contains the orchestration of the link simulation. A
//! [`Sweep`](sweep::Sweep) is built from an immutable
//! [`SimulationConfig`](config::SimulationConfig). Building the sweep
//! validates the configuration and draws everything that stays fixed during
//! the simulation (channel matrix, pilots, payload). Running it transmits
//! every codeword of the payload at every transmit SNR through the
//! [`Link`](link::Link) and aggregates the statistics of each SNR point.

use crate::{alphabet, channel, equalizer, frame, pilot};
use thiserror::Error;

pub mod config;
pub mod link;
pub mod rates;
pub mod sweep;

/// Simulation setup error.
///
/// These errors are detected when the sweep is built, before any codeword
/// is transmitted.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid modulation alphabet.
    #[error(transparent)]
    Alphabet(#[from] alphabet::Error),
    /// Invalid channel parameters.
    #[error(transparent)]
    Channel(#[from] channel::Error),
    /// Invalid pilot parameters.
    #[error(transparent)]
    Pilot(#[from] pilot::Error),
    /// Invalid framing parameters.
    #[error(transparent)]
    Frame(#[from] frame::Error),
    /// Invalid equalizer parameters.
    #[error(transparent)]
    Equalizer(#[from] equalizer::Error),
    /// The list of transmit SNRs is empty.
    #[error("at least one transmit SNR is needed")]
    EmptySnrList,
    /// Some transmit SNR is infinite or NaN.
    #[error("transmit SNR {tx_snr_db} dB is not finite")]
    NonFiniteSnr {
        /// Offending SNR in dB.
        tx_snr_db: f64,
    },
    /// Some antenna count is zero.
    #[error("the number of antennas must be positive (n_r = {n_r}, n_t = {n_t})")]
    NoAntennas {
        /// Number of receive antennas.
        n_r: usize,
        /// Number of transmit antennas.
        n_t: usize,
    },
    /// The payload is empty.
    #[error("the payload is empty")]
    EmptyPayload,
    /// The thread pool could not be created.
    #[error("could not create thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
