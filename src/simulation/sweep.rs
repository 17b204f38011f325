//! SNR sweep.
//!
//! The [`Sweep`] transmits the whole payload, split in codewords, at each of
//! the configured transmit SNRs. The channel matrix, the pilots and the
//! payload are drawn once when the sweep is built and are shared read-only by
//! all the transmissions.

use super::{
    config::{ChannelModel, Payload, SimulationConfig},
    link::{CodewordFailure, CodewordRecord, Link, Transmission},
    rates::{is_outage, Rates},
    Error,
};
use crate::{
    alphabet::Alphabet,
    channel,
    detector::Detector,
    frame::FrameCodec,
    linalg::CMatrix,
    pilot,
    rand::{codeword_rng, setup_rng},
};
use rand::{distributions::Standard, Rng};
use rayon::prelude::*;
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::Sender,
        Arc,
    },
    time::{Duration, Instant},
};

// Sample sizes below which the statistics are not reliable
const MIN_PAYLOAD_BITS: usize = 10_000;
const MIN_TRANSMISSIONS: usize = 10_000;

/// SNR sweep.
///
/// This struct is used to set up and run a link simulation.
#[derive(Debug)]
pub struct Sweep {
    config: SimulationConfig,
    alphabet: Alphabet,
    codec: FrameCodec,
    codeword_size: usize,
    rates: Rates,
    h: CMatrix,
    pilot: CMatrix,
    eigenmodes: Vec<f64>,
    payload: Vec<u8>,
    detector: Box<dyn Detector>,
    reporter: Option<Reporter>,
    abort: Arc<AtomicBool>,
}

/// Progress reporter.
///
/// A reporter can optionally be passed to the sweep to receive the
/// statistics of each SNR point as soon as it is finished.
#[derive(Debug, Clone)]
pub struct Reporter {
    /// Sender element of a channel used to send the reports.
    pub tx: Sender<Report>,
}

/// Progress report.
#[derive(Debug, Clone, PartialEq)]
pub enum Report {
    /// Summary of a finished SNR point.
    Statistics(Summary),
    /// The sweep has finished.
    Finished,
}

/// Aggregated statistics of an SNR point.
///
/// Failed codewords are not included in the aggregates. If every codeword
/// failed, the rates and averages are NaN, since nothing was measured.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    /// Transmit SNR in dB.
    pub tx_snr_db: f64,
    /// Number of codewords transmitted.
    pub codewords: usize,
    /// Number of codewords whose transmission failed.
    pub failed_codewords: usize,
    /// Number of symbol errors.
    pub symbol_errors: u64,
    /// Number of bit errors.
    pub bit_errors: u64,
    /// Number of block errors.
    pub block_errors: u64,
    /// Symbol error rate.
    pub ser: f64,
    /// Bit error rate.
    pub ber: f64,
    /// Block error rate.
    pub bler: f64,
    /// Transmit Eb/N0 in dB.
    pub tx_ebn0_db: f64,
    /// Average receive Eb/N0 in dB.
    pub rx_ebn0_db: f64,
    /// Average mean squared error of the channel estimates.
    pub channel_mse: f64,
    /// Whether the transmit Eb/N0 is below the Shannon limit.
    pub tx_outage: bool,
    /// Number of codewords whose receive Eb/N0 is below the Shannon limit.
    pub rx_outages: usize,
    /// Elapsed time for this SNR point.
    pub elapsed: Duration,
    /// Throughput in Mbps (referred to payload bits).
    pub throughput_mbps: f64,
}

/// Statistics of an SNR point.
#[derive(Debug)]
pub struct SnrStatistics {
    /// Aggregated statistics.
    pub summary: Summary,
    /// Statistics of each successful codeword, in codeword order.
    pub records: Vec<CodewordRecord>,
    /// Failed codewords, in codeword order.
    pub failures: Vec<CodewordFailure>,
    /// Detected payload bits.
    ///
    /// The bits of failed codewords are set to zero, so that this has the
    /// same length as the transmitted payload.
    pub received_payload: Vec<u8>,
}

impl Sweep {
    /// Creates a new sweep.
    ///
    /// The configuration is validated, and the channel matrix, the payload
    /// and the pilots are drawn (in this order) from the setup stream.
    ///
    /// # Examples
    /// ```
    /// # use mimo_link::simulation::{config::SimulationConfig, sweep::Sweep};
    /// let config = SimulationConfig {
    ///     tx_snrs_db: vec![20.0],
    ///     ..SimulationConfig::default()
    /// };
    /// let sweep = Sweep::new(config, None).unwrap();
    /// assert_eq!(sweep.num_codewords(), 10);
    /// assert_eq!(sweep.eigenmodes().len(), 4);
    /// ```
    pub fn new(config: SimulationConfig, reporter: Option<Reporter>) -> Result<Sweep, Error> {
        config.validate()?;
        let alphabet = Alphabet::new(config.family, config.order)?;
        let codeword_size = config.codeword_size(&alphabet);
        if codeword_size != config.codeword_size {
            log::warn!(
                "codeword size {} is not a multiple of {} bits per symbol; using {}",
                config.codeword_size,
                alphabet.bits_per_symbol(),
                codeword_size
            );
        }
        let codec = config.frame_codec(&alphabet)?;
        let rates = Rates::new(
            codeword_size,
            alphabet.bits_per_symbol(),
            config.n_r,
            config.n_t,
        );

        let mut rng = setup_rng(config.seed);
        let h = match config.channel {
            ChannelModel::Fading => channel::fading_channel(
                &mut rng,
                config.n_r,
                config.n_t,
                config.large_scale_gain()?,
                config.k_factor,
                config.shadowing_std_db,
            )?,
            ChannelModel::Identity => channel::identity_channel(config.n_r, config.n_t),
        };
        let payload = match &config.payload {
            Payload::Random { size } => (&mut rng)
                .sample_iter(Standard)
                .map(<u8 as From<bool>>::from)
                .take(*size)
                .collect(),
            Payload::Bits(bits) => bits.clone(),
        };
        let pilot = pilot::generate_pilot(&mut rng, config.n_t, config.n_pilot)?;
        let eigenmodes = channel::eigenmodes(&h);
        log::debug!("channel eigenmodes: {:?}", eigenmodes);

        if payload.len() < MIN_PAYLOAD_BITS {
            log::warn!(
                "payload of {} bits is too small for reliable statistics",
                payload.len()
            );
        }
        let num_codewords = payload.len().div_ceil(codeword_size);
        if num_codewords < MIN_TRANSMISSIONS {
            log::warn!("{num_codewords} transmissions per SNR point may give unreliable statistics");
        }
        if config.perfect_csi {
            log::warn!("perfect CSI mode: the data bypasses the channel");
        }

        Ok(Sweep {
            detector: config.detector.build_detector(),
            config,
            alphabet,
            codec,
            codeword_size,
            rates,
            h,
            pilot,
            eigenmodes,
            payload,
            reporter,
            abort: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Returns the configuration of the sweep.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Returns the modulation alphabet.
    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    /// Returns the codeword size in bits.
    ///
    /// This is the configured codeword size rounded up to a multiple of the
    /// bits per symbol.
    pub fn codeword_size(&self) -> usize {
        self.codeword_size
    }

    /// Returns the rate parameters of the link.
    pub fn rates(&self) -> &Rates {
        &self.rates
    }

    /// Returns the channel matrix.
    pub fn channel(&self) -> &CMatrix {
        &self.h
    }

    /// Returns the pilot matrix.
    pub fn pilot(&self) -> &CMatrix {
        &self.pilot
    }

    /// Returns the channel eigenmodes.
    pub fn eigenmodes(&self) -> &[f64] {
        &self.eigenmodes
    }

    /// Returns the payload bits.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Returns the number of codewords per SNR point.
    pub fn num_codewords(&self) -> usize {
        self.payload.len().div_ceil(self.codeword_size)
    }

    /// Returns the abort flag.
    ///
    /// Setting this flag stops the sweep before the next SNR point starts.
    pub fn abort_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.abort)
    }

    /// Runs the sweep.
    ///
    /// Returns the statistics of each SNR point, in the configured order.
    /// If the sweep is aborted, only the SNR points that were started are
    /// returned.
    pub fn run(&self) -> Result<Vec<SnrStatistics>, Error> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.threads())
            .build()?;
        let link = Link {
            alphabet: &self.alphabet,
            codec: &self.codec,
            h: &self.h,
            pilot: &self.pilot,
            quantizer: self.config.quantizer,
            equalizer: self.config.equalizer,
            detector: &*self.detector,
            rates: self.rates,
            perfect_csi: self.config.perfect_csi,
        };
        let statistics = pool.install(|| {
            self.config
                .tx_snrs_db
                .par_iter()
                .enumerate()
                .filter_map(|(snr_index, &tx_snr_db)| {
                    if self.abort.load(Ordering::Relaxed) {
                        return None;
                    }
                    Some(self.run_snr(&link, snr_index, tx_snr_db))
                })
                .collect()
        });
        if let Some(reporter) = &self.reporter {
            // The receiver may have gone away, in which case there is
            // nobody to report to.
            let _ = reporter.tx.send(Report::Finished);
        }
        Ok(statistics)
    }

    fn run_snr(&self, link: &Link, snr_index: usize, tx_snr_db: f64) -> SnrStatistics {
        let start = Instant::now();
        let outcomes: Vec<Result<Transmission, CodewordFailure>> = (0..self.num_codewords())
            .into_par_iter()
            .map(|codeword| {
                let mut rng = codeword_rng(self.config.seed, snr_index, codeword);
                link.transmit(&mut rng, self.codeword_bits(codeword), tx_snr_db, codeword)
            })
            .collect();

        let mut records = Vec::with_capacity(outcomes.len());
        let mut failures = Vec::new();
        let mut received_payload = Vec::with_capacity(self.payload.len());
        for (codeword, outcome) in outcomes.into_iter().enumerate() {
            let len = self.codeword_bits(codeword).len();
            match outcome {
                Ok(transmission) => {
                    received_payload.extend_from_slice(&transmission.received_bits[..len]);
                    records.push(transmission.record);
                }
                Err(failure) => {
                    log::warn!("{failure}");
                    received_payload.extend(std::iter::repeat(0).take(len));
                    failures.push(failure);
                }
            }
        }

        let summary = Summary::new(
            tx_snr_db,
            self.rates.ebn0_db(tx_snr_db),
            &records,
            failures.len(),
            start.elapsed(),
        );
        if let Some(reporter) = &self.reporter {
            let _ = reporter.tx.send(Report::Statistics(summary.clone()));
        }
        SnrStatistics {
            summary,
            records,
            failures,
            received_payload,
        }
    }

    fn codeword_bits(&self, codeword: usize) -> &[u8] {
        let start = codeword * self.codeword_size;
        let end = (start + self.codeword_size).min(self.payload.len());
        &self.payload[start..end]
    }
}

impl Summary {
    /// Returns whether at least one codeword was received, so that the
    /// rates and averages are meaningful.
    pub fn has_measurements(&self) -> bool {
        self.codewords > self.failed_codewords
    }

    fn new(
        tx_snr_db: f64,
        tx_ebn0_db: f64,
        records: &[CodewordRecord],
        failed_codewords: usize,
        elapsed: Duration,
    ) -> Summary {
        let count = |f: fn(&CodewordRecord) -> usize| records.iter().map(f).sum::<usize>() as u64;
        let symbols = count(|r| r.symbols);
        let bits = count(|r| r.bits);
        let symbol_errors = count(|r| r.symbol_errors);
        let bit_errors = count(|r| r.bit_errors);
        let block_errors = count(|r| usize::from(r.block_error));
        let average = |f: fn(&CodewordRecord) -> f64| {
            records.iter().map(f).sum::<f64>() / records.len() as f64
        };
        Summary {
            tx_snr_db,
            codewords: records.len() + failed_codewords,
            failed_codewords,
            symbol_errors,
            bit_errors,
            block_errors,
            ser: symbol_errors as f64 / symbols as f64,
            ber: bit_errors as f64 / bits as f64,
            bler: block_errors as f64 / records.len() as f64,
            tx_ebn0_db,
            rx_ebn0_db: average(|r| r.rx_ebn0_db),
            channel_mse: average(|r| r.channel_mse),
            tx_outage: is_outage(tx_ebn0_db),
            rx_outages: records.iter().filter(|r| is_outage(r.rx_ebn0_db)).count(),
            elapsed,
            throughput_mbps: 1e-6 * bits as f64 / elapsed.as_secs_f64(),
        }
    }
}
