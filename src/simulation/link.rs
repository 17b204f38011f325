//! Single codeword transmission.
//!
//! The [`Link`] holds everything that stays fixed during a sweep and
//! transmits one codeword at one transmit SNR. A transmission goes through
//! the stages listed in [`Stage`]. A failure in a stage aborts the codeword
//! only, and is returned as a [`CodewordFailure`] carrying the context in
//! which it happened.

use super::rates::{is_outage, Rates};
use crate::{
    alphabet::Alphabet,
    channel::AwgnChannel,
    detector::Detector,
    equalizer::{self, Algorithm},
    estimation::{self, Estimator},
    frame::FrameCodec,
    linalg::{self, CMatrix},
    quantizer::Quantizer,
    rand::Rng,
    util::{db, hamming_distance, linear},
};
use thiserror::Error;

/// Stage of a codeword transmission.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Stage {
    /// Framing of the payload and checksum into a symbol block.
    Assemble,
    /// Channel and noise application to data and pilots.
    Transmit,
    /// Quantization of the received samples.
    Quantize,
    /// Least-squares channel estimation.
    EstimateChannel,
    /// Computation of the equalization matrix.
    Equalize,
    /// Symbol detection and checksum verification.
    Detect,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Stage::Assemble => "assembly",
                Stage::Transmit => "transmission",
                Stage::Quantize => "quantization",
                Stage::EstimateChannel => "channel estimation",
                Stage::Equalize => "equalization",
                Stage::Detect => "detection",
            }
        )
    }
}

/// Error raised during a codeword transmission.
#[derive(Debug, Error)]
pub enum LinkError {
    /// The channel could not be estimated.
    #[error(transparent)]
    Estimation(#[from] estimation::Error),
    /// The channel could not be equalized.
    #[error(transparent)]
    Equalizer(#[from] equalizer::Error),
    /// The noise variance is not a finite non-negative number.
    #[error("invalid noise variance {variance}")]
    NoiseVariance {
        /// Offending noise variance.
        variance: f64,
    },
}

/// Failed codeword transmission.
#[derive(Debug, Error)]
#[error(
    "codeword {codeword} at {tx_snr_db} dB failed in {stage} \
     ({n_r}x{n_t} channel): {source}"
)]
pub struct CodewordFailure {
    /// Index of the codeword.
    pub codeword: usize,
    /// Transmit SNR in dB.
    pub tx_snr_db: f64,
    /// Stage in which the transmission failed.
    pub stage: Stage,
    /// Number of receive antennas.
    pub n_r: usize,
    /// Number of transmit antennas.
    pub n_t: usize,
    /// Underlying error.
    pub source: LinkError,
}

/// Statistics of a single codeword transmission.
#[derive(Debug, Clone, PartialEq)]
pub struct CodewordRecord {
    /// Index of the codeword.
    pub codeword: usize,
    /// Transmit SNR in dB.
    pub tx_snr_db: f64,
    /// Mean 2-norm of the transmitted symbol vectors (block columns).
    pub ex: f64,
    /// Number of wrongly detected payload symbols.
    pub symbol_errors: usize,
    /// Number of payload symbols.
    pub symbols: usize,
    /// Number of wrongly detected payload bits.
    pub bit_errors: usize,
    /// Number of payload bits.
    pub bits: usize,
    /// Whether the checksum failed.
    pub block_error: bool,
    /// Noise power in dBm.
    pub noise_power_dbm: f64,
    /// Post-equalization SNR of each stream, in dB.
    pub rx_snr_db: Vec<f64>,
    /// Average received SNR in dB.
    pub rx_snr_avg_db: f64,
    /// Path loss in dB.
    pub path_loss_db: f64,
    /// Transmit Eb/N0 in dB.
    pub tx_ebn0_db: f64,
    /// Receive Eb/N0 in dB.
    pub rx_ebn0_db: f64,
    /// Mean squared error of the channel estimate.
    pub channel_mse: f64,
}

impl CodewordRecord {
    /// Returns the symbol error rate.
    pub fn ser(&self) -> f64 {
        self.symbol_errors as f64 / self.symbols as f64
    }

    /// Returns the bit error rate.
    pub fn ber(&self) -> f64 {
        self.bit_errors as f64 / self.bits as f64
    }
}

/// Successful codeword transmission.
#[derive(Debug, Clone, PartialEq)]
pub struct Transmission {
    /// Statistics of the transmission.
    pub record: CodewordRecord,
    /// Detected payload bits.
    pub received_bits: Vec<u8>,
}

/// MIMO link.
///
/// The link borrows the parts of a sweep that stay fixed for every
/// codeword.
#[derive(Debug)]
pub struct Link<'a> {
    /// Modulation alphabet.
    pub alphabet: &'a Alphabet,
    /// Frame codec.
    pub codec: &'a FrameCodec,
    /// Channel matrix.
    pub h: &'a CMatrix,
    /// Pilot matrix.
    pub pilot: &'a CMatrix,
    /// Receiver quantizer.
    pub quantizer: Quantizer,
    /// Equalization algorithm.
    pub equalizer: Algorithm,
    /// Symbol detector.
    pub detector: &'a dyn Detector,
    /// Rate parameters.
    pub rates: Rates,
    /// Sends the data through the identity channel instead of `h`.
    pub perfect_csi: bool,
}

impl Link<'_> {
    /// Transmits one codeword.
    ///
    /// The payload bits of the codeword are mapped to symbols, framed with
    /// their checksum and sent through the channel, together with the
    /// pilots, at a transmit SNR `tx_snr_db`. The receiver estimates the
    /// channel, equalizes, detects and verifies the checksum.
    ///
    /// The noise is drawn from `rng`, for the data first and for the pilots
    /// second.
    pub fn transmit(
        &self,
        rng: &mut Rng,
        payload_bits: &[u8],
        tx_snr_db: f64,
        codeword: usize,
    ) -> Result<Transmission, CodewordFailure> {
        let (n_r, n_t) = self.h.dim();
        let fail = |stage: Stage, source: LinkError| CodewordFailure {
            codeword,
            tx_snr_db,
            stage,
            n_r,
            n_t,
            source,
        };

        // Framing
        let frame = self.codec.assemble(payload_bits, self.alphabet);
        let x = &frame.block;
        let channel_uses = x.ncols();
        let ex = x
            .columns()
            .into_iter()
            .map(|col| col.iter().map(|z| z.norm_sqr()).sum::<f64>().sqrt())
            .sum::<f64>()
            / channel_uses as f64;
        let p_sym_dbm = db(ex * super::rates::SUBCARRIER_SPACING / n_t as f64) + 30.0;
        let p_sym = linear(p_sym_dbm);
        let noise_power_dbm = p_sym_dbm - tx_snr_db;
        let rho = linear(tx_snr_db);
        let tx_ebn0_db = self.rates.ebn0_db(tx_snr_db);

        // Data and pilots through the channel
        let noise_power = linear(noise_power_dbm);
        let y = if self.perfect_csi {
            receive(rng, &linalg::eye(n_r, n_t), x, noise_power, p_sym)
        } else {
            receive(rng, self.h, x, noise_power, p_sym)
        }
        .map_err(|e| fail(Stage::Transmit, e))?;
        let t = receive(rng, self.h, self.pilot, noise_power, p_sym)
            .map_err(|e| fail(Stage::Transmit, e))?;

        // Receiver front-end
        let y = self.quantizer.quantize(&y);
        let t = self.quantizer.quantize(&t);

        // Channel estimation
        let h_hat = estimation::estimate(self.pilot, &t, Estimator::LeastSquares)
            .map_err(|e| fail(Stage::EstimateChannel, e.into()))?;
        let channel_mse = estimation::mean_squared_error(self.h, &h_hat);
        let h_hat_energy = linalg::frobenius_norm(&h_hat).powi(2);
        let path_loss_db = p_sym_dbm - db(p_sym * h_hat_energy);
        let rx_snr_avg_db = db(rho * h_hat_energy);
        let rx_ebn0_db = self.rates.ebn0_db(rx_snr_avg_db);

        // Equalization
        let equalization = equalizer::equalize(&h_hat, self.equalizer, rho)
            .map_err(|e| fail(Stage::Equalize, e.into()))?;
        if log::log_enabled!(log::Level::Trace) {
            log::trace!(
                "codeword {} at {} dB: analytic SNR {:?}, realized SINR {:?}",
                codeword,
                tx_snr_db,
                equalization.rx_snr,
                equalizer::post_equalization_snr(&equalization.w, &h_hat, rho)
            );
        }
        let rx_snr_db = equalization.rx_snr.iter().map(|&snr| db(snr)).collect();
        let z = equalization.w.dot(&y);

        // Detection and checksum verification
        let (payload_symbols, checksum_symbols) = self.codec.disassemble(&z, &frame.layout);
        let detection = self.detector.detect(&payload_symbols, self.alphabet);
        let checksum_detection = self.detector.detect(&checksum_symbols, self.alphabet);
        let checksum = self.codec.checksum_from_bits(&checksum_detection.bits);
        let block_error = !self.codec.checksum().verify(checksum, &detection.bits);
        let symbol_errors = detection
            .indices
            .iter()
            .zip(frame.payload.iter())
            .filter(|(a, b)| a != b)
            .count();
        let bit_errors = hamming_distance(&detection.bits, &frame.payload_bits);

        if is_outage(tx_ebn0_db) {
            log::debug!("codeword {codeword} at {tx_snr_db} dB: transmit Eb/N0 below Shannon limit");
        }
        if is_outage(rx_ebn0_db) {
            log::debug!("codeword {codeword} at {tx_snr_db} dB: receive Eb/N0 below Shannon limit");
        }

        Ok(Transmission {
            record: CodewordRecord {
                codeword,
                tx_snr_db,
                ex,
                symbol_errors,
                symbols: frame.payload.len(),
                bit_errors,
                bits: frame.payload_bits.len(),
                block_error,
                noise_power_dbm,
                rx_snr_db,
                rx_snr_avg_db,
                path_loss_db,
                tx_ebn0_db,
                rx_ebn0_db,
                channel_mse,
            },
            received_bits: detection.bits,
        })
    }
}

// Sends `x` through `h` and adds noise of power `noise_power`, scaled by the
// power of the noiseless signal relative to `p_sym`. Since `noise_power` is
// `p_sym / rho`, the realized SNR of each received sample is `rho`.
fn receive(
    rng: &mut Rng,
    h: &CMatrix,
    x: &CMatrix,
    noise_power: f64,
    p_sym: f64,
) -> Result<CMatrix, LinkError> {
    let mut signal = h.dot(x);
    let mean_power = linalg::frobenius_norm(&signal).powi(2) / signal.len() as f64;
    let variance = noise_power * mean_power / p_sym;
    if !(variance >= 0.0 && variance.is_finite()) {
        return Err(LinkError::NoiseVariance { variance });
    }
    AwgnChannel::new(variance).add_noise(rng, &mut signal);
    Ok(signal)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        alphabet::Family,
        channel,
        detector::MaximumLikelihood,
        frame::Checksum,
        pilot::generate_pilot,
        rand::{codeword_rng, setup_rng},
    };
    use num_complex::Complex;
    use rand::Rng as _;

    // Everything a link borrows
    struct Parts {
        alphabet: Alphabet,
        codec: FrameCodec,
        h: CMatrix,
        pilot: CMatrix,
        detector: MaximumLikelihood,
        rates: Rates,
    }

    impl Parts {
        fn new(order: usize, h: CMatrix) -> Parts {
            let (n_r, n_t) = h.dim();
            let alphabet = Alphabet::new(Family::Qam, order).unwrap();
            let checksum = Checksum::new(0b1001_0011, 8, 256).unwrap();
            let codec = FrameCodec::new(checksum, n_t).unwrap();
            let pilot = generate_pilot(&mut setup_rng(1), n_t, 4).unwrap();
            let rates = Rates::new(256, alphabet.bits_per_symbol(), n_r, n_t);
            Parts {
                alphabet,
                codec,
                h,
                pilot,
                detector: MaximumLikelihood::new(),
                rates,
            }
        }

        fn link(&self, equalizer: Algorithm, perfect_csi: bool) -> Link<'_> {
            Link {
                alphabet: &self.alphabet,
                codec: &self.codec,
                h: &self.h,
                pilot: &self.pilot,
                quantizer: Quantizer::infinite(),
                equalizer,
                detector: &self.detector,
                rates: self.rates,
                perfect_csi,
            }
        }
    }

    fn random_bits(n: usize) -> Vec<u8> {
        let mut rng = setup_rng(99);
        (0..n).map(|_| rng.gen_range(0..2)).collect()
    }

    #[test]
    fn ex_is_mean_column_norm() {
        // 8 bits and an 8-bit checksum make 8 QPSK symbols, which fill 4
        // columns of 2 unit-energy symbols each
        let parts = Parts::new(4, linalg::eye(2, 2));
        let link = parts.link(Algorithm::Zf, false);
        let record = link
            .transmit(&mut codeword_rng(0, 0, 0), &random_bits(8), 300.0, 0)
            .unwrap()
            .record;
        assert!((record.ex - 2.0f64.sqrt()).abs() < 1e-12);

        // 16-QAM block with a zero padding symbol
        let parts = Parts::new(16, linalg::eye(2, 2));
        let link = parts.link(Algorithm::Zf, false);
        let bits = random_bits(36);
        let frame = parts.codec.assemble(&bits, &parts.alphabet);
        assert_eq!(frame.layout.padding_symbols, 1);
        let norms: Vec<f64> = frame
            .block
            .columns()
            .into_iter()
            .map(|col| col.iter().map(|z| z.norm_sqr()).sum::<f64>().sqrt())
            .collect();
        let expected = norms.iter().sum::<f64>() / norms.len() as f64;
        let record = link
            .transmit(&mut codeword_rng(0, 0, 0), &bits, 300.0, 0)
            .unwrap()
            .record;
        assert!((record.ex - expected).abs() < 1e-12);
        // P_sym = Ex * 15 kHz / N_t in dBm
        let p_sym_dbm = db(expected * 15e3 / 2.0) + 30.0;
        assert!((record.noise_power_dbm - (p_sym_dbm - 300.0)).abs() < 1e-9);
    }

    #[test]
    fn perfect_csi_bypasses_channel_for_data_only() {
        // The channel swaps the two streams
        let one = Complex::new(1.0, 0.0);
        let zero = Complex::new(0.0, 0.0);
        let swap = CMatrix::from_shape_vec((2, 2), vec![zero, one, one, zero]).unwrap();
        let parts = Parts::new(4, swap);
        let bits = random_bits(200);

        let through_h = parts
            .link(Algorithm::Zf, false)
            .transmit(&mut codeword_rng(5, 0, 0), &bits, 300.0, 0)
            .unwrap()
            .record;
        let perfect_csi = parts
            .link(Algorithm::Zf, true)
            .transmit(&mut codeword_rng(5, 0, 0), &bits, 300.0, 0)
            .unwrap()
            .record;
        // The pilots still see the swap, so the estimate is the same
        assert_eq!(perfect_csi.channel_mse, through_h.channel_mse);
        assert!(through_h.channel_mse < 1e-12);
        assert_eq!(through_h.bit_errors, 0);
        // but the equalizer undoes a swap that the data never went through
        assert!(perfect_csi.bit_errors > 0);
    }

    #[test]
    fn perfect_csi_with_identity_channel() {
        let parts = Parts::new(16, linalg::eye(2, 2));
        let bits = random_bits(200);
        let record = parts
            .link(Algorithm::Mmse, true)
            .transmit(&mut codeword_rng(6, 0, 0), &bits, 300.0, 0)
            .unwrap()
            .record;
        assert_eq!(record.bit_errors, 0);
        assert!(!record.block_error);
    }

    #[test]
    fn rank_deficient_channel_fails_equalization() {
        let parts = Parts::new(4, channel::identity_channel(1, 2));
        let failure = parts
            .link(Algorithm::Zf, false)
            .transmit(&mut codeword_rng(0, 2, 7), &random_bits(64), 40.0, 7)
            .unwrap_err();
        assert_eq!(failure.stage, Stage::Equalize);
        assert_eq!(failure.codeword, 7);
        assert_eq!((failure.n_r, failure.n_t), (1, 2));
        assert_eq!(failure.tx_snr_db, 40.0);
        assert!(matches!(failure.source, LinkError::Equalizer(_)));
    }

    #[test]
    fn overflowing_noise_fails_transmission() {
        // The noise power in linear units overflows to infinity
        let parts = Parts::new(4, linalg::eye(1, 1));
        let failure = parts
            .link(Algorithm::Zf, false)
            .transmit(&mut codeword_rng(0, 0, 0), &random_bits(64), -1e4, 0)
            .unwrap_err();
        assert_eq!(failure.stage, Stage::Transmit);
        assert!(matches!(failure.source, LinkError::NoiseVariance { .. }));
    }
}
