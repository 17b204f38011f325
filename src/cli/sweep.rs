//! Sweep CLI subcommand.
//!
//! This subcommand runs a link simulation over a list of transmit SNRs and
//! prints a progress table with the statistics of each SNR point.
//!
//! # Examples
//!
//! A 4x4 MIMO link with 16-QAM and MMSE equalization can be simulated with
//! ```shell
//! $ mimo-link sweep --order 16 --equalizer MMSE --snrs 0,10,20,30 \
//!       --payload-size 100000 --output-file results.csv
//! ```
//!
//! The payload can also be read from a file, whose bytes are sent MSB
//! first:
//! ```shell
//! $ mimo-link sweep --payload-file image.bmp --n-r 2 --n-t 2 --n-pilot 2
//! ```

use crate::{
    alphabet::Family,
    cli::*,
    detector::factory::DetectorImplementation,
    equalizer,
    quantizer::{self, Quantizer},
    simulation::{
        config::{ChannelModel, Payload, SimulationConfig},
        link::CodewordRecord,
        sweep::{Report, Reporter, SnrStatistics, Summary, Sweep},
    },
};
use clap::Parser;
use console::Term;
use std::{
    error::Error,
    fs::File,
    io::Write,
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::{self, Receiver},
        Arc,
    },
    time::Duration,
};

/// Sweep CLI arguments.
#[derive(Debug, Parser)]
#[command(about = "Performs a MIMO link simulation")]
pub struct Args {
    /// Output CSV file with per-codeword results
    #[arg(long)]
    output_file: Option<String>,
    /// Modulation family
    #[arg(long, default_value_t = Family::Qam)]
    family: Family,
    /// Constellation order (M)
    #[arg(long, default_value = "64")]
    order: usize,
    /// Codeword size (bits)
    #[arg(long, default_value = "1024")]
    codeword_size: usize,
    /// Checksum polynomial (binary with 0b prefix, hex with 0x prefix, or decimal)
    #[arg(long, default_value = "0b10010011", value_parser = parse_polynomial)]
    crc_polynomial: u64,
    /// Checksum length (bits)
    #[arg(long, default_value = "24")]
    crc_length: usize,
    /// Pilot sequence length
    #[arg(long, default_value = "4")]
    n_pilot: usize,
    /// Number of receive antennas
    #[arg(long, default_value = "4")]
    n_r: usize,
    /// Number of transmit antennas
    #[arg(long, default_value = "4")]
    n_t: usize,
    /// Channel model
    #[arg(long, default_value_t = ChannelModel::Fading)]
    channel: ChannelModel,
    /// Carrier frequency (Hz)
    #[arg(long, default_value = "1.8e6")]
    carrier_frequency: f64,
    /// Distance between transmitter and receiver (m)
    #[arg(long, default_value = "100")]
    distance: f64,
    /// Transmit antenna gain (linear)
    #[arg(long, default_value = "1")]
    gain_tx: f64,
    /// Receive antenna gain (linear)
    #[arg(long, default_value = "1")]
    gain_rx: f64,
    /// Path loss exponent
    #[arg(long, default_value = "2")]
    path_loss_exponent: f64,
    /// Shadowing standard deviation (dB)
    #[arg(long, default_value = "8")]
    shadowing_std: f64,
    /// Rician K-factor (0 for Rayleigh fading)
    #[arg(long, default_value = "0")]
    k_factor: f64,
    /// Quantization bits per real dimension (infinite precision if absent)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=16))]
    quantization_bits: Option<u32>,
    /// Maximum number of Lloyd-Max iterations
    #[arg(long, default_value_t = quantizer::DEFAULT_MAX_ITERATIONS)]
    lloyd_max_iter: usize,
    /// Equalizer
    #[arg(long, default_value_t = equalizer::Algorithm::Mmse)]
    equalizer: equalizer::Algorithm,
    /// Detector implementation
    #[arg(long, default_value = "ML")]
    detector: DetectorImplementation,
    /// Transmit SNRs (dB, format "3,10,20")
    #[arg(
        long,
        value_delimiter = ',',
        allow_hyphen_values = true,
        default_value = "3,10,20,30,40,45,50,60,70,80"
    )]
    snrs: Vec<f64>,
    /// Random seed
    #[arg(long, default_value = "7")]
    seed: u64,
    /// Send the data through an identity channel (debugging aid)
    #[arg(long)]
    perfect_csi: bool,
    /// Number of worker threads (defaults to the number of CPUs)
    #[arg(long)]
    threads: Option<usize>,
    /// File whose contents are used as payload
    #[arg(long)]
    payload_file: Option<String>,
    /// Size of the random payload (bits), used if no payload file is given
    #[arg(long, default_value = "10000")]
    payload_size: usize,
}

impl Run for Args {
    fn run(&self) -> Result<(), Box<dyn Error>> {
        let mut output_file = if let Some(f) = &self.output_file {
            Some(File::create(f)?)
        } else {
            None
        };
        let (report_tx, report_rx) = mpsc::channel();
        let reporter = Reporter { tx: report_tx };
        let sweep = Sweep::new(self.config()?, Some(reporter))?;
        self.write_details(std::io::stdout(), &sweep)?;
        let mut progress = Progress::new(report_rx, sweep.abort_flag());
        let progress = std::thread::spawn(move || progress.run());
        let statistics = sweep.run()?;
        match progress.join() {
            Ok(Ok(())) => (),
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err("progress thread panicked".into()),
        }
        if let Some(f) = &mut output_file {
            write_csv(f, &sweep, &statistics)?;
        }
        Ok(())
    }
}

impl Args {
    fn config(&self) -> Result<SimulationConfig, Box<dyn Error>> {
        let payload = match &self.payload_file {
            Some(path) => Payload::from_bytes(&std::fs::read(path)?),
            None => Payload::Random {
                size: self.payload_size,
            },
        };
        let quantizer = match self.quantization_bits {
            Some(bits) => Quantizer::new(bits, self.lloyd_max_iter),
            None => Quantizer::infinite(),
        };
        Ok(SimulationConfig {
            family: self.family,
            order: self.order,
            codeword_size: self.codeword_size,
            crc_polynomial: self.crc_polynomial,
            crc_length: self.crc_length,
            n_pilot: self.n_pilot,
            n_r: self.n_r,
            n_t: self.n_t,
            channel: self.channel,
            carrier_frequency: self.carrier_frequency,
            distance: self.distance,
            antenna_gain_tx: self.gain_tx,
            antenna_gain_rx: self.gain_rx,
            path_loss_exponent: self.path_loss_exponent,
            shadowing_std_db: self.shadowing_std,
            k_factor: self.k_factor,
            quantizer,
            equalizer: self.equalizer,
            detector: self.detector,
            tx_snrs_db: self.snrs.clone(),
            seed: self.seed,
            perfect_csi: self.perfect_csi,
            threads: self.threads,
            payload,
        })
    }

    fn write_details<W: Write>(&self, mut f: W, sweep: &Sweep) -> std::io::Result<()> {
        let config = sweep.config();
        let rates = sweep.rates();
        writeln!(f, "MIMO LINK SIMULATION PARAMETERS")?;
        writeln!(f, "-------------------------------")?;
        writeln!(f, "Simulation:")?;
        writeln!(f, " - Seed: {}", config.seed)?;
        writeln!(f, " - Payload: {} bits", sweep.payload().len())?;
        if let Some(path) = &self.payload_file {
            writeln!(f, " - Payload file: {path}")?;
        }
        writeln!(f, " - Codewords per SNR: {}", sweep.num_codewords())?;
        writeln!(f, " - Threads: {}", config.threads())?;
        writeln!(f, "Transmitter:")?;
        writeln!(f, " - Modulation: {}-{}", config.order, config.family)?;
        writeln!(f, " - Codeword size: {} bits", sweep.codeword_size())?;
        writeln!(
            f,
            " - Checksum: {:#b} ({} bits)",
            config.crc_polynomial, config.crc_length
        )?;
        writeln!(f, " - Pilot length: {}", config.n_pilot)?;
        writeln!(f, " - Streams: {}", rates.streams)?;
        writeln!(
            f,
            " - Bit rate per stream: {:.1} kbps",
            1e-3 * rates.bit_rate_per_stream
        )?;
        writeln!(f, " - Subcarriers: {}", rates.subcarriers)?;
        writeln!(
            f,
            " - Spectral efficiency: {:.3} bits/s/Hz",
            rates.spectral_efficiency
        )?;
        writeln!(f, "Channel:")?;
        writeln!(f, " - Model: {}", config.channel)?;
        writeln!(f, " - Antennas: {}x{}", config.n_r, config.n_t)?;
        if config.channel == ChannelModel::Fading {
            writeln!(
                f,
                " - Carrier frequency: {:.3} MHz",
                1e-6 * config.carrier_frequency
            )?;
            writeln!(f, " - Distance: {} m", config.distance)?;
            writeln!(f, " - Path loss exponent: {}", config.path_loss_exponent)?;
            writeln!(f, " - Shadowing std: {} dB", config.shadowing_std_db)?;
            writeln!(f, " - K-factor: {}", config.k_factor)?;
        }
        writeln!(
            f,
            " - Eigenmodes: {}",
            sweep
                .eigenmodes()
                .iter()
                .map(|e| format!("{e:.3e}"))
                .collect::<Vec<_>>()
                .join(", ")
        )?;
        writeln!(f, "Receiver:")?;
        match config.quantizer.bits() {
            Some(bits) => writeln!(f, " - Quantization: {bits} bits")?,
            None => writeln!(f, " - Quantization: infinite precision")?,
        }
        writeln!(f, " - Equalizer: {}", config.equalizer)?;
        writeln!(f, " - Detector: {}", config.detector)?;
        if config.perfect_csi {
            writeln!(f, " - Perfect CSI")?;
        }
        writeln!(f)?;
        Ok(())
    }
}

/// Parses a checksum polynomial.
///
/// The polynomial can be given in binary with a `0b` prefix, in hexadecimal
/// with a `0x` prefix, or in decimal. Underscores are ignored.
pub fn parse_polynomial(s: &str) -> Result<u64, String> {
    let s = s.replace('_', "");
    let parsed = if let Some(bin) = s.strip_prefix("0b") {
        u64::from_str_radix(bin, 2)
    } else if let Some(hex) = s.strip_prefix("0x") {
        u64::from_str_radix(hex, 16)
    } else {
        s.parse()
    };
    parsed.map_err(|e| format!("invalid polynomial {s}: {e}"))
}

fn write_csv<W: Write>(
    mut f: W,
    sweep: &Sweep,
    statistics: &[SnrStatistics],
) -> std::io::Result<()> {
    writeln!(
        f,
        "Codeword,Tx_SNR,Ex,SER,noise_power,Rx_SNR,PL,Avg_BER,Block_Error,BLER,\
         Tx_EbN0,Rx_EbN0,Channel_MSE,Bit_Rate,N_subcarriers"
    )?;
    let rates = sweep.rates();
    for stats in statistics {
        for record in &stats.records {
            writeln!(
                f,
                "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
                record.codeword,
                record.tx_snr_db,
                record.ex,
                record.ser(),
                record.noise_power_dbm,
                format_rx_snr(record),
                record.path_loss_db,
                record.ber(),
                u8::from(record.block_error),
                stats.summary.bler,
                record.tx_ebn0_db,
                record.rx_ebn0_db,
                record.channel_mse,
                rates.bit_rate_per_stream,
                rates.subcarriers
            )?;
        }
    }
    Ok(())
}

fn format_rx_snr(record: &CodewordRecord) -> String {
    record
        .rx_snr_db
        .iter()
        .map(|snr| snr.to_string())
        .collect::<Vec<_>>()
        .join(";")
}

#[derive(Debug)]
struct Progress {
    rx: Receiver<Report>,
    term: Term,
    abort: Arc<AtomicBool>,
}

impl Progress {
    fn new(rx: Receiver<Report>, abort: Arc<AtomicBool>) -> Progress {
        Progress {
            rx,
            term: Term::stdout(),
            abort,
        }
    }

    fn run(&mut self) -> Result<(), Box<dyn Error + Send + Sync + 'static>> {
        ctrlc::set_handler({
            let term = self.term.clone();
            let abort = Arc::clone(&self.abort);
            move || {
                abort.store(true, Ordering::Relaxed);
                let _ = term.write_line("Aborting after the SNR points in progress");
            }
        })?;

        let ret = self.work();
        self.term.write_line("")?;
        self.term.show_cursor()?;
        ret
    }

    fn work(&mut self) -> Result<(), Box<dyn Error + Send + Sync + 'static>> {
        self.term.set_title("mimo-link sweep");
        self.term.hide_cursor()?;
        self.term.write_line(Self::format_header())?;
        // The sweep drops the sender when it is done, so a receive error
        // also means that it has finished.
        while let Ok(Report::Statistics(stats)) = self.rx.recv() {
            self.term.write_line(&Self::format_progress(&stats))?;
        }
        Ok(())
    }

    fn format_header() -> &'static str {
        "  Tx SNR | Codewords |  Failed | Bit errs | Blk errs |     SER |     BER |    BLER | Rx Eb/N0 | Throughp | Elapsed\n\
         ---------|-----------|---------|----------|----------|---------|---------|---------|----------|----------|----------"
    }

    fn format_progress(stats: &Summary) -> String {
        let rates = if stats.has_measurements() {
            format!(
                "{:7.2e} | {:7.2e} | {:7.2e} | {:8.2}",
                stats.ser, stats.ber, stats.bler, stats.rx_ebn0_db
            )
        } else {
            format!("{:>7} | {:>7} | {:>7} | {:>8}", "-", "-", "-", "-")
        };
        format!(
            "{:8.2} | {:9} | {:7} | {:8} | {:8} | {} | {:8.3} | {}",
            stats.tx_snr_db,
            stats.codewords,
            stats.failed_codewords,
            stats.bit_errors,
            stats.block_errors,
            rates,
            stats.throughput_mbps,
            humantime::format_duration(Duration::from_secs(stats.elapsed.as_secs()))
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn polynomials() {
        assert_eq!(parse_polynomial("0b1001_0011"), Ok(0x93));
        assert_eq!(parse_polynomial("0x93"), Ok(0x93));
        assert_eq!(parse_polynomial("147"), Ok(0x93));
        assert!(parse_polynomial("0b102").is_err());
    }

    #[test]
    fn csv_output() {
        let config = SimulationConfig {
            order: 4,
            n_r: 1,
            n_t: 1,
            n_pilot: 1,
            codeword_size: 100,
            channel: ChannelModel::Identity,
            payload: Payload::Random { size: 250 },
            tx_snrs_db: vec![20.0, 30.0],
            threads: Some(1),
            ..SimulationConfig::default()
        };
        let sweep = Sweep::new(config, None).unwrap();
        let statistics = sweep.run().unwrap();
        let mut out = Vec::new();
        write_csv(&mut out, &sweep, &statistics).unwrap();
        let out = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        // header plus 3 codewords per SNR
        assert_eq!(lines.len(), 7);
        assert!(lines[0].starts_with("Codeword,Tx_SNR,"));
        for line in &lines[1..] {
            assert_eq!(line.split(',').count(), 15);
        }
        assert!(lines[1].starts_with("0,20,"));
        assert!(lines[6].starts_with("2,30,"));
    }

    #[test]
    fn progress_without_measurements() {
        let config = SimulationConfig {
            order: 4,
            n_r: 1,
            n_t: 2,
            n_pilot: 2,
            codeword_size: 100,
            channel: ChannelModel::Identity,
            equalizer: equalizer::Algorithm::Zf,
            payload: Payload::Random { size: 250 },
            tx_snrs_db: vec![40.0],
            threads: Some(1),
            ..SimulationConfig::default()
        };
        let statistics = Sweep::new(config, None).unwrap().run().unwrap();
        let summary = &statistics[0].summary;
        assert_eq!(summary.failed_codewords, 3);
        let line = Progress::format_progress(summary);
        assert!(!line.contains("NaN"));
        assert_eq!(line.split('|').count(), 11);
    }
}
