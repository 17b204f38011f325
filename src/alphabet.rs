//! Modulation alphabets.
//!
//! This module builds Gray-coded constellations. The alphabet is an
//! indexable table of [`Symbol`]s, where the position in the table is the
//! symbol index `m`. Each symbol carries its `k = log2(M)` Gray-coded bits,
//! split into an in-phase sub-field (the first `k / 2` bits) and a quadrature
//! sub-field (the remaining bits), together with its complex coordinate.
//!
//! # Examples
//! ```
//! # use mimo_link::alphabet::{Alphabet, Family};
//! let alphabet = Alphabet::new(Family::Qam, 16).unwrap();
//! assert_eq!(alphabet.bits_per_symbol(), 4);
//! let m = alphabet.index_of_bits(&[0, 1, 1, 0]);
//! assert_eq!(alphabet.symbol(m).bits(), &[0, 1, 1, 0]);
//! ```

use clap::ValueEnum;
use enum_iterator::Sequence;
use num_complex::Complex;
use std::f64::consts::PI;
use thiserror::Error;

/// Modulation family.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, ValueEnum, Sequence)]
#[clap(rename_all = "UPPER")]
pub enum Family {
    /// Phase-shift keying.
    Psk,
    /// Square quadrature amplitude modulation.
    Qam,
}

impl std::str::FromStr for Family {
    type Err = String;

    fn from_str(s: &str) -> Result<Family, String> {
        Ok(match s {
            "PSK" => Family::Psk,
            "QAM" => Family::Qam,
            _ => Err(format!("invalid modulation family {s}"))?,
        })
    }
}

impl std::fmt::Display for Family {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(
            f,
            "{}",
            match self {
                Family::Psk => "PSK",
                Family::Qam => "QAM",
            }
        )
    }
}

/// Alphabet construction error.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Error)]
pub enum Error {
    /// The constellation order is not a power of two, or the constellation
    /// is a non-square QAM.
    #[error("unsupported constellation: {order}-{family}")]
    UnsupportedConstellation {
        /// Modulation family.
        family: Family,
        /// Number of symbols requested.
        order: usize,
    },
}

/// Constellation symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    index: usize,
    bits: Vec<u8>,
    split: usize,
    x: Complex<f64>,
}

impl Symbol {
    /// Returns the symbol index `m`.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns the Gray-coded bits of the symbol.
    pub fn bits(&self) -> &[u8] {
        &self.bits
    }

    /// Returns the in-phase bit sub-field.
    pub fn i_bits(&self) -> &[u8] {
        &self.bits[..self.split]
    }

    /// Returns the quadrature bit sub-field.
    pub fn q_bits(&self) -> &[u8] {
        &self.bits[self.split..]
    }

    /// Returns the complex coordinate of the symbol.
    pub fn x(&self) -> Complex<f64> {
        self.x
    }
}

/// Modulation alphabet.
#[derive(Debug, Clone, PartialEq)]
pub struct Alphabet {
    family: Family,
    bits_per_symbol: usize,
    symbols: Vec<Symbol>,
    // symbol index for each Gray code value
    by_code: Vec<usize>,
}

impl Alphabet {
    /// Builds an alphabet of `order` symbols.
    ///
    /// The order must be a power of two. For QAM it must also be a perfect
    /// square (so `log2(order)` is even). The average symbol energy of the
    /// resulting alphabet is one.
    pub fn new(family: Family, order: usize) -> Result<Alphabet, Error> {
        let unsupported = Error::UnsupportedConstellation { family, order };
        if order < 2 || !order.is_power_of_two() {
            return Err(unsupported);
        }
        let k = order.trailing_zeros() as usize;
        let points = match family {
            Family::Psk => psk_points(order),
            Family::Qam => {
                if k % 2 != 0 {
                    return Err(unsupported);
                }
                qam_points(order)
            }
        };
        let energy = points.iter().map(|x| x.norm_sqr()).sum::<f64>() / order as f64;
        let scale = energy.sqrt();
        let mut by_code = vec![0; order];
        let symbols = points
            .into_iter()
            .enumerate()
            .map(|(m, x)| {
                let code = gray(m);
                by_code[code] = m;
                Symbol {
                    index: m,
                    bits: (0..k).rev().map(|b| ((code >> b) & 1) as u8).collect(),
                    split: k / 2,
                    x: x / scale,
                }
            })
            .collect();
        Ok(Alphabet {
            family,
            bits_per_symbol: k,
            symbols,
            by_code,
        })
    }

    /// Returns the modulation family.
    pub fn family(&self) -> Family {
        self.family
    }

    /// Returns the number of symbols `M`.
    pub fn order(&self) -> usize {
        self.symbols.len()
    }

    /// Returns the number of bits per symbol `k`.
    pub fn bits_per_symbol(&self) -> usize {
        self.bits_per_symbol
    }

    /// Returns the symbols, ordered by index.
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// Returns the symbol with index `m`.
    ///
    /// # Panics
    ///
    /// Panics if `m` is not smaller than the alphabet order.
    pub fn symbol(&self, m: usize) -> &Symbol {
        &self.symbols[m]
    }

    /// Returns the index of the symbol carrying some bits.
    ///
    /// # Panics
    ///
    /// Panics if the length of `bits` is not the number of bits per symbol.
    pub fn index_of_bits(&self, bits: &[u8]) -> usize {
        assert_eq!(bits.len(), self.bits_per_symbol);
        let code = bits
            .iter()
            .fold(0, |acc, &b| (acc << 1) | usize::from(b & 1));
        self.by_code[code]
    }

    /// Returns the average symbol energy.
    pub fn average_energy(&self) -> f64 {
        self.symbols.iter().map(|s| s.x.norm_sqr()).sum::<f64>() / self.order() as f64
    }
}

fn gray(m: usize) -> usize {
    m ^ (m >> 1)
}

fn psk_points(order: usize) -> Vec<Complex<f64>> {
    let a = (0.5f64).sqrt();
    (0..order)
        .map(|m| {
            let phase = 2.0 * PI * m as f64 / order as f64 + PI / order as f64;
            Complex::from_polar(a, phase)
        })
        .collect()
}

// Square grid with levels {-(L-1), ..., -1, 1, ..., L-1}, scanned in rows of
// constant in-phase level, alternate rows reversed.
fn qam_points(order: usize) -> Vec<Complex<f64>> {
    let side = 1 << (order.trailing_zeros() / 2);
    let levels: Vec<f64> = (0..side).map(|j| (2 * j) as f64 - (side - 1) as f64).collect();
    let mut points = Vec::with_capacity(order);
    for (row, &re) in levels.iter().enumerate() {
        let row_points = levels.iter().map(|&im| Complex::new(re, im));
        if row % 2 == 1 {
            points.extend(row_points.rev());
        } else {
            points.extend(row_points);
        }
    }
    points
}
