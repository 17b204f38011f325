//! Frame codec.
//!
//! This module converts between payload bits and alphabet symbols, computes
//! the frame checksum, and lays out one codeword on the spatial streams.
//!
//! A transmitted codeword consists of the payload symbols, followed by zero
//! padding symbols, followed by the checksum symbols. The amount of padding is
//! chosen so that the total number of symbols is a multiple of the number of
//! transmit antennas `n_t`. The symbols are then arranged column-major in an
//! `n_t x (symbols / n_t)` block, so that each column is one channel use.

use crate::{alphabet::Alphabet, linalg::CMatrix};
use ndarray::{Array2, ShapeBuilder};
use num_complex::Complex;
use num_traits::Zero;
use thiserror::Error;

/// Frame codec error.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Error)]
pub enum Error {
    /// The checksum value does not fit in the configured checksum length.
    #[error("checksum needs {required} bits but its length is {length} bits")]
    CrcTooLong {
        /// Configured checksum length.
        length: usize,
        /// Number of bits needed by the checksum value.
        required: usize,
    },
    /// The codeword is shorter than the checksum polynomial.
    #[error("codeword size {codeword_size} is smaller than the polynomial length {polynomial_length}")]
    CodewordTooSmall {
        /// Configured codeword size.
        codeword_size: usize,
        /// Bit length of the polynomial.
        polynomial_length: usize,
    },
    /// The number of transmit antennas is zero.
    #[error("the number of spatial streams must be positive")]
    NoStreams,
}

/// Frame checksum.
///
/// The checksum of a codeword is obtained by left-padding the codeword with
/// zeros up to the codeword size and XOR-folding the bits at the positions
/// where the polynomial (written MSB first) has a one. The result is
/// rendered as a bit string of the configured length.
///
/// # Examples
/// ```
/// # use mimo_link::frame::Checksum;
/// let checksum = Checksum::new(0b1001_0011, 24, 1024).unwrap();
/// let bits = [1, 0, 1, 1, 0, 1];
/// let crc = checksum.compute(&bits);
/// assert_eq!(crc.len(), 24);
/// assert!(checksum.verify(&crc, &bits));
/// ```
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Checksum {
    taps: Vec<usize>,
    length: usize,
    codeword_size: usize,
}

impl Checksum {
    /// Creates a checksum.
    ///
    /// Fails if `codeword_size` is shorter than the bit length of
    /// `polynomial`, or if `length` cannot hold the checksum value.
    pub fn new(polynomial: u64, length: usize, codeword_size: usize) -> Result<Checksum, Error> {
        let polynomial_length = (u64::BITS - polynomial.leading_zeros()).max(1) as usize;
        if codeword_size < polynomial_length {
            return Err(Error::CodewordTooSmall {
                codeword_size,
                polynomial_length,
            });
        }
        // The XOR fold produces a single bit
        if length < 1 {
            return Err(Error::CrcTooLong {
                length,
                required: 1,
            });
        }
        let taps = (0..polynomial_length)
            .filter(|&position| (polynomial >> (polynomial_length - 1 - position)) & 1 == 1)
            .collect();
        Ok(Checksum {
            taps,
            length,
            codeword_size,
        })
    }

    /// Returns the checksum length in bits.
    pub fn length(&self) -> usize {
        self.length
    }

    /// Returns the codeword size in bits.
    pub fn codeword_size(&self) -> usize {
        self.codeword_size
    }

    /// Computes the checksum of a codeword.
    pub fn compute(&self, bits: &[u8]) -> Vec<u8> {
        let padding = self.codeword_size.saturating_sub(bits.len());
        let value = self
            .taps
            .iter()
            .filter(|&&position| position >= padding)
            .fold(0, |acc, &position| acc ^ (bits[position - padding] & 1));
        let mut checksum = vec![0; self.length];
        checksum[self.length - 1] = value;
        checksum
    }

    /// Checks a codeword against a checksum.
    pub fn verify(&self, checksum: &[u8], bits: &[u8]) -> bool {
        self.compute(bits) == checksum
    }
}

/// Converts bits to alphabet indices.
///
/// Each group of `k` bits is mapped to the symbol carrying those bits. If
/// the number of bits is not a multiple of `k`, the last group is completed
/// with zeros.
pub fn bits_to_symbols(bits: &[u8], alphabet: &Alphabet) -> Vec<usize> {
    let k = alphabet.bits_per_symbol();
    bits.chunks(k)
        .map(|chunk| {
            if chunk.len() == k {
                alphabet.index_of_bits(chunk)
            } else {
                let mut group = chunk.to_vec();
                group.resize(k, 0);
                alphabet.index_of_bits(&group)
            }
        })
        .collect()
}

/// Converts alphabet indices to bits.
pub fn symbols_to_bits(indices: &[usize], alphabet: &Alphabet) -> Vec<u8> {
    indices
        .iter()
        .flat_map(|&m| alphabet.symbol(m).bits().iter().cloned())
        .collect()
}

/// Layout of a codeword on the spatial streams.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Layout {
    /// Number of payload symbols.
    pub payload_symbols: usize,
    /// Number of zero padding symbols.
    pub padding_symbols: usize,
    /// Number of checksum symbols.
    pub checksum_symbols: usize,
    /// Number of spatial streams (transmit antennas).
    pub streams: usize,
}

impl Layout {
    /// Total number of symbols in the codeword.
    pub fn total_symbols(&self) -> usize {
        self.payload_symbols + self.padding_symbols + self.checksum_symbols
    }

    /// Number of channel uses (columns of the transmitted block).
    pub fn channel_uses(&self) -> usize {
        self.total_symbols() / self.streams
    }
}

/// Assembled codeword, ready to be transmitted.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Transmitted block, `n_t x channel_uses`.
    pub block: CMatrix,
    /// Layout of the block.
    pub layout: Layout,
    /// Payload symbol indices.
    pub payload: Vec<usize>,
    /// Payload bits (a whole number of symbols).
    pub payload_bits: Vec<u8>,
    /// Checksum bits, before padding to a whole number of symbols.
    pub checksum: Vec<u8>,
}

/// Frame codec.
///
/// Ties together the checksum and the number of spatial streams to assemble
/// and disassemble codewords.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct FrameCodec {
    checksum: Checksum,
    streams: usize,
}

impl FrameCodec {
    /// Creates a frame codec for `streams` transmit antennas.
    pub fn new(checksum: Checksum, streams: usize) -> Result<FrameCodec, Error> {
        if streams == 0 {
            return Err(Error::NoStreams);
        }
        Ok(FrameCodec { checksum, streams })
    }

    /// Returns the checksum.
    pub fn checksum(&self) -> &Checksum {
        &self.checksum
    }

    /// Number of symbols used by the checksum.
    ///
    /// The checksum is left-padded with zeros to a whole number of symbols.
    pub fn checksum_symbols(&self, alphabet: &Alphabet) -> usize {
        self.checksum.length().div_ceil(alphabet.bits_per_symbol())
    }

    /// Computes the layout of a codeword with `payload_symbols` symbols.
    pub fn layout(&self, payload_symbols: usize, alphabet: &Alphabet) -> Layout {
        let checksum_symbols = self.checksum_symbols(alphabet);
        let used = payload_symbols + checksum_symbols;
        let padding_symbols = used.div_ceil(self.streams) * self.streams - used;
        Layout {
            payload_symbols,
            padding_symbols,
            checksum_symbols,
            streams: self.streams,
        }
    }

    /// Assembles a codeword.
    pub fn assemble(&self, payload_bits: &[u8], alphabet: &Alphabet) -> Frame {
        let payload = bits_to_symbols(payload_bits, alphabet);
        let payload_bits = symbols_to_bits(&payload, alphabet);
        let checksum = self.checksum.compute(&payload_bits);
        let layout = self.layout(payload.len(), alphabet);
        let k = alphabet.bits_per_symbol();
        let mut checksum_padded = vec![0; layout.checksum_symbols * k - checksum.len()];
        checksum_padded.extend_from_slice(&checksum);
        let checksum_indices = bits_to_symbols(&checksum_padded, alphabet);

        let symbols: Vec<Complex<f64>> = payload
            .iter()
            .map(|&m| alphabet.symbol(m).x())
            .chain(std::iter::repeat(Complex::zero()).take(layout.padding_symbols))
            .chain(checksum_indices.iter().map(|&m| alphabet.symbol(m).x()))
            .collect();
        let block = Array2::from_shape_vec(
            (layout.streams, layout.channel_uses()).f(),
            symbols,
        )
        .unwrap();
        Frame {
            block,
            layout,
            payload,
            payload_bits,
            checksum,
        }
    }

    /// Splits a received block into payload and checksum symbols.
    ///
    /// The block is read column-major and the padding symbols are dropped.
    pub fn disassemble(&self, block: &CMatrix, layout: &Layout) -> (Vec<Complex<f64>>, Vec<Complex<f64>>) {
        let symbols: Vec<Complex<f64>> = block.t().iter().cloned().collect();
        let checksum_start = layout.payload_symbols + layout.padding_symbols;
        (
            symbols[..layout.payload_symbols].to_vec(),
            symbols[checksum_start..checksum_start + layout.checksum_symbols].to_vec(),
        )
    }

    /// Extracts the checksum bits from the bits of the checksum symbols.
    pub fn checksum_from_bits<'a>(&self, bits: &'a [u8]) -> &'a [u8] {
        &bits[bits.len() - self.checksum.length()..]
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::alphabet::Family;

    #[test]
    fn checksum_taps() {
        // Polynomial 1001_0011 selects positions 0, 3, 6 and 7
        let checksum = Checksum::new(0b1001_0011, 4, 8).unwrap();
        assert_eq!(checksum.compute(&[1, 0, 0, 0, 0, 0, 0, 0]), vec![0, 0, 0, 1]);
        assert_eq!(checksum.compute(&[1, 0, 0, 1, 0, 0, 0, 0]), vec![0, 0, 0, 0]);
        assert_eq!(checksum.compute(&[0, 1, 1, 0, 1, 1, 0, 0]), vec![0, 0, 0, 0]);
        assert_eq!(checksum.compute(&[0, 0, 0, 0, 0, 0, 0, 1]), vec![0, 0, 0, 1]);
    }

    #[test]
    fn checksum_left_padding() {
        let checksum = Checksum::new(0b1001_0011, 4, 10).unwrap();
        // Padded to 00_1000_0000: position 3 of the padded word is bit 1
        assert_eq!(checksum.compute(&[1, 0, 0, 0, 0, 0, 0, 0]), vec![0, 0, 0, 0]);
        assert_eq!(checksum.compute(&[0, 1, 0, 0, 0, 0, 0, 0]), vec![0, 0, 0, 1]);
    }

    #[test]
    fn checksum_round_trip() {
        let checksum = Checksum::new(0b1001_0011, 24, 64).unwrap();
        for len in 0..64 {
            let bits: Vec<u8> = (0..len).map(|j| ((j * 7 + 3) % 5 % 2) as u8).collect();
            assert!(checksum.verify(&checksum.compute(&bits), &bits));
        }
    }

    #[test]
    fn checksum_detects_tap_flips() {
        let checksum = Checksum::new(0b1001_0011, 24, 8).unwrap();
        let bits = [1, 1, 0, 1, 0, 0, 1, 0];
        let crc = checksum.compute(&bits);
        for position in [0, 3, 6, 7] {
            let mut flipped = bits;
            flipped[position] ^= 1;
            assert!(!checksum.verify(&crc, &flipped));
        }
    }

    #[test]
    fn checksum_errors() {
        assert_eq!(
            Checksum::new(0b1001_0011, 24, 4),
            Err(Error::CodewordTooSmall {
                codeword_size: 4,
                polynomial_length: 8
            })
        );
        assert_eq!(
            Checksum::new(0b1001_0011, 0, 1024),
            Err(Error::CrcTooLong {
                length: 0,
                required: 1
            })
        );
    }

    #[test]
    fn bits_symbols_round_trip() {
        let alphabet = Alphabet::new(Family::Qam, 16).unwrap();
        let bits: Vec<u8> = (0..40).map(|j| ((j * j + 1) % 3 % 2) as u8).collect();
        let symbols = bits_to_symbols(&bits, &alphabet);
        assert_eq!(symbols.len(), 10);
        assert_eq!(symbols_to_bits(&symbols, &alphabet), bits);
        // Partial last symbol is zero-extended
        let symbols = bits_to_symbols(&bits[..6], &alphabet);
        let mut expected = bits[..6].to_vec();
        expected.extend_from_slice(&[0, 0]);
        assert_eq!(symbols_to_bits(&symbols, &alphabet), expected);
    }

    #[test]
    fn layout_fills_streams() {
        let alphabet = Alphabet::new(Family::Qam, 64).unwrap();
        let checksum = Checksum::new(0b1001_0011, 24, 1024).unwrap();
        let codec = FrameCodec::new(checksum, 4).unwrap();
        // 24 checksum bits are 4 symbols of 6 bits
        let layout = codec.layout(171, &alphabet);
        assert_eq!(layout.checksum_symbols, 4);
        assert_eq!(layout.padding_symbols, 1);
        assert_eq!(layout.total_symbols() % 4, 0);
        assert_eq!(layout.channel_uses(), 44);
    }

    #[test]
    fn assemble_disassemble() {
        let alphabet = Alphabet::new(Family::Qam, 16).unwrap();
        let checksum = Checksum::new(0b1001_0011, 6, 64).unwrap();
        let codec = FrameCodec::new(checksum, 3).unwrap();
        let bits: Vec<u8> = (0..28).map(|j| (j % 3 == 0) as u8).collect();
        let frame = codec.assemble(&bits, &alphabet);
        // 7 payload symbols, 2 checksum symbols, no padding
        assert_eq!(frame.layout.payload_symbols, 7);
        assert_eq!(frame.layout.checksum_symbols, 2);
        assert_eq!(frame.layout.padding_symbols, 0);
        assert_eq!(frame.block.dim(), (3, 3));
        // Column-major: second payload symbol is in row 1, column 0
        assert_eq!(frame.block[[1, 0]], alphabet.symbol(frame.payload[1]).x());
        let (payload, crc) = codec.disassemble(&frame.block, &frame.layout);
        let expected: Vec<_> = frame.payload.iter().map(|&m| alphabet.symbol(m).x()).collect();
        assert_eq!(payload, expected);
        assert_eq!(crc.len(), 2);
        let crc_bits = symbols_to_bits(
            &crc.iter()
                .map(|x| {
                    alphabet
                        .symbols()
                        .iter()
                        .position(|s| s.x() == *x)
                        .unwrap()
                })
                .collect::<Vec<_>>(),
            &alphabet,
        );
        assert_eq!(codec.checksum_from_bits(&crc_bits), &frame.checksum[..]);
    }

    #[test]
    fn padding_is_zero() {
        let alphabet = Alphabet::new(Family::Qam, 4).unwrap();
        let checksum = Checksum::new(0b101, 3, 16).unwrap();
        let codec = FrameCodec::new(checksum, 4).unwrap();
        let frame = codec.assemble(&[1, 1, 0, 1, 1, 0], &alphabet);
        // 3 payload symbols, 2 checksum symbols, 3 padding symbols
        assert_eq!(frame.layout.padding_symbols, 3);
        let flat: Vec<_> = frame.block.t().iter().cloned().collect();
        assert!(flat[3..6].iter().all(|x| x.is_zero()));
        assert!(flat[6..].iter().all(|x| !x.is_zero()));
    }
}
