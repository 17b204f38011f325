//! Alphabet CLI subcommand.
//!
//! This subcommand prints the constellation table of a modulation alphabet:
//! the index, the Gray-coded bits (in-phase and quadrature sub-fields) and
//! the complex coordinate of each symbol.
//!
//! # Examples
//!
//! The 16-QAM alphabet can be printed with
//! ```shell
//! $ mimo-link alphabet --family QAM 16
//! ```
//! If the family is omitted, all the families of the given order are
//! printed.

use crate::{
    alphabet::{Alphabet, Family},
    cli::*,
};
use clap::Parser;
use std::{error::Error, io::Write};

/// Alphabet CLI arguments.
#[derive(Debug, Parser)]
#[command(about = "Prints a constellation table")]
pub struct Args {
    /// Constellation order (M)
    order: usize,
    /// Modulation family
    #[arg(long)]
    family: Option<Family>,
}

impl Run for Args {
    fn run(&self) -> Result<(), Box<dyn Error>> {
        let families = match self.family {
            Some(family) => vec![family],
            None => enum_iterator::all::<Family>().collect(),
        };
        let mut stdout = std::io::stdout().lock();
        for family in families {
            let alphabet = Alphabet::new(family, self.order)?;
            write_table(&mut stdout, &alphabet)?;
        }
        Ok(())
    }
}

fn write_table<W: Write>(mut f: W, alphabet: &Alphabet) -> std::io::Result<()> {
    writeln!(f, "{}-{}", alphabet.order(), alphabet.family())?;
    writeln!(f, "    m | Bits (I|Q)       |       Re |       Im")?;
    writeln!(f, "------|------------------|----------|----------")?;
    for symbol in alphabet.symbols() {
        let bits = format!(
            "{}|{}",
            bits_to_string(symbol.i_bits()),
            bits_to_string(symbol.q_bits())
        );
        writeln!(
            f,
            "{:5} | {:16} | {:8.4} | {:8.4}",
            symbol.index(),
            bits,
            symbol.x().re,
            symbol.x().im
        )?;
    }
    writeln!(f, "Average energy: {:.6}", alphabet.average_energy())?;
    writeln!(f)?;
    Ok(())
}

fn bits_to_string(bits: &[u8]) -> String {
    bits.iter().map(|&b| if b == 1 { '1' } else { '0' }).collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn qpsk_table() {
        let alphabet = Alphabet::new(Family::Qam, 4).unwrap();
        let mut out = Vec::new();
        write_table(&mut out, &alphabet).unwrap();
        let out = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "4-QAM");
        // title, header, separator, 4 symbols, energy, blank
        assert_eq!(lines.len(), 9);
        assert!(lines[7].starts_with("Average energy: 1.0000"));
        assert!(lines[8].is_empty());
    }
}
