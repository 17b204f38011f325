//! `mimo-link` CLI application
//!
//! The CLI application is organized in several subcommands. The
//! supported subcommands can be seen by running `mimo-link`.
//! See the modules below for examples and more information about
//! how to use each subcommand.

use clap::Parser;
use std::error::Error;

pub mod alphabet;
pub mod sweep;

/// Trait to run a CLI subcommand
pub trait Run {
    /// Run the CLI subcommand
    fn run(&self) -> Result<(), Box<dyn Error>>;
}

/// CLI arguments.
#[derive(Debug, Parser)]
#[command(author, version, name = "mimo-link", about = "MIMO link simulator")]
pub enum Args {
    /// alphabet subcommand
    Alphabet(alphabet::Args),
    /// sweep subcommand
    Sweep(sweep::Args),
}

impl Run for Args {
    fn run(&self) -> Result<(), Box<dyn Error>> {
        match self {
            Args::Alphabet(x) => x.run(),
            Args::Sweep(x) => x.run(),
        }
    }
}
