use clap::Parser;
use mimo_link::cli::{Args, Run};
use std::error::Error;

#[termination::display]
fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    Args::parse().run()
}
