//! # MIMO link simulator
//!
//! `mimo_link` simulates a point-to-point MIMO link: payload bits are mapped
//! onto a Gray-coded constellation, sent through a fading multi-antenna
//! channel that the receiver estimates from pilot symbols, equalized with a
//! zero-forcing or MMSE combiner, detected, and checked against a checksum.
//! Symbol, bit and block error statistics are collected over a sweep of
//! transmit SNRs.
//!
//! It can be used as a Rust library or as a CLI tool. See [`cli`] for
//! documentation about the usage of the CLI tool, and [`simulation`] for the
//! library entry point.

#![warn(missing_docs)]

pub mod alphabet;
pub mod channel;
pub mod cli;
pub mod detector;
pub mod equalizer;
pub mod estimation;
pub mod frame;
pub mod linalg;
pub mod pilot;
pub mod quantizer;
pub mod rand;
pub mod simulation;

mod util;
