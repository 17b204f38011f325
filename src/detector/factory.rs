//! Detector factory.
//!
//! This module contains routines to build a symbol detector as a `Box<dyn
//! Detector>` from a [`DetectorImplementation`] value.

use super::{kmeans::KMeans, Detector, MaximumLikelihood};
use clap::ValueEnum;

/// Detector implementation.
///
/// This enum lists the available detection strategies.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Default, ValueEnum)]
#[clap(rename_all = "UPPER")]
pub enum DetectorImplementation {
    /// The [`MaximumLikelihood`] detector.
    #[default]
    Ml,
    /// The [`KMeans`] clustering detector.
    KMeans,
}

impl DetectorImplementation {
    /// Builds a detector.
    pub fn build_detector(&self) -> Box<dyn Detector> {
        match self {
            DetectorImplementation::Ml => Box::new(MaximumLikelihood::new()),
            DetectorImplementation::KMeans => Box::new(KMeans::default()),
        }
    }
}

impl std::str::FromStr for DetectorImplementation {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "ML" => DetectorImplementation::Ml,
            "KMEANS" => DetectorImplementation::KMeans,
            _ => return Err("invalid detector implementation"),
        })
    }
}

impl std::fmt::Display for DetectorImplementation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(
            f,
            "{}",
            match self {
                DetectorImplementation::Ml => "ML",
                DetectorImplementation::KMeans => "KMEANS",
            }
        )
    }
}
