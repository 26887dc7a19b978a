use std::str::FromStr;

use crate::{Real, extraction::ExtractionConfig};
use anyhow::{Error, anyhow};
use clap::{Parser, Subcommand};

/// The geometry of a shaping kernel: rise length, flat-top length and the
/// electronics decay constant, all in digitiser timebins.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct ShapingParameters {
    pub rise: usize,
    pub top: usize,
    pub tau: Real,
}

impl FromStr for ShapingParameters {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let vals: Vec<_> = s.split(',').collect();
        if vals.len() == 3 {
            Ok(ShapingParameters {
                rise: usize::from_str(vals[0])?,
                top: usize::from_str(vals[1])?,
                tau: Real::from_str(vals[2])?,
            })
        } else {
            Err(anyhow!(
                "Incorrect number of shaping parameters, expected pattern '*,*,*', got '{s}'"
            ))
        }
    }
}

#[derive(Default, Debug, Clone, Parser)]
pub struct FilterParameters {
    /// Kernel geometry as 'rise,top,tau'.
    pub shaping: ShapingParameters,

    /// Fraction of the peak used as the crossing threshold.
    #[clap(long, default_value = "0.8")]
    pub percentage: Real,

    /// Offset added to the crossing midpoint before the energy readout.
    #[clap(long, default_value = "0")]
    pub shift: i64,

    /// Signed energy averaging window; see the extraction documentation.
    #[clap(long, default_value = "0")]
    pub mean: i64,
}

impl FilterParameters {
    pub fn extraction_config(&self) -> ExtractionConfig {
        ExtractionConfig {
            percentage: self.percentage,
            shift: self.shift,
            mean: self.mean,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Mode {
    #[clap(about = "Shapes with the single trapezoid and extracts by percent threshold cross.")]
    SingleTrap(FilterParameters),
    #[clap(about = "Shapes with the firmware's bipolar double trapezoid.")]
    DoubleTrap(FilterParameters),
    #[clap(about = "Shapes with the cusp kernel for better timing resolution.")]
    Cusp(FilterParameters),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_shaping_triple() {
        let params = ShapingParameters::from_str("625,100,1250").unwrap();
        assert_eq!(
            params,
            ShapingParameters {
                rise: 625,
                top: 100,
                tau: 1250.0,
            }
        );
    }

    #[test]
    fn rejects_wrong_arity_and_bad_fields() {
        assert!(ShapingParameters::from_str("625,100").is_err());
        assert!(ShapingParameters::from_str("625,100,1250,0").is_err());
        assert!(ShapingParameters::from_str("rise,100,1250").is_err());
    }
}
