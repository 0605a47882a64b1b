use std::fs;
use std::path::Path;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::calibration::{CalibrationTables, Instrument};
use crate::margin::{Analysis, Policy, DEFAULT_STEP};
use crate::Result;

/// Analysis settings, usually read from a TOML file
///
/// ```toml
/// step = 1e-6
/// policy = "strict"
///
/// [[tables.resistor]]
/// range = "0-1"
/// base_multiplier = 0.000085
/// constant = 2e-7
/// ```
///
/// Every key is optional. Tables left out keep their reference values.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Finite-difference step of the sensitivity estimate
    pub step: f64,
    pub policy: Policy,
    pub tables: CalibrationTables,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            step: DEFAULT_STEP,
            policy: Policy::default(),
            tables: CalibrationTables::default(),
        }
    }
}

impl Config {
    /// Read a configuration from `path`
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, is not valid TOML, or holds a calibration
    /// range whose bounds are malformed or reversed.
    pub fn from_file(path: &Path) -> Result<Self> {
        info!("reading configuration from {path:?}");
        let contents = fs::read_to_string(path)?;
        contents.parse()
    }

    /// Build the analysis described by this configuration
    pub fn analysis(&self) -> Analysis {
        Analysis::new(self.tables.clone())
            .with_step(self.step)
            .with_policy(self.policy)
    }
}

impl std::str::FromStr for Config {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        for instrument in Instrument::ALL {
            for (ii, jj) in config.tables.table(instrument).overlaps() {
                warn!("{instrument} ranges {ii} and {jj} overlap, range {ii} takes precedence");
            }
        }
        Ok(config)
    }
}
