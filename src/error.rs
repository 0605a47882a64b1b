use thiserror::Error;

use crate::calibration::Instrument;

#[derive(Debug, Error)]
pub enum Error {
    /// Readings that cannot be analysed: too few values, or text that is not a number
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// An instrument label outside `resistor`, `voltage` and `current`
    #[error("unrecognized instrument class: {0:?}")]
    UnrecognizedInstrumentClass(String),
    /// The average fell outside every calibrated range of the instrument
    #[error("no calibration range of {instrument} contains {value}")]
    NoCalibrationRange { instrument: Instrument, value: f64 },
    /// A calibration range label that is not of the form `lower-upper`
    #[error("invalid calibration range {0:?}")]
    InvalidRange(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("failed to parse configuration: {0}")]
    Config(#[from] toml::de::Error),
}
