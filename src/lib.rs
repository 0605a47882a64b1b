#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
// #![warn(clippy::cargo)]

pub mod calibration;
pub mod config;
pub mod error;
pub mod history;
pub mod margin;
pub mod statistics;

pub use calibration::{CalibrationEntry, CalibrationTable, CalibrationTables, Instrument};
pub use error::Error;
pub use margin::{analyze, Analysis, ErrorReport, Policy};

pub type Result<T> = ::std::result::Result<T, Error>;
