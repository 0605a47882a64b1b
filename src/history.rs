//! Caller-owned record of completed analyses, persisted as CSV.

use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::calibration::Instrument;
use crate::margin::ErrorReport;
use crate::Result;

/// One row of the history, the instrument class together with the figures of its report
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct Record {
    #[serde(rename = "Type")]
    pub instrument: Instrument,
    #[serde(rename = "Average")]
    pub average: f64,
    #[serde(rename = "Standard Deviation")]
    pub standard_deviation: f64,
    #[serde(rename = "Random Error")]
    pub random_error: f64,
    #[serde(rename = "Systematic Error")]
    pub systematic_error: f64,
    #[serde(rename = "Total Error")]
    pub total_error: f64,
}

impl Record {
    pub const fn new(instrument: Instrument, report: &ErrorReport) -> Self {
        Self {
            instrument,
            average: report.average,
            standard_deviation: report.standard_deviation,
            random_error: report.random_error,
            systematic_error: report.systematic_error,
            total_error: report.total_error,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct History(Vec<Record>);

impl History {
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, instrument: Instrument, report: &ErrorReport) {
        self.0.push(Record::new(instrument, report));
    }

    pub fn records(&self) -> &[Record] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Write every record, with a header row, to `writer`
    ///
    /// # Errors
    /// Returns an error if serialization or the underlying writer fails.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        for record in &self.0 {
            wtr.serialize(record)?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// # Errors
    /// Returns an error if a row is malformed or names an unknown instrument.
    pub fn read_csv<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(reader);

        let records = rdr
            .deserialize()
            .collect::<::std::result::Result<Vec<Record>, _>>()?;
        Ok(Self(records))
    }

    /// # Errors
    /// Returns an error if the file cannot be created or written.
    pub fn save(&self, path: &Path) -> Result<()> {
        info!("writing {} records to {path:?}", self.len());
        self.write_csv(fs::File::create(path)?)
    }

    /// # Errors
    /// Returns an error if the file cannot be read or is not a history file.
    pub fn load(path: &Path) -> Result<Self> {
        let history = Self::read_csv(fs::File::open(path)?)?;
        info!("read {} records from {path:?}", history.len());
        Ok(history)
    }

    /// Add one analysis to the history file at `path`, creating the file if needed
    ///
    /// Returns the history as written.
    ///
    /// # Errors
    /// Returns an error if an existing file cannot be read as a history, or if writing fails.
    pub fn append_to(path: &Path, instrument: Instrument, report: &ErrorReport) -> Result<Self> {
        let mut history = if path.exists() {
            Self::load(path)?
        } else {
            Self::new()
        };
        history.push(instrument, report);
        history.save(path)?;
        Ok(history)
    }
}
