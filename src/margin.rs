use std::fmt;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::calibration::{CalibrationTables, Instrument};
use crate::statistics::{average, random_error, sample_standard_deviation};
use crate::{Error, Result};

/// Finite-difference step used by [`partial_derivative`] when none is configured
pub const DEFAULT_STEP: f64 = 1e-6;

/// What to do when a reading set has no calibrated systematic error
///
/// This covers an average outside every range of the instrument table, and an instrument label
/// that is not recognised at all.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Policy {
    /// Treat the systematic error as zero
    #[default]
    Lenient,
    /// Fail with [`Error::NoCalibrationRange`] or [`Error::UnrecognizedInstrumentClass`]
    Strict,
}

/// The error budget of one set of readings
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub average: f64,
    pub standard_deviation: f64,
    pub random_error: f64,
    pub systematic_error: f64,
    pub total_error: f64,
    /// Sensitivity of the systematic error to the average reading
    pub partial_derivative: f64,
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Average Value: {:.4}", self.average)?;
        writeln!(f, "Standard Deviation: {:.4}", self.standard_deviation)?;
        writeln!(f, "Random Error: {:.4}", self.random_error)?;
        writeln!(f, "Systematic Error: {:.4}", self.systematic_error)?;
        writeln!(f, "Total Error: {:.4}", self.total_error)?;
        write!(f, "Partial Derivative: {:.4}", self.partial_derivative)
    }
}

/// Error analysis against a fixed set of calibration tables
#[derive(Clone, Debug, PartialEq)]
pub struct Analysis {
    tables: CalibrationTables,
    step: f64,
    policy: Policy,
}

impl Default for Analysis {
    fn default() -> Self {
        Self::new(CalibrationTables::default())
    }
}

impl Analysis {
    pub const fn new(tables: CalibrationTables) -> Self {
        Self {
            tables,
            step: DEFAULT_STEP,
            policy: Policy::Lenient,
        }
    }

    #[must_use]
    pub fn with_step(self, step: f64) -> Self {
        Self { step, ..self }
    }

    #[must_use]
    pub fn with_policy(self, policy: Policy) -> Self {
        Self { policy, ..self }
    }

    pub const fn tables(&self) -> &CalibrationTables {
        &self.tables
    }

    pub const fn step(&self) -> f64 {
        self.step
    }

    pub const fn policy(&self) -> Policy {
        self.policy
    }

    /// The device-accuracy error of the average of `readings`
    ///
    /// # Errors
    /// - [`Error::InvalidInput`] if `readings` is empty
    /// - [`Error::NoCalibrationRange`] under [`Policy::Strict`] when the average lies outside
    ///   every calibrated range
    pub fn systematic_error(&self, readings: &[f64], instrument: Instrument) -> Result<f64> {
        let average = average(readings)?;
        if let Some(error) = self.calibrated_error(average, instrument) {
            return Ok(error);
        }

        match self.policy {
            Policy::Lenient => {
                warn!("no {instrument} range contains {average}, systematic error taken as zero");
                Ok(0.)
            }
            Policy::Strict => Err(Error::NoCalibrationRange {
                instrument,
                value: average,
            }),
        }
    }

    /// The linear calibration model at `average`, `None` if no range contains it
    fn calibrated_error(&self, average: f64, instrument: Instrument) -> Option<f64> {
        let entry = self.tables.table(instrument).resolve(average)?;
        debug!(
            "{instrument} average {average} resolved to range {}",
            entry.label()
        );
        Some(entry.systematic_error(average))
    }

    /// As [`Self::systematic_error`], for an instrument given by name
    ///
    /// An unrecognised name contributes no systematic error under [`Policy::Lenient`].
    ///
    /// # Errors
    /// As [`Self::systematic_error`], plus [`Error::UnrecognizedInstrumentClass`] under
    /// [`Policy::Strict`].
    pub fn systematic_error_for_label(&self, readings: &[f64], label: &str) -> Result<f64> {
        average(readings)?;
        match label.parse::<Instrument>() {
            Ok(instrument) => self.systematic_error(readings, instrument),
            Err(err) => match self.policy {
                Policy::Lenient => {
                    warn!("{err}, systematic error taken as zero");
                    Ok(0.)
                }
                Policy::Strict => Err(err),
            },
        }
    }

    /// Forward-difference sensitivity of the systematic error to the average reading
    ///
    /// The perturbation is applied by appending one extra reading at `average + step` and
    /// re-evaluating, rather than by shifting the average directly. Appending moves the average
    /// by only `step / (n + 1)`, so inside a single range the result is
    /// `base_multiplier / (n + 1)` and not `base_multiplier`. Existing reports depend on this
    /// value, so it is kept as is.
    ///
    /// The policy applies to the measured readings only. If the extra reading carries the average
    /// out of every range, the perturbed side contributes zero systematic error.
    ///
    /// # Errors
    /// As [`Self::systematic_error`].
    pub fn partial_derivative(&self, readings: &[f64], instrument: Instrument) -> Result<f64> {
        let measured_average = average(readings)?;

        let mut perturbed = Vec::with_capacity(readings.len() + 1);
        perturbed.extend_from_slice(readings);
        perturbed.push(measured_average + self.step);

        let original_error = self.systematic_error(readings, instrument)?;
        let perturbed_average = average(&perturbed)?;
        let perturbed_error = self
            .calibrated_error(perturbed_average, instrument)
            .unwrap_or_else(|| {
                debug!("perturbed {instrument} average {perturbed_average} is uncalibrated");
                0.
            });

        Ok((perturbed_error - original_error) / self.step)
    }

    /// Run the full analysis of `readings`
    ///
    /// # Errors
    /// - [`Error::InvalidInput`] for fewer than two readings
    /// - [`Error::NoCalibrationRange`] under [`Policy::Strict`]
    pub fn analyze(&self, readings: &[f64], instrument: Instrument) -> Result<ErrorReport> {
        let average = average(readings)?;
        let standard_deviation = sample_standard_deviation(readings)?;
        let random_error = random_error(standard_deviation, readings.len());
        let systematic_error = self.systematic_error(readings, instrument)?;
        let total_error = total_error(random_error, systematic_error);
        let partial_derivative = self.partial_derivative(readings, instrument)?;

        debug!(
            "analysed {} {instrument} readings: average {average}, total error {total_error}",
            readings.len()
        );

        Ok(ErrorReport {
            average,
            standard_deviation,
            random_error,
            systematic_error,
            total_error,
            partial_derivative,
        })
    }
}

/// Combine independent random and systematic errors in quadrature
///
/// $$
///     \sigma_{tot} = \sqrt{\sigma_{rand}^2 + \sigma_{sys}^2}
/// $$
pub fn total_error(random_error: f64, systematic_error: f64) -> f64 {
    random_error
        .mul_add(random_error, systematic_error * systematic_error)
        .sqrt()
}

/// Systematic error of `readings` under the lenient policy
///
/// # Errors
/// Returns [`Error::InvalidInput`] if `readings` is empty.
pub fn systematic_error(
    tables: &CalibrationTables,
    readings: &[f64],
    instrument: Instrument,
) -> Result<f64> {
    Analysis::new(tables.clone()).systematic_error(readings, instrument)
}

/// Sensitivity of the systematic error with finite-difference step `step`
///
/// See [`Analysis::partial_derivative`] for how the perturbation is applied. A zero `step` gives
/// a non-finite result.
///
/// # Errors
/// Returns [`Error::InvalidInput`] if `readings` is empty.
pub fn partial_derivative(
    tables: &CalibrationTables,
    readings: &[f64],
    instrument: Instrument,
    step: f64,
) -> Result<f64> {
    Analysis::new(tables.clone())
        .with_step(step)
        .partial_derivative(readings, instrument)
}

/// Analyse `readings` against the reference calibration tables
///
/// # Errors
/// Returns [`Error::InvalidInput`] for fewer than two readings.
pub fn analyze(readings: &[f64], instrument: Instrument) -> Result<ErrorReport> {
    Analysis::default().analyze(readings, instrument)
}

/// Parse a comma separated list of readings such as `"9.8, 10.0, 10.2"`
///
/// # Errors
/// Returns [`Error::InvalidInput`] if any entry is not a number.
pub fn parse_readings(input: &str) -> Result<Vec<f64>> {
    input
        .split(',')
        .map(|token| {
            let token = token.trim();
            token
                .parse()
                .map_err(|_| Error::InvalidInput(format!("{token:?} is not a number")))
        })
        .collect()
}
