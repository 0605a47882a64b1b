use std::fmt;
use std::str::FromStr;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// The class of device a set of readings was taken with
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Instrument {
    Resistor,
    Voltage,
    Current,
}

impl Instrument {
    pub const ALL: [Self; 3] = [Self::Resistor, Self::Voltage, Self::Current];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Resistor => "resistor",
            Self::Voltage => "voltage",
            Self::Current => "current",
        }
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Instrument {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let label = s.trim();
        Self::ALL
            .into_iter()
            .find(|instrument| instrument.name().eq_ignore_ascii_case(label))
            .ok_or_else(|| Error::UnrecognizedInstrumentClass(label.to_owned()))
    }
}

/// One row of a device-accuracy table
///
/// Within the inclusive range `[lower, upper]` the accuracy of the device is specified as a
/// fraction of the reading plus a fixed floor, so the systematic error of an average $\bar{x}$ is
///
/// $$
///     \sigma_{sys} = \bar{x} \cdot m + c
/// $$
///
/// where $m$ is the base multiplier and $c$ the constant.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawEntry", into = "RawEntry")]
pub struct CalibrationEntry {
    lower: f64,
    upper: f64,
    base_multiplier: f64,
    constant: f64,
}

impl CalibrationEntry {
    /// # Errors
    /// Returns [`Error::InvalidRange`] unless `lower <= upper`.
    pub fn new(lower: f64, upper: f64, base_multiplier: f64, constant: f64) -> Result<Self> {
        // Also rejects NaN bounds
        if !(lower <= upper) {
            return Err(Error::InvalidRange(format!("{lower}-{upper}")));
        }
        Ok(Self {
            lower,
            upper,
            base_multiplier,
            constant,
        })
    }

    /// Build an entry from a range label such as `"1.1-10"` or `"0-.1"`
    ///
    /// # Errors
    /// Returns [`Error::InvalidRange`] if the label does not hold two numbers separated by `-`, or
    /// if the bounds are reversed.
    pub fn from_label(label: &str, base_multiplier: f64, constant: f64) -> Result<Self> {
        let (lower, upper) = parse_range(label)?;
        Self::new(lower, upper, base_multiplier, constant)
    }

    pub const fn lower(&self) -> f64 {
        self.lower
    }

    pub const fn upper(&self) -> f64 {
        self.upper
    }

    pub const fn base_multiplier(&self) -> f64 {
        self.base_multiplier
    }

    pub const fn constant(&self) -> f64 {
        self.constant
    }

    /// Inclusive at both ends
    pub fn contains(&self, value: f64) -> bool {
        self.lower <= value && value <= self.upper
    }

    pub fn systematic_error(&self, average: f64) -> f64 {
        average.mul_add(self.base_multiplier, self.constant)
    }

    pub fn label(&self) -> String {
        format!("{}-{}", self.lower, self.upper)
    }
}

/// Split a `lower-upper` label into its bounds
///
/// The separator is the first `-` after the leading character, so a negative lower bound such as
/// `"-5-0"` is accepted.
fn parse_range(label: &str) -> Result<(f64, f64)> {
    let invalid = || Error::InvalidRange(label.to_owned());
    let label = label.trim();
    let split = label
        .char_indices()
        .skip(1)
        .find(|&(_, c)| c == '-')
        .map(|(ii, _)| ii)
        .ok_or_else(invalid)?;

    let lower = label[..split].trim().parse().map_err(|_| invalid())?;
    let upper = label[split + 1..].trim().parse().map_err(|_| invalid())?;
    Ok((lower, upper))
}

/// On-disk form of a [`CalibrationEntry`]
#[derive(Deserialize, Serialize)]
struct RawEntry {
    range: String,
    base_multiplier: f64,
    constant: f64,
}

impl TryFrom<RawEntry> for CalibrationEntry {
    type Error = Error;

    fn try_from(raw: RawEntry) -> Result<Self> {
        Self::from_label(&raw.range, raw.base_multiplier, raw.constant)
    }
}

impl From<CalibrationEntry> for RawEntry {
    fn from(entry: CalibrationEntry) -> Self {
        Self {
            range: entry.label(),
            base_multiplier: entry.base_multiplier,
            constant: entry.constant,
        }
    }
}

/// An ordered list of calibrated ranges for one instrument
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CalibrationTable(Vec<CalibrationEntry>);

impl CalibrationTable {
    pub const fn new(entries: Vec<CalibrationEntry>) -> Self {
        Self(entries)
    }

    pub fn entries(&self) -> &[CalibrationEntry] {
        &self.0
    }

    /// Find the calibrated range containing `value`
    ///
    /// Entries are tried in table order and the first whose inclusive bounds contain `value` is
    /// returned. `None` means `value` lies in a gap of the table or outside it entirely.
    pub fn resolve(&self, value: f64) -> Option<&CalibrationEntry> {
        self.0.iter().find(|entry| entry.contains(value))
    }

    /// Index pairs of entries whose ranges share at least one value
    ///
    /// Only the earlier entry of each pair is ever returned by [`Self::resolve`] for the shared
    /// values.
    pub fn overlaps(&self) -> Vec<(usize, usize)> {
        self.0
            .iter()
            .enumerate()
            .tuple_combinations()
            .filter(|((_, a), (_, b))| a.lower <= b.upper && b.lower <= a.upper)
            .map(|((ii, _), (jj, _))| (ii, jj))
            .collect()
    }

    fn from_rows(rows: &[(f64, f64, f64, f64)]) -> Self {
        Self(
            rows.iter()
                .map(|&(lower, upper, base_multiplier, constant)| CalibrationEntry {
                    lower,
                    upper,
                    base_multiplier,
                    constant,
                })
                .collect(),
        )
    }

    /// Reference accuracy table for resistance readings, in ohm
    pub fn resistor() -> Self {
        Self::from_rows(&RESISTOR)
    }

    /// Reference accuracy table for voltage readings, in volt
    pub fn voltage() -> Self {
        Self::from_rows(&VOLTAGE)
    }

    /// Reference accuracy table for current readings, in ampere
    pub fn current() -> Self {
        Self::from_rows(&CURRENT)
    }

    pub fn reference(instrument: Instrument) -> Self {
        match instrument {
            Instrument::Resistor => Self::resistor(),
            Instrument::Voltage => Self::voltage(),
            Instrument::Current => Self::current(),
        }
    }
}

// (lower, upper, base multiplier, constant). The constants are stated as a fraction of the full
// scale of each range.
const RESISTOR: [(f64, f64, f64, f64); 6] = [
    (0., 1., 0.000_085, 0.000_200 * 0.001),
    (1.1, 10., 0.000_085, 0.000_020 * 0.001),
    (10.1, 100., 0.000_085, 0.000_020 * 0.1),
    (100.1, 1_000., 0.000_75, 0.000_006),
    (1_000.1, 10_000., 0.000_075, 0.000_006 * 10.),
    (10_000.1, 100_000., 0.000_075, 0.000_010 * 100.),
];

const VOLTAGE: [(f64, f64, f64, f64); 5] = [
    (0., 0.1, 0.000_03, 0.000_35 * 0.1),
    (0.1, 1., 0.000_025, 0.000_006),
    (1.1, 10., 0.000_025, 0.000_005 * 10.),
    (10.1, 100., 0.000_04, 0.000_006 * 100.),
    (100.1, 1_000., 0.000_04, 0.000_006 * 1_000.),
];

const CURRENT: [(f64, f64, f64, f64); 8] = [
    (0., 0.000_01, 0.000_45, 0.000_05 * 0.000_01),
    (0.000_011, 0.000_1, 0.000_45, 0.000_05 * 0.000_1),
    (0.000_11, 0.001, 0.000_45, 0.000_05 * 0.001),
    (0.001_1, 0.01, 0.000_2, 0.000_05 * 0.01),
    (0.011, 0.1, 0.000_2, 0.000_05 * 0.1),
    (0.11, 1., 0.000_4, 0.000_05),
    (1.1, 3., 0.000_5, 0.000_04 * 3.),
    (3.1, 10., 0.002_2, 0.000_25 * 10.),
];

/// The accuracy tables of every supported instrument
///
/// Tables missing from a configuration file fall back to the reference constants.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationTables {
    #[serde(default = "CalibrationTable::resistor")]
    pub resistor: CalibrationTable,
    #[serde(default = "CalibrationTable::voltage")]
    pub voltage: CalibrationTable,
    #[serde(default = "CalibrationTable::current")]
    pub current: CalibrationTable,
}

impl Default for CalibrationTables {
    fn default() -> Self {
        Self {
            resistor: CalibrationTable::resistor(),
            voltage: CalibrationTable::voltage(),
            current: CalibrationTable::current(),
        }
    }
}

impl CalibrationTables {
    pub const fn table(&self, instrument: Instrument) -> &CalibrationTable {
        match instrument {
            Instrument::Resistor => &self.resistor,
            Instrument::Voltage => &self.voltage,
            Instrument::Current => &self.current,
        }
    }
}
