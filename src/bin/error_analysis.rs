//! Error analysis of repeated instrument readings from the command line.
//!
//! ```text
//! error-analysis --type resistor 9.8,10.0,10.2,9.9,10.1 --csv history.csv
//! ```

use std::path::PathBuf;

use clap::Parser;
use log::info;

use error_analysis::config::Config;
use error_analysis::history::History;
use error_analysis::margin::parse_readings;
use error_analysis::{Instrument, Policy};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Instrument the readings were taken with: resistor, voltage or current
    #[arg(short = 't', long = "type")]
    instrument: Instrument,

    /// Readings, comma separated and/or as separate arguments
    #[arg(required = true, allow_negative_numbers = true)]
    readings: Vec<String>,

    /// TOML file with calibration tables and analysis settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Fail instead of assuming zero systematic error for uncalibrated averages
    #[arg(long)]
    strict: bool,

    /// Finite-difference step of the sensitivity estimate
    #[arg(long)]
    step: Option<f64>,

    /// Append the result to this CSV history file
    #[arg(long)]
    csv: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if args.strict {
        config.policy = Policy::Strict;
    }
    if let Some(step) = args.step {
        config.step = step;
    }

    let readings = parse_readings(&args.readings.join(","))?;
    let report = config.analysis().analyze(&readings, args.instrument)?;

    println!("Error analysis of {} {} readings", readings.len(), args.instrument);
    println!("{report}");

    if let Some(path) = &args.csv {
        let history = History::append_to(path, args.instrument, &report)?;
        info!("history now holds {} records", history.len());
    }

    Ok(())
}
