use ndarray_rand::rand::{Rng, SeedableRng};
use rand_isaac::Isaac64Rng;
use tempdir::TempDir;

use error_analysis::config::Config;
use error_analysis::history::History;
use error_analysis::margin::parse_readings;
use error_analysis::{analyze, Analysis, Error, Instrument, Policy, Result};

fn create_working_dir(test_name: &str) -> TempDir {
    TempDir::new(test_name).unwrap()
}

/// Readings scattered uniformly by `spread` around `centre`
fn generate_readings<R: Rng>(rng: &mut R, centre: f64, spread: f64, num: usize) -> Vec<f64> {
    (0..num)
        .map(|_| centre + rng.gen_range(-spread..spread))
        .collect()
}

#[test]
fn resistor_readings_around_ten_ohm() -> Result<()> {
    let readings = parse_readings("9.8, 10.0, 10.2, 9.9, 10.1")?;

    let report = analyze(&readings, Instrument::Resistor)?;

    // 10 ohm closes the "1.1-10" range
    approx::assert_relative_eq!(report.average, 10.);
    approx::assert_relative_eq!(report.standard_deviation, 0.158_113_883, max_relative = 1e-8);
    approx::assert_relative_eq!(report.random_error, 0.070_710_678, max_relative = 1e-8);
    approx::assert_relative_eq!(
        report.systematic_error,
        10.0 * 0.000_085 + 0.000_020 * 0.001,
        max_relative = 1e-12
    );
    approx::assert_relative_eq!(
        report.total_error,
        report.random_error.hypot(report.systematic_error),
        max_relative = 1e-12
    );
    assert!(report.total_error >= report.random_error);
    approx::assert_abs_diff_eq!(report.total_error, 0.0707, epsilon = 1e-4);

    // The appended reading pushes the average into the gap before "10.1-100", where no
    // systematic error is assigned
    approx::assert_relative_eq!(
        report.partial_derivative,
        -report.systematic_error / 1e-6,
        max_relative = 1e-9
    );
    Ok(())
}

#[test]
fn constant_readings_only_carry_systematic_error() -> Result<()> {
    let report = analyze(&[2., 2., 2., 2.], Instrument::Voltage)?;

    approx::assert_abs_diff_eq!(report.standard_deviation, 0.);
    approx::assert_abs_diff_eq!(report.random_error, 0.);
    approx::assert_relative_eq!(report.total_error, report.systematic_error);
    Ok(())
}

#[test]
fn negative_resistance_has_no_systematic_error() -> Result<()> {
    let report = analyze(&[-5.1, -4.9, -5.0], Instrument::Resistor)?;

    approx::assert_abs_diff_eq!(report.systematic_error, 0.);
    approx::assert_relative_eq!(report.total_error, report.random_error);
    approx::assert_abs_diff_eq!(report.partial_derivative, 0.);
    Ok(())
}

#[test]
fn single_reading_cannot_be_analysed() {
    for readings in [vec![], vec![1.0]] {
        assert!(matches!(
            analyze(&readings, Instrument::Current),
            Err(Error::InvalidInput(_))
        ));
    }
}

#[test]
fn every_instrument_uses_its_own_table() -> Result<()> {
    let seed = 40;
    let mut rng = Isaac64Rng::seed_from_u64(seed);
    let num_readings = rng.gen_range(5..50);

    for (instrument, centre, multiplier, constant) in [
        (Instrument::Resistor, 500., 0.000_75, 0.000_006),
        (Instrument::Voltage, 50., 0.000_04, 0.000_006 * 100.),
        (Instrument::Current, 2., 0.000_5, 0.000_04 * 3.),
    ] {
        let readings = generate_readings(&mut rng, centre, 0.1, num_readings);
        let report = analyze(&readings, instrument)?;

        approx::assert_relative_eq!(
            report.systematic_error,
            report.average * multiplier + constant,
            max_relative = 1e-12
        );
        assert!(report.total_error >= report.systematic_error);
        assert!(report.total_error >= report.random_error);
    }
    Ok(())
}

#[test]
fn configured_tables_drive_the_analysis() -> Result<()> {
    let tmp_dir = create_working_dir("configured_tables_drive_the_analysis");
    let config_path = tmp_dir.path().join("analysis.toml");
    std::fs::write(
        &config_path,
        r#"
            step = 1e-4

            [[tables.resistor]]
            range = "0-1000"
            base_multiplier = 0.0
            constant = 0.25
        "#,
    )?;

    let config = Config::from_file(&config_path)?;
    let report = config
        .analysis()
        .analyze(&[99., 100., 101.], Instrument::Resistor)?;

    approx::assert_relative_eq!(report.systematic_error, 0.25);
    // Constant systematic error over the whole range
    approx::assert_abs_diff_eq!(report.partial_derivative, 0.);
    Ok(())
}

#[test]
fn strict_analysis_reports_uncalibrated_average() {
    let analysis = Analysis::default().with_policy(Policy::Strict);

    let result = analysis.analyze(&[20., 21.], Instrument::Current);

    match result {
        Err(Error::NoCalibrationRange { instrument, value }) => {
            assert_eq!(instrument, Instrument::Current);
            approx::assert_relative_eq!(value, 20.5);
        }
        other => panic!("expected a missing calibration range, got {other:?}"),
    }
}

#[test]
fn missing_configuration_file_is_an_io_error() {
    let tmp_dir = create_working_dir("missing_configuration_file_is_an_io_error");
    let result = Config::from_file(&tmp_dir.path().join("absent.toml"));
    assert!(matches!(result, Err(Error::Io(_))));
}

#[test]
fn history_accumulates_across_saves() -> Result<()> {
    let seed = 40;
    let mut rng = Isaac64Rng::seed_from_u64(seed);
    let tmp_dir = create_working_dir("history_accumulates_across_saves");
    let csv_path = tmp_dir.path().join("history.csv");

    let mut history = History::new();
    for instrument in Instrument::ALL {
        let readings = generate_readings(&mut rng, 0.5, 0.01, 10);
        history.push(instrument, &analyze(&readings, instrument)?);
    }
    history.save(&csv_path)?;

    let mut reloaded = History::load(&csv_path)?;
    assert_eq!(reloaded, history);

    let readings = generate_readings(&mut rng, 5., 0.1, 10);
    reloaded.push(
        Instrument::Voltage,
        &analyze(&readings, Instrument::Voltage)?,
    );
    reloaded.save(&csv_path)?;

    let records = History::load(&csv_path)?;
    assert_eq!(records.len(), 4);
    assert_eq!(records.records()[3].instrument, Instrument::Voltage);
    Ok(())
}

#[test]
fn strict_configuration_accepts_calibrated_edge_average() -> Result<()> {
    let config: Config = r#"policy = "strict""#.parse()?;
    let readings = parse_readings(&["9.8, 10.0", "10.2", "9.9,10.1"].join(","))?;

    let report = config.analysis().analyze(&readings, Instrument::Resistor)?;

    approx::assert_relative_eq!(
        report.systematic_error,
        10.0 * 0.000_085 + 0.000_020 * 0.001,
        max_relative = 1e-12
    );
    approx::assert_relative_eq!(
        report.partial_derivative,
        -report.systematic_error / config.step,
        max_relative = 1e-9
    );
    Ok(())
}

#[test]
fn appending_creates_then_extends_history_file() -> Result<()> {
    let tmp_dir = create_working_dir("appending_creates_then_extends_history_file");
    let csv_path = tmp_dir.path().join("history.csv");

    let first = analyze(&[1.5, 1.6, 1.7], Instrument::Voltage)?;
    let written = History::append_to(&csv_path, Instrument::Voltage, &first)?;
    assert_eq!(written.len(), 1);

    let second = analyze(&[0.5, 0.52], Instrument::Current)?;
    let written = History::append_to(&csv_path, Instrument::Current, &second)?;
    assert_eq!(written.len(), 2);

    let reloaded = History::load(&csv_path)?;
    assert_eq!(reloaded, written);
    assert_eq!(reloaded.records()[0].instrument, Instrument::Voltage);
    approx::assert_relative_eq!(reloaded.records()[1].average, second.average);
    Ok(())
}

#[test]
fn appending_to_a_foreign_file_fails() -> Result<()> {
    let tmp_dir = create_working_dir("appending_to_a_foreign_file_fails");
    let csv_path = tmp_dir.path().join("notes.csv");
    std::fs::write(&csv_path, "Type,Average\ncapacitor,1\n")?;

    let report = analyze(&[1.5, 1.6], Instrument::Voltage)?;
    assert!(History::append_to(&csv_path, Instrument::Voltage, &report).is_err());
    Ok(())
}
