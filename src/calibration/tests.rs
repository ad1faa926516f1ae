// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Tests for calibration parsing and matching.

use super::*;

use std::f64::consts::PI;

use approx::assert_abs_diff_eq;
use tempfile::tempdir;

const RXCAL: &str = r#"{
    "file_type": "receiver calibration",
    "instrument_type": "MTU-5C",
    "serial_number": "10128",
    "timestamp": "2021-04-26T18:01:02+00:00",
    "cal_data": [
        {"tag": "H1", "freq_Hz": [0.1, 1.0, 10.0],
         "magnitude": [1.0, 1.0, 0.99], "phs_deg": [0.0, -1.0, -45.0]},
        {"tag": "E1", "freq_Hz": [0.1, 1.0, 10.0],
         "magnitude": [1.0, 1.0, 1.0], "phs_deg": [0.0, 0.0, 0.0]}
    ]
}"#;

const SCAL: &str = r#"{
    "file_type": "sensor calibration",
    "instrument_type": "MTC-155",
    "serial_number": "57005",
    "cal_data": [
        {"freq_Hz": [0.01, 0.1, 1.0, 10.0],
         "magnitude": [0.1, 1.0, 10.0, 100.0],
         "phs_deg": [90.0, 85.0, 45.0, 5.0]}
    ]
}"#;

#[test]
fn parse_receiver_calibration() {
    let cal = Calibration::from_json(RXCAL, "rxcal").unwrap();
    assert_eq!(cal.file_type, "receiver calibration");
    assert_eq!(cal.serial, "10128");
    assert_eq!(cal.n_responses(), 2);

    // Tags match case-insensitively; phases come back in radians.
    let h1 = cal.response_for("h1").unwrap();
    assert_abs_diff_eq!(h1.frequencies[2], 10.0);
    assert_abs_diff_eq!(h1.phases[2], -PI / 4.0);

    // A tagged file doesn't match arbitrary tags.
    assert!(cal.response_for("hz").is_none());
}

#[test]
fn untagged_sensor_table_matches_any_tag() {
    let cal = Calibration::from_json(SCAL, "scal").unwrap();
    assert_eq!(cal.n_responses(), 1);
    let response = cal.response_for("hx").unwrap();
    assert_abs_diff_eq!(response.amplitudes[3], 100.0);
    assert_abs_diff_eq!(response.phases[0], PI / 2.0);
}

#[test]
fn ragged_table_rejected() {
    let result = Calibration::from_json(
        r#"{"serial_number": "1", "cal_data":
            [{"freq_Hz": [1.0, 2.0], "magnitude": [1.0], "phs_deg": [0.0, 0.0]}]}"#,
        "bad",
    );
    assert!(matches!(
        result,
        Err(CalibrationError::TableLengthMismatch {
            frequencies: 2,
            amplitudes: 1,
            phases: 2,
            ..
        })
    ));
}

#[test]
fn non_ascending_frequencies_rejected() {
    let result = Calibration::from_json(
        r#"{"serial_number": "1", "cal_data":
            [{"freq_Hz": [1.0, 1.0], "magnitude": [1.0, 1.0], "phs_deg": [0.0, 0.0]}]}"#,
        "bad",
    );
    assert!(matches!(
        result,
        Err(CalibrationError::FrequenciesNotAscending(_))
    ));
}

#[test]
fn empty_calibration_rejected() {
    let result = Calibration::from_json(r#"{"serial_number": "1", "cal_data": []}"#, "empty");
    assert!(matches!(result, Err(CalibrationError::NoResponses(_))));
}

#[test]
fn mapping_source() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("10128_rxcal.json");
    std::fs::write(&path, RXCAL).unwrap();

    let set = CalibrationSet::new(CalibrationSource::Mapping(
        [("10128".to_string(), path)].into(),
    ));
    let cal = set.find("10128").unwrap().unwrap();
    assert_eq!(cal.serial, "10128");
    // Unmapped serials resolve to nothing.
    assert!(set.find("99999").unwrap().is_none());
}

#[test]
fn mapping_to_missing_file_is_an_error() {
    let set = CalibrationSet::new(CalibrationSource::Mapping(
        [("10128".to_string(), PathBuf::from("gone.json"))].into(),
    ));
    assert!(matches!(
        set.find("10128"),
        Err(CalibrationError::FileDoesntExist(_))
    ));
}

#[test]
fn directory_source_auto_matches() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("rxcal.json"), RXCAL).unwrap();
    std::fs::write(dir.path().join("scal.json"), SCAL).unwrap();
    // Junk that must be skipped, not fatal.
    std::fs::write(dir.path().join("notes.json"), "{\"hello\": 1}").unwrap();
    std::fs::write(dir.path().join("readme.txt"), "not json at all").unwrap();

    let set = CalibrationSet::new(CalibrationSource::Directory(dir.path().to_path_buf()));
    assert_eq!(set.find("10128").unwrap().unwrap().serial, "10128");
    assert_eq!(set.find("57005").unwrap().unwrap().serial, "57005");
    assert!(set.find("31337").unwrap().is_none());
}

#[test]
fn missing_directory_is_an_error() {
    let set = CalibrationSet::new(CalibrationSource::Directory(PathBuf::from("gone/cal")));
    assert!(matches!(
        set.find("10128"),
        Err(CalibrationError::DirDoesntExist(_))
    ));
}
