// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! End-to-end conversion tests over a synthetic station directory.

use super::*;

use std::io::Write;

use approx::assert_abs_diff_eq;
use tempfile::{tempdir, TempDir};

use crate::archive::{FilterKind, Mth5File};
use crate::phoenix::{FileHeader, FileType, SegmentHeader};
use crate::types::ChannelKind;

const RECORDING_ID: u32 = 0x608783F4;

const RECMETA: &str = r#"{
    "instrument_type": "MTU-5C",
    "instrument_serial": "10128",
    "station": "MT001",
    "survey": "toronto_test",
    "gps": {"lat": 43.6962547, "lon": -79.3936462, "elev": 140.1},
    "chconfig": {
        "chans": [
            {"channel_id": 0, "tag": "hx", "type": "H",
             "sensor_serial": "57005", "sensor_type": "MTC-155"},
            {"channel_id": 3, "tag": "ex", "type": "E",
             "dipole_length_m": 100.0, "azimuth": 90.0}
        ]
    }
}"#;

const RXCAL: &str = r#"{
    "file_type": "receiver calibration",
    "instrument_type": "MTU-5C",
    "serial_number": "10128",
    "cal_data": [
        {"tag": "hx", "freq_Hz": [0.1, 1.0, 10.0],
         "magnitude": [1.0, 1.0, 0.99], "phs_deg": [0.0, -1.0, -45.0]},
        {"tag": "ex", "freq_Hz": [0.1, 1.0, 10.0],
         "magnitude": [1.0, 1.0, 1.0], "phs_deg": [0.0, 0.0, 0.0]}
    ]
}"#;

const SCAL: &str = r#"{
    "file_type": "sensor calibration",
    "instrument_type": "MTC-155",
    "serial_number": "57005",
    "cal_data": [
        {"freq_Hz": [0.01, 0.1, 1.0], "magnitude": [0.1, 1.0, 10.0],
         "phs_deg": [90.0, 85.0, 45.0]}
    ]
}"#;

fn base_header(channel_id: u8, kind: ChannelKind) -> FileHeader {
    FileHeader {
        file_type: FileType::Continuous,
        file_version: 2,
        recording_id: RECORDING_ID,
        instrument_type: "MTU-5C".to_string(),
        instrument_serial: "10128".to_string(),
        channel_id,
        channel_type: kind,
        frame_size: 64,
        bytes_per_sample: 3,
        data_footer: 4,
        sample_rate_base: 150,
        sample_rate_exp: 0,
        future1: 0,
        future2: 0,
        file_sequence: 1,
        frag_period: 360,
        max_samples: 0,
        gps_lat: 43.696_255,
        gps_long: -79.393_646,
        gps_elevation: 140.102_63,
        gps_horizontal_accuracy_mm: 17_512,
        gps_vertical_accuracy_mm: 22_404,
        battery_voltage_mv: 12_475,
        timing_flags: 55,
        timing_sat_count: 7,
        timing_stability: 201,
        lp_frequency: 10_000,
        preamp_gain: 1.0,
        channel_main_gain: 1.0,
        attenuator_gain: 1.0,
        ad_plus_minus_range: 5.0,
        intrinsic_circuitry_gain: 1.0,
        max_signal: 0.0,
        min_signal: 0.0,
        saturated_frames: 0,
        missing_frames: 0,
        ch_board_model: "BCM01-I".to_string(),
        ch_board_serial: 200_803,
        ch_firmware: 65_567,
    }
}

/// Write one continuous 150 Hz fragment holding a single 20-sample frame of
/// ascending counts.
fn write_continuous(dir: &std::path::Path, channel_id: u8, kind: ChannelKind, sequence: u32) {
    let header = FileHeader {
        file_sequence: sequence,
        ..base_header(channel_id, kind)
    };
    let name = format!(
        "10128_{RECORDING_ID:08X}_{channel_id}_{sequence:08}.bin"
    );
    let mut f = std::fs::File::create(dir.join(name)).unwrap();
    f.write_all(&header.to_bytes()).unwrap();
    let mut frame = vec![];
    for i in 0..20_i32 {
        frame.extend_from_slice(&(i * 100).to_le_bytes()[..3]);
    }
    frame.extend_from_slice(&[0; 4]);
    f.write_all(&frame).unwrap();
}

/// Write one segmented 24 kHz fragment holding two 2-sample bursts 360 s
/// apart.
fn write_segmented(dir: &std::path::Path, channel_id: u8, kind: ChannelKind) {
    let header = FileHeader {
        bytes_per_sample: 4,
        data_footer: 0,
        sample_rate_base: 24_000,
        file_type: FileType::Segmented,
        ..base_header(channel_id, kind)
    };
    let name = format!("10128_{RECORDING_ID:08X}_{channel_id}_00000001.td_24k");
    let mut f = std::fs::File::create(dir.join(name)).unwrap();
    f.write_all(&header.to_bytes()).unwrap();
    for (i, start) in [RECORDING_ID + 24, RECORDING_ID + 384].into_iter().enumerate() {
        let sub = SegmentHeader {
            gps_time_stamp: start,
            n_samples: 2,
            saturation_count: 0,
            missing_count: 0,
            value_min: 0.0,
            value_max: 1.0,
            value_mean: 0.5,
            segment: i as u32,
        };
        f.write_all(&sub.to_bytes()).unwrap();
        for v in [0.25_f32, 0.75] {
            f.write_all(&v.to_le_bytes()).unwrap();
        }
    }
}

/// A station directory with hx (channel 0) and ex (channel 3), each carrying
/// a two-fragment 150 Hz recording and a two-burst 24 kHz recording, plus
/// calibration exports in a sibling directory.
fn synthetic_station() -> (TempDir, std::path::PathBuf, std::path::PathBuf) {
    let dir = tempdir().unwrap();
    let station = dir.path().join("10128_2021-04-27-032436");
    for (channel_id, kind) in [(0, ChannelKind::Magnetic), (3, ChannelKind::Electric)] {
        let chan_dir = station.join(channel_id.to_string());
        std::fs::create_dir_all(&chan_dir).unwrap();
        write_continuous(&chan_dir, channel_id, kind, 1);
        write_continuous(&chan_dir, channel_id, kind, 2);
        write_segmented(&chan_dir, channel_id, kind);
    }
    std::fs::write(station.join("recmeta.json"), RECMETA).unwrap();

    let cal_dir = dir.path().join("calibrations");
    std::fs::create_dir_all(&cal_dir).unwrap();
    std::fs::write(cal_dir.join("10128_rxcal.json"), RXCAL).unwrap();
    std::fs::write(cal_dir.join("57005_scal.json"), SCAL).unwrap();

    (dir, station, cal_dir)
}

#[test]
fn converts_a_station_directory() {
    let (_dir, station, cal_dir) = synthetic_station();

    let archive_path = from_phoenix(
        &station,
        None,
        Some(&[150.0, 24000.0]),
        Some(CalibrationSource::Directory(cal_dir.clone())),
        Some(CalibrationSource::Directory(cal_dir)),
    )
    .unwrap();

    // The default output lands inside the station directory.
    assert_eq!(archive_path, station.join("from_phoenix.h5"));
    assert!(archive_path.is_file());

    let archive = Mth5File::open(&archive_path).unwrap();
    assert_eq!(archive.version().unwrap(), "0.2.0");
    assert_eq!(archive.survey_names().unwrap(), ["toronto_test"]);
    assert_eq!(archive.station_names("toronto_test").unwrap(), ["MT001"]);
    // One continuous run and one run per 24 kHz burst.
    assert_eq!(
        archive.run_names("toronto_test", "MT001").unwrap(),
        ["sr150_0001", "sr24000_0001", "sr24000_0002"]
    );

    // Two fragments of 20 samples each chain into 40.
    let hx = archive
        .read_channel("toronto_test", "MT001", "sr150_0001", "hx")
        .unwrap();
    assert_eq!(hx.len(), 40);
    // Counts scale by +/-5 V over 2^23 at unity gain, in millivolts.
    let scale = 5.0 / 8_388_608.0 * 1000.0;
    assert_abs_diff_eq!(hx[1], 100.0 * scale, epsilon = 1e-9);
    // The second fragment repeats the ramp.
    assert_abs_diff_eq!(hx[20], 0.0);

    let ex_burst = archive
        .read_channel("toronto_test", "MT001", "sr24000_0002", "ex")
        .unwrap();
    assert_abs_diff_eq!(ex_burst[0], 0.25);
    assert_abs_diff_eq!(ex_burst[1], 0.75);

    // Calibrations became filters: receiver per component, sensor for hx
    // only (ex has no sensor serial), and a gain coefficient per component.
    let names = archive.filter_names("toronto_test").unwrap();
    assert_eq!(
        names,
        [
            "10128_rxcal_ex",
            "10128_rxcal_hx",
            "57005_scal",
            "ex_total_gain",
            "hx_total_gain",
        ]
    );
    let scal = archive.get_filter("toronto_test", "57005_scal").unwrap();
    assert_eq!(scal.units_in, "nanotesla");
    assert!(matches!(scal.kind, FilterKind::FrequencyTable { .. }));
    let gain = archive.get_filter("toronto_test", "hx_total_gain").unwrap();
    assert!(matches!(gain.kind, FilterKind::Coefficient { gain } if gain == 1.0));

    // Channel attributes carry the recmeta identities.
    assert_eq!(
        archive
            .channel_attr("toronto_test", "MT001", "sr150_0001", "hx", "sensor.id")
            .unwrap(),
        "57005"
    );
    assert_eq!(
        archive
            .channel_attr("toronto_test", "MT001", "sr24000_0001", "ex", "type")
            .unwrap(),
        "electric"
    );

    // One summary row per stored channel: 2 channels x 3 runs.
    assert_eq!(archive.channel_summary().unwrap().nrows(), 6);
}

#[test]
fn existing_archive_is_overwritten() {
    let (_dir, station, _cal) = synthetic_station();
    let target = station.join("from_phoenix.h5");
    std::fs::write(&target, "stale bytes").unwrap();

    let first = from_phoenix(&station, None, Some(&[150.0]), None, None).unwrap();
    assert_eq!(first, target);
    let len_after_first = std::fs::metadata(&target).unwrap().len();

    // Converting again replaces the archive rather than appending to it.
    from_phoenix(&station, None, Some(&[150.0]), None, None).unwrap();
    assert_eq!(std::fs::metadata(&target).unwrap().len(), len_after_first);

    let archive = Mth5File::open(&target).unwrap();
    assert_eq!(archive.channel_summary().unwrap().nrows(), 2);
}

#[test]
fn single_rate_selection() {
    let (_dir, station, _cal) = synthetic_station();
    let path = from_phoenix(&station, Some(std::path::Path::new("just150.h5")), Some(&[150.0]), None, None)
        .unwrap();
    let archive = Mth5File::open(&path).unwrap();
    assert_eq!(
        archive.run_names("toronto_test", "MT001").unwrap(),
        ["sr150_0001"]
    );
    // Without calibration sources the gain coefficients still get stored.
    assert_eq!(
        archive.filter_names("toronto_test").unwrap(),
        ["ex_total_gain", "hx_total_gain"]
    );
}

#[test]
fn unknown_rate_is_an_error() {
    let (_dir, station, _cal) = synthetic_station();
    let result = from_phoenix(&station, None, Some(&[96_000.0]), None, None);
    assert!(matches!(result, Err(ConvertError::NoDataForRate(_))));
}

#[test]
fn missing_recmeta_is_an_error() {
    let (_dir, station, _cal) = synthetic_station();
    std::fs::remove_file(station.join("recmeta.json")).unwrap();
    let result = from_phoenix(&station, None, Some(&[150.0]), None, None);
    assert!(matches!(
        result,
        Err(ConvertError::Recmeta(crate::recmeta::RecmetaError::FileDoesntExist(_)))
    ));
}

#[test]
fn missing_station_dir_is_an_error() {
    let result = from_phoenix("no/such/station", None, None, None, None);
    assert!(matches!(
        result,
        Err(ConvertError::StationDirDoesntExist(_))
    ));
}
