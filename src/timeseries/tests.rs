// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Tests for the time-series containers.

use super::*;

use approx::assert_abs_diff_eq;
use chrono::{SecondsFormat, TimeZone};
use ndarray::{array, Array1};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 4, 27, 3, 25, 30).unwrap()
}

fn ramp(n: usize) -> Array1<f64> {
    Array1::from_iter((0..n).map(|i| i as f64))
}

#[test]
fn kind_follows_component() {
    let ch = ChannelTimeSeries::new("Ex", 150.0, t0(), ramp(10)).unwrap();
    assert_eq!(ch.kind(), ChannelKind::Electric);
    assert_eq!(ch.component(), "ex");

    let ch = ChannelTimeSeries::new("hz", 150.0, t0(), ramp(10)).unwrap();
    assert_eq!(ch.kind(), ChannelKind::Magnetic);
}

#[test]
fn component_kind_mismatch_rejected() {
    // An electric channel can't be called "hx", and a magnetic one can't be
    // called "ey".
    let result = ChannelTimeSeries::with_kind("hx", ChannelKind::Electric, 150.0, t0(), ramp(4));
    assert!(matches!(
        result,
        Err(TimeSeriesError::ComponentKindMismatch { .. })
    ));
    let result = ChannelTimeSeries::with_kind("ey", ChannelKind::Magnetic, 150.0, t0(), ramp(4));
    assert!(matches!(
        result,
        Err(TimeSeriesError::ComponentKindMismatch { .. })
    ));
    let result =
        ChannelTimeSeries::with_kind("battery", ChannelKind::Auxiliary, 150.0, t0(), ramp(4));
    assert!(result.is_ok());
}

#[test]
fn empty_and_unsampled_rejected() {
    assert!(matches!(
        ChannelTimeSeries::new("ex", 150.0, t0(), Array1::zeros(0)),
        Err(TimeSeriesError::EmptyData)
    ));
    assert!(matches!(
        ChannelTimeSeries::new("ex", 0.0, t0(), ramp(4)),
        Err(TimeSeriesError::ZeroSampleRate)
    ));
}

#[test]
fn end_is_the_last_sample() {
    // 48000 samples at 24 kHz: the last sample lands 1.999958 s in.
    let ch = ChannelTimeSeries::new("hx", 24000.0, t0(), ramp(48_000)).unwrap();
    assert_eq!(
        ch.end().to_rfc3339_opts(SecondsFormat::AutoSi, false),
        "2021-04-27T03:25:31.999958333+00:00"
    );
}

#[test]
fn slice_is_inclusive() {
    let ch = ChannelTimeSeries::new("ex", 1.0, t0(), ramp(10)).unwrap();
    let sliced = ch
        .slice(t0() + Duration::seconds(2), t0() + Duration::seconds(5))
        .unwrap();
    assert_eq!(sliced.start(), t0() + Duration::seconds(2));
    assert_abs_diff_eq!(*sliced.data(), array![2.0, 3.0, 4.0, 5.0]);

    // A window past the data is empty, not clamped into existence.
    let result = ch.slice(t0() + Duration::seconds(30), t0() + Duration::seconds(40));
    assert!(matches!(result, Err(TimeSeriesError::EmptySlice { .. })));
}

#[test]
fn slice_clamps_to_data() {
    let ch = ChannelTimeSeries::new("ex", 1.0, t0(), ramp(5)).unwrap();
    let sliced = ch
        .slice(t0() - Duration::seconds(100), t0() + Duration::seconds(100))
        .unwrap();
    assert_eq!(sliced.n_samples(), 5);
    assert_eq!(sliced.start(), t0());
}

#[test]
fn decimate_keeps_every_nth() {
    let ch = ChannelTimeSeries::new("ex", 150.0, t0(), ramp(9)).unwrap();
    let dec = ch.decimate(3).unwrap();
    assert_abs_diff_eq!(dec.sample_rate(), 50.0);
    assert_abs_diff_eq!(*dec.data(), array![0.0, 3.0, 6.0]);
    assert!(matches!(
        ch.decimate(0),
        Err(TimeSeriesError::BadDecimationFactor(0))
    ));
}

#[test]
fn run_trims_to_common_window() {
    // hx covers [0, 9] s, ex covers [2, 11] s; the run is [2, 9].
    let hx = ChannelTimeSeries::new("hx", 1.0, t0(), ramp(10)).unwrap();
    let ex =
        ChannelTimeSeries::new("ex", 1.0, t0() + Duration::seconds(2), ramp(10)).unwrap();
    let run = RunTimeSeries::new(vec![hx, ex]).unwrap();

    assert_eq!(run.start(), t0() + Duration::seconds(2));
    assert_eq!(run.end(), t0() + Duration::seconds(9));
    assert_eq!(run.components(), ["ex", "hx"]);
    // Both channels hold exactly the common window.
    assert_eq!(run.get("hx").unwrap().n_samples(), 8);
    assert_abs_diff_eq!(run.get("hx").unwrap().data()[0], 2.0);
    assert_abs_diff_eq!(run.get("ex").unwrap().data()[0], 0.0);
}

#[test]
fn run_rejects_bad_combinations() {
    assert!(matches!(
        RunTimeSeries::new(vec![]),
        Err(TimeSeriesError::NoChannels)
    ));

    let hx = ChannelTimeSeries::new("hx", 150.0, t0(), ramp(10)).unwrap();
    let ex = ChannelTimeSeries::new("ex", 24000.0, t0(), ramp(10)).unwrap();
    assert!(matches!(
        RunTimeSeries::new(vec![hx.clone(), ex]),
        Err(TimeSeriesError::SampleRateMismatch { .. })
    ));

    assert!(matches!(
        RunTimeSeries::new(vec![hx.clone(), hx.clone()]),
        Err(TimeSeriesError::DuplicateComponent(_))
    ));

    let late = ChannelTimeSeries::new("ex", 150.0, t0() + Duration::days(1), ramp(10)).unwrap();
    assert!(matches!(
        RunTimeSeries::new(vec![hx, late]),
        Err(TimeSeriesError::NoOverlap)
    ));
}
