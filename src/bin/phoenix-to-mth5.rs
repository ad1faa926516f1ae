// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Convert a Phoenix MTU-5C station directory into an MTH5 archive.
//!
//! Usage: phoenix-to-mth5 <station dir> [output.h5] [rates] [rxcal dir] [scal dir]
//!
//! `rates` is a comma-separated list of sample rates in samples/second,
//! defaulting to 150,24000. Set RUST_LOG=info to watch the conversion.

use std::path::PathBuf;

use phoenix_mth5::calibration::CalibrationSource;
use phoenix_mth5::PhoenixToMth5;

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let station_dir = match args.first() {
        Some(dir) => dir,
        None => {
            eprintln!(
                "usage: phoenix-to-mth5 <station dir> [output.h5] [rates] [rxcal dir] [scal dir]"
            );
            std::process::exit(2);
        }
    };

    let mut builder = PhoenixToMth5::new(station_dir);
    if let Some(output) = args.get(1) {
        builder = builder.archive_filename(output);
    }
    if let Some(rates) = args.get(2) {
        let rates: Result<Vec<f64>, _> = rates.split(',').map(str::parse).collect();
        match rates {
            Ok(rates) => builder = builder.sample_rates(&rates),
            Err(e) => {
                eprintln!("Couldn't parse sample rates: {e}");
                std::process::exit(2);
            }
        }
    }
    if let Some(dir) = args.get(3) {
        builder = builder.receiver_calibrations(CalibrationSource::Directory(PathBuf::from(dir)));
    }
    if let Some(dir) = args.get(4) {
        builder = builder.sensor_calibrations(CalibrationSource::Directory(PathBuf::from(dir)));
    }

    match builder.convert() {
        Ok(path) => println!("{}", path.display()),
        Err(e) => {
            eprintln!("Conversion failed: {e}");
            std::process::exit(1);
        }
    }
}
