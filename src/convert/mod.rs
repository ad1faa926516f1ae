// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! One-call conversion of a station directory into an MTH5 archive.
//!
//! ```no_run
//! use phoenix_mth5::{calibration::CalibrationSource, PhoenixToMth5};
//!
//! let archive = PhoenixToMth5::new("10128_2021-04-27-032436")
//!     .sample_rates(&[150.0, 24000.0])
//!     .receiver_calibrations(CalibrationSource::Directory("rxcal".into()))
//!     .sensor_calibrations(CalibrationSource::Directory("scal".into()))
//!     .convert()?;
//! # Ok::<(), phoenix_mth5::ConvertError>(())
//! ```

mod error;
#[cfg(test)]
mod tests;

pub use error::ConvertError;

use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::archive::{Filter, FilterKind, Mth5File, RunMetadata, StationMetadata};
use crate::calibration::{Calibration, CalibrationSet, CalibrationSource};
use crate::constants::{DEFAULT_ARCHIVE_NAME, DEFAULT_SAMPLE_RATES};
use crate::recmeta::RecordingMetadata;
use crate::station::{assemble_runs, RunChannel};
use crate::timeseries::RunTimeSeries;
use crate::types::ChannelKind;

/// Builder for a station-directory conversion.
pub struct PhoenixToMth5 {
    station_dir: PathBuf,
    archive_path: Option<PathBuf>,
    sample_rates: Vec<f64>,
    receiver_calibrations: Option<CalibrationSource>,
    sensor_calibrations: Option<CalibrationSource>,
}

impl PhoenixToMth5 {
    pub fn new<T: AsRef<Path>>(station_dir: T) -> PhoenixToMth5 {
        PhoenixToMth5 {
            station_dir: station_dir.as_ref().to_path_buf(),
            archive_path: None,
            sample_rates: DEFAULT_SAMPLE_RATES.to_vec(),
            receiver_calibrations: None,
            sensor_calibrations: None,
        }
    }

    /// Where to write the archive. A relative path lands inside the station
    /// directory; the default is `from_phoenix.h5` there.
    pub fn archive_filename<T: AsRef<Path>>(mut self, path: T) -> PhoenixToMth5 {
        self.archive_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Which acquisition rates to include [samples/second].
    pub fn sample_rates(mut self, rates: &[f64]) -> PhoenixToMth5 {
        self.sample_rates = rates.to_vec();
        self
    }

    pub fn receiver_calibrations(mut self, source: CalibrationSource) -> PhoenixToMth5 {
        self.receiver_calibrations = Some(source);
        self
    }

    pub fn sensor_calibrations(mut self, source: CalibrationSource) -> PhoenixToMth5 {
        self.sensor_calibrations = Some(source);
        self
    }

    fn archive_path(&self) -> PathBuf {
        match &self.archive_path {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => self.station_dir.join(path),
            None => self.station_dir.join(DEFAULT_ARCHIVE_NAME),
        }
    }

    /// Run the conversion, returning the path of the produced archive. An
    /// archive already at that path is overwritten.
    pub fn convert(&self) -> Result<PathBuf, ConvertError> {
        if !self.station_dir.is_dir() {
            return Err(ConvertError::StationDirDoesntExist(
                self.station_dir.display().to_string(),
            ));
        }
        let recmeta = RecordingMetadata::from_file(self.station_dir.join("recmeta.json"))?;
        info!(
            "Converting {} (receiver {} {})",
            self.station_dir.display(),
            recmeta.instrument_type,
            recmeta.instrument_serial
        );

        let runs = assemble_runs(&self.station_dir, &recmeta, &self.sample_rates)?;

        let receiver_cal = match &self.receiver_calibrations {
            Some(source) => CalibrationSet::new(source.clone()).find(&recmeta.instrument_serial)?,
            None => None,
        };
        let sensor_cals = self
            .sensor_calibrations
            .as_ref()
            .map(|source| CalibrationSet::new(source.clone()));

        let archive_path = self.archive_path();
        let survey = recmeta.survey_id();
        let station = recmeta.station_id();
        let archive = Mth5File::create(&archive_path, survey)?;

        // Prefer the surveyed position from recmeta; fall back to the GPS
        // fix in the first file header.
        let (latitude, longitude, elevation) = match recmeta.gps {
            Some(gps) => (gps.lat, gps.lon, gps.elev),
            None => runs
                .first()
                .and_then(|run| run.channels.first())
                .map(|c| {
                    (
                        c.header.gps_lat as f64,
                        c.header.gps_long as f64,
                        c.header.gps_elevation as f64,
                    )
                })
                .unwrap_or_default(),
        };
        archive.add_station(
            survey,
            &StationMetadata {
                id: station.to_string(),
                latitude,
                longitude,
                elevation,
                data_logger_type: recmeta.instrument_type.clone(),
                data_logger_serial: recmeta.instrument_serial.clone(),
            },
        )?;

        let mut n_channels = 0;
        for run in runs {
            let mut channels = vec![];
            for mut channel in run.channels {
                attach_filters(
                    &archive,
                    survey,
                    receiver_cal.as_deref(),
                    sensor_cals.as_ref(),
                    &mut channel,
                )?;
                channels.push(channel.ts);
            }

            let aligned = RunTimeSeries::new(channels)?;
            archive.add_run(
                survey,
                station,
                &RunMetadata {
                    id: run.id.clone(),
                    sample_rate: aligned.sample_rate(),
                    start: aligned.start(),
                    end: aligned.end(),
                },
            )?;
            for channel in aligned.channels() {
                archive.add_channel(survey, station, &run.id, channel)?;
                n_channels += 1;
            }
        }

        info!(
            "Wrote {} channel(s) to {}",
            n_channels,
            archive_path.display()
        );
        Ok(archive_path)
    }
}

/// Register this channel's filters with the archive and record their names
/// on the channel.
fn attach_filters(
    archive: &Mth5File,
    survey: &str,
    receiver_cal: Option<&Calibration>,
    sensor_cals: Option<&CalibrationSet>,
    channel: &mut RunChannel,
) -> Result<(), ConvertError> {
    let component = channel.ts.component().to_string();
    let mut applied = vec![];

    // The physical unit this channel's sensor measures.
    let measured_units = match channel.ts.kind() {
        ChannelKind::Electric => "millivolts per kilometer",
        ChannelKind::Magnetic => "nanotesla",
        ChannelKind::Auxiliary => "millivolts",
    };

    if let Some(cal) = receiver_cal {
        match cal.response_for(&component) {
            Some(response) => {
                let filter = Filter {
                    name: format!("{}_rxcal_{}", cal.serial, component),
                    units_in: "millivolts".to_string(),
                    units_out: "millivolts".to_string(),
                    kind: FilterKind::FrequencyTable {
                        frequencies: response.frequencies.clone(),
                        amplitudes: response.amplitudes.clone(),
                        phases: response.phases.clone(),
                    },
                };
                archive.add_filter(survey, &filter)?;
                applied.push(filter.sanitized_name());
            }
            None => warn!("Receiver calibration {} has no response for {component}", cal.serial),
        }
    }

    if let (Some(cals), Some(serial)) = (sensor_cals, channel.ts.sensor_id.clone()) {
        if let Some(cal) = cals.find(&serial)? {
            match cal.response_for(&component) {
                Some(response) => {
                    let filter = Filter {
                        name: format!("{}_scal", cal.serial),
                        units_in: measured_units.to_string(),
                        units_out: "millivolts".to_string(),
                        kind: FilterKind::FrequencyTable {
                            frequencies: response.frequencies.clone(),
                            amplitudes: response.amplitudes.clone(),
                            phases: response.phases.clone(),
                        },
                    };
                    archive.add_filter(survey, &filter)?;
                    applied.push(filter.sanitized_name());
                }
                None => warn!("Sensor calibration {serial} has no response for {component}"),
            }
        }
    }

    // The selectable gain stages always get undone, calibrations or not.
    let gain_filter = Filter {
        name: format!("{component}_total_gain"),
        units_in: "millivolts".to_string(),
        units_out: "millivolts".to_string(),
        kind: FilterKind::Coefficient {
            gain: channel.header.total_selectable_gain(),
        },
    };
    archive.add_filter(survey, &gain_filter)?;
    applied.push(gain_filter.sanitized_name());

    channel.ts.filters_applied = applied;
    Ok(())
}

/// The one-call shape: convert a station directory with everything
/// defaulted unless given.
pub fn from_phoenix<T: AsRef<Path>>(
    station_dir: T,
    archive_filename: Option<&Path>,
    sample_rates: Option<&[f64]>,
    receiver_calibrations: Option<CalibrationSource>,
    sensor_calibrations: Option<CalibrationSource>,
) -> Result<PathBuf, ConvertError> {
    let mut builder = PhoenixToMth5::new(station_dir);
    if let Some(path) = archive_filename {
        builder = builder.archive_filename(path);
    }
    if let Some(rates) = sample_rates {
        builder = builder.sample_rates(rates);
    }
    if let Some(source) = receiver_calibrations {
        builder = builder.receiver_calibrations(source);
    }
    if let Some(source) = sensor_calibrations {
        builder = builder.sensor_calibrations(source);
    }
    builder.convert()
}
