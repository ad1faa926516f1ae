// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The MTH5 archive itself.
//!
//! An archive is a single HDF5 file:
//!
//! ```text
//! /                                   file.type, file.version, ...
//! /Experiment/channel_summary         one row per stored channel
//! /Experiment/Surveys/<survey>
//!     Filters/{zpk,coefficient,time_delay,fap}/<filter>
//!     Stations/<station>/<run>/<component>
//! ```

mod error;
pub mod filters;
pub mod summary;

pub use error::{InitMth5Error, Mth5Error};
pub use filters::{Filter, FilterKind};
pub use summary::{SummaryRow, SummaryTable};

use std::{
    path::{Path, PathBuf},
    sync::Mutex,
};

use chrono::{DateTime, SecondsFormat, Utc};
use hdf5::types::VarLenUnicode;
use log::{info, warn};
use ndarray::Array1;

use crate::constants::{MTH5_FILE_TYPE, MTH5_VERSION};
use crate::timeseries::ChannelTimeSeries;
use filters::FiltersGroup;

/// What the archive records about a station.
#[derive(Debug, Clone, Default)]
pub struct StationMetadata {
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: f64,
    pub data_logger_type: String,
    pub data_logger_serial: String,
}

/// What the archive records about a run.
#[derive(Debug, Clone)]
pub struct RunMetadata {
    pub id: String,
    pub sample_rate: f64,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// An open MTH5 archive. The [`hdf5::File`] is behind a [`Mutex`] to prevent
/// parallel usage of the file.
pub struct Mth5File {
    file: Mutex<hdf5::File>,
    path: PathBuf,
}

impl Mth5File {
    /// Create an archive, truncating any existing file at `path`, and lay
    /// down the group skeleton for one survey.
    pub fn create<T: AsRef<Path>>(path: T, survey: &str) -> Result<Mth5File, InitMth5Error> {
        // so that libhdf5 doesn't print errors to stdout
        hdf5::silence_errors(true);

        let path = path.as_ref();
        if path.exists() {
            warn!(
                "{} will be overwritten in 'w' mode",
                path.display()
            );
        }
        let file = hdf5::File::create(path)?;

        init_str_attr(&file, "file.type", MTH5_FILE_TYPE)?;
        init_str_attr(&file, "file.version", MTH5_VERSION)?;
        init_str_attr(&file, "file.access.platform", std::env::consts::OS)?;
        init_str_attr(
            &file,
            "file.access.application",
            concat!("phoenix_mth5 ", env!("CARGO_PKG_VERSION")),
        )?;
        init_str_attr(
            &file,
            "file.access.time",
            &Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        )?;

        let experiment = file.create_group("Experiment")?;
        summary::SummaryTable::create(&experiment, "channel_summary")
            .map_err(|e| match e {
                Mth5Error::Hdf5(e) => InitMth5Error::Hdf5(e),
                e => InitMth5Error::InvalidString(e.to_string()),
            })?;
        let surveys = experiment.create_group("Surveys")?;
        let survey_group = surveys.create_group(survey)?;
        survey_group.create_group("Stations")?;
        FiltersGroup::create(&survey_group)?;

        info!(
            "Initialized MTH5 {} file {} in mode w",
            MTH5_VERSION,
            path.display()
        );

        Ok(Mth5File {
            file: Mutex::new(file),
            path: path.to_path_buf(),
        })
    }

    /// Open an existing archive read-only, checking it really is one of the
    /// supported version.
    pub fn open<T: AsRef<Path>>(path: T) -> Result<Mth5File, InitMth5Error> {
        hdf5::silence_errors(true);

        let path = path.as_ref();
        if !path.exists() {
            return Err(InitMth5Error::FileDoesntExist(path.display().to_string()));
        }
        let file = hdf5::File::open(path)?;

        let file_type = match file.attr("file.type") {
            Ok(attr) => attr.read_scalar::<VarLenUnicode>()?.to_string(),
            Err(_) => return Err(InitMth5Error::NotAnMth5(path.display().to_string())),
        };
        if file_type != MTH5_FILE_TYPE {
            return Err(InitMth5Error::NotAnMth5(path.display().to_string()));
        }
        let version = file.attr("file.version")?.read_scalar::<VarLenUnicode>()?;
        if version.as_str() != MTH5_VERSION {
            return Err(InitMth5Error::WrongVersion {
                path: path.display().to_string(),
                got: version.to_string(),
                expected: MTH5_VERSION.to_string(),
            });
        }

        Ok(Mth5File {
            file: Mutex::new(file),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The archive schema version stored in the file.
    pub fn version(&self) -> Result<String, Mth5Error> {
        let file = self.file.lock().unwrap();
        read_str_attr(&file, "file.version")
    }

    pub fn survey_names(&self) -> Result<Vec<String>, Mth5Error> {
        let file = self.file.lock().unwrap();
        let mut names = file.group("Experiment/Surveys")?.member_names()?;
        names.sort_unstable();
        Ok(names)
    }

    pub fn station_names(&self, survey: &str) -> Result<Vec<String>, Mth5Error> {
        let file = self.file.lock().unwrap();
        let mut names = stations_group(&file, survey)?.member_names()?;
        names.sort_unstable();
        Ok(names)
    }

    pub fn run_names(&self, survey: &str, station: &str) -> Result<Vec<String>, Mth5Error> {
        let file = self.file.lock().unwrap();
        let mut names = stations_group(&file, survey)?
            .group(station)?
            .member_names()?;
        names.sort_unstable();
        Ok(names)
    }

    /// Add a station group (idempotent).
    pub fn add_station(&self, survey: &str, meta: &StationMetadata) -> Result<(), Mth5Error> {
        let file = self.file.lock().unwrap();
        let stations = stations_group(&file, survey)?;
        if stations.link_exists(&meta.id) {
            return Ok(());
        }
        let station = stations.create_group(&meta.id)?;
        write_str_attr(&station, "id", &meta.id)?;
        write_f64_attr(&station, "location.latitude", meta.latitude)?;
        write_f64_attr(&station, "location.longitude", meta.longitude)?;
        write_f64_attr(&station, "location.elevation", meta.elevation)?;
        write_str_attr(&station, "data_logger.type", &meta.data_logger_type)?;
        write_str_attr(&station, "data_logger.id", &meta.data_logger_serial)?;
        Ok(())
    }

    /// Add a run group under a station (idempotent).
    pub fn add_run(&self, survey: &str, station: &str, meta: &RunMetadata) -> Result<(), Mth5Error> {
        let file = self.file.lock().unwrap();
        let station = stations_group(&file, survey)?.group(station)?;
        if station.link_exists(&meta.id) {
            return Ok(());
        }
        let run = station.create_group(&meta.id)?;
        write_str_attr(&run, "id", &meta.id)?;
        write_f64_attr(&run, "sample_rate", meta.sample_rate)?;
        write_str_attr(&run, "time_period.start", &iso(meta.start))?;
        write_str_attr(&run, "time_period.end", &iso(meta.end))?;
        Ok(())
    }

    /// Write one channel's samples into a run and record it in the channel
    /// summary.
    pub fn add_channel(
        &self,
        survey: &str,
        station: &str,
        run_id: &str,
        channel: &ChannelTimeSeries,
    ) -> Result<(), Mth5Error> {
        let file = self.file.lock().unwrap();
        let run = stations_group(&file, survey)?
            .group(station)?
            .group(run_id)?;

        let ds = run
            .new_dataset_builder()
            .with_data(channel.data())
            .create(channel.component())?;
        write_str_attr(&ds, "component", channel.component())?;
        write_str_attr(&ds, "type", channel.kind().as_str())?;
        write_f64_attr(&ds, "sample_rate", channel.sample_rate())?;
        write_str_attr(&ds, "units", &channel.units)?;
        write_str_attr(&ds, "time_period.start", &iso(channel.start()))?;
        write_str_attr(&ds, "time_period.end", &iso(channel.end()))?;
        write_f64_attr(&ds, "measurement_azimuth", channel.azimuth)?;
        write_f64_attr(&ds, "measurement_tilt", channel.tilt)?;
        if let Some(serial) = &channel.sensor_id {
            write_str_attr(&ds, "sensor.id", serial)?;
        }
        if let Some(model) = &channel.sensor_type {
            write_str_attr(&ds, "sensor.type", model)?;
        }
        if let Some(length) = channel.dipole_length_m {
            write_f64_attr(&ds, "dipole_length", length)?;
        }
        if !channel.filters_applied.is_empty() {
            write_str_list_attr(&ds, "filter.name", &channel.filters_applied)?;
        }

        let row = SummaryRow::new(
            station,
            run_id,
            channel.component(),
            &iso(channel.start()),
            &iso(channel.end()),
            channel.n_samples() as u64,
            channel.sample_rate(),
            channel.kind().as_str(),
            &channel.units,
        )?;
        SummaryTable::open(&file.group("Experiment")?, "channel_summary")?.append(&row)?;

        Ok(())
    }

    /// Read a channel's samples back.
    pub fn read_channel(
        &self,
        survey: &str,
        station: &str,
        run_id: &str,
        component: &str,
    ) -> Result<Array1<f64>, Mth5Error> {
        let file = self.file.lock().unwrap();
        let ds = stations_group(&file, survey)?
            .group(station)?
            .group(run_id)?
            .dataset(component)?;
        Ok(ds.read_1d::<f64>()?)
    }

    /// Read a string attribute from a channel dataset.
    pub fn channel_attr(
        &self,
        survey: &str,
        station: &str,
        run_id: &str,
        component: &str,
        attr: &str,
    ) -> Result<String, Mth5Error> {
        let file = self.file.lock().unwrap();
        let ds = stations_group(&file, survey)?
            .group(station)?
            .group(run_id)?
            .dataset(component)?;
        read_str_attr(&ds, attr)
    }

    pub fn add_filter(&self, survey: &str, filter: &Filter) -> Result<(), Mth5Error> {
        let file = self.file.lock().unwrap();
        FiltersGroup::open(&survey_group(&file, survey)?)?.add_filter(filter)
    }

    pub fn filter_names(&self, survey: &str) -> Result<Vec<String>, Mth5Error> {
        let file = self.file.lock().unwrap();
        FiltersGroup::open(&survey_group(&file, survey)?)?.filter_names()
    }

    pub fn get_filter(&self, survey: &str, name: &str) -> Result<Filter, Mth5Error> {
        let file = self.file.lock().unwrap();
        FiltersGroup::open(&survey_group(&file, survey)?)?.get_filter(name)
    }

    /// The channel-summary table.
    pub fn channel_summary(&self) -> Result<SummaryTable, Mth5Error> {
        let file = self.file.lock().unwrap();
        SummaryTable::open(&file.group("Experiment")?, "channel_summary")
    }
}

fn survey_group(file: &hdf5::File, survey: &str) -> Result<hdf5::Group, Mth5Error> {
    let surveys = file.group("Experiment/Surveys")?;
    if !surveys.link_exists(survey) {
        return Err(Mth5Error::UnknownSurvey(survey.to_string()));
    }
    Ok(surveys.group(survey)?)
}

fn stations_group(file: &hdf5::File, survey: &str) -> Result<hdf5::Group, Mth5Error> {
    Ok(survey_group(file, survey)?.group("Stations")?)
}

pub(crate) fn iso(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::AutoSi, false)
}

fn varlen(value: &str) -> Result<VarLenUnicode, Mth5Error> {
    value
        .parse()
        .map_err(|_| Mth5Error::InvalidString(value.to_string()))
}

pub(crate) fn write_str_attr(
    obj: &hdf5::Location,
    name: &str,
    value: &str,
) -> Result<(), Mth5Error> {
    obj.new_attr::<VarLenUnicode>()
        .create(name)?
        .write_scalar(&varlen(value)?)?;
    Ok(())
}

pub(crate) fn write_f64_attr(obj: &hdf5::Location, name: &str, value: f64) -> Result<(), Mth5Error> {
    obj.new_attr::<f64>().create(name)?.write_scalar(&value)?;
    Ok(())
}

fn write_str_list_attr(
    obj: &hdf5::Location,
    name: &str,
    values: &[String],
) -> Result<(), Mth5Error> {
    let values: Vec<VarLenUnicode> = values
        .iter()
        .map(|v| varlen(v))
        .collect::<Result<_, _>>()?;
    obj.new_attr::<VarLenUnicode>()
        .shape(values.len())
        .create(name)?
        .write(&Array1::from_vec(values))?;
    Ok(())
}

pub(crate) fn read_str_attr(obj: &hdf5::Location, name: &str) -> Result<String, Mth5Error> {
    Ok(obj.attr(name)?.read_scalar::<VarLenUnicode>()?.to_string())
}

/// Wrap creation-time attribute failures in the init error.
fn init_str_attr(file: &hdf5::File, name: &str, value: &str) -> Result<(), InitMth5Error> {
    match write_str_attr(file, name, value) {
        Ok(()) => Ok(()),
        Err(Mth5Error::Hdf5(e)) => Err(InitMth5Error::Hdf5(e)),
        Err(_) => Err(InitMth5Error::InvalidString(value.to_string())),
    }
}
