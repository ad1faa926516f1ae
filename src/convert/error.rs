// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with whole-station conversion.

use thiserror::Error;

use crate::archive::{InitMth5Error, Mth5Error};
use crate::calibration::CalibrationError;
use crate::phoenix::{InitPhoenixReaderError, PhoenixReaderError};
use crate::recmeta::RecmetaError;
use crate::timeseries::TimeSeriesError;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Specified station directory '{0}' doesn't exist")]
    StationDirDoesntExist(String),

    #[error("No channel directories under '{0}'; is this really a station directory?")]
    NoChannelDirs(String),

    #[error("Channel id {0} has data but no component name; add it to recmeta.json")]
    UnknownChannel(u8),

    #[error("No data found for the requested sample rate of {0} samples/second")]
    NoDataForRate(f64),

    #[error(transparent)]
    InitPhoenixReader(#[from] InitPhoenixReaderError),

    #[error(transparent)]
    PhoenixReader(#[from] PhoenixReaderError),

    #[error(transparent)]
    Recmeta(#[from] RecmetaError),

    #[error(transparent)]
    Calibration(#[from] CalibrationError),

    #[error(transparent)]
    TimeSeries(#[from] TimeSeriesError),

    #[error(transparent)]
    InitMth5(#[from] InitMth5Error),

    #[error(transparent)]
    Mth5(#[from] Mth5Error),

    /// An IO error while walking the station directory.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
