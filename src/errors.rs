// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Errors associated with all aspects of phoenix_mth5.
 */

use thiserror::Error;

pub use crate::archive::{InitMth5Error, Mth5Error};
pub use crate::calibration::CalibrationError;
pub use crate::convert::ConvertError;
pub use crate::phoenix::{InitPhoenixReaderError, PhoenixReaderError};
pub use crate::recmeta::RecmetaError;
pub use crate::timeseries::TimeSeriesError;

#[derive(Error, Debug)]
pub enum PhoenixMth5Error {
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

    #[error(transparent)]
    Convert(#[from] ConvertError),
}
