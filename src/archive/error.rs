// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with MTH5 archives.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum InitMth5Error {
    #[error("Specified archive '{0}' doesn't exist")]
    FileDoesntExist(String),

    #[error("'{0}' has no 'file.type' attribute; is it an MTH5 at all?")]
    NotAnMth5(String),

    #[error("'{path}' is an MTH5 of version {got}; only {expected} is supported")]
    WrongVersion {
        path: String,
        got: String,
        expected: String,
    },

    #[error("'{0}' can't be written as an HDF5 attribute")]
    InvalidString(String),

    /// An error associated with the hdf5 crate.
    #[error("HDF5 error: {0}")]
    Hdf5(#[from] hdf5::Error),
}

#[derive(Error, Debug)]
pub enum Mth5Error {
    #[error("No filter named '{0}' in the archive")]
    UnknownFilter(String),

    #[error("No survey named '{0}' in the archive")]
    UnknownSurvey(String),

    #[error("Filter '{name}' claims type '{got}', which isn't a known filter type")]
    UnknownFilterType { name: String, got: String },

    #[error("'{0}' can't be written as an HDF5 attribute")]
    InvalidString(String),

    /// An error associated with the hdf5 crate.
    #[error("HDF5 error: {0}")]
    Hdf5(#[from] hdf5::Error),
}
