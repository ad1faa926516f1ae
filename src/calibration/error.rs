// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with Phoenix calibration files.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CalibrationError {
    #[error("Specified calibration file '{0}' doesn't exist")]
    FileDoesntExist(String),

    #[error("Specified calibration directory '{0}' doesn't exist")]
    DirDoesntExist(String),

    #[error("Couldn't parse calibration file '{path}': {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },

    #[error(
        "Calibration table for '{name}' is ragged: {frequencies} frequencies, \
         {amplitudes} amplitudes, {phases} phases"
    )]
    TableLengthMismatch {
        name: String,
        frequencies: usize,
        amplitudes: usize,
        phases: usize,
    },

    #[error("Calibration table for '{0}' has non-ascending frequencies")]
    FrequenciesNotAscending(String),

    #[error("Calibration file '{0}' carries no response tables")]
    NoResponses(String),

    /// An IO error while reading a file or directory.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
