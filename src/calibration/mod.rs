// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Phoenix calibration exports.
//!
//! The vendor software exports two kinds of JSON calibration files: a
//! receiver calibration (one response table per channel, keyed by the
//! receiver serial) and sensor calibrations (one table per coil, keyed by
//! the sensor serial). Either is matched to a recording through the serials
//! in `recmeta.json`.

mod error;
#[cfg(test)]
mod tests;

pub use error::CalibrationError;

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use log::{debug, warn};
use parking_lot::RwLock;
use serde::Deserialize;

/// A frequency/amplitude/phase response table. Phases are in radians;
/// frequencies ascend.
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyResponse {
    pub frequencies: Vec<f64>,
    pub amplitudes: Vec<f64>,
    pub phases: Vec<f64>,
}

/// One parsed calibration file.
#[derive(Debug, Clone)]
pub struct Calibration {
    /// "receiver calibration" or "sensor calibration" as exported.
    pub file_type: String,
    pub instrument_type: String,
    pub serial: String,
    pub timestamp: Option<String>,
    responses: Vec<(Option<String>, FrequencyResponse)>,
}

impl Calibration {
    /// Parse a calibration export from a file.
    pub fn from_file<T: AsRef<Path>>(path: T) -> Result<Calibration, CalibrationError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CalibrationError::FileDoesntExist(path.display().to_string()));
        }
        Self::from_json(&std::fs::read_to_string(path)?, &path.display().to_string())
    }

    /// Parse a calibration export; `name` labels errors.
    pub fn from_json(json: &str, name: &str) -> Result<Calibration, CalibrationError> {
        let raw: RawCalibration = serde_json::from_str(json).map_err(|source| {
            CalibrationError::Json {
                path: name.to_string(),
                source,
            }
        })?;
        if raw.cal_data.is_empty() {
            return Err(CalibrationError::NoResponses(name.to_string()));
        }

        let mut responses = vec![];
        for entry in raw.cal_data {
            let label = entry
                .tag
                .clone()
                .unwrap_or_else(|| raw.serial_number.clone());
            if entry.freq_hz.len() != entry.magnitude.len()
                || entry.freq_hz.len() != entry.phs_deg.len()
            {
                return Err(CalibrationError::TableLengthMismatch {
                    name: label,
                    frequencies: entry.freq_hz.len(),
                    amplitudes: entry.magnitude.len(),
                    phases: entry.phs_deg.len(),
                });
            }
            if entry.freq_hz.windows(2).any(|w| w[0] >= w[1]) {
                return Err(CalibrationError::FrequenciesNotAscending(label));
            }
            let response = FrequencyResponse {
                frequencies: entry.freq_hz,
                amplitudes: entry.magnitude,
                phases: entry.phs_deg.iter().map(|p| p.to_radians()).collect(),
            };
            responses.push((entry.tag.map(|t| t.to_lowercase()), response));
        }

        Ok(Calibration {
            file_type: raw.file_type,
            instrument_type: raw.instrument_type,
            serial: raw.serial_number,
            timestamp: raw.timestamp,
            responses,
        })
    }

    /// The response table for a channel tag. Sensor exports usually carry a
    /// single untagged table, which matches any tag.
    pub fn response_for(&self, tag: &str) -> Option<&FrequencyResponse> {
        let tag = tag.to_lowercase();
        if let Some((_, response)) = self
            .responses
            .iter()
            .find(|(t, _)| t.as_deref() == Some(tag.as_str()))
        {
            return Some(response);
        }
        match self.responses.as_slice() {
            [(None, response)] => Some(response),
            _ => None,
        }
    }

    pub fn n_responses(&self) -> usize {
        self.responses.len()
    }
}

/// Vendor JSON layout.
#[derive(Deserialize)]
struct RawCalibration {
    #[serde(default)]
    file_type: String,
    #[serde(default)]
    instrument_type: String,
    serial_number: String,
    #[serde(default)]
    timestamp: Option<String>,
    cal_data: Vec<RawCalData>,
}

#[derive(Deserialize)]
struct RawCalData {
    #[serde(default)]
    tag: Option<String>,
    #[serde(rename = "freq_Hz")]
    freq_hz: Vec<f64>,
    magnitude: Vec<f64>,
    phs_deg: Vec<f64>,
}

/// Where calibrations come from: an explicit serial-to-path map, or a
/// directory to search and auto-match against `recmeta.json` serials.
#[derive(Debug, Clone)]
pub enum CalibrationSource {
    Mapping(HashMap<String, PathBuf>),
    Directory(PathBuf),
}

/// Resolves serials against a [`CalibrationSource`], parsing each file at
/// most once.
pub struct CalibrationSet {
    source: CalibrationSource,
    cache: RwLock<HashMap<PathBuf, Arc<Calibration>>>,
}

impl CalibrationSet {
    pub fn new(source: CalibrationSource) -> CalibrationSet {
        CalibrationSet {
            source,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Find the calibration for a serial. `Ok(None)` when a directory source
    /// holds nothing for it; a mapping that names a missing file is an
    /// error.
    pub fn find(&self, serial: &str) -> Result<Option<Arc<Calibration>>, CalibrationError> {
        match &self.source {
            CalibrationSource::Mapping(map) => match map.get(serial) {
                Some(path) => Ok(Some(self.load(path)?)),
                None => {
                    warn!("No calibration mapped for serial {serial}");
                    Ok(None)
                }
            },
            CalibrationSource::Directory(dir) => {
                if !dir.is_dir() {
                    return Err(CalibrationError::DirDoesntExist(dir.display().to_string()));
                }
                let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
                    .filter_map(|e| e.ok())
                    .map(|e| e.path())
                    .filter(|p| p.extension().is_some_and(|e| e == "json"))
                    .collect();
                paths.sort_unstable();

                for path in paths {
                    let cal = match self.load(&path) {
                        Ok(cal) => cal,
                        Err(CalibrationError::Json { path, .. }) => {
                            // Not everything in the directory has to be a
                            // calibration export.
                            debug!("Skipping non-calibration file {path}");
                            continue;
                        }
                        Err(e) => return Err(e),
                    };
                    if cal.serial == serial {
                        return Ok(Some(cal));
                    }
                }
                warn!("No calibration found for serial {serial}");
                Ok(None)
            }
        }
    }

    fn load(&self, path: &Path) -> Result<Arc<Calibration>, CalibrationError> {
        {
            let cache = self.cache.read();
            if let Some(cal) = cache.get(path) {
                return Ok(Arc::clone(cal));
            }
        }
        let cal = Arc::new(Calibration::from_file(path)?);
        self.cache
            .write()
            .insert(path.to_path_buf(), Arc::clone(&cal));
        Ok(cal)
    }
}
