// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The `recmeta.json` descriptor an MTU-5C writes next to its channel
//! directories. It names the receiver and, per channel, the sensor that was
//! plugged into it; calibration matching runs off those identities.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::constants::DEFAULT_CHANNEL_MAP;
use crate::types::ChannelKind;

#[derive(Error, Debug)]
pub enum RecmetaError {
    #[error("Specified metadata file '{0}' doesn't exist")]
    FileDoesntExist(String),

    #[error("Channel id {0} appears more than once in recmeta.json")]
    DuplicateChannel(u8),

    #[error("Couldn't parse recmeta.json: {0}")]
    Json(#[from] serde_json::Error),

    /// An IO error while reading the file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything we consume from `recmeta.json`. Fields the receiver writes
/// that we don't use are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordingMetadata {
    pub instrument_type: String,
    pub instrument_serial: String,
    #[serde(default)]
    pub recording_id: Option<u32>,
    #[serde(default)]
    pub station: Option<String>,
    #[serde(default)]
    pub survey: Option<String>,
    #[serde(default)]
    pub gps: Option<GpsPosition>,
    #[serde(default)]
    pub chconfig: ChannelConfig,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct GpsPosition {
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub elev: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChannelConfig {
    #[serde(default)]
    pub chans: Vec<ChannelEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChannelEntry {
    pub channel_id: u8,
    /// Component name, e.g. "hx" or "ey".
    pub tag: String,
    /// "E", "H" or "A"; derived from the tag when absent.
    #[serde(rename = "type", default)]
    pub ty: Option<String>,
    #[serde(default)]
    pub sensor_serial: Option<String>,
    #[serde(default)]
    pub sensor_type: Option<String>,
    #[serde(default)]
    pub azimuth: f64,
    #[serde(default)]
    pub tilt: f64,
    /// Electric channels only.
    #[serde(default)]
    pub dipole_length_m: Option<f64>,
    #[serde(default)]
    pub gain: Option<f64>,
}

impl ChannelEntry {
    pub fn kind(&self) -> ChannelKind {
        match self.ty.as_deref() {
            Some("E") | Some("e") => ChannelKind::Electric,
            Some("H") | Some("h") => ChannelKind::Magnetic,
            Some("A") | Some("a") => ChannelKind::Auxiliary,
            _ => ChannelKind::from_component(&self.tag),
        }
    }
}

impl RecordingMetadata {
    /// Read and validate a `recmeta.json`.
    pub fn from_file<T: AsRef<Path>>(path: T) -> Result<RecordingMetadata, RecmetaError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(RecmetaError::FileDoesntExist(path.display().to_string()));
        }
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    pub fn from_json(json: &str) -> Result<RecordingMetadata, RecmetaError> {
        let meta: RecordingMetadata = serde_json::from_str(json)?;
        let mut seen = [false; 256];
        for chan in &meta.chconfig.chans {
            if seen[chan.channel_id as usize] {
                return Err(RecmetaError::DuplicateChannel(chan.channel_id));
            }
            seen[chan.channel_id as usize] = true;
        }
        Ok(meta)
    }

    /// The archive station id: the configured station name, else the
    /// receiver serial.
    pub fn station_id(&self) -> &str {
        self.station.as_deref().unwrap_or(&self.instrument_serial)
    }

    /// The archive survey id.
    pub fn survey_id(&self) -> &str {
        self.survey.as_deref().unwrap_or("phoenix")
    }

    pub fn channel(&self, channel_id: u8) -> Option<&ChannelEntry> {
        self.chconfig
            .chans
            .iter()
            .find(|c| c.channel_id == channel_id)
    }

    /// Component name for a channel id, falling back to the receiver's
    /// standard map when `recmeta.json` doesn't configure the channel.
    pub fn component_for(&self, channel_id: u8) -> Option<String> {
        if let Some(chan) = self.channel(channel_id) {
            return Some(chan.tag.to_lowercase());
        }
        DEFAULT_CHANNEL_MAP
            .get(channel_id as usize)
            .map(|s| s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECMETA: &str = r#"{
        "instrument_type": "MTU-5C",
        "instrument_serial": "10128",
        "recording_id": 1619493876,
        "station": "MT001",
        "survey": "toronto_test",
        "gps": {"lat": 43.6962547, "lon": -79.3936462, "elev": 140.1},
        "timezone": "UTC",
        "chconfig": {
            "chans": [
                {"channel_id": 0, "tag": "H1", "type": "H",
                 "sensor_serial": "57005", "sensor_type": "MTC-155",
                 "azimuth": 0.0},
                {"channel_id": 3, "tag": "E1", "type": "E",
                 "dipole_length_m": 100.0, "azimuth": 90.0}
            ]
        }
    }"#;

    #[test]
    fn parse_recmeta() {
        let meta = RecordingMetadata::from_json(RECMETA).unwrap();
        assert_eq!(meta.instrument_serial, "10128");
        assert_eq!(meta.station_id(), "MT001");
        assert_eq!(meta.survey_id(), "toronto_test");
        assert_eq!(meta.gps.unwrap().elev, 140.1);

        let h1 = meta.channel(0).unwrap();
        assert_eq!(h1.kind(), ChannelKind::Magnetic);
        assert_eq!(h1.sensor_serial.as_deref(), Some("57005"));

        let e1 = meta.channel(3).unwrap();
        assert_eq!(e1.kind(), ChannelKind::Electric);
        assert_eq!(e1.dipole_length_m, Some(100.0));
    }

    #[test]
    fn components_fall_back_to_standard_map() {
        let meta = RecordingMetadata::from_json(RECMETA).unwrap();
        // Configured channels use their tag, lowercased.
        assert_eq!(meta.component_for(0).as_deref(), Some("h1"));
        // Unconfigured channels use the receiver's standard map.
        assert_eq!(meta.component_for(1).as_deref(), Some("hy"));
        assert_eq!(meta.component_for(4).as_deref(), Some("ey"));
        assert_eq!(meta.component_for(8), None);
    }

    #[test]
    fn defaults_when_sparse() {
        let meta = RecordingMetadata::from_json(
            r#"{"instrument_type": "MTU-5C", "instrument_serial": "10128"}"#,
        )
        .unwrap();
        assert_eq!(meta.station_id(), "10128");
        assert_eq!(meta.survey_id(), "phoenix");
        assert!(meta.chconfig.chans.is_empty());
    }

    #[test]
    fn duplicate_channel_rejected() {
        let result = RecordingMetadata::from_json(
            r#"{
                "instrument_type": "MTU-5C",
                "instrument_serial": "10128",
                "chconfig": {"chans": [
                    {"channel_id": 0, "tag": "hx"},
                    {"channel_id": 0, "tag": "hy"}
                ]}
            }"#,
        );
        assert!(matches!(result, Err(RecmetaError::DuplicateChannel(0))));
    }

    #[test]
    fn missing_file() {
        let result = RecordingMetadata::from_file("nope/recmeta.json");
        assert!(matches!(result, Err(RecmetaError::FileDoesntExist(_))));
    }
}
