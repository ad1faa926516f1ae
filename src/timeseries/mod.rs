// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Containers for magnetotelluric time series.
//!
//! A [`ChannelTimeSeries`] holds one component's equally-spaced samples; a
//! [`RunTimeSeries`] holds the simultaneously-recorded channels of a run,
//! trimmed to their common time window.

mod error;
#[cfg(test)]
mod tests;

pub use error::TimeSeriesError;

use chrono::{DateTime, Duration, Utc};
use ndarray::Array1;

use crate::types::ChannelKind;

/// One channel of equally-spaced samples plus the metadata the archive wants
/// about it. Samples are millivolts at the channel input.
#[derive(Debug, Clone)]
pub struct ChannelTimeSeries {
    component: String,
    kind: ChannelKind,
    sample_rate: f64,
    start: DateTime<Utc>,
    data: Array1<f64>,
    pub units: String,
    pub sensor_id: Option<String>,
    pub sensor_type: Option<String>,
    pub azimuth: f64,
    pub tilt: f64,
    pub dipole_length_m: Option<f64>,
    /// Names of archive filters that take this channel back to physical
    /// units.
    pub filters_applied: Vec<String>,
}

impl ChannelTimeSeries {
    /// Create a channel, deriving its kind from the component name.
    pub fn new(
        component: &str,
        sample_rate: f64,
        start: DateTime<Utc>,
        data: Array1<f64>,
    ) -> Result<ChannelTimeSeries, TimeSeriesError> {
        Self::with_kind(
            component,
            ChannelKind::from_component(component),
            sample_rate,
            start,
            data,
        )
    }

    /// Create a channel of an explicit kind. The component prefix has to
    /// agree: `e*` is electric, `h*`/`b*` is magnetic, anything else is
    /// auxiliary.
    pub fn with_kind(
        component: &str,
        kind: ChannelKind,
        sample_rate: f64,
        start: DateTime<Utc>,
        data: Array1<f64>,
    ) -> Result<ChannelTimeSeries, TimeSeriesError> {
        if ChannelKind::from_component(component) != kind {
            return Err(TimeSeriesError::ComponentKindMismatch {
                component: component.to_string(),
                kind,
            });
        }
        if data.is_empty() {
            return Err(TimeSeriesError::EmptyData);
        }
        if !(sample_rate > 0.0) {
            return Err(TimeSeriesError::ZeroSampleRate);
        }

        Ok(ChannelTimeSeries {
            component: component.to_lowercase(),
            kind,
            sample_rate,
            start,
            data,
            units: "millivolts".to_string(),
            sensor_id: None,
            sensor_type: None,
            azimuth: 0.0,
            tilt: 0.0,
            dipole_length_m: None,
            filters_applied: vec![],
        })
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    pub fn kind(&self) -> ChannelKind {
        self.kind
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// UTC time of the last sample. Samples are assumed equally spaced from
    /// the start time.
    pub fn end(&self) -> DateTime<Utc> {
        self.start + samples_to_duration(self.data.len() - 1, self.sample_rate)
    }

    pub fn n_samples(&self) -> usize {
        self.data.len()
    }

    pub fn data(&self) -> &Array1<f64> {
        &self.data
    }

    /// The sub-series with sample times `>= start` and `<= end` (both ends
    /// inclusive).
    pub fn slice(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<ChannelTimeSeries, TimeSeriesError> {
        let first = duration_to_samples(start - self.start, self.sample_rate)
            .map_or(0, |s| s.max(0.0).ceil() as usize);
        let last = match duration_to_samples(end - self.start, self.sample_rate) {
            Some(s) if s >= 0.0 => (s.floor() as usize).min(self.data.len() - 1),
            _ => {
                return Err(TimeSeriesError::EmptySlice {
                    start: start.to_rfc3339(),
                    end: end.to_rfc3339(),
                })
            }
        };
        if first > last || first >= self.data.len() {
            return Err(TimeSeriesError::EmptySlice {
                start: start.to_rfc3339(),
                end: end.to_rfc3339(),
            });
        }

        let mut sliced = self.clone();
        sliced.start = self.start + samples_to_duration(first, self.sample_rate);
        sliced.data = self.data.slice(ndarray::s![first..=last]).to_owned();
        Ok(sliced)
    }

    /// Keep every `factor`-th sample, dividing the sample rate. Plain
    /// decimation; filter beforehand if aliasing matters.
    pub fn decimate(&self, factor: usize) -> Result<ChannelTimeSeries, TimeSeriesError> {
        if factor == 0 {
            return Err(TimeSeriesError::BadDecimationFactor(factor));
        }
        let mut decimated = self.clone();
        decimated.data = self.data.slice(ndarray::s![..;factor as isize]).to_owned();
        decimated.sample_rate = self.sample_rate / factor as f64;
        Ok(decimated)
    }
}

/// The channels of one run, trimmed to their common (intersection) time
/// window and sorted by component.
#[derive(Debug, Clone)]
pub struct RunTimeSeries {
    channels: Vec<ChannelTimeSeries>,
    sample_rate: f64,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl RunTimeSeries {
    pub fn new(channels: Vec<ChannelTimeSeries>) -> Result<RunTimeSeries, TimeSeriesError> {
        let first = channels.first().ok_or(TimeSeriesError::NoChannels)?;
        let sample_rate = first.sample_rate();

        let mut start = first.start();
        let mut end = first.end();
        for channel in &channels {
            if channel.sample_rate() != sample_rate {
                return Err(TimeSeriesError::SampleRateMismatch {
                    expected: sample_rate,
                    got: channel.sample_rate(),
                    component: channel.component().to_string(),
                });
            }
            start = start.max(channel.start());
            end = end.min(channel.end());
        }
        if end < start {
            return Err(TimeSeriesError::NoOverlap);
        }

        let mut trimmed = vec![];
        for channel in &channels {
            let channel = if channel.start() == start && channel.end() == end {
                channel.clone()
            } else {
                channel.slice(start, end)?
            };
            if trimmed
                .iter()
                .any(|c: &ChannelTimeSeries| c.component() == channel.component())
            {
                return Err(TimeSeriesError::DuplicateComponent(
                    channel.component().to_string(),
                ));
            }
            trimmed.push(channel);
        }
        trimmed.sort_by(|a, b| a.component().cmp(b.component()));

        Ok(RunTimeSeries {
            channels: trimmed,
            sample_rate,
            start,
            end,
        })
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Component names, sorted.
    pub fn components(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.component()).collect()
    }

    pub fn channels(&self) -> &[ChannelTimeSeries] {
        &self.channels
    }

    pub fn get(&self, component: &str) -> Option<&ChannelTimeSeries> {
        let component = component.to_lowercase();
        self.channels.iter().find(|c| c.component() == component)
    }
}

fn samples_to_duration(n: usize, sample_rate: f64) -> Duration {
    Duration::nanoseconds((n as f64 / sample_rate * 1e9).round() as i64)
}

/// Fractional sample index of an instant, `None` when the offset is too far
/// away to count in nanoseconds.
fn duration_to_samples(d: Duration, sample_rate: f64) -> Option<f64> {
    let ns = d.num_nanoseconds()?;
    // Absorb nanosecond round-off so window edges that fall exactly on a
    // sample stay on it.
    let samples = ns as f64 * sample_rate / 1e9;
    let nearest = samples.round();
    if (samples - nearest).abs() < 1e-6 {
        Some(nearest)
    } else {
        Some(samples)
    }
}
