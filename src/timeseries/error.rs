// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with time-series containers.

use thiserror::Error;

use crate::types::ChannelKind;

#[derive(Error, Debug)]
pub enum TimeSeriesError {
    #[error("Component '{component}' can't name a {kind} channel")]
    ComponentKindMismatch {
        component: String,
        kind: ChannelKind,
    },

    #[error("A channel needs at least one sample")]
    EmptyData,

    #[error("A channel needs a sample rate above 0 samples/second")]
    ZeroSampleRate,

    #[error("A run needs at least one channel")]
    NoChannels,

    #[error("Channel '{component}' runs at {got} samples/second, but the run runs at {expected}")]
    SampleRateMismatch {
        expected: f64,
        got: f64,
        component: String,
    },

    #[error("Component '{0}' appears more than once in the run")]
    DuplicateComponent(String),

    #[error("The run's channels share no common time window")]
    NoOverlap,

    #[error("No samples between {start} and {end}")]
    EmptySlice { start: String, end: String },

    #[error("Decimation factor must be at least 1, not {0}")]
    BadDecimationFactor(usize),
}
