// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Convert Phoenix Geophysics MTU-5C recordings into MTH5 (HDF5) archives.
 */

pub mod archive;
pub mod calibration;
mod constants;
pub mod convert;
pub mod errors;
pub mod phoenix;
pub mod recmeta;
pub mod station;
pub mod timeseries;
mod types;

pub use constants::{DEFAULT_ARCHIVE_NAME, DEFAULT_SAMPLE_RATES, MTH5_VERSION};
pub use convert::{from_phoenix, PhoenixToMth5};
pub use errors::*;
pub use types::ChannelKind;
