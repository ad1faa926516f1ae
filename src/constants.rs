// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Useful constants.
 */

/// Length of the file header at the top of every MTU-5C data file [bytes].
pub(crate) const FILE_HEADER_LEN: usize = 128;

/// Length of the subheader preceding every segment in a segmented file
/// [bytes].
pub(crate) const SEGMENT_HEADER_LEN: usize = 32;

/// The archive schema version written to (and expected from) every file.
pub const MTH5_VERSION: &str = "0.2.0";

/// The `file.type` root attribute of an archive.
pub(crate) const MTH5_FILE_TYPE: &str = "MTH5";

/// Default output name when the caller doesn't give one.
pub const DEFAULT_ARCHIVE_NAME: &str = "from_phoenix.h5";

/// Sample rates included in the archive when the caller doesn't give any
/// [samples/second].
pub const DEFAULT_SAMPLE_RATES: [f64; 2] = [150.0, 24000.0];

/// Component names by channel id when `recmeta.json` doesn't override them.
pub(crate) const DEFAULT_CHANNEL_MAP: [&str; 8] =
    ["hx", "hy", "hz", "ex", "ey", "h1", "h2", "h3"];

/// Chunk length for the resizable channel-summary table.
pub(crate) const SUMMARY_CHUNK: usize = 128;
