// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with reading MTU-5C data files.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum InitPhoenixReaderError {
    #[error("Specified data file '{0}' doesn't exist")]
    FileDoesntExist(String),

    #[error("File ended after {got} bytes; the file header is 128 bytes")]
    ShortHeader { got: usize },

    #[error("Header claims a header length of {got}, but only 128 is defined")]
    WrongHeaderLength { got: u16 },

    #[error("Unknown file type {0}; expected 1 (continuous) or 2 (segmented)")]
    UnknownFileType(u8),

    #[error("Unknown channel type byte {0:#04x}; expected 'E', 'H' or 'A'")]
    UnknownChannelType(u8),

    #[error("The '{0}' header field isn't NUL-padded ASCII")]
    BadNameField(&'static str),

    #[error("Header describes a sample rate of 0 samples/second")]
    ZeroSampleRate,

    #[error(
        "Frame layout doesn't add up: frame_size {frame_size} minus footer \
         {data_footer} isn't a multiple of {bytes_per_sample} bytes per sample"
    )]
    BadFrameLayout {
        frame_size: u16,
        data_footer: u8,
        bytes_per_sample: u8,
    },

    /// An IO error while opening or reading the header.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum PhoenixReaderError {
    #[error("Segment {segment} needs {expected} more bytes but the file ends after {got}")]
    TruncatedSegment {
        segment: u32,
        expected: usize,
        got: usize,
    },

    #[error("File ends inside a frame: expected {expected} bytes, got {got}")]
    TruncatedFrame { expected: usize, got: usize },

    #[error("'{0}' is a continuous file; it has no segments to read")]
    NotSegmented(String),

    #[error("'{0}' is a segmented file; it has no frames to read")]
    NotContinuous(String),

    #[error("Samples of {0} bytes aren't decodable; expected 3 or 4")]
    BadSampleWidth(u8),

    #[error(
        "File name '{0}' doesn't follow '<serial>_<recid>_<channel>_<sequence>.<ext>'"
    )]
    BadFileName(String),

    #[error("'{0}' has no parent directory to search for sequence files")]
    NoParentDir(String),

    /// An IO error while reading data.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
