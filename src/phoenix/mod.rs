// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Code to read the data files written by a Phoenix Geophysics MTU-5C
//! receiver.
//!
//! A receiver writes one directory per channel. Continuous files (`.bin`)
//! carry raw A/D counts in fixed-size frames; segmented files (`.td_150`,
//! `.td_24k`, ...) carry bursts of already-calibrated millivolt samples,
//! each behind a 32-byte subheader. Long recordings are split into
//! sequence-numbered fragments that chain together.

mod error;
mod types;

pub use error::{InitPhoenixReaderError, PhoenixReaderError};
pub use types::{FileHeader, FileType, Segment, SegmentHeader};
pub(crate) use types::FileName;

use std::{
    fs::File,
    io::{BufReader, Read},
    path::{Path, PathBuf},
};

use chrono::{DateTime, Duration, Utc};
use ndarray::Array1;

use crate::constants::{FILE_HEADER_LEN, SEGMENT_HEADER_LEN};

/// A reader over a single MTU-5C data file. The header is parsed eagerly;
/// sample data is pulled on demand.
pub struct PhoenixReader {
    path: PathBuf,
    header: FileHeader,
    file: BufReader<File>,
    /// Index of the next segment to be read, for error reporting.
    next_segment: u32,
}

/// Open an MTU-5C data file of either shape.
pub fn open_phoenix<T: AsRef<Path>>(path: T) -> Result<PhoenixReader, InitPhoenixReaderError> {
    let path = path.as_ref();
    // If the file doesn't exist, File::open would catch it, but the error
    // message wouldn't name the file.
    if !path.exists() {
        return Err(InitPhoenixReaderError::FileDoesntExist(
            path.display().to_string(),
        ));
    }
    let file = File::open(path)?;
    let len = file.metadata()?.len() as usize;
    if len < FILE_HEADER_LEN {
        return Err(InitPhoenixReaderError::ShortHeader { got: len });
    }

    let mut file = BufReader::new(file);
    let mut buf = [0_u8; FILE_HEADER_LEN];
    file.read_exact(&mut buf)?;
    let header = FileHeader::parse(&buf)?;

    Ok(PhoenixReader {
        path: path.to_path_buf(),
        header,
        file,
        next_segment: 0,
    })
}

impl PhoenixReader {
    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// UTC time of this file's first sample. Continuous fragments don't
    /// record their own start, so it is derived from the recording start and
    /// the fragment's position in the sequence chain.
    pub fn start_time(&self) -> DateTime<Utc> {
        let offset = (self.header.file_sequence.saturating_sub(1) as i64)
            * self.header.frag_period as i64;
        self.header.recording_start_time() + Duration::seconds(offset)
    }

    /// Read the next segment of a segmented file. `Ok(None)` at end of file.
    pub fn read_segment(&mut self) -> Result<Option<Segment>, PhoenixReaderError> {
        if self.header.file_type != FileType::Segmented {
            return Err(PhoenixReaderError::NotSegmented(
                self.path.display().to_string(),
            ));
        }

        let mut buf = [0_u8; SEGMENT_HEADER_LEN];
        match self.read_fully(&mut buf)? {
            0 => return Ok(None),
            n if n < SEGMENT_HEADER_LEN => {
                return Err(PhoenixReaderError::TruncatedSegment {
                    segment: self.next_segment,
                    expected: SEGMENT_HEADER_LEN,
                    got: n,
                });
            }
            _ => (),
        }
        let header = SegmentHeader::parse(&buf);

        let payload_len = header.n_samples as usize * 4;
        let mut payload = vec![0_u8; payload_len];
        let n = self.read_fully(&mut payload)?;
        if n < payload_len {
            return Err(PhoenixReaderError::TruncatedSegment {
                segment: self.next_segment,
                expected: payload_len,
                got: n,
            });
        }

        let data = Array1::from_iter(payload.chunks_exact(4).map(|b| {
            f32::from_le_bytes(b.try_into().unwrap()) as f64
        }));

        self.next_segment += 1;
        Ok(Some(Segment { header, data }))
    }

    /// Drain all remaining segments of a segmented file.
    pub fn read_all_segments(&mut self) -> Result<Vec<Segment>, PhoenixReaderError> {
        let mut segments = vec![];
        while let Some(segment) = self.read_segment()? {
            segments.push(segment);
        }
        Ok(segments)
    }

    /// Read the whole payload of a continuous file, returning samples scaled
    /// to millivolts at the channel input.
    pub fn read_frames(&mut self) -> Result<Array1<f64>, PhoenixReaderError> {
        if self.header.file_type != FileType::Continuous {
            return Err(PhoenixReaderError::NotContinuous(
                self.path.display().to_string(),
            ));
        }
        if !matches!(self.header.bytes_per_sample, 3 | 4) {
            return Err(PhoenixReaderError::BadSampleWidth(
                self.header.bytes_per_sample,
            ));
        }

        let mut payload = vec![];
        self.file.read_to_end(&mut payload)?;

        let frame_size = self.header.frame_size as usize;
        let rem = payload.len() % frame_size;
        if rem != 0 {
            return Err(PhoenixReaderError::TruncatedFrame {
                expected: frame_size,
                got: rem,
            });
        }

        let width = self.header.bytes_per_sample as usize;
        let data_bytes = frame_size - self.header.data_footer as usize;
        let scale = self.header.count_scale_mv();
        let mut data = Vec::with_capacity(payload.len() / frame_size * (data_bytes / width));
        for frame in payload.chunks_exact(frame_size) {
            // The footer at the tail of each frame is receiver status, not
            // samples.
            for sample in frame[..data_bytes].chunks_exact(width) {
                data.push(decode_counts(sample) as f64 * scale);
            }
        }

        Ok(Array1::from_vec(data))
    }

    /// All files in this file's directory that belong to the same channel of
    /// the same recording, ascending by sequence number (this file included).
    pub fn sequence_list(&self) -> Result<Vec<PathBuf>, PhoenixReaderError> {
        let name = FileName::parse(&self.path)
            .ok_or_else(|| PhoenixReaderError::BadFileName(self.path.display().to_string()))?;
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| PhoenixReaderError::NoParentDir(self.path.display().to_string()))?;

        let mut sequences = vec![];
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if let Some(other) = FileName::parse(&path) {
                if name.same_channel(&other) {
                    sequences.push((other.sequence, path));
                }
            }
        }
        sequences.sort_unstable_by_key(|(seq, _)| *seq);

        Ok(sequences.into_iter().map(|(_, path)| path).collect())
    }

    /// Like `read_exact`, but a clean EOF partway through returns the byte
    /// count instead of an error.
    fn read_fully(&mut self, buf: &mut [u8]) -> Result<usize, PhoenixReaderError> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.file.read(&mut buf[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        Ok(filled)
    }
}

/// Decode one little-endian two's-complement sample of 3 or 4 bytes. The
/// width is validated before any frame is decoded.
fn decode_counts(bytes: &[u8]) -> i32 {
    match bytes.len() {
        3 => {
            let sign = if bytes[2] & 0x80 != 0 { 0xFF } else { 0x00 };
            i32::from_le_bytes([bytes[0], bytes[1], bytes[2], sign])
        }
        _ => i32::from_le_bytes(bytes.try_into().unwrap()),
    }
}
