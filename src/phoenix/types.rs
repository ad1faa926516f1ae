// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Helper types for the MTU-5C reader.

use chrono::{DateTime, Utc};
use ndarray::Array1;

use super::error::InitPhoenixReaderError;
use crate::constants::FILE_HEADER_LEN;
use crate::types::ChannelKind;

/// On-disk shape of an MTU-5C data file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    /// Raw A/D counts in fixed-size frames (`.bin`).
    Continuous,
    /// Bursts of calibrated millivolt samples behind subheaders
    /// (`.td_150`, `.td_24k`, ...).
    Segmented,
}

/// The 128-byte header at the top of every MTU-5C data file. All multi-byte
/// fields are little-endian.
#[derive(Debug, Clone, PartialEq)]
pub struct FileHeader {
    pub file_type: FileType,
    pub file_version: u8,
    pub recording_id: u32,
    pub instrument_type: String,
    pub instrument_serial: String,
    pub channel_id: u8,
    pub channel_type: ChannelKind,
    pub frame_size: u16,
    pub bytes_per_sample: u8,
    pub data_footer: u8,
    pub sample_rate_base: u16,
    pub sample_rate_exp: i8,
    pub future1: u8,
    pub future2: u16,
    pub file_sequence: u32,
    pub frag_period: u32,
    pub max_samples: u32,
    pub gps_lat: f32,
    pub gps_long: f32,
    pub gps_elevation: f32,
    pub gps_horizontal_accuracy_mm: u32,
    pub gps_vertical_accuracy_mm: u32,
    pub battery_voltage_mv: u16,
    pub timing_flags: u8,
    pub timing_sat_count: u8,
    pub timing_stability: u16,
    pub lp_frequency: u16,
    pub preamp_gain: f32,
    pub channel_main_gain: f32,
    pub attenuator_gain: f32,
    pub ad_plus_minus_range: f32,
    pub intrinsic_circuitry_gain: f32,
    pub max_signal: f32,
    pub min_signal: f32,
    pub saturated_frames: u32,
    pub missing_frames: u32,
    pub ch_board_model: String,
    pub ch_board_serial: u32,
    pub ch_firmware: u32,
}

impl FileHeader {
    /// Parse a header from the first 128 bytes of a file.
    pub(super) fn parse(buf: &[u8; FILE_HEADER_LEN]) -> Result<FileHeader, InitPhoenixReaderError> {
        let mut c = Cursor { buf, pos: 0 };

        let file_type = match c.u8() {
            1 => FileType::Continuous,
            2 => FileType::Segmented,
            t => return Err(InitPhoenixReaderError::UnknownFileType(t)),
        };
        let file_version = c.u8();
        let header_length = c.u16();
        if header_length != FILE_HEADER_LEN as u16 {
            return Err(InitPhoenixReaderError::WrongHeaderLength { got: header_length });
        }
        let recording_id = c.u32();
        let instrument_type = c.name_field("instrument_type")?;
        let instrument_serial = c.name_field("instrument_serial")?;
        let channel_id = c.u8();
        let channel_type = {
            let tag = c.u8();
            ChannelKind::from_tag(tag).ok_or(InitPhoenixReaderError::UnknownChannelType(tag))?
        };
        let frame_size = c.u16();
        let bytes_per_sample = c.u8();
        let data_footer = c.u8();
        let sample_rate_base = c.u16();
        let sample_rate_exp = c.u8() as i8;
        let future1 = c.u8();
        let future2 = c.u16();
        let file_sequence = c.u32();
        let frag_period = c.u32();
        let max_samples = c.u32();
        let gps_lat = c.f32();
        let gps_long = c.f32();
        let gps_elevation = c.f32();
        let gps_horizontal_accuracy_mm = c.u32();
        let gps_vertical_accuracy_mm = c.u32();
        let battery_voltage_mv = c.u16();
        let timing_flags = c.u8();
        let timing_sat_count = c.u8();
        let timing_stability = c.u16();
        let lp_frequency = c.u16();
        let preamp_gain = c.f32();
        let channel_main_gain = c.f32();
        let attenuator_gain = c.f32();
        let ad_plus_minus_range = c.f32();
        let intrinsic_circuitry_gain = c.f32();
        let max_signal = c.f32();
        let min_signal = c.f32();
        let saturated_frames = c.u32();
        let missing_frames = c.u32();
        let ch_board_model = c.name_field("ch_board_model")?;
        let ch_board_serial = c.u32();
        let ch_firmware = c.u32();

        let header = FileHeader {
            file_type,
            file_version,
            recording_id,
            instrument_type,
            instrument_serial,
            channel_id,
            channel_type,
            frame_size,
            bytes_per_sample,
            data_footer,
            sample_rate_base,
            sample_rate_exp,
            future1,
            future2,
            file_sequence,
            frag_period,
            max_samples,
            gps_lat,
            gps_long,
            gps_elevation,
            gps_horizontal_accuracy_mm,
            gps_vertical_accuracy_mm,
            battery_voltage_mv,
            timing_flags,
            timing_sat_count,
            timing_stability,
            lp_frequency,
            preamp_gain,
            channel_main_gain,
            attenuator_gain,
            ad_plus_minus_range,
            intrinsic_circuitry_gain,
            max_signal,
            min_signal,
            saturated_frames,
            missing_frames,
            ch_board_model,
            ch_board_serial,
            ch_firmware,
        };

        if header.sample_rate() == 0.0 {
            return Err(InitPhoenixReaderError::ZeroSampleRate);
        }
        if header.file_type == FileType::Continuous {
            let bad = match (header.frame_size as usize).checked_sub(header.data_footer as usize) {
                Some(0) | None => true,
                Some(data_bytes) => {
                    header.bytes_per_sample == 0
                        || data_bytes % header.bytes_per_sample as usize != 0
                }
            };
            if bad {
                return Err(InitPhoenixReaderError::BadFrameLayout {
                    frame_size: header.frame_size,
                    data_footer: header.data_footer,
                    bytes_per_sample: header.bytes_per_sample,
                });
            }
        }

        Ok(header)
    }

    /// Sample rate [samples/second]: `base * 10^exp`.
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate_base as f64 * 10.0_f64.powi(self.sample_rate_exp as i32)
    }

    /// UTC start of the whole recording (the recording id doubles as its
    /// start time, in epoch seconds).
    pub fn recording_start_time(&self) -> DateTime<Utc> {
        epoch_to_datetime(self.recording_id)
    }

    /// Battery voltage [V].
    pub fn battery_voltage_v(&self) -> f64 {
        self.battery_voltage_mv as f64 / 1000.0
    }

    /// Gain applied by circuitry the user can't switch off.
    pub fn total_circuitry_gain(&self) -> f64 {
        self.preamp_gain as f64 * self.channel_main_gain as f64 * self.intrinsic_circuitry_gain as f64
    }

    /// Gain from the user-selectable stages.
    pub fn total_selectable_gain(&self) -> f64 {
        self.preamp_gain as f64 * self.channel_main_gain as f64 * self.attenuator_gain as f64
    }

    /// Factor taking raw A/D counts to millivolts at the channel input.
    pub fn count_scale_mv(&self) -> f64 {
        let full_scale = 2.0_f64.powi(8 * self.bytes_per_sample as i32 - 1);
        self.ad_plus_minus_range as f64 / full_scale / self.total_circuitry_gain() * 1000.0
    }

    /// Samples held by one continuous-file frame.
    pub fn samples_per_frame(&self) -> usize {
        (self.frame_size as usize - self.data_footer as usize) / self.bytes_per_sample as usize
    }

    /// Serialise back to the on-disk layout. Test fixtures are written
    /// through this so the offsets can't drift from `parse`.
    #[cfg(test)]
    pub(crate) fn to_bytes(&self) -> [u8; FILE_HEADER_LEN] {
        let mut buf = [0_u8; FILE_HEADER_LEN];
        let mut w = Writer { buf: &mut buf, pos: 0 };

        w.u8(match self.file_type {
            FileType::Continuous => 1,
            FileType::Segmented => 2,
        });
        w.u8(self.file_version);
        w.u16(FILE_HEADER_LEN as u16);
        w.u32(self.recording_id);
        w.name_field(&self.instrument_type);
        w.name_field(&self.instrument_serial);
        w.u8(self.channel_id);
        w.u8(self.channel_type.tag());
        w.u16(self.frame_size);
        w.u8(self.bytes_per_sample);
        w.u8(self.data_footer);
        w.u16(self.sample_rate_base);
        w.u8(self.sample_rate_exp as u8);
        w.u8(self.future1);
        w.u16(self.future2);
        w.u32(self.file_sequence);
        w.u32(self.frag_period);
        w.u32(self.max_samples);
        w.f32(self.gps_lat);
        w.f32(self.gps_long);
        w.f32(self.gps_elevation);
        w.u32(self.gps_horizontal_accuracy_mm);
        w.u32(self.gps_vertical_accuracy_mm);
        w.u16(self.battery_voltage_mv);
        w.u8(self.timing_flags);
        w.u8(self.timing_sat_count);
        w.u16(self.timing_stability);
        w.u16(self.lp_frequency);
        w.f32(self.preamp_gain);
        w.f32(self.channel_main_gain);
        w.f32(self.attenuator_gain);
        w.f32(self.ad_plus_minus_range);
        w.f32(self.intrinsic_circuitry_gain);
        w.f32(self.max_signal);
        w.f32(self.min_signal);
        w.u32(self.saturated_frames);
        w.u32(self.missing_frames);
        w.name_field(&self.ch_board_model);
        w.u32(self.ch_board_serial);
        w.u32(self.ch_firmware);

        buf
    }
}

/// The 32-byte subheader in front of every segment of a segmented file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentHeader {
    pub gps_time_stamp: u32,
    pub n_samples: u32,
    pub saturation_count: u16,
    pub missing_count: u16,
    pub value_min: f32,
    pub value_max: f32,
    pub value_mean: f32,
    pub segment: u32,
}

impl SegmentHeader {
    pub(super) fn parse(buf: &[u8; crate::constants::SEGMENT_HEADER_LEN]) -> SegmentHeader {
        let mut c = Cursor { buf, pos: 0 };
        SegmentHeader {
            gps_time_stamp: c.u32(),
            n_samples: c.u32(),
            saturation_count: c.u16(),
            missing_count: c.u16(),
            value_min: c.f32(),
            value_max: c.f32(),
            value_mean: c.f32(),
            segment: c.u32(),
            // 4 reserved bytes follow
        }
    }

    /// UTC start of the segment.
    pub fn start_time(&self) -> DateTime<Utc> {
        epoch_to_datetime(self.gps_time_stamp)
    }

    /// UTC time one sample period past the last sample.
    pub fn end_time(&self, sample_rate: f64) -> DateTime<Utc> {
        let nanos = (self.n_samples as f64 / sample_rate * 1e9).round() as i64;
        self.start_time() + chrono::Duration::nanoseconds(nanos)
    }

    #[cfg(test)]
    pub(crate) fn to_bytes(&self) -> [u8; crate::constants::SEGMENT_HEADER_LEN] {
        let mut buf = [0_u8; crate::constants::SEGMENT_HEADER_LEN];
        let mut w = Writer { buf: &mut buf, pos: 0 };
        w.u32(self.gps_time_stamp);
        w.u32(self.n_samples);
        w.u16(self.saturation_count);
        w.u16(self.missing_count);
        w.f32(self.value_min);
        w.f32(self.value_max);
        w.f32(self.value_mean);
        w.u32(self.segment);
        buf
    }
}

/// One segment: its subheader plus millivolt samples.
#[derive(Debug, Clone)]
pub struct Segment {
    pub header: SegmentHeader,
    pub data: Array1<f64>,
}

/// The pieces of an MTU-5C file name,
/// `<serial>_<recording id, hex>_<channel id>_<sequence>.<extension>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FileName {
    pub(crate) instrument_serial: String,
    pub(crate) recording_id: u32,
    pub(crate) channel_id: u8,
    pub(crate) sequence: u32,
    pub(crate) extension: String,
}

impl FileName {
    pub(crate) fn parse(path: &std::path::Path) -> Option<FileName> {
        let stem = path.file_stem()?.to_str()?;
        let extension = path.extension()?.to_str()?.to_string();
        let mut parts = stem.split('_');
        let instrument_serial = parts.next()?.to_string();
        let recording_id = u32::from_str_radix(parts.next()?, 16).ok()?;
        let channel_id = parts.next()?.parse().ok()?;
        let sequence = parts.next()?.parse().ok()?;
        if parts.next().is_some() {
            return None;
        }
        Some(FileName {
            instrument_serial,
            recording_id,
            channel_id,
            sequence,
            extension,
        })
    }

    /// Does `other` belong to the same channel of the same recording?
    pub(crate) fn same_channel(&self, other: &FileName) -> bool {
        self.instrument_serial == other.instrument_serial
            && self.recording_id == other.recording_id
            && self.channel_id == other.channel_id
            && self.extension == other.extension
    }

    #[cfg(test)]
    pub(crate) fn to_name(&self) -> String {
        format!(
            "{}_{:08X}_{}_{:08}.{}",
            self.instrument_serial, self.recording_id, self.channel_id, self.sequence, self.extension
        )
    }
}

pub(crate) fn epoch_to_datetime(secs: u32) -> DateTime<Utc> {
    DateTime::from_timestamp(secs as i64, 0).expect("u32 epoch seconds are always in range")
}

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl Cursor<'_> {
    fn take<const N: usize>(&mut self) -> [u8; N] {
        // Callers hand over fixed-size buffers, so this can't be out of
        // bounds.
        let bytes: [u8; N] = self.buf[self.pos..self.pos + N].try_into().unwrap();
        self.pos += N;
        bytes
    }

    fn u8(&mut self) -> u8 {
        self.take::<1>()[0]
    }

    fn u16(&mut self) -> u16 {
        u16::from_le_bytes(self.take())
    }

    fn u32(&mut self) -> u32 {
        u32::from_le_bytes(self.take())
    }

    fn f32(&mut self) -> f32 {
        f32::from_le_bytes(self.take())
    }

    /// An 8-byte NUL-padded ASCII field.
    fn name_field(&mut self, field: &'static str) -> Result<String, InitPhoenixReaderError> {
        let bytes = self.take::<8>();
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        if !bytes[..end].is_ascii() || bytes[end..].iter().any(|&b| b != 0) {
            return Err(InitPhoenixReaderError::BadNameField(field));
        }
        Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
    }
}

#[cfg(test)]
struct Writer<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

#[cfg(test)]
impl Writer<'_> {
    fn put(&mut self, bytes: &[u8]) {
        self.buf[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
        self.pos += bytes.len();
    }

    fn u8(&mut self, v: u8) {
        self.put(&[v]);
    }

    fn u16(&mut self, v: u16) {
        self.put(&v.to_le_bytes());
    }

    fn u32(&mut self, v: u32) {
        self.put(&v.to_le_bytes());
    }

    fn f32(&mut self, v: f32) {
        self.put(&v.to_le_bytes());
    }

    fn name_field(&mut self, s: &str) {
        let mut bytes = [0_u8; 8];
        bytes[..s.len()].copy_from_slice(s.as_bytes());
        self.put(&bytes);
    }
}
