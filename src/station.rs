// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Walking a station directory and assembling its files into runs.
//!
//! A station directory holds one numbered subdirectory per channel and a
//! `recmeta.json`. Continuous fragments chain into one block per unbroken
//! sequence; every segment of a segmented file is its own block. Blocks that
//! start at the same second at the same sample rate line up across channels
//! as a run.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use ndarray::Array1;
use rayon::prelude::*;

use crate::convert::ConvertError;
use crate::phoenix::{open_phoenix, FileHeader, FileName, FileType};
use crate::recmeta::RecordingMetadata;
use crate::timeseries::ChannelTimeSeries;

/// One channel of an assembled run, with the file header it was read from
/// (the header carries the gains and GPS fix the archive wants).
pub struct RunChannel {
    pub channel_id: u8,
    pub header: FileHeader,
    pub ts: ChannelTimeSeries,
}

/// All simultaneously-started channel blocks at one sample rate.
pub struct AssembledRun {
    pub id: String,
    pub sample_rate: f64,
    pub start: DateTime<Utc>,
    pub channels: Vec<RunChannel>,
}

/// One contiguous stretch of one channel's samples.
struct Block {
    channel_id: u8,
    header: FileHeader,
    start: DateTime<Utc>,
    data: Array1<f64>,
}

/// Read a station directory and group its data into runs at the requested
/// sample rates.
pub fn assemble_runs(
    station_dir: &Path,
    recmeta: &RecordingMetadata,
    sample_rates: &[f64],
) -> Result<Vec<AssembledRun>, ConvertError> {
    let channel_dirs = find_channel_dirs(station_dir)?;

    // Channels are independent until they're grouped, so read them in
    // parallel.
    let blocks: Vec<Vec<Block>> = channel_dirs
        .par_iter()
        .map(|dir| read_channel_dir(dir))
        .collect::<Result<_, _>>()?;
    let mut blocks: Vec<Block> = blocks.into_iter().flatten().collect();

    blocks.retain(|block| {
        let rate = block.header.sample_rate();
        let wanted = sample_rates.iter().any(|&r| rates_match(rate, r));
        if !wanted {
            debug!(
                "Dropping channel {} block at {} samples/second; not requested",
                block.channel_id, rate
            );
        }
        wanted
    });

    // Group by (sample rate, start second). BTreeMap ordering gives the runs
    // their numbering.
    let mut groups: BTreeMap<(u64, i64), Vec<Block>> = BTreeMap::new();
    for block in blocks {
        let key = (block.header.sample_rate().to_bits(), block.start.timestamp());
        groups.entry(key).or_default().push(block);
    }

    let mut counters: BTreeMap<u64, usize> = BTreeMap::new();
    let mut runs = vec![];
    for ((rate_bits, _), group) in groups {
        let index = counters.entry(rate_bits).or_insert(0);
        *index += 1;
        let sample_rate = f64::from_bits(rate_bits);
        let id = format!("sr{}_{:04}", format_rate(sample_rate), index);

        // Groups are never created empty.
        let start = group.iter().map(|b| b.start).min().unwrap();
        let mut channels = vec![];
        for block in group {
            channels.push(into_channel(block, recmeta)?);
        }
        channels.sort_by(|a, b| a.channel_id.cmp(&b.channel_id));

        runs.push(AssembledRun {
            id,
            sample_rate,
            start,
            channels,
        });
    }

    for &rate in sample_rates {
        if !runs.iter().any(|run| rates_match(run.sample_rate, rate)) {
            return Err(ConvertError::NoDataForRate(rate));
        }
    }

    info!(
        "Assembled {} run(s) from {} channel directory(ies)",
        runs.len(),
        channel_dirs.len()
    );
    Ok(runs)
}

/// The numbered per-channel subdirectories of a station directory.
fn find_channel_dirs(station_dir: &Path) -> Result<Vec<PathBuf>, ConvertError> {
    if !station_dir.is_dir() {
        return Err(ConvertError::StationDirDoesntExist(
            station_dir.display().to_string(),
        ));
    }

    let mut dirs = vec![];
    for entry in std::fs::read_dir(station_dir)? {
        let path = entry?.path();
        let is_channel = path.is_dir()
            && path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.parse::<u8>().is_ok());
        if is_channel {
            dirs.push(path);
        }
    }
    if dirs.is_empty() {
        return Err(ConvertError::NoChannelDirs(
            station_dir.display().to_string(),
        ));
    }
    dirs.sort_unstable();
    Ok(dirs)
}

/// Read every data file in one channel directory into blocks.
fn read_channel_dir(dir: &Path) -> Result<Vec<Block>, ConvertError> {
    // Group the directory's data files by channel and extension, ascending
    // by sequence.
    let mut by_kind: BTreeMap<(u8, String), Vec<(FileName, PathBuf)>> = BTreeMap::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        match FileName::parse(&path) {
            Some(name) => by_kind
                .entry((name.channel_id, name.extension.clone()))
                .or_default()
                .push((name, path)),
            None => debug!("Skipping {}; not an MTU-5C data file", path.display()),
        }
    }

    let mut blocks = vec![];
    for (_, mut files) in by_kind {
        files.sort_by_key(|(name, _)| name.sequence);

        // Split the sequence list into unbroken chains.
        let mut chains: Vec<Vec<PathBuf>> = vec![];
        let mut previous = None;
        for (name, path) in files {
            match previous {
                Some(p) if name.sequence == p + 1 => {
                    chains.last_mut().unwrap().push(path);
                }
                Some(_) => {
                    warn!(
                        "Sequence gap before {}; starting a new block",
                        path.display()
                    );
                    chains.push(vec![path]);
                }
                None => chains.push(vec![path]),
            }
            previous = Some(name.sequence);
        }

        for chain in chains {
            blocks.extend(read_chain(&chain)?);
        }
    }
    Ok(blocks)
}

/// Read one unbroken chain of files. A continuous chain concatenates into a
/// single block; a segmented chain yields one block per segment.
fn read_chain(chain: &[PathBuf]) -> Result<Vec<Block>, ConvertError> {
    let mut blocks = vec![];
    // (first file's header and start, samples so far)
    let mut continuous: Option<(FileHeader, DateTime<Utc>, Vec<f64>)> = None;

    for path in chain {
        let mut reader = open_phoenix(path)?;
        match reader.header().file_type {
            FileType::Continuous => {
                let data = reader.read_frames()?;
                match &mut continuous {
                    Some((_, _, samples)) => samples.extend(data.iter()),
                    None => {
                        continuous = Some((
                            reader.header().clone(),
                            reader.start_time(),
                            data.to_vec(),
                        ));
                    }
                }
            }
            FileType::Segmented => {
                for segment in reader.read_all_segments()? {
                    blocks.push(Block {
                        channel_id: reader.header().channel_id,
                        header: reader.header().clone(),
                        start: segment.header.start_time(),
                        data: segment.data,
                    });
                }
            }
        }
    }

    if let Some((header, start, samples)) = continuous {
        blocks.push(Block {
            channel_id: header.channel_id,
            header,
            start,
            data: Array1::from_vec(samples),
        });
    }
    Ok(blocks)
}

/// Turn a block into an archive-ready channel using the station metadata.
fn into_channel(block: Block, recmeta: &RecordingMetadata) -> Result<RunChannel, ConvertError> {
    let component = recmeta
        .component_for(block.channel_id)
        .ok_or(ConvertError::UnknownChannel(block.channel_id))?;
    let entry = recmeta.channel(block.channel_id);
    let kind = entry
        .map(|e| e.kind())
        .unwrap_or(block.header.channel_type);

    let mut ts = ChannelTimeSeries::with_kind(
        &component,
        kind,
        block.header.sample_rate(),
        block.start,
        block.data,
    )?;
    if let Some(entry) = entry {
        ts.sensor_id = entry.sensor_serial.clone();
        ts.sensor_type = entry.sensor_type.clone();
        ts.azimuth = entry.azimuth;
        ts.tilt = entry.tilt;
        ts.dipole_length_m = entry.dipole_length_m;
    }

    Ok(RunChannel {
        channel_id: block.channel_id,
        header: block.header,
        ts,
    })
}

fn rates_match(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6 * a.max(b).max(1.0)
}

/// "150", "24000", or "2.5" for sub-1 Hz decimation levels.
fn format_rate(rate: f64) -> String {
    if rate.fract() == 0.0 {
        format!("{}", rate as u64)
    } else {
        format!("{rate}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_formatting() {
        assert_eq!(format_rate(150.0), "150");
        assert_eq!(format_rate(24000.0), "24000");
        assert_eq!(format_rate(2.5), "2.5");
    }

    #[test]
    fn rate_matching_tolerates_float_noise() {
        assert!(rates_match(150.0, 150.0));
        assert!(rates_match(24000.0, 24000.0000001));
        assert!(!rates_match(150.0, 24000.0));
    }
}
