// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The channel-summary table: one row per channel in the archive, so a
//! reader can see what's inside without walking the hierarchy.

use hdf5::{types::FixedAscii, H5Type};
use ndarray::s;

use super::error::Mth5Error;
use crate::constants::SUMMARY_CHUNK;

/// One row of the summary table. Strings are fixed-width ASCII so the rows
/// form a flat HDF5 compound type; over-long values are truncated.
#[derive(H5Type, Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct SummaryRow {
    pub station: FixedAscii<32>,
    pub run: FixedAscii<32>,
    pub component: FixedAscii<16>,
    pub start: FixedAscii<40>,
    pub end: FixedAscii<40>,
    pub n_samples: u64,
    pub sample_rate: f64,
    pub measurement_type: FixedAscii<16>,
    pub units: FixedAscii<16>,
}

impl SummaryRow {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        station: &str,
        run: &str,
        component: &str,
        start: &str,
        end: &str,
        n_samples: u64,
        sample_rate: f64,
        measurement_type: &str,
        units: &str,
    ) -> Result<SummaryRow, Mth5Error> {
        Ok(SummaryRow {
            station: fixed(station)?,
            run: fixed(run)?,
            component: fixed(component)?,
            start: fixed(start)?,
            end: fixed(end)?,
            n_samples,
            sample_rate,
            measurement_type: fixed(measurement_type)?,
            units: fixed(units)?,
        })
    }

    fn zeroed() -> SummaryRow {
        SummaryRow {
            station: FixedAscii::default(),
            run: FixedAscii::default(),
            component: FixedAscii::default(),
            start: FixedAscii::default(),
            end: FixedAscii::default(),
            n_samples: 0,
            sample_rate: 0.0,
            measurement_type: FixedAscii::default(),
            units: FixedAscii::default(),
        }
    }
}

/// Truncate to the column width; non-ASCII content is an error.
fn fixed<const N: usize>(s: &str) -> Result<FixedAscii<N>, Mth5Error> {
    if !s.is_ascii() {
        return Err(Mth5Error::InvalidString(s.to_string()));
    }
    let end = s.len().min(N);
    FixedAscii::from_ascii(&s.as_bytes()[..end])
        .map_err(|_| Mth5Error::InvalidString(s.to_string()))
}

/// A resizable 1-D table of [`SummaryRow`]s.
pub struct SummaryTable {
    dataset: hdf5::Dataset,
}

impl SummaryTable {
    /// Create an empty table with unlimited rows.
    pub(crate) fn create(parent: &hdf5::Group, name: &str) -> Result<SummaryTable, Mth5Error> {
        let dataset = parent
            .new_dataset::<SummaryRow>()
            .shape((0..,))
            .chunk((SUMMARY_CHUNK,))
            .create(name)?;
        Ok(SummaryTable { dataset })
    }

    pub(crate) fn open(parent: &hdf5::Group, name: &str) -> Result<SummaryTable, Mth5Error> {
        Ok(SummaryTable {
            dataset: parent.dataset(name)?,
        })
    }

    pub fn nrows(&self) -> usize {
        self.dataset.shape()[0]
    }

    pub fn append(&self, row: &SummaryRow) -> Result<(), Mth5Error> {
        let n = self.nrows();
        self.dataset.resize((n + 1,))?;
        self.dataset
            .write_slice(std::slice::from_ref(row), s![n..n + 1])?;
        Ok(())
    }

    pub fn rows(&self) -> Result<Vec<SummaryRow>, Mth5Error> {
        Ok(self.dataset.read_raw::<SummaryRow>()?)
    }

    /// Reset to a single zeroed row.
    pub fn clear(&self) -> Result<(), Mth5Error> {
        let zeroed = SummaryRow::zeroed();
        self.dataset.resize((1,))?;
        self.dataset
            .write_slice(std::slice::from_ref(&zeroed), s![0..1])?;
        Ok(())
    }
}
