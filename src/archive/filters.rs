// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Filter storage.
//!
//! Every survey carries a `Filters` group with one subgroup per filter
//! family. A filter is itself a subgroup named after it: scalar metadata as
//! attributes, poles/zeros and frequency-response tables as compound
//! datasets.

use hdf5::H5Type;
use log::debug;
use num_complex::Complex64;

use super::error::Mth5Error;
use super::{read_str_attr, write_f64_attr, write_str_attr};

/// A calibration filter, named and unit-annotated.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub name: String,
    pub units_in: String,
    pub units_out: String,
    pub kind: FilterKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterKind {
    /// Zeros, poles and gain.
    PoleZero {
        poles: Vec<Complex64>,
        zeros: Vec<Complex64>,
        gain: f64,
        normalization_factor: f64,
    },
    /// A frequency-independent multiplier.
    Coefficient { gain: f64 },
    /// A pure delay [seconds].
    TimeDelay { delay: f64 },
    /// A frequency/amplitude/phase look-up table; phases in radians.
    FrequencyTable {
        frequencies: Vec<f64>,
        amplitudes: Vec<f64>,
        phases: Vec<f64>,
    },
}

impl Filter {
    /// The name as stored. HDF5 paths can't hold '/', so unit-style names
    /// like "V/m" become "V per m".
    pub fn sanitized_name(&self) -> String {
        self.name.replace('/', " per ")
    }

    fn type_str(&self) -> &'static str {
        match self.kind {
            FilterKind::PoleZero { .. } => "zpk",
            FilterKind::Coefficient { .. } => "coefficient",
            FilterKind::TimeDelay { .. } => "time_delay",
            FilterKind::FrequencyTable { .. } => "fap",
        }
    }
}

/// One (real, imag) pair of a poles or zeros dataset.
#[derive(H5Type, Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub(crate) struct ComplexEntry {
    pub(crate) real: f64,
    pub(crate) imag: f64,
}

/// One row of a `fap_table` dataset.
#[derive(H5Type, Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub(crate) struct FapEntry {
    pub(crate) frequency: f64,
    pub(crate) amplitude: f64,
    pub(crate) phase: f64,
}

const FAMILIES: [&str; 4] = ["zpk", "coefficient", "time_delay", "fap"];

/// The `Filters` group of a survey.
pub(crate) struct FiltersGroup {
    group: hdf5::Group,
}

impl FiltersGroup {
    /// Create the family subgroups under a fresh `Filters` group.
    pub(crate) fn create(parent: &hdf5::Group) -> Result<FiltersGroup, hdf5::Error> {
        let group = parent.create_group("Filters")?;
        for family in FAMILIES {
            group.create_group(family)?;
        }
        Ok(FiltersGroup { group })
    }

    pub(crate) fn open(parent: &hdf5::Group) -> Result<FiltersGroup, hdf5::Error> {
        Ok(FiltersGroup {
            group: parent.group("Filters")?,
        })
    }

    /// Store a filter. Adding a name that already exists is a no-op (the
    /// same response tends to be referenced by many channels).
    pub(crate) fn add_filter(&self, filter: &Filter) -> Result<(), Mth5Error> {
        let name = filter.sanitized_name();
        let family = self.group.group(filter.type_str())?;
        if family.link_exists(&name) {
            debug!("Filter {name} already stored");
            return Ok(());
        }

        let fg = family.create_group(&name)?;
        write_str_attr(&fg, "name", &name)?;
        write_str_attr(&fg, "type", filter.type_str())?;
        write_str_attr(&fg, "units_in", &filter.units_in)?;
        write_str_attr(&fg, "units_out", &filter.units_out)?;

        match &filter.kind {
            FilterKind::PoleZero {
                poles,
                zeros,
                gain,
                normalization_factor,
            } => {
                write_f64_attr(&fg, "gain", *gain)?;
                write_f64_attr(&fg, "normalization_factor", *normalization_factor)?;
                write_complex_dataset(&fg, "poles", poles)?;
                write_complex_dataset(&fg, "zeros", zeros)?;
            }
            FilterKind::Coefficient { gain } => {
                write_f64_attr(&fg, "gain", *gain)?;
            }
            FilterKind::TimeDelay { delay } => {
                write_f64_attr(&fg, "delay", *delay)?;
            }
            FilterKind::FrequencyTable {
                frequencies,
                amplitudes,
                phases,
            } => {
                let table: Vec<FapEntry> = frequencies
                    .iter()
                    .zip(amplitudes)
                    .zip(phases)
                    .map(|((&frequency, &amplitude), &phase)| FapEntry {
                        frequency,
                        amplitude,
                        phase,
                    })
                    .collect();
                fg.new_dataset_builder()
                    .with_data(&table)
                    .create("fap_table")?;
            }
        }

        Ok(())
    }

    /// All stored filter names, over every family.
    pub(crate) fn filter_names(&self) -> Result<Vec<String>, Mth5Error> {
        let mut names = vec![];
        for family in FAMILIES {
            names.extend(self.group.group(family)?.member_names()?);
        }
        names.sort_unstable();
        Ok(names)
    }

    /// Rebuild a [`Filter`] from its stored form.
    pub(crate) fn get_filter(&self, name: &str) -> Result<Filter, Mth5Error> {
        for family in FAMILIES {
            let family = self.group.group(family)?;
            if !family.link_exists(name) {
                continue;
            }
            let fg = family.group(name)?;

            let stored_type = read_str_attr(&fg, "type")?;
            let kind = match stored_type.as_str() {
                "zpk" => FilterKind::PoleZero {
                    poles: read_complex_dataset(&fg, "poles")?,
                    zeros: read_complex_dataset(&fg, "zeros")?,
                    gain: fg.attr("gain")?.read_scalar()?,
                    normalization_factor: fg.attr("normalization_factor")?.read_scalar()?,
                },
                "coefficient" => FilterKind::Coefficient {
                    gain: fg.attr("gain")?.read_scalar()?,
                },
                "time_delay" => FilterKind::TimeDelay {
                    delay: fg.attr("delay")?.read_scalar()?,
                },
                "fap" => {
                    let table = fg.dataset("fap_table")?.read_raw::<FapEntry>()?;
                    FilterKind::FrequencyTable {
                        frequencies: table.iter().map(|e| e.frequency).collect(),
                        amplitudes: table.iter().map(|e| e.amplitude).collect(),
                        phases: table.iter().map(|e| e.phase).collect(),
                    }
                }
                other => {
                    return Err(Mth5Error::UnknownFilterType {
                        name: name.to_string(),
                        got: other.to_string(),
                    })
                }
            };

            return Ok(Filter {
                name: read_str_attr(&fg, "name")?,
                units_in: read_str_attr(&fg, "units_in")?,
                units_out: read_str_attr(&fg, "units_out")?,
                kind,
            });
        }

        Err(Mth5Error::UnknownFilter(name.to_string()))
    }
}

fn write_complex_dataset(
    group: &hdf5::Group,
    name: &str,
    values: &[Complex64],
) -> Result<(), Mth5Error> {
    let entries: Vec<ComplexEntry> = values
        .iter()
        .map(|c| ComplexEntry {
            real: c.re,
            imag: c.im,
        })
        .collect();
    group.new_dataset_builder().with_data(&entries).create(name)?;
    Ok(())
}

fn read_complex_dataset(group: &hdf5::Group, name: &str) -> Result<Vec<Complex64>, Mth5Error> {
    let entries = group.dataset(name)?.read_raw::<ComplexEntry>()?;
    Ok(entries
        .into_iter()
        .map(|e| Complex64::new(e.real, e.imag))
        .collect())
}
