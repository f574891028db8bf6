//! The gridded soil moisture dataset handed to the output writer.

use crate::errors::{RemapError, RemapResult};
use crate::grid::GriddedSeries;
use crate::timeseries::FloatValue;
use serde::{Deserialize, Serialize};

pub const VARIABLE_NAME: &str = "SMAPHB_SM";
pub const UNITS: &str = "m3/m3";
/// Value the writer stores for missing cells on disk.
pub const FILL_VALUE: i32 = -9999;

/// Descriptive attributes attached verbatim to the output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metadata {
    pub title: String,
    pub description: String,
    pub creator_name: String,
    pub institution: String,
    pub citation: String,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            title: "SMAP-HydroBlocks Surface Soil Moisture Data (m3/m3)".to_string(),
            description: "SMAP-HydroBlocks (SMAP-HB) is a hyper-resolution satellite-based \
                surface soil moisture product that combines NASA Soil Moisture Active-Passive \
                (SMAP) L3 Enhance product, hyper-resolution land surface modeling, radiative \
                transfer modeling, machine learning, and in-situ observations. This data is \
                organize in geographic coordinates at 30-m 6-hourly resolution (2015-2019)."
                .to_string(),
            creator_name: "Noemi Vergopolan (noemi@princeton.edu)".to_string(),
            institution: "Princeton University".to_string(),
            citation: "Vergopolan et al. (2020). Combining hyper-resolution land surface \
                modeling with SMAP brightness temperatures to obtain 30-m soil moisture \
                estimates. Remote Sensing of Environment, 242, 111740. \
                https://doi.org/10.1016/j.rse.2020.111740 and Vergopolan et al. (2021). \
                SMAP-HydroBlocks, a 30-m satellite-based soil moisture dataset for the \
                conterminous US. Scientific Data, 8, 264. \
                https://doi.org/10.1038/s41597-021-01050-2"
                .to_string(),
        }
    }
}

/// zlib deflate level, 0 (no compression, fast) to 9 (max compression, slow).
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct CompressionLevel(u8);

impl CompressionLevel {
    pub const MAX: u8 = 9;

    pub fn new(level: u8) -> RemapResult<Self> {
        if level > Self::MAX {
            return Err(RemapError::Configuration(format!(
                "compression level {level} is outside 0..={}",
                Self::MAX
            )));
        }
        Ok(Self(level))
    }

    pub fn level(&self) -> u8 {
        self.0
    }
}

impl Default for CompressionLevel {
    fn default() -> Self {
        Self(4)
    }
}

impl TryFrom<u8> for CompressionLevel {
    type Error = RemapError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CompressionLevel> for u8 {
    fn from(value: CompressionLevel) -> Self {
        value.0
    }
}

/// Encoding requested from the writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteOptions {
    pub compression: CompressionLevel,
    pub zlib: bool,
    pub fill_value: i32,
    /// Store the time coordinate as 32-bit integers
    pub time_as_i32: bool,
    /// Replace an existing output instead of failing
    pub overwrite: bool,
}

impl WriteOptions {
    pub fn new(compression: CompressionLevel) -> Self {
        Self {
            compression,
            zlib: true,
            fill_value: FILL_VALUE,
            time_as_i32: true,
            overwrite: true,
        }
    }
}

/// Final output: one gridded variable, its units and the missing-value marker.
///
/// Missing cells hold `missing_value` (NaN); the writer maps them to
/// [`WriteOptions::fill_value`].
#[derive(Debug, Clone, PartialEq)]
pub struct GriddedDataset {
    pub name: String,
    pub units: String,
    pub missing_value: FloatValue,
    pub grid: GriddedSeries,
    pub metadata: Metadata,
}

impl GriddedDataset {
    pub fn soil_moisture(grid: GriddedSeries, metadata: Metadata) -> Self {
        Self {
            name: VARIABLE_NAME.to_string(),
            units: UNITS.to_string(),
            missing_value: FloatValue::NAN,
            grid,
            metadata,
        }
    }

    /// True if `value` is the missing-value marker.
    pub fn is_missing(&self, value: FloatValue) -> bool {
        value.is_nan()
    }
}
