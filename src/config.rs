//! Remap configuration and its validation into a typed request.
//!
//! A [`RemapConfig`] is plain data, typically read from TOML:
//!
//! ```toml
//! start = "2016-01-01"
//! end = "2016-12-31"
//! time_step = "monthly"
//! compression_level = 4
//!
//! [bbox]
//! min_lon = -75.0
//! max_lon = -74.5
//! min_lat = 40.0
//! max_lat = 40.5
//! ```
//!
//! [`RemapConfig::validate`] checks everything up front and produces a [`RemapRequest`];
//! no raster or series is read before that succeeds.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use smaphb_core::aggregate::{AggregateOptions, Cadence};
use smaphb_core::bbox::BoundingBox;
use smaphb_core::dataset::{CompressionLevel, Metadata, WriteOptions};
use smaphb_core::errors::{RemapError, RemapResult};
use smaphb_core::timeseries::Timestamp;
use std::path::Path;

const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemapConfig {
    /// First day (or timestamp) to include
    pub start: String,
    /// Last day (or timestamp) to include; a bare date includes the whole day
    pub end: String,
    /// One of "6h", "daily", "monthly", "annual"
    #[serde(default = "default_time_step")]
    pub time_step: String,
    #[serde(default = "default_compression_level")]
    pub compression_level: u8,
    #[serde(default)]
    pub report_empty_buckets: bool,
    pub bbox: BoundingBox,
    #[serde(default)]
    pub metadata: Metadata,
}

fn default_time_step() -> String {
    Cadence::SixHourly.to_string()
}

fn default_compression_level() -> u8 {
    CompressionLevel::default().level()
}

impl RemapConfig {
    pub fn new(bbox: BoundingBox, start: &str, end: &str, time_step: &str) -> Self {
        Self {
            bbox,
            start: start.to_string(),
            end: end.to_string(),
            time_step: time_step.to_string(),
            compression_level: default_compression_level(),
            report_empty_buckets: false,
            metadata: Metadata::default(),
        }
    }

    pub fn from_toml_str(content: &str) -> RemapResult<Self> {
        toml::from_str(content)
            .map_err(|e| RemapError::Configuration(format!("could not parse configuration: {e}")))
    }

    pub fn from_file(path: impl AsRef<Path>) -> RemapResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            RemapError::Configuration(format!("could not read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Check the configuration and convert it into a typed request.
    ///
    /// The time step is checked first, so an unsupported cadence is always reported as such.
    pub fn validate(&self) -> RemapResult<RemapRequest> {
        let cadence: Cadence = self.time_step.parse()?;
        self.bbox.validate()?;
        let compression = CompressionLevel::new(self.compression_level)?;
        let start = parse_bound(&self.start, NaiveTime::MIN)?;
        let end = parse_bound(&self.end, end_of_day())?;
        if start > end {
            return Err(RemapError::Configuration(format!(
                "start {} is after end {}",
                self.start, self.end
            )));
        }

        Ok(RemapRequest {
            bbox: self.bbox,
            start,
            end,
            cadence,
            write: WriteOptions::new(compression),
            aggregate: AggregateOptions {
                report_empty_buckets: self.report_empty_buckets,
            },
            metadata: self.metadata.clone(),
        })
    }
}

/// Validated, fully typed remap request.
#[derive(Debug, Clone, PartialEq)]
pub struct RemapRequest {
    pub bbox: BoundingBox,
    pub start: Timestamp,
    pub end: Timestamp,
    pub cadence: Cadence,
    pub write: WriteOptions,
    pub aggregate: AggregateOptions,
    pub metadata: Metadata,
}

/// 23:59:59.999999999
fn end_of_day() -> NaiveTime {
    NaiveTime::MIN - chrono::Duration::nanoseconds(1)
}

/// Parse a timestamp, or a bare date completed with `time_of_day`.
fn parse_bound(value: &str, time_of_day: NaiveTime) -> RemapResult<Timestamp> {
    if let Ok(t) = NaiveDateTime::parse_from_str(value, DATETIME_FORMAT) {
        return Ok(t);
    }
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map(|d| d.and_time(time_of_day))
        .map_err(|_| {
            RemapError::Configuration(format!(
                "'{value}' is not a date (YYYY-MM-DD) or timestamp (YYYY-MM-DDTHH:MM:SS)"
            ))
        })
}
