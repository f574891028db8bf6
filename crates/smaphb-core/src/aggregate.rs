//! Temporal aggregation of the remapped grid.
//!
//! Resampling follows calendar buckets: one bucket per day, month or year, labelled by
//! the bucket start (midnight, first day of month, 1 January). Buckets are contiguous
//! from the bucket of the first time step to the bucket of the last, so a calendar period
//! without any source time step still appears in the output, entirely missing.
//!
//! The reduction is a NaN-aware mean: missing values are ignored, and a bucket whose
//! values are all missing stays missing.

use crate::errors::{RemapError, RemapResult};
use crate::grid::GriddedSeries;
use crate::timeseries::{FloatValue, Timestamp};
use chrono::{Datelike, Days, Months, NaiveTime};
use ndarray::{s, Array3, Zip};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// Output time step of the gridded series.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Cadence {
    /// Native 6-hourly steps, no resampling
    SixHourly,
    Daily,
    Monthly,
    Annual,
}

impl Cadence {
    pub const ALL: [Cadence; 4] = [
        Cadence::SixHourly,
        Cadence::Daily,
        Cadence::Monthly,
        Cadence::Annual,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Cadence::SixHourly => "6h",
            Cadence::Daily => "daily",
            Cadence::Monthly => "monthly",
            Cadence::Annual => "annual",
        }
    }

    /// Start of the calendar bucket containing `t`.
    ///
    /// For [`Cadence::SixHourly`] every time step is its own bucket.
    pub fn bucket_start(&self, t: Timestamp) -> Timestamp {
        let date = t.date();
        match self {
            Cadence::SixHourly => t,
            Cadence::Daily => date.and_time(NaiveTime::MIN),
            Cadence::Monthly => (date - Days::new(date.day0() as u64)).and_time(NaiveTime::MIN),
            Cadence::Annual => (date - Days::new(date.ordinal0() as u64)).and_time(NaiveTime::MIN),
        }
    }

    /// Start of the bucket following the one starting at `start`.
    fn next_bucket(&self, start: Timestamp) -> Timestamp {
        match self {
            Cadence::SixHourly => start + chrono::Duration::hours(6),
            Cadence::Daily => start + Days::new(1),
            Cadence::Monthly => start + Months::new(1),
            Cadence::Annual => start + Months::new(12),
        }
    }
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Cadence {
    type Err = RemapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Cadence::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| {
                RemapError::Configuration(format!(
                    "time step '{s}' is not available, use one of: '6h', 'daily', 'monthly', 'annual'"
                ))
            })
    }
}

impl TryFrom<String> for Cadence {
    type Error = RemapError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Cadence> for String {
    fn from(value: Cadence) -> Self {
        value.as_str().to_string()
    }
}

/// Options for [`aggregate`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateOptions {
    /// Log a warning for buckets whose cells have no valid value (the mean of an empty set).
    /// When unset these are only reported at debug level.
    pub report_empty_buckets: bool,
}

/// Convert unmapped cells to missing and resample the grid to `cadence`.
///
/// Spatial axes are unchanged. For [`Cadence::SixHourly`] the time axis is unchanged too.
/// The time axis must be strictly increasing and match the first axis of `values`,
/// otherwise [`RemapError::InvalidGrid`] is returned.
pub fn aggregate(
    mut grid: GriddedSeries,
    cadence: Cadence,
    options: &AggregateOptions,
) -> RemapResult<GriddedSeries> {
    check_time_axis(&grid)?;
    grid.mark_unmapped_missing();
    if cadence == Cadence::SixHourly || grid.times.is_empty() {
        return Ok(grid);
    }

    let buckets = bucket_starts(&grid.times, cadence);
    let (_, n_lat, n_lon) = grid.values.dim();
    let mut sums = Array3::<FloatValue>::zeros((buckets.len(), n_lat, n_lon));
    let mut counts = Array3::<u32>::zeros((buckets.len(), n_lat, n_lon));

    let mut b = 0;
    for (t, time) in grid.times.iter().enumerate() {
        let start = cadence.bucket_start(*time);
        while buckets[b] != start {
            b += 1;
        }
        Zip::from(sums.slice_mut(s![b, .., ..]))
            .and(counts.slice_mut(s![b, .., ..]))
            .and(grid.values.slice(s![t, .., ..]))
            .for_each(|sum, count, v| {
                if !v.is_nan() {
                    *sum += *v;
                    *count += 1;
                }
            });
    }

    let values = Zip::from(&sums).and(&counts).map_collect(|sum, count| {
        if *count == 0 {
            FloatValue::NAN
        } else {
            *sum / *count as FloatValue
        }
    });

    let empty = counts.iter().filter(|c| **c == 0).count();
    if empty > 0 {
        if options.report_empty_buckets {
            warn!(%cadence, cells = empty, "Mean of empty bucket, output is missing");
        } else {
            debug!(%cadence, cells = empty, "Mean of empty bucket, output is missing");
        }
    }

    Ok(GriddedSeries {
        times: buckets,
        lats: grid.lats,
        lons: grid.lons,
        values,
    })
}

fn check_time_axis(grid: &GriddedSeries) -> RemapResult<()> {
    let steps = grid.values.dim().0;
    if steps != grid.n_times() {
        return Err(RemapError::InvalidGrid {
            reason: format!("{} timestamps for {} time steps", grid.n_times(), steps),
        });
    }
    if let Some(i) = grid.times.windows(2).position(|w| w[0] >= w[1]) {
        return Err(RemapError::InvalidGrid {
            reason: format!("time axis not strictly increasing at step {}", i + 1),
        });
    }
    Ok(())
}

/// Contiguous bucket labels covering `times`, which must be sorted and non-empty.
fn bucket_starts(times: &[Timestamp], cadence: Cadence) -> Vec<Timestamp> {
    let (Some(first), Some(last)) = (times.first(), times.last()) else {
        return Vec::new();
    };
    let last = cadence.bucket_start(*last);
    let mut buckets = vec![cadence.bucket_start(*first)];
    while let Some(current) = buckets.last().copied() {
        if current >= last {
            break;
        }
        buckets.push(cadence.next_bucket(current));
    }
    buckets
}
