//! Per-catchment HRU time series as delivered by the series store.

use crate::errors::{RemapError, RemapResult};
use chrono::NaiveDateTime;
use ndarray::{s, Array2, ArrayView1};
use std::collections::HashSet;

pub type FloatValue = f64;
pub type Timestamp = NaiveDateTime;

/// Soil moisture of every HRU of one catchment, indexed `[time, hru column]`.
///
/// Column `k` of `values` belongs to `hru_ids[k]`.
#[derive(Debug, Clone, PartialEq)]
pub struct CatchmentSeries {
    catchment: i32,
    times: Vec<Timestamp>,
    hru_ids: Vec<i32>,
    values: Array2<FloatValue>,
}

impl CatchmentSeries {
    /// Create a series, checking that:
    ///
    /// * `values` has shape `(times.len(), hru_ids.len())`
    /// * timestamps are strictly increasing
    /// * every HRU id appears at most once
    pub fn new(
        catchment: i32,
        times: Vec<Timestamp>,
        hru_ids: Vec<i32>,
        values: Array2<FloatValue>,
    ) -> RemapResult<Self> {
        let invalid = |reason: String| RemapError::InvalidSeries { catchment, reason };

        if values.dim() != (times.len(), hru_ids.len()) {
            return Err(invalid(format!(
                "values have shape {:?}, expected ({}, {})",
                values.dim(),
                times.len(),
                hru_ids.len()
            )));
        }
        if let Some(i) = times.windows(2).position(|w| w[0] >= w[1]) {
            return Err(invalid(format!(
                "timestamps are not strictly increasing at step {}",
                i + 1
            )));
        }
        let mut seen = HashSet::with_capacity(hru_ids.len());
        if let Some(dup) = hru_ids.iter().find(|id| !seen.insert(**id)) {
            return Err(invalid(format!("HRU {dup} appears more than once")));
        }

        Ok(Self {
            catchment,
            times,
            hru_ids,
            values,
        })
    }

    pub fn catchment(&self) -> i32 {
        self.catchment
    }

    pub fn times(&self) -> &[Timestamp] {
        &self.times
    }

    pub fn hru_ids(&self) -> &[i32] {
        &self.hru_ids
    }

    pub fn values(&self) -> &Array2<FloatValue> {
        &self.values
    }

    /// Number of time steps.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Full time series of each HRU, paired with its id.
    pub fn hru_columns(&self) -> impl Iterator<Item = (i32, ArrayView1<'_, FloatValue>)> {
        self.hru_ids
            .iter()
            .copied()
            .zip(self.values.columns())
    }

    /// Drop the time steps outside the inclusive range `[start, end]`.
    pub fn trimmed(self, start: Timestamp, end: Timestamp) -> Self {
        let first = self.times.partition_point(|t| *t < start);
        let last = self.times.partition_point(|t| *t <= end).max(first);
        if first == 0 && last == self.times.len() {
            return self;
        }
        Self {
            catchment: self.catchment,
            times: self.times[first..last].to_vec(),
            hru_ids: self.hru_ids,
            values: self.values.slice(s![first..last, ..]).to_owned(),
        }
    }
}
