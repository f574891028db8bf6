//! Dense `time × lat × lon` gridded series shared by the remapper and the aggregator.

use crate::timeseries::{FloatValue, Timestamp};
use ndarray::{Array1, Array3};

/// Placeholder written into cells that no catchment/HRU pair covers.
pub const UNMAPPED: FloatValue = -9999.0;

#[derive(Debug, Clone, PartialEq)]
pub struct GriddedSeries {
    pub times: Vec<Timestamp>,
    pub lats: Array1<f64>,
    pub lons: Array1<f64>,
    /// Indexed `[time, lat, lon]`
    pub values: Array3<FloatValue>,
}

impl GriddedSeries {
    /// Allocate a grid filled with [`UNMAPPED`].
    pub fn unmapped(times: Vec<Timestamp>, lats: Array1<f64>, lons: Array1<f64>) -> Self {
        let values = Array3::from_elem((times.len(), lats.len(), lons.len()), UNMAPPED);
        Self {
            times,
            lats,
            lons,
            values,
        }
    }

    pub fn n_times(&self) -> usize {
        self.times.len()
    }

    /// Replace every [`UNMAPPED`] cell by NaN, the missing-value marker used from here on.
    pub fn mark_unmapped_missing(&mut self) {
        self.values.mapv_inplace(|v| if v == UNMAPPED { FloatValue::NAN } else { v });
    }

    /// Number of `(lat, lon)` cells that hold no value at any time step.
    pub fn missing_cells(&self) -> usize {
        let (_, n_lat, n_lon) = self.values.dim();
        (0..n_lat)
            .flat_map(|i| (0..n_lon).map(move |j| (i, j)))
            .filter(|(i, j)| {
                self.values
                    .slice(ndarray::s![.., *i, *j])
                    .iter()
                    .all(|v| v.is_nan() || *v == UNMAPPED)
            })
            .count()
    }
}
