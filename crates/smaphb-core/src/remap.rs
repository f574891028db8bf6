//! Scatter of per-HRU catchment series onto the dense output grid.
//!
//! Remapping runs in two phases:
//!
//! 1. [`RemapPlan::probe`] asks the series source for the time axis of the first catchment.
//!    That axis is canonical for the whole output and the grid is allocated from it.
//! 2. [`GridRemapper::remap`] visits every catchment once, loads its series, checks the
//!    series against the canonical axis and broadcasts each HRU series into every cell of
//!    that HRU's footprint.
//!
//! Only one catchment series is held at a time. The output itself is dense: every covered
//! cell stores its own copy of the HRU series, so memory grows with
//! `time × lat × lon` regardless of how many HRUs there are.

use crate::errors::{RemapError, RemapResult};
use crate::grid::GriddedSeries;
use crate::spatial_index::{mask_cells, SpatialIndex};
use crate::timeseries::{CatchmentSeries, Timestamp};
use ndarray::s;
use tracing::{debug, info, warn};

/// Supplier of catchment series for the remapper.
pub trait SeriesSource {
    /// Load the full series of one catchment.
    fn load(&mut self, catchment: i32) -> RemapResult<CatchmentSeries>;

    /// Load only the time axis of one catchment.
    ///
    /// The default loads the full series and keeps the timestamps.
    fn time_axis(&mut self, catchment: i32) -> RemapResult<Vec<Timestamp>> {
        Ok(self.load(catchment)?.times().to_vec())
    }
}

/// Canonical time axis for one remap.
#[derive(Debug, Clone, PartialEq)]
pub struct RemapPlan {
    times: Vec<Timestamp>,
}

impl RemapPlan {
    /// Determine the canonical time axis from the first catchment of the index.
    pub fn probe<S: SeriesSource>(index: &SpatialIndex, source: &mut S) -> RemapResult<Self> {
        let first = index.unique_catchments()[0];
        let times = source.time_axis(first)?;
        debug!(catchment = first, steps = times.len(), "Canonical time axis");
        Ok(Self { times })
    }

    pub fn from_times(times: Vec<Timestamp>) -> Self {
        Self { times }
    }

    pub fn times(&self) -> &[Timestamp] {
        &self.times
    }

    /// Allocate the output grid, every cell unmapped.
    pub fn allocate(&self, index: &SpatialIndex) -> GriddedSeries {
        GriddedSeries::unmapped(self.times.clone(), index.lats().clone(), index.lons().clone())
    }

    /// Check a catchment series against the canonical axis.
    pub fn check(&self, series: &CatchmentSeries) -> RemapResult<()> {
        if series.len() != self.times.len() {
            return Err(RemapError::ShapeMismatch {
                catchment: series.catchment(),
                expected: self.times.len(),
                found: series.len(),
            });
        }
        if let Some(index) = series
            .times()
            .iter()
            .zip(self.times.iter())
            .position(|(a, b)| a != b)
        {
            return Err(RemapError::TimeAxisMismatch {
                catchment: series.catchment(),
                index,
            });
        }
        Ok(())
    }
}

/// What a single catchment contributed to the grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScatterStats {
    /// Cells that received an HRU series
    pub cells_written: usize,
    /// HRUs of the series without any cell in the catchment footprint
    pub hrus_skipped: usize,
}

#[derive(Debug)]
pub struct GridRemapper<'a> {
    index: &'a SpatialIndex,
}

impl<'a> GridRemapper<'a> {
    pub fn new(index: &'a SpatialIndex) -> Self {
        Self { index }
    }

    /// Remap every catchment of the index into a freshly allocated grid.
    ///
    /// Cells not covered by any catchment/HRU pair keep [`crate::grid::UNMAPPED`].
    pub fn remap<S: SeriesSource>(&self, source: &mut S) -> RemapResult<GriddedSeries> {
        let plan = RemapPlan::probe(self.index, source)?;
        let mut grid = plan.allocate(self.index);
        let (n_lat, n_lon) = self.index.dim();
        info!(
            catchments = self.index.unique_catchments().len(),
            steps = plan.times().len(),
            lat = n_lat,
            lon = n_lon,
            "Remapping catchments onto grid"
        );

        let mut total = ScatterStats::default();
        for catchment in self.index.unique_catchments() {
            // Dropped at the end of the iteration; only one series is resident at a time.
            let series = source.load(*catchment)?;
            if series.catchment() != *catchment {
                return Err(RemapError::InvalidSeries {
                    catchment: *catchment,
                    reason: format!("source returned catchment {}", series.catchment()),
                });
            }
            plan.check(&series)?;
            let stats = self.scatter(&mut grid, &series);
            total.cells_written += stats.cells_written;
            total.hrus_skipped += stats.hrus_skipped;
        }

        info!(
            cells_written = total.cells_written,
            hrus_skipped = total.hrus_skipped,
            "Remap complete"
        );
        Ok(grid)
    }

    /// Broadcast every HRU series of `series` into its cells of `grid`.
    ///
    /// The series must already match the grid's time axis (see [`RemapPlan::check`]).
    /// HRUs without any cell in the catchment are skipped.
    pub fn scatter(&self, grid: &mut GriddedSeries, series: &CatchmentSeries) -> ScatterStats {
        let catchment = series.catchment();
        let footprint = self.index.catchment_mask(catchment);
        let mut stats = ScatterStats::default();

        for (hru, column) in series.hru_columns() {
            let cells = mask_cells(&self.index.hru_mask_within(&footprint, hru));
            if cells.is_empty() {
                stats.hrus_skipped += 1;
                continue;
            }
            for (i, j) in &cells {
                grid.values.slice_mut(s![.., *i, *j]).assign(&column);
            }
            stats.cells_written += cells.len();
        }

        if stats.cells_written == 0 && footprint.iter().any(|v| *v) {
            warn!(
                catchment,
                hrus = series.hru_ids().len(),
                "No HRU of the series matches the catchment footprint"
            );
        }
        debug!(
            catchment,
            cells_written = stats.cells_written,
            hrus_skipped = stats.hrus_skipped,
            "Scattered catchment"
        );
        stats
    }
}
