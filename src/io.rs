//! Collaborator interfaces for storage: raster reading, series loading and output writing.
//!
//! The remap pipeline only talks to storage through these traits. The in-memory
//! implementations serve tests and callers that already hold their data.

use smaphb_core::bbox::BoundingBox;
use smaphb_core::dataset::{GriddedDataset, WriteOptions};
use smaphb_core::errors::{CollaboratorError, RemapError, RemapResult, Stage};
use smaphb_core::raster::{CategoricalRaster, RasterLayer};
use smaphb_core::remap::SeriesSource;
use smaphb_core::timeseries::{CatchmentSeries, Timestamp};
use std::collections::BTreeMap;
use thiserror::Error;

/// Reads catchment and HRU id rasters restricted to a bounding box.
///
/// Both layers must be co-registered: same coordinate axes, cell for cell.
pub trait RasterSource {
    fn read_categorical_raster(
        &self,
        layer: RasterLayer,
        bbox: &BoundingBox,
    ) -> Result<CategoricalRaster, CollaboratorError>;
}

/// Reads per-catchment HRU series for a date range.
pub trait SeriesStore {
    fn read_series(
        &mut self,
        catchment: i32,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<CatchmentSeries, CollaboratorError>;

    /// Timestamps of one catchment's series.
    ///
    /// Stores that can read the time coordinate on its own should override this.
    fn read_time_axis(
        &mut self,
        catchment: i32,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<Timestamp>, CollaboratorError> {
        Ok(self.read_series(catchment, start, end)?.times().to_vec())
    }
}

/// Persists the final gridded dataset.
pub trait DatasetSink {
    fn write(
        &mut self,
        dataset: &GriddedDataset,
        options: &WriteOptions,
    ) -> Result<(), CollaboratorError>;
}

/// Errors raised by the in-memory collaborators.
#[derive(Error, Debug)]
pub enum MemoryStoreError {
    #[error("No series stored for catchment {0}")]
    MissingSeries(i32),
    #[error("Output already written and overwrite is disabled")]
    AlreadyWritten,
}

/// Full-extent rasters held in memory, clipped on every read.
#[derive(Debug, Clone)]
pub struct MemoryRasters {
    catchments: CategoricalRaster,
    hrus: CategoricalRaster,
}

impl MemoryRasters {
    pub fn new(catchments: CategoricalRaster, hrus: CategoricalRaster) -> Self {
        Self { catchments, hrus }
    }
}

impl RasterSource for MemoryRasters {
    fn read_categorical_raster(
        &self,
        layer: RasterLayer,
        bbox: &BoundingBox,
    ) -> Result<CategoricalRaster, CollaboratorError> {
        let raster = match layer {
            RasterLayer::Catchments => &self.catchments,
            RasterLayer::Hrus => &self.hrus,
        };
        Ok(raster.clip(bbox))
    }
}

/// Catchment series held in memory, keyed by catchment id.
#[derive(Debug, Clone, Default)]
pub struct MemorySeriesStore {
    series: BTreeMap<i32, CatchmentSeries>,
    reads: Vec<i32>,
}

impl MemorySeriesStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, series: CatchmentSeries) -> &mut Self {
        self.series.insert(series.catchment(), series);
        self
    }

    /// Catchments read so far, in order.
    pub fn reads(&self) -> &[i32] {
        &self.reads
    }
}

impl SeriesStore for MemorySeriesStore {
    fn read_series(
        &mut self,
        catchment: i32,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<CatchmentSeries, CollaboratorError> {
        self.reads.push(catchment);
        let series = self
            .series
            .get(&catchment)
            .ok_or(MemoryStoreError::MissingSeries(catchment))?;
        Ok(series.clone().trimmed(start, end))
    }

    fn read_time_axis(
        &mut self,
        catchment: i32,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<Timestamp>, CollaboratorError> {
        let series = self
            .series
            .get(&catchment)
            .ok_or(MemoryStoreError::MissingSeries(catchment))?;
        Ok(series
            .times()
            .iter()
            .copied()
            .filter(|t| *t >= start && *t <= end)
            .collect())
    }
}

/// Keeps the last written dataset in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    written: Option<(GriddedDataset, WriteOptions)>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dataset(&self) -> Option<&GriddedDataset> {
        self.written.as_ref().map(|(dataset, _)| dataset)
    }

    pub fn options(&self) -> Option<&WriteOptions> {
        self.written.as_ref().map(|(_, options)| options)
    }
}

impl DatasetSink for MemorySink {
    fn write(
        &mut self,
        dataset: &GriddedDataset,
        options: &WriteOptions,
    ) -> Result<(), CollaboratorError> {
        if self.written.is_some() && !options.overwrite {
            return Err(MemoryStoreError::AlreadyWritten.into());
        }
        self.written = Some((dataset.clone(), *options));
        Ok(())
    }
}

/// Adapts a [`SeriesStore`] to the remapper for one date range.
///
/// Store failures are reported as remap-stage collaborator errors and any timestamps the
/// store returns outside the range are dropped.
pub(crate) struct RangedSeries<'a, S> {
    store: &'a mut S,
    start: Timestamp,
    end: Timestamp,
}

impl<'a, S: SeriesStore> RangedSeries<'a, S> {
    pub(crate) fn new(store: &'a mut S, start: Timestamp, end: Timestamp) -> Self {
        Self { store, start, end }
    }
}

impl<S: SeriesStore> SeriesSource for RangedSeries<'_, S> {
    fn load(&mut self, catchment: i32) -> RemapResult<CatchmentSeries> {
        let series = self
            .store
            .read_series(catchment, self.start, self.end)
            .map_err(|e| RemapError::collaborator(Stage::Remap, e))?;
        Ok(series.trimmed(self.start, self.end))
    }

    fn time_axis(&mut self, catchment: i32) -> RemapResult<Vec<Timestamp>> {
        let times = self
            .store
            .read_time_axis(catchment, self.start, self.end)
            .map_err(|e| RemapError::collaborator(Stage::Remap, e))?;
        Ok(times
            .into_iter()
            .filter(|t| *t >= self.start && *t <= self.end)
            .collect())
    }
}
