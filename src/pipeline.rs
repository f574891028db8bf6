//! End-to-end remap: rasters → spatial index → remap → aggregation → writer.
//!
//! Each stage runs to completion before the next starts and any failure aborts the run;
//! nothing is written unless every stage succeeded. Errors carry the stage they came from
//! (see [`RemapError::stage`]).

use crate::config::{RemapConfig, RemapRequest};
use crate::io::{DatasetSink, RangedSeries, RasterSource, SeriesStore};
use smaphb_core::aggregate::aggregate;
use smaphb_core::dataset::GriddedDataset;
use smaphb_core::errors::{RemapError, RemapResult, Stage};
use smaphb_core::raster::RasterLayer;
use smaphb_core::remap::GridRemapper;
use smaphb_core::spatial_index::SpatialIndex;
use tracing::{error, info};

/// Shape of a completed remap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemapSummary {
    pub catchments: usize,
    pub time_steps: usize,
    pub lat: usize,
    pub lon: usize,
    /// Cells without a value at any output time step
    pub missing_cells: usize,
}

#[derive(Debug, Clone)]
pub struct RemapPipeline {
    request: RemapRequest,
}

impl RemapPipeline {
    pub fn new(request: RemapRequest) -> Self {
        Self { request }
    }

    /// Validate `config` and build a pipeline from it.
    pub fn from_config(config: &RemapConfig) -> RemapResult<Self> {
        Ok(Self::new(config.validate()?))
    }

    pub fn request(&self) -> &RemapRequest {
        &self.request
    }

    /// Build the spatial index from the clipped catchment and HRU rasters.
    pub fn build_index<R: RasterSource>(&self, rasters: &R) -> RemapResult<SpatialIndex> {
        let bbox = &self.request.bbox;
        let read = |layer: RasterLayer| {
            rasters
                .read_categorical_raster(layer, bbox)
                .map_err(|e| RemapError::collaborator(Stage::IndexBuilding, e))
        };
        let catchments = read(RasterLayer::Catchments)?;
        let hrus = read(RasterLayer::Hrus)?;
        let index = SpatialIndex::new(catchments, hrus, bbox)?;
        info!(
            bbox = %bbox,
            catchments = index.unique_catchments().len(),
            "Built spatial index"
        );
        Ok(index)
    }

    /// Run every stage except writing and return the final dataset.
    pub fn produce<R: RasterSource, S: SeriesStore>(
        &self,
        rasters: &R,
        store: &mut S,
    ) -> RemapResult<(GriddedDataset, RemapSummary)> {
        let index = self.build_index(rasters)?;

        let mut source = RangedSeries::new(store, self.request.start, self.request.end);
        let grid = GridRemapper::new(&index).remap(&mut source)?;

        let grid = aggregate(grid, self.request.cadence, &self.request.aggregate)?;
        let (time_steps, lat, lon) = grid.values.dim();
        let summary = RemapSummary {
            catchments: index.unique_catchments().len(),
            time_steps,
            lat,
            lon,
            missing_cells: grid.missing_cells(),
        };
        info!(
            cadence = %self.request.cadence,
            time_steps,
            missing_cells = summary.missing_cells,
            "Aggregated grid"
        );

        Ok((
            GriddedDataset::soil_moisture(grid, self.request.metadata.clone()),
            summary,
        ))
    }

    /// Run the whole pipeline and hand the dataset to `sink`.
    pub fn run<R: RasterSource, S: SeriesStore, W: DatasetSink>(
        &self,
        rasters: &R,
        store: &mut S,
        sink: &mut W,
    ) -> RemapResult<RemapSummary> {
        let result = self.produce(rasters, store).and_then(|(dataset, summary)| {
            sink.write(&dataset, &self.request.write)
                .map_err(|e| RemapError::collaborator(Stage::Write, e))?;
            info!(
                variable = %dataset.name,
                compression = self.request.write.compression.level(),
                "Wrote gridded dataset"
            );
            Ok(summary)
        });
        if let Err(e) = &result {
            error!(stage = %e.stage(), error = %e, "Remap failed");
        }
        result
    }
}

/// Validate `config` and run the full pipeline.
pub fn run<R: RasterSource, S: SeriesStore, W: DatasetSink>(
    config: &RemapConfig,
    rasters: &R,
    store: &mut S,
    sink: &mut W,
) -> RemapResult<RemapSummary> {
    RemapPipeline::from_config(config)?.run(rasters, store, sink)
}
