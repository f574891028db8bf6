//! Catchment/HRU membership index over a pair of clipped categorical rasters.
//!
//! The index owns the catchment and HRU rasters for the lifetime of one remap and answers
//! membership queries lazily: masks are only built for the (catchment, HRU) pairs that are
//! actually asked for, never for the full id space.
//!
//! Masks are disjoint by construction. A cell holds exactly one catchment id and one HRU id,
//! so two distinct catchments (or two distinct HRUs of one catchment) can never claim it.

use crate::bbox::BoundingBox;
use crate::errors::{RemapError, RemapResult};
use crate::raster::{CategoricalRaster, NODATA_ID};
use ndarray::{Array1, Array2, Zip};
use std::collections::BTreeSet;

/// Boolean `[lat, lon]` membership grid.
pub type Mask = Array2<bool>;

#[derive(Debug, Clone)]
pub struct SpatialIndex {
    catchments: CategoricalRaster,
    hrus: CategoricalRaster,
    unique_catchments: Vec<i32>,
}

impl SpatialIndex {
    /// Build the index from two co-registered rasters that are already clipped.
    ///
    /// Fails with [`RemapError::Configuration`] if the rasters are not co-registered or if
    /// either axis is empty, and with [`RemapError::NoData`] if no catchment other than
    /// [`NODATA_ID`] is present.
    pub fn new(
        catchments: CategoricalRaster,
        hrus: CategoricalRaster,
        bbox: &BoundingBox,
    ) -> RemapResult<Self> {
        if catchments.lons().is_empty() || catchments.lats().is_empty() {
            return Err(RemapError::Configuration(format!(
                "bounding box {bbox} selects {} longitudes and {} latitudes",
                catchments.lons().len(),
                catchments.lats().len()
            )));
        }
        if !catchments.is_coregistered_with(&hrus) {
            return Err(RemapError::Configuration(
                "catchment and HRU rasters are not co-registered".to_string(),
            ));
        }

        let unique_catchments: Vec<i32> = catchments
            .values()
            .iter()
            .copied()
            .filter(|id| *id != NODATA_ID)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if unique_catchments.is_empty() {
            return Err(RemapError::NoData {
                bbox: bbox.to_string(),
            });
        }

        Ok(Self {
            catchments,
            hrus,
            unique_catchments,
        })
    }

    /// Convenience for clipping full-extent rasters and building the index in one step.
    pub fn from_full_extent(
        catchments: &CategoricalRaster,
        hrus: &CategoricalRaster,
        bbox: &BoundingBox,
    ) -> RemapResult<Self> {
        Self::new(catchments.clip(bbox), hrus.clip(bbox), bbox)
    }

    /// Distinct catchment ids in ascending order, sentinel excluded.
    pub fn unique_catchments(&self) -> &[i32] {
        &self.unique_catchments
    }

    pub fn lons(&self) -> &Array1<f64> {
        self.catchments.lons()
    }

    pub fn lats(&self) -> &Array1<f64> {
        self.catchments.lats()
    }

    /// Grid shape as `(lat, lon)`.
    pub fn dim(&self) -> (usize, usize) {
        self.catchments.dim()
    }

    /// Cells belonging to `catchment_id`.
    pub fn catchment_mask(&self, catchment_id: i32) -> Mask {
        self.catchments.values().mapv(|id| id == catchment_id)
    }

    /// Cells belonging to `hru_id` inside an already computed catchment mask.
    pub fn hru_mask_within(&self, catchment_mask: &Mask, hru_id: i32) -> Mask {
        Zip::from(catchment_mask)
            .and(self.hrus.values())
            .map_collect(|in_catchment, hru| *in_catchment && *hru == hru_id)
    }

    /// Cells where the catchment raster equals `catchment_id` and the HRU raster equals `hru_id`.
    pub fn mask(&self, catchment_id: i32, hru_id: i32) -> Mask {
        Zip::from(self.catchments.values())
            .and(self.hrus.values())
            .map_collect(|catchment, hru| *catchment == catchment_id && *hru == hru_id)
    }
}

/// `(lat, lon)` indices of the set cells of a mask, in row-major order.
pub fn mask_cells(mask: &Mask) -> Vec<(usize, usize)> {
    mask.indexed_iter()
        .filter(|(_, set)| **set)
        .map(|(idx, _)| idx)
        .collect()
}
