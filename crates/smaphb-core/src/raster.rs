//! Categorical (integer id) rasters on a regular lon/lat grid.

use crate::bbox::BoundingBox;
use crate::errors::{RemapError, RemapResult};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Reserved identifier for raster cells without a catchment/HRU.
pub const NODATA_ID: i32 = -9999;

/// Which categorical layer a raster holds.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RasterLayer {
    Catchments,
    Hrus,
}

/// Integer id grid indexed `[lat, lon]` together with its coordinate axes.
///
/// Latitudes are usually stored north to south, as in GeoTIFF rasters. Nothing here
/// depends on that ordering; it is carried through to the output grid unchanged.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategoricalRaster {
    values: Array2<i32>,
    lons: Array1<f64>,
    lats: Array1<f64>,
}

impl CategoricalRaster {
    pub fn new(values: Array2<i32>, lons: Array1<f64>, lats: Array1<f64>) -> RemapResult<Self> {
        if values.dim() != (lats.len(), lons.len()) {
            return Err(RemapError::Configuration(format!(
                "raster shape {:?} does not match coordinates ({} lat, {} lon)",
                values.dim(),
                lats.len(),
                lons.len()
            )));
        }
        Ok(Self { values, lons, lats })
    }

    pub fn values(&self) -> &Array2<i32> {
        &self.values
    }

    pub fn lons(&self) -> &Array1<f64> {
        &self.lons
    }

    pub fn lats(&self) -> &Array1<f64> {
        &self.lats
    }

    /// Number of cells as `(lat, lon)`.
    pub fn dim(&self) -> (usize, usize) {
        self.values.dim()
    }

    /// Restrict the raster to the cells whose coordinates fall inside `bbox`.
    ///
    /// The order of the retained coordinates is preserved. The result may be empty
    /// along either axis; callers decide whether that is an error.
    pub fn clip(&self, bbox: &BoundingBox) -> CategoricalRaster {
        let lon_idx: Vec<usize> = self
            .lons
            .iter()
            .enumerate()
            .filter(|(_, lon)| bbox.contains_lon(**lon))
            .map(|(i, _)| i)
            .collect();
        let lat_idx: Vec<usize> = self
            .lats
            .iter()
            .enumerate()
            .filter(|(_, lat)| bbox.contains_lat(**lat))
            .map(|(i, _)| i)
            .collect();

        CategoricalRaster {
            values: self
                .values
                .select(Axis(0), &lat_idx)
                .select(Axis(1), &lon_idx),
            lons: self.lons.select(Axis(0), &lon_idx),
            lats: self.lats.select(Axis(0), &lat_idx),
        }
    }

    /// True if both rasters share the same coordinate axes cell for cell.
    pub fn is_coregistered_with(&self, other: &CategoricalRaster) -> bool {
        self.lons == other.lons && self.lats == other.lats
    }
}
