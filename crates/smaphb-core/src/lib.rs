//! Remapping engine for HRU-based soil moisture.
//!
//! Turns per-HRU catchment time series into a dense `time × lat × lon` grid and
//! optionally resamples it in time:
//!
//! - [`spatial_index`]: catchment/HRU membership masks over the clipped rasters
//! - [`remap`]: scatter of HRU series into their cells
//! - [`aggregate`]: missing-aware temporal mean per calendar bucket

pub mod aggregate;
pub mod bbox;
pub mod dataset;
pub mod errors;
pub mod grid;
pub mod raster;
pub mod remap;
pub mod spatial_index;
pub mod timeseries;
