//! SMAP-HydroBlocks gridding.
//!
//! Validates a [`config::RemapConfig`], reads catchment/HRU rasters and per-catchment HRU
//! series through the [`io`] traits, remaps them onto a lon/lat grid with `smaphb-core`,
//! resamples in time and hands the result to a [`io::DatasetSink`].

pub mod config;
pub mod io;
pub mod pipeline;

pub use smaphb_core;
