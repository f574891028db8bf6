use std::fmt;

use thiserror::Error;

/// Boxed error raised by an external collaborator (raster reader, series store, writer).
pub type CollaboratorError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Pipeline stage an error originated from.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Request validation, raster loading and building the spatial index
    IndexBuilding,
    /// Loading catchment series and scattering them onto the grid
    Remap,
    /// Sentinel conversion and temporal resampling
    Aggregation,
    /// Handing the gridded dataset to the writer
    Write,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::IndexBuilding => "index building",
            Stage::Remap => "remap",
            Stage::Aggregation => "aggregation",
            Stage::Write => "write",
        };
        f.write_str(name)
    }
}

/// Error type for invalid remapping operations.
#[derive(Error, Debug)]
pub enum RemapError {
    #[error("Invalid configuration: {0}")]
    Configuration(String),
    #[error("No catchments found inside bounding box {bbox}")]
    NoData { bbox: String },
    #[error("Time axis of catchment {catchment} has {found} steps, expected {expected}")]
    ShapeMismatch {
        catchment: i32,
        expected: usize,
        found: usize,
    },
    #[error("Time axis of catchment {catchment} differs from the canonical axis at step {index}")]
    TimeAxisMismatch { catchment: i32, index: usize },
    #[error("Invalid series for catchment {catchment}: {reason}")]
    InvalidSeries { catchment: i32, reason: String },
    #[error("Invalid gridded series: {reason}")]
    InvalidGrid { reason: String },
    #[error("{stage} failed: {source}")]
    Collaborator {
        stage: Stage,
        #[source]
        source: CollaboratorError,
    },
}

impl RemapError {
    /// Wrap an error raised by an external collaborator during `stage`.
    pub fn collaborator(stage: Stage, source: impl Into<CollaboratorError>) -> Self {
        RemapError::Collaborator {
            stage,
            source: source.into(),
        }
    }

    /// The pipeline stage this error belongs to.
    pub fn stage(&self) -> Stage {
        match self {
            RemapError::Configuration(_) | RemapError::NoData { .. } => Stage::IndexBuilding,
            RemapError::ShapeMismatch { .. }
            | RemapError::TimeAxisMismatch { .. }
            | RemapError::InvalidSeries { .. } => Stage::Remap,
            RemapError::InvalidGrid { .. } => Stage::Aggregation,
            RemapError::Collaborator { stage, .. } => *stage,
        }
    }
}

/// Convenience type for `Result<T, RemapError>`.
pub type RemapResult<T> = Result<T, RemapError>;
