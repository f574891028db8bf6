//! Geographic bounding box used to clip the categorical rasters.

use crate::errors::{RemapError, RemapResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Axis-aligned lon/lat bounding box (degrees).
///
/// Both axes are inclusive: a coordinate equal to a bound is inside the box.
///
/// # Examples
///
/// ```rust
/// use smaphb_core::bbox::BoundingBox;
///
/// let bbox = BoundingBox::new(-75.0, -74.0, 40.0, 41.0).unwrap();
/// assert!(bbox.contains_lon(-74.0));
/// assert!(!bbox.contains_lat(41.5));
/// assert!(BoundingBox::new(-74.0, -75.0, 40.0, 41.0).is_err());
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub max_lon: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// Create a bounding box, checking that `min < max` on both axes.
    pub fn new(min_lon: f64, max_lon: f64, min_lat: f64, max_lat: f64) -> RemapResult<Self> {
        let bbox = Self {
            min_lon,
            max_lon,
            min_lat,
            max_lat,
        };
        bbox.validate()?;
        Ok(bbox)
    }

    /// Check the axis ordering of a (possibly deserialised) bounding box.
    pub fn validate(&self) -> RemapResult<()> {
        let finite = [self.min_lon, self.max_lon, self.min_lat, self.max_lat]
            .iter()
            .all(|v| v.is_finite());
        if !finite {
            return Err(RemapError::Configuration(format!(
                "bounding box {self} has non-finite bounds"
            )));
        }
        if self.min_lon >= self.max_lon {
            return Err(RemapError::Configuration(format!(
                "bounding box min_lon ({}) must be smaller than max_lon ({})",
                self.min_lon, self.max_lon
            )));
        }
        if self.min_lat >= self.max_lat {
            return Err(RemapError::Configuration(format!(
                "bounding box min_lat ({}) must be smaller than max_lat ({})",
                self.min_lat, self.max_lat
            )));
        }
        Ok(())
    }

    pub fn contains_lon(&self, lon: f64) -> bool {
        lon >= self.min_lon && lon <= self.max_lon
    }

    pub fn contains_lat(&self, lat: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[lon {}..{}, lat {}..{}]",
            self.min_lon, self.max_lon, self.min_lat, self.max_lat
        )
    }
}
