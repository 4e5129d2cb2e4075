use serde::Deserialize;

use crate::errors::{invalid_parameter, Result};

/// Axis aligned lon/lat rectangle in EPSG:4326, in degrees.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct WgsBoundingBox {
    pub left_lon: f64,
    pub right_lon: f64,
    pub bottom_lat: f64,
    pub top_lat: f64,
}

impl WgsBoundingBox {
    /// Covers most of California, Oregon and Washington.
    pub fn west_coast() -> Self {
        Self {
            left_lon: -125.59,
            right_lon: -114.43,
            bottom_lat: 32.27,
            top_lat: 49.14,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let bounds = [self.left_lon, self.right_lon, self.bottom_lat, self.top_lat];
        if !bounds.iter().all(|bound| bound.is_finite()) {
            return Err(invalid_parameter(format!(
                "bounding box {:?} has a bound that is not a finite number",
                self
            )));
        }
        if self.left_lon > self.right_lon || self.bottom_lat > self.top_lat {
            return Err(invalid_parameter(format!(
                "bounding box {:?} has its minimum above its maximum",
                self
            )));
        }
        Ok(())
    }

    pub fn to_polygon(&self) -> geo::Polygon {
        geo::Rect::new(
            (self.left_lon, self.bottom_lat),
            (self.right_lon, self.top_lat),
        )
        .to_polygon()
    }
}

impl Default for WgsBoundingBox {
    fn default() -> Self {
        Self::west_coast()
    }
}
