use anyhow::Context;
use std::{fs, path::PathBuf};

use crate::{
    errors::{PerimeterError, Result},
    geofile::{feature::FeatureCollection, geojson::feature_collection_to_geojson_string},
};

/// Destination of the selected perimeters. Implementations overwrite whatever a previous run published.
pub trait Publisher {
    /// Human readable destination, used for logging.
    fn destination(&self) -> String;

    fn publish_geojson(&self, geojson: String) -> Result<()>;

    fn publish(&self, collection: &FeatureCollection) -> Result<()> {
        let geojson = feature_collection_to_geojson_string(collection);
        log::info!(
            "Publishing {} features ({} bytes) to {}",
            collection.len(),
            geojson.len(),
            self.destination()
        );
        self.publish_geojson(geojson)
    }
}

/// Writes the GeoJSON to a local file.
pub struct FilePublisher {
    pub filepath: PathBuf,
}

impl Publisher for FilePublisher {
    fn destination(&self) -> String {
        format!("{:?}", self.filepath)
    }

    fn publish_geojson(&self, geojson: String) -> Result<()> {
        fs::write(&self.filepath, geojson)
            .with_context(|| format!("Could not write GeoJSON to {:?}", self.filepath))
            .map_err(PerimeterError::PublishError)
    }
}
