use anyhow::{anyhow, Context};
use serde::Deserialize;
use std::{
    path::{Path, PathBuf},
    sync::atomic::{AtomicUsize, Ordering},
};

use crate::{
    errors::{PerimeterError, Result},
    geofile::{
        feature::FeatureCollection,
        gdal_geofile::{read_features_from_geofile, vsizip_path},
    },
};

/// Current wildfire perimeters from the NIFC open data portal, as a zipped shapefile.
/// See https://data-nifc.opendata.arcgis.com/datasets/wildfire-perimeters
pub const NIFC_PERIMETERS_URL: &str =
    "https://opendata.arcgis.com/datasets/5da472c6d27b4b67970acc7b5044c862_0.zip";

static MEM_ARCHIVE_COUNT: AtomicUsize = AtomicUsize::new(0);

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub enum Source {
    /// Download the archive on every run.
    Url { url: String },
    /// A previously downloaded archive or any other vector file GDAL can read.
    Geofile { filepath: PathBuf },
}

impl Default for Source {
    fn default() -> Self {
        Source::Url {
            url: NIFC_PERIMETERS_URL.to_string(),
        }
    }
}

pub fn download_perimeter_archive(url: &str) -> anyhow::Result<Vec<u8>> {
    log::info!("Downloading perimeters from {}", url);
    let client = reqwest::blocking::Client::builder()
        .user_agent("wildfire-perimeters")
        .build()?;
    let response = client.get(url).send()?.error_for_status()?;
    let bytes = response.bytes().context("Reading response body")?;
    log::info!("Downloaded {} bytes", bytes.len());
    Ok(bytes.to_vec())
}

/// Unique per process and call, so concurrent reads never share a GDAL memory file.
fn mem_archive_path() -> PathBuf {
    PathBuf::from(format!(
        "/vsimem/perimeters_{}_{}.zip",
        std::process::id(),
        MEM_ARCHIVE_COUNT.fetch_add(1, Ordering::Relaxed)
    ))
}

/// Decode a zipped perimeter archive held in memory. Nothing is written to disk.
pub fn read_perimeter_archive(archive: Vec<u8>) -> anyhow::Result<FeatureCollection> {
    let mem_filepath = mem_archive_path();
    gdal::vsi::create_mem_file(&mem_filepath, archive)
        .with_context(|| format!("Creating memory file {:?}", mem_filepath))?;
    let collection = read_features_from_geofile(&vsizip_path(&mem_filepath));
    if let Err(err) = gdal::vsi::unlink_mem_file(&mem_filepath) {
        log::warn!("Could not release memory file {:?}: {}", mem_filepath, err);
    }
    collection
}

fn is_zip_archive(filepath: &Path) -> bool {
    filepath
        .extension()
        .and_then(|extension| extension.to_str())
        .map_or(false, |extension| extension.eq_ignore_ascii_case("zip"))
}

fn read_perimeters(filepath: &Path) -> anyhow::Result<FeatureCollection> {
    if !filepath.exists() {
        return Err(anyhow!("Perimeter file {:?} not found", filepath));
    }
    if is_zip_archive(filepath) {
        read_features_from_geofile(&vsizip_path(filepath))
    } else {
        read_features_from_geofile(filepath)
    }
}

/// Fetch the perimeter dataset from `source`. A downloaded archive is only held in memory.
pub fn fetch_perimeters(source: &Source) -> Result<FeatureCollection> {
    match source {
        Source::Url { url } => download_perimeter_archive(url).and_then(read_perimeter_archive),
        Source::Geofile { filepath } => read_perimeters(filepath),
    }
    .map_err(PerimeterError::FetchError)
}
