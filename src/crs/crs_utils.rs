use anyhow::anyhow;
use proj::Transform;

use crate::errors::Result;
use crate::geofile::feature::FeatureCollection;

pub type EpsgCode = u32;

pub const WGS84_EPSG_CODE: EpsgCode = 4326;

/// Coordinate reference system of a feature collection, in a form PROJ accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum Crs {
    Epsg(EpsgCode),
    /// WKT or PROJ string for reference systems without an EPSG authority code.
    Definition(String),
}

impl Crs {
    pub fn wgs84() -> Self {
        Crs::Epsg(WGS84_EPSG_CODE)
    }

    pub fn is_wgs84(&self) -> bool {
        *self == Crs::Epsg(WGS84_EPSG_CODE)
    }

    pub fn proj_definition(&self) -> String {
        match self {
            Crs::Epsg(code) => epsg_code_to_authority_string(*code),
            Crs::Definition(definition) => definition.clone(),
        }
    }
}

pub fn epsg_code_to_authority_string(code: EpsgCode) -> String {
    format!("EPSG:{}", code)
}

/// Determine the CRS of a GDAL spatial reference. An EPSG code is preferred; GDAL is asked to identify one
/// if the source (e.g. an ESRI .prj file) does not carry an authority. Otherwise falls back to WKT.
pub fn crs_from_spatial_ref(spatial_ref: &mut gdal::spatial_ref::SpatialRef) -> anyhow::Result<Crs> {
    if let Err(err) = spatial_ref.auto_identify_epsg() {
        log::debug!("Could not identify an EPSG code for spatial ref, {}", err);
    }
    match (spatial_ref.auth_name(), spatial_ref.auth_code()) {
        (Ok(auth_name), Ok(auth_code)) if auth_name == "EPSG" => Ok(Crs::Epsg(
            EpsgCode::try_from(auth_code).map_err(|_| anyhow!("Invalid EPSG code {}", auth_code))?,
        )),
        _ => Ok(Crs::Definition(spatial_ref.to_wkt()?)),
    }
}

/// Project all geometries of a collection into EPSG:4326. Collections already in EPSG:4326 are returned as is.
pub fn project_collection_to_wgs84(collection: FeatureCollection) -> Result<FeatureCollection> {
    if collection.crs.is_wgs84() {
        return Ok(collection);
    }
    log::info!(
        "Projecting {} features to {}",
        collection.len(),
        epsg_code_to_authority_string(WGS84_EPSG_CODE)
    );
    // new_known_crs normalizes the axis order to lon/lat.
    let projection = proj::Proj::new_known_crs(
        &collection.crs.proj_definition(),
        &epsg_code_to_authority_string(WGS84_EPSG_CODE),
        None,
    )?;

    let mut features = collection.features;
    for feature in features.iter_mut() {
        if let Some(geometry) = feature.geometry.as_mut() {
            geometry.transform(&projection)?;
        }
    }
    Ok(FeatureCollection {
        features,
        field_names: collection.field_names,
        crs: Crs::wgs84(),
    })
}
