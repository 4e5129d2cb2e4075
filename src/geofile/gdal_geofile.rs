use anyhow::{anyhow, Context};
use gdal::vector::{FieldValue, LayerAccess};
use std::path::{Path, PathBuf};

use crate::crs::crs_utils::crs_from_spatial_ref;

use super::feature::{AttributeValue, Feature, FeatureCollection, FeatureMap};

/// Path through GDAL's virtual zip file system, which lets a zipped shapefile be opened without unpacking it.
pub fn vsizip_path(archive_filepath: &Path) -> PathBuf {
    PathBuf::from(format!("/vsizip/{}", archive_filepath.display()))
}

pub fn read_features_from_geofile(filepath: &Path) -> anyhow::Result<FeatureCollection> {
    gdal::DriverManager::register_all();
    let open_options = gdal::DatasetOptions {
        open_flags: gdal::GdalOpenFlags::GDAL_OF_VECTOR,
        ..Default::default()
    };
    let dataset = gdal::Dataset::open_ex(filepath, open_options)
        .with_context(|| format!("Opening geofile {:?}", filepath))?;

    let layer_count = dataset.layer_count();
    if 0 == layer_count || 1 < layer_count {
        return Err(anyhow!(
            "Found {} layers, only one layer is supported.",
            layer_count
        ));
    }
    let mut layer = dataset.layer(0)?;

    let mut spatial_ref = layer
        .spatial_ref()
        .ok_or_else(|| anyhow!("Layer of {:?} has no spatial reference", filepath))?;
    let crs = crs_from_spatial_ref(&mut spatial_ref)?;

    let field_names: Vec<String> = layer.defn().fields().map(|field| field.name()).collect();

    let mut features = Vec::new();
    for gdal_feature in layer.features() {
        let geometry = match gdal_feature.geometry() {
            Some(gdal_geometry) => {
                let wkb = gdal_geometry.wkb()?;
                let geometry = wkb::wkb_to_geom(&mut wkb.as_slice())
                    .map_err(|err| anyhow!("Could not read geometry from WKB, {:?}", err))?;
                Some(geometry)
            }
            None => None,
        };

        let attributes = read_attributes(&gdal_feature, &field_names)?;

        features.push(Feature {
            geometry,
            attributes,
        });
    }
    log::info!("Read {} features from {:?}", features.len(), filepath);

    Ok(FeatureCollection {
        features,
        field_names,
        crs,
    })
}

/// Reads every schema field of `feature`. A field that GDAL cannot convert is an error rather than a missing
/// attribute.
fn read_attributes(
    feature: &gdal::vector::Feature,
    field_names: &[String],
) -> anyhow::Result<FeatureMap> {
    let mut attributes = FeatureMap::with_capacity(field_names.len());
    for field_name in field_names {
        let value = feature.field(field_name).with_context(|| {
            format!(
                "Reading field {} of feature {:?}",
                field_name,
                feature.fid()
            )
        })?;
        attributes.insert(field_name.clone(), attribute_value_from_field(value));
    }
    Ok(attributes)
}

fn attribute_value_from_field(value: Option<FieldValue>) -> AttributeValue {
    match value {
        None => AttributeValue::Null,
        Some(FieldValue::StringValue(value)) => AttributeValue::String(value),
        Some(FieldValue::IntegerValue(value)) => AttributeValue::Integer(value as i64),
        Some(FieldValue::Integer64Value(value)) => AttributeValue::Integer(value),
        Some(FieldValue::RealValue(value)) => AttributeValue::Real(value),
        Some(FieldValue::DateValue(value)) => AttributeValue::Date(value),
        Some(FieldValue::DateTimeValue(value)) => AttributeValue::DateTime(value),
        // Shapefiles have no list fields.
        Some(other) => {
            log::debug!("Ignoring unsupported field value {:?}", other);
            AttributeValue::Null
        }
    }
}
