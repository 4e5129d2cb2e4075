use super::feature::{Feature, FeatureCollection};

pub const GEOJSON_CONTENT_TYPE: &str = "application/geo+json";

/// Attribute used as the GeoJSON feature id when present.
const ID_FIELD: &str = "GlobalID";

fn to_geojson_feature(feature: &Feature) -> geojson::Feature {
    let properties: geojson::JsonObject = feature
        .attributes
        .iter()
        .map(|(key, value)| (key.clone(), value.to_json()))
        .collect();
    let id = feature
        .attribute(ID_FIELD)
        .and_then(|value| value.as_str())
        .map(|id| geojson::feature::Id::String(id.to_string()));

    geojson::Feature {
        bbox: None,
        geometry: feature
            .geometry
            .as_ref()
            .map(|geometry| geojson::Geometry::new(geojson::Value::from(geometry))),
        id,
        properties: Some(properties),
        foreign_members: None,
    }
}

pub fn feature_collection_to_geojson_string(collection: &FeatureCollection) -> String {
    let feature_collection: geojson::FeatureCollection =
        collection.features.iter().map(to_geojson_feature).collect();
    geojson::GeoJson::from(feature_collection).to_string()
}
