use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};

use crate::crs::crs_utils::Crs;

/// A single attribute value of a feature. Mirrors the field types a shapefile layer can carry through GDAL,
/// plus the naive timestamp that date normalization produces.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Null,
    String(String),
    Integer(i64),
    Real(f64),
    Date(NaiveDate),
    DateTime(DateTime<FixedOffset>),
    NaiveDateTime(NaiveDateTime),
}

impl AttributeValue {
    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;
        match self {
            AttributeValue::Null => Value::Null,
            AttributeValue::String(value) => Value::String(value.clone()),
            AttributeValue::Integer(value) => Value::from(*value),
            // NaN and infinities have no JSON representation.
            AttributeValue::Real(value) => serde_json::Number::from_f64(*value)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            AttributeValue::Date(value) => Value::String(value.format("%Y-%m-%d").to_string()),
            AttributeValue::DateTime(value) => Value::String(value.to_rfc3339()),
            AttributeValue::NaiveDateTime(value) => {
                Value::String(value.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
            }
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_string())
    }
}

pub type FeatureMap = HashMap<String, AttributeValue>;

#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub geometry: Option<geo::Geometry>,
    pub attributes: FeatureMap,
}

impl Feature {
    /// Value of the attribute `name`, treating an explicit null the same as a missing key.
    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name).filter(|value| !value.is_null())
    }
}

impl From<geo::Geometry> for Feature {
    fn from(value: geo::Geometry) -> Self {
        Self {
            geometry: Some(value),
            attributes: FeatureMap::new(),
        }
    }
}

/// Features read from a single layer together with the layer's field names and CRS.
///
/// `field_names` is the schema of the source layer. It is kept separately from the per-feature attributes
/// because a column can exist even if every value in it is null.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
    pub field_names: Vec<String>,
    pub crs: Crs,
}

impl FeatureCollection {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field_names.iter().any(|field_name| field_name == name)
    }

    /// New collection with the same schema and CRS but only the features for which `predicate` holds.
    pub fn filtered<P: FnMut(&Feature) -> bool>(self, mut predicate: P) -> Self {
        Self {
            features: self
                .features
                .into_iter()
                .filter(|feature| predicate(feature))
                .collect(),
            ..self
        }
    }
}
