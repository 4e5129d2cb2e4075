use serde::Deserialize;

use crate::errors::{data_shape, Result};
use crate::geofile::feature::{AttributeValue, Feature, FeatureCollection, FeatureMap};

/// One attribute of the published output.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct OutputField {
    /// Field name in the source dataset.
    pub source: String,
    /// Name in the output, defaults to `source`.
    #[serde(default)]
    pub name: Option<String>,
    /// Convert string values from e.g. "CREEK FIRE" to "Creek Fire".
    #[serde(default)]
    pub title_case: bool,
}

impl OutputField {
    pub fn output_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.source)
    }
}

/// Capitalize the first letter of every word and lowercase the rest. A word starts after any character that
/// is not a letter, so "O'BRIEN-2" becomes "O'Brien-2".
pub fn title_case(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut previous_is_letter = false;
    for character in text.chars() {
        if character.is_alphabetic() {
            if previous_is_letter {
                result.extend(character.to_lowercase());
            } else {
                result.extend(character.to_uppercase());
            }
            previous_is_letter = true;
        } else {
            result.push(character);
            previous_is_letter = false;
        }
    }
    result
}

/// Reduce every feature's attributes to `output_fields`, renamed and optionally title cased.
pub fn project_fields(
    collection: FeatureCollection,
    output_fields: &[OutputField],
) -> Result<FeatureCollection> {
    if let Some(missing) = output_fields
        .iter()
        .find(|field| !collection.has_field(&field.source))
    {
        return Err(data_shape(format!(
            "output field '{}' does not exist in the dataset",
            missing.source
        )));
    }

    let features = collection
        .features
        .into_iter()
        .map(|mut feature| {
            let attributes: FeatureMap = output_fields
                .iter()
                .map(|field| {
                    let value = match feature.attributes.remove(&field.source) {
                        Some(AttributeValue::String(text)) if field.title_case => {
                            AttributeValue::String(title_case(&text))
                        }
                        Some(value) => value,
                        None => AttributeValue::Null,
                    };
                    (field.output_name().to_string(), value)
                })
                .collect();
            Feature {
                geometry: feature.geometry,
                attributes,
            }
        })
        .collect();

    Ok(FeatureCollection {
        features,
        field_names: output_fields
            .iter()
            .map(|field| field.output_name().to_string())
            .collect(),
        crs: collection.crs,
    })
}
