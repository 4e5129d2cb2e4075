use std::collections::{hash_map::Entry, HashMap, HashSet};

use chrono::{Duration, NaiveDateTime};
use geo::Intersects;

use crate::{
    crs::{crs_utils::project_collection_to_wgs84, wgs_bounding_box::WgsBoundingBox},
    errors::{data_shape, invalid_parameter, Result},
    geofile::feature::{AttributeValue, Feature, FeatureCollection},
};

use super::{
    fields::{project_fields, OutputField},
    timestamp::normalize_timestamp,
};

pub const IRWIN_ID_FIELD: &str = "IRWINID";
pub const DATE_CURRENT_FIELD: &str = "DateCurren";
pub const GLOBAL_ID_FIELD: &str = "GlobalID";

pub const DEFAULT_N_DAYS: i64 = 30;

#[derive(Debug, Clone)]
pub struct SelectionParams {
    /// Reference time the window is measured back from.
    pub as_of: NaiveDateTime,
    /// Size of the window in days, must not be negative.
    pub n_days: i64,
    pub bounding_box: WgsBoundingBox,
    /// Keep only the most recent perimeter of each fire.
    pub deduplicate: bool,
    /// Attributes to publish. All attributes are kept if not set.
    pub output_fields: Option<Vec<OutputField>>,
}

impl SelectionParams {
    pub fn new(as_of: NaiveDateTime) -> Self {
        Self {
            as_of,
            n_days: DEFAULT_N_DAYS,
            bounding_box: WgsBoundingBox::default(),
            deduplicate: true,
            output_fields: None,
        }
    }

    /// Oldest `DateCurren` that is still selected.
    pub fn cutoff(&self) -> NaiveDateTime {
        Duration::try_days(self.n_days)
            .and_then(|window| self.as_of.checked_sub_signed(window))
            .unwrap_or(NaiveDateTime::MIN)
    }
}

/// Select the current, identified fire perimeters inside the bounding box.
///
/// The stages run in this order, each consuming the result of the previous one:
/// 1. drop features without geometry
/// 2. drop features without an IRWIN id
/// 3. normalize `DateCurren` and drop features older than `n_days` before `as_of`
/// 4. project to EPSG:4326
/// 5. drop features that do not intersect the bounding box
/// 6. if enabled, keep only the most recent feature per IRWIN id
/// 7. if configured, project the attributes to the output fields
pub fn select_current_perimeters(
    collection: FeatureCollection,
    params: &SelectionParams,
) -> Result<FeatureCollection> {
    if params.n_days < 0 {
        return Err(invalid_parameter(format!(
            "n_days must not be negative, got {}",
            params.n_days
        )));
    }
    params.bounding_box.validate()?;
    for field in [IRWIN_ID_FIELD, DATE_CURRENT_FIELD] {
        if !collection.has_field(field) {
            return Err(data_shape(format!(
                "dataset has no '{}' field, found {:?}",
                field, collection.field_names
            )));
        }
    }
    log::info!("Selecting perimeters from {} features", collection.len());

    let collection = collection.filtered(|feature| feature.geometry.is_some());
    log::info!("{} features have a geometry", collection.len());

    let collection = collection.filtered(|feature| feature.attribute(IRWIN_ID_FIELD).is_some());
    log::info!("{} features have an IRWIN id", collection.len());

    let cutoff = params.cutoff();
    let collection = normalize_dates(collection)?.filtered(|feature| {
        date_current(feature).map_or(false, |date_current| date_current >= cutoff)
    });
    log::info!("{} features are dated on or after {}", collection.len(), cutoff);

    let collection = project_collection_to_wgs84(collection)?;

    let bounding_polygon = params.bounding_box.to_polygon();
    let collection = collection.filtered(|feature| {
        feature
            .geometry
            .as_ref()
            .map_or(false, |geometry| geometry.intersects(&bounding_polygon))
    });
    log::info!("{} features intersect {:?}", collection.len(), params.bounding_box);

    let collection = if params.deduplicate {
        let collection = keep_most_recent_per_id(collection);
        log::info!("{} features left after deduplication", collection.len());
        collection
    } else {
        collection
    };

    match &params.output_fields {
        Some(output_fields) => project_fields(collection, output_fields),
        None => Ok(collection),
    }
}

/// Replace every `DateCurren` value by its normalized naive timestamp. Null values stay null.
fn normalize_dates(collection: FeatureCollection) -> Result<FeatureCollection> {
    let features = collection
        .features
        .into_iter()
        .map(|mut feature| {
            let normalized = match feature.attributes.get(DATE_CURRENT_FIELD) {
                Some(value) => normalize_timestamp(value).map_err(|err| {
                    data_shape(format!(
                        "invalid {} of feature {:?}: {}",
                        DATE_CURRENT_FIELD,
                        feature.attribute(GLOBAL_ID_FIELD),
                        err
                    ))
                })?,
                None => None,
            };
            feature.attributes.insert(
                DATE_CURRENT_FIELD.to_string(),
                normalized.map_or(AttributeValue::Null, AttributeValue::NaiveDateTime),
            );
            Ok(feature)
        })
        .collect::<Result<Vec<Feature>>>()?;
    Ok(FeatureCollection {
        features,
        ..collection
    })
}

fn date_current(feature: &Feature) -> Option<NaiveDateTime> {
    match feature.attribute(DATE_CURRENT_FIELD) {
        Some(AttributeValue::NaiveDateTime(date_time)) => Some(*date_time),
        _ => None,
    }
}

fn irwin_id(feature: &Feature) -> String {
    match feature.attribute(IRWIN_ID_FIELD) {
        Some(AttributeValue::String(id)) => id.clone(),
        Some(other) => other.to_json().to_string(),
        None => String::new(),
    }
}

/// Several perimeters from different report dates can exist for the same fire. They share the IRWIN id but not
/// the GlobalID. Keeps the most recent one, or the first one on equal dates, in the original order.
fn keep_most_recent_per_id(collection: FeatureCollection) -> FeatureCollection {
    let mut most_recent: HashMap<String, usize> = HashMap::new();
    for (index, feature) in collection.features.iter().enumerate() {
        match most_recent.entry(irwin_id(feature)) {
            Entry::Vacant(entry) => {
                entry.insert(index);
            }
            Entry::Occupied(mut entry) => {
                let current = &collection.features[*entry.get()];
                if date_current(feature) > date_current(current) {
                    entry.insert(index);
                }
            }
        }
    }

    let keep: HashSet<usize> = most_recent.into_values().collect();
    let mut index = 0;
    collection.filtered(|_| {
        index += 1;
        keep.contains(&(index - 1))
    })
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, NaiveDateTime};
    use rstest::{fixture, rstest};

    use crate::{
        crs::{crs_utils::Crs, wgs_bounding_box::WgsBoundingBox},
        errors::PerimeterError,
        geofile::feature::{AttributeValue, Feature, FeatureCollection, FeatureMap},
        perimeters::fields::OutputField,
    };

    use super::{select_current_perimeters, SelectionParams};

    #[fixture]
    fn as_of() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 9, 30)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn inside_point() -> Option<geo::Geometry> {
        Some(geo::Geometry::Point(geo::Point::new(-120.0, 40.0)))
    }

    fn perimeter(
        global_id: &str,
        irwin_id: Option<&str>,
        geometry: Option<geo::Geometry>,
        date_current: NaiveDateTime,
    ) -> Feature {
        Feature {
            geometry,
            attributes: FeatureMap::from([
                ("GlobalID".to_string(), AttributeValue::from(global_id)),
                (
                    "IRWINID".to_string(),
                    irwin_id.map_or(AttributeValue::Null, AttributeValue::from),
                ),
                (
                    "DateCurren".to_string(),
                    AttributeValue::NaiveDateTime(date_current),
                ),
            ]),
        }
    }

    fn collection(features: Vec<Feature>) -> FeatureCollection {
        FeatureCollection {
            features,
            field_names: vec![
                "GlobalID".to_string(),
                "IRWINID".to_string(),
                "DateCurren".to_string(),
            ],
            crs: Crs::wgs84(),
        }
    }

    fn global_ids(collection: &FeatureCollection) -> Vec<&str> {
        collection
            .features
            .iter()
            .map(|feature| feature.attribute("GlobalID").unwrap().as_str().unwrap())
            .collect()
    }

    #[rstest]
    fn test_drops_missing_geometry_and_id(as_of: NaiveDateTime) {
        let input = collection(vec![
            perimeter("a", Some("A1"), None, as_of - Duration::days(1)),
            perimeter("b", None, inside_point(), as_of - Duration::days(5)),
            perimeter("c", Some("X1"), inside_point(), as_of - Duration::days(2)),
        ]);

        let output = select_current_perimeters(input, &SelectionParams::new(as_of)).unwrap();

        assert_eq!(vec!["c"], global_ids(&output));
        assert!(output.crs.is_wgs84());
    }

    #[rstest]
    fn test_keeps_most_recent_per_id(as_of: NaiveDateTime) {
        let input = collection(vec![
            perimeter("old", Some("X2"), inside_point(), as_of - Duration::days(10)),
            perimeter("new", Some("X2"), inside_point(), as_of - Duration::days(1)),
            perimeter("other", Some("X3"), inside_point(), as_of - Duration::days(3)),
        ]);

        let output = select_current_perimeters(input, &SelectionParams::new(as_of)).unwrap();

        assert_eq!(vec!["new", "other"], global_ids(&output));
    }

    #[rstest]
    fn test_keeps_duplicates_without_deduplication(as_of: NaiveDateTime) {
        let input = collection(vec![
            perimeter("old", Some("X2"), inside_point(), as_of - Duration::days(10)),
            perimeter("new", Some("X2"), inside_point(), as_of - Duration::days(1)),
        ]);
        let params = SelectionParams {
            deduplicate: false,
            ..SelectionParams::new(as_of)
        };

        let output = select_current_perimeters(input, &params).unwrap();

        assert_eq!(vec!["old", "new"], global_ids(&output));
    }

    #[rstest]
    fn test_equal_dates_keep_first(as_of: NaiveDateTime) {
        let date_current = as_of - Duration::days(4);
        let input = collection(vec![
            perimeter("first", Some("X4"), inside_point(), date_current),
            perimeter("second", Some("X4"), inside_point(), date_current),
        ]);

        let output = select_current_perimeters(input, &SelectionParams::new(as_of)).unwrap();

        assert_eq!(vec!["first"], global_ids(&output));
    }

    #[rstest]
    #[case(Duration::zero(), true)]
    #[case(Duration::microseconds(1), false)]
    #[case(Duration::microseconds(-1), true)]
    fn test_cutoff_boundary(
        as_of: NaiveDateTime,
        #[case] before_cutoff: Duration,
        #[case] expected_kept: bool,
    ) {
        let date_current = as_of - Duration::days(30) - before_cutoff;
        let input = collection(vec![perimeter("a", Some("X1"), inside_point(), date_current)]);

        let output = select_current_perimeters(input, &SelectionParams::new(as_of)).unwrap();

        assert_eq!(expected_kept, !output.is_empty());
    }

    #[rstest]
    fn test_zero_day_window(as_of: NaiveDateTime) {
        let input = collection(vec![
            perimeter("now", Some("X1"), inside_point(), as_of),
            perimeter("earlier", Some("X2"), inside_point(), as_of - Duration::seconds(1)),
        ]);
        let params = SelectionParams {
            n_days: 0,
            ..SelectionParams::new(as_of)
        };

        let output = select_current_perimeters(input, &params).unwrap();

        assert_eq!(vec!["now"], global_ids(&output));
    }

    #[rstest]
    fn test_bounding_box(as_of: NaiveDateTime) {
        let date_current = as_of - Duration::days(1);
        let straddling: geo::Polygon = geo::Rect::new((-127.0, 40.0), (-124.0, 41.0)).to_polygon();
        let outside: geo::Polygon = geo::Rect::new((-80.0, 30.0), (-79.0, 31.0)).to_polygon();
        let input = collection(vec![
            perimeter(
                "null_island",
                Some("X1"),
                Some(geo::Geometry::Point(geo::Point::new(0.0, 0.0))),
                date_current,
            ),
            perimeter("straddling", Some("X2"), Some(straddling.into()), date_current),
            perimeter("outside", Some("X3"), Some(outside.into()), date_current),
            perimeter("inside", Some("X4"), inside_point(), date_current),
        ]);

        let output = select_current_perimeters(input, &SelectionParams::new(as_of)).unwrap();

        assert_eq!(vec!["straddling", "inside"], global_ids(&output));
    }

    #[rstest]
    fn test_custom_bounding_box(as_of: NaiveDateTime) {
        let input = collection(vec![perimeter(
            "a",
            Some("X1"),
            Some(geo::Geometry::Point(geo::Point::new(0.5, 0.5))),
            as_of,
        )]);
        let params = SelectionParams {
            bounding_box: WgsBoundingBox {
                left_lon: 0.0,
                right_lon: 1.0,
                bottom_lat: 0.0,
                top_lat: 1.0,
            },
            ..SelectionParams::new(as_of)
        };

        let output = select_current_perimeters(input, &params).unwrap();

        assert_eq!(1, output.len());
    }

    #[rstest]
    fn test_idempotent(as_of: NaiveDateTime) {
        let input = collection(vec![
            perimeter("a", Some("X1"), inside_point(), as_of - Duration::days(1)),
            perimeter("b", Some("X1"), inside_point(), as_of - Duration::days(2)),
            perimeter("c", Some("X2"), inside_point(), as_of - Duration::days(40)),
            perimeter("d", None, inside_point(), as_of - Duration::days(1)),
        ]);
        let params = SelectionParams::new(as_of);

        let first = select_current_perimeters(input.clone(), &params).unwrap();
        let second = select_current_perimeters(input, &params).unwrap();

        assert_eq!(first, second);
    }

    #[rstest]
    fn test_normalizes_date_strings(as_of: NaiveDateTime) {
        let mut recent = perimeter("recent", Some("X1"), inside_point(), as_of);
        recent.attributes.insert(
            "DateCurren".to_string(),
            AttributeValue::from("2020-09-28T08:00:00-07:00"),
        );
        let mut undated = perimeter("undated", Some("X2"), inside_point(), as_of);
        undated
            .attributes
            .insert("DateCurren".to_string(), AttributeValue::Null);

        let output =
            select_current_perimeters(collection(vec![recent, undated]), &SelectionParams::new(as_of))
                .unwrap();

        assert_eq!(vec!["recent"], global_ids(&output));
        assert_eq!(
            Some(&AttributeValue::NaiveDateTime(
                NaiveDate::from_ymd_opt(2020, 9, 28)
                    .unwrap()
                    .and_hms_opt(8, 0, 0)
                    .unwrap()
            )),
            output.features[0].attribute("DateCurren")
        );
    }

    #[rstest]
    fn test_unparseable_date(as_of: NaiveDateTime) {
        let mut feature = perimeter("a", Some("X1"), inside_point(), as_of);
        feature
            .attributes
            .insert("DateCurren".to_string(), AttributeValue::from("not a date"));

        let result = select_current_perimeters(collection(vec![feature]), &SelectionParams::new(as_of));

        assert!(matches!(result, Err(PerimeterError::DataShapeError(_))));
    }

    #[rstest]
    #[case("IRWINID")]
    #[case("DateCurren")]
    fn test_missing_field(as_of: NaiveDateTime, #[case] missing_field: &str) {
        let mut input = collection(vec![]);
        input.field_names.retain(|field_name| field_name != missing_field);

        let result = select_current_perimeters(input, &SelectionParams::new(as_of));

        assert!(matches!(result, Err(PerimeterError::DataShapeError(_))));
    }

    #[rstest]
    fn test_negative_n_days(as_of: NaiveDateTime) {
        let params = SelectionParams {
            n_days: -1,
            ..SelectionParams::new(as_of)
        };

        let result = select_current_perimeters(collection(vec![]), &params);

        assert!(matches!(result, Err(PerimeterError::InvalidParameter(_))));
    }

    #[rstest]
    fn test_output_fields(as_of: NaiveDateTime) {
        let input = collection(vec![perimeter("a", Some("X1"), inside_point(), as_of)]);
        let params = SelectionParams {
            output_fields: Some(vec![OutputField {
                source: "IRWINID".to_string(),
                name: Some("irwin_id".to_string()),
                title_case: false,
            }]),
            ..SelectionParams::new(as_of)
        };

        let output = select_current_perimeters(input, &params).unwrap();

        assert_eq!(vec!["irwin_id"], output.field_names);
        assert_eq!(
            Some(&AttributeValue::from("X1")),
            output.features[0].attributes.get("irwin_id")
        );
    }

    #[rstest]
    fn test_huge_window_keeps_everything(as_of: NaiveDateTime) {
        let params = SelectionParams {
            n_days: i64::MAX,
            ..SelectionParams::new(as_of)
        };
        assert_eq!(NaiveDateTime::MIN, params.cutoff());

        let very_old = NaiveDate::from_ymd_opt(1900, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let input = collection(vec![
            perimeter("a", Some("X1"), inside_point(), very_old),
            perimeter("b", Some("X2"), inside_point(), as_of),
        ]);

        let output = select_current_perimeters(input, &params).unwrap();

        assert_eq!(vec!["a", "b"], global_ids(&output));
    }

    #[rstest]
    fn test_non_finite_bounding_box(as_of: NaiveDateTime) {
        let input = collection(vec![perimeter("a", Some("X1"), inside_point(), as_of)]);
        let params = SelectionParams {
            bounding_box: WgsBoundingBox {
                left_lon: f64::NAN,
                ..WgsBoundingBox::west_coast()
            },
            ..SelectionParams::new(as_of)
        };

        let result = select_current_perimeters(input, &params);

        assert!(matches!(result, Err(PerimeterError::InvalidParameter(_))));
    }
}
