pub mod crs_utils;
pub mod wgs_bounding_box;
