pub mod download;
pub mod fields;
pub mod selection;
pub mod timestamp;
