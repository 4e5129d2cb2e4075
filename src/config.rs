use anyhow::anyhow;
use serde::Deserialize;
use std::{
    fs::read_to_string,
    path::{Path, PathBuf},
};

use crate::{
    crs::wgs_bounding_box::WgsBoundingBox,
    perimeters::{download::Source, fields::OutputField, selection::DEFAULT_N_DAYS},
};

pub const DEFAULT_BUCKET: &str = "tiles.nst.guide";
pub const DEFAULT_KEY: &str = "wildfire_current/current.geojson";

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub enum DestinationConfig {
    S3 {
        bucket: String,
        key: String,
        #[serde(default)]
        region: Option<String>,
    },
    Geofile {
        filepath: PathBuf,
    },
}

impl Default for DestinationConfig {
    fn default() -> Self {
        DestinationConfig::S3 {
            bucket: DEFAULT_BUCKET.to_string(),
            key: DEFAULT_KEY.to_string(),
            region: None,
        }
    }
}

fn default_n_days() -> i64 {
    DEFAULT_N_DAYS
}

fn default_deduplicate() -> bool {
    true
}

/// Run configuration. Every field has a default, so an empty file (or no file at all) is a valid config.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub source: Source,
    #[serde(default)]
    pub destination: DestinationConfig,
    #[serde(default = "default_n_days")]
    pub n_days: i64,
    #[serde(default)]
    pub bounding_box: WgsBoundingBox,
    #[serde(default = "default_deduplicate")]
    pub deduplicate: bool,
    #[serde(default)]
    pub output_fields: Option<Vec<OutputField>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: Source::default(),
            destination: DestinationConfig::default(),
            n_days: default_n_days(),
            bounding_box: WgsBoundingBox::default(),
            deduplicate: default_deduplicate(),
            output_fields: None,
        }
    }
}

impl Config {
    pub fn from_yaml(contents: &str) -> anyhow::Result<Self> {
        // serde_yaml reads an empty document as null rather than an empty map.
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(contents)?)
    }

    pub fn load(config_filepath: &Path) -> anyhow::Result<Self> {
        if !config_filepath.exists() {
            return Err(anyhow!("Config file {:?} not found", config_filepath));
        }
        Self::from_yaml(&read_to_string(config_filepath)?)
    }
}
