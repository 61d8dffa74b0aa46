//! Runtime settings read from an optional `stratus` config file plus
//! `STRATUS_*` environment overrides.

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::Result;
use crate::graph::DEFAULT_REGION;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default = "default_region")]
    pub region: String,
    /// When set, KO rows in reports carry their full error text.
    #[serde(default)]
    pub detailed_errors: bool,
}

fn default_region() -> String {
    DEFAULT_REGION.to_owned()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            region: default_region(),
            detailed_errors: false,
        }
    }
}

impl Settings {
    pub fn load() -> Result<Settings> {
        let config = Config::builder()
            .add_source(File::with_name("stratus").required(false))
            .add_source(Environment::with_prefix("STRATUS"))
            .build()?;
        Ok(config.try_deserialize()?)
    }
}
