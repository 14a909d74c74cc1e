//! CLI configuration loading and merging.

use anyhow::Context;
use std::path::Path;
use strand_data::DatasetConfig;

/// Values given on the command line; each one replaces the config file's.
#[derive(Debug, Default)]
pub struct Overrides {
    pub paths: Vec<String>,
    pub split: Option<String>,
    pub ds_type: Option<String>,
}

/// Load the dataset configuration.
///
/// Configuration precedence:
/// 1. CLI arguments
/// 2. Config file (`--config`)
/// 3. Defaults
pub fn load(path: Option<&Path>, overrides: &Overrides) -> anyhow::Result<DatasetConfig> {
    let mut config = match path {
        Some(path) => DatasetConfig::load_from_file(path)?,
        None => DatasetConfig::default(),
    };

    if !overrides.paths.is_empty() {
        config.paths.clone_from(&overrides.paths);
    }
    if let Some(split) = &overrides.split {
        config.split = parse_split(split)?;
    }
    if let Some(ds_type) = &overrides.ds_type {
        config.ds_type.clone_from(ds_type);
    }
    Ok(config)
}

/// Parse a comma-separated list of proportions.
pub fn parse_split(value: &str) -> anyhow::Result<Vec<f64>> {
    value
        .split(',')
        .map(|part| {
            part.trim().parse::<f64>().with_context(|| format!("invalid split proportion {:?}", part.trim()))
        })
        .collect()
}
