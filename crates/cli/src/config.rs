use anyhow::{Context, Result};
use pitscan_algorithms::parallel::ProcessingMode;
use pitscan_algorithms::AnalysisConfig;
use pitscan_core::CRS;
use std::fs;
use std::path::Path;

/// Flag values that take precedence over the config file
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub area_crs: Option<CRS>,
    pub buffer_distance: Option<f64>,
    pub threads: Option<usize>,
}

pub fn load_from_file(path: &Path) -> Result<AnalysisConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;
    let config: AnalysisConfig =
        toml::from_str(&content).with_context(|| "Failed to parse TOML configuration")?;
    Ok(config)
}

/// Defaults, then the optional file, then the command line flags
pub fn resolve(path: Option<&Path>, overrides: Overrides) -> Result<AnalysisConfig> {
    let mut config = match path {
        Some(path) => load_from_file(path)?,
        None => AnalysisConfig::default(),
    };
    if let Some(crs) = overrides.area_crs {
        config.area_crs = crs;
    }
    if let Some(distance) = overrides.buffer_distance {
        config.buffer_distance = distance;
    }
    match overrides.threads {
        Some(1) => config.processing = ProcessingMode::Sequential,
        Some(n) => config.processing = ProcessingMode::ParallelWith(n),
        None => {}
    }
    Ok(config)
}
