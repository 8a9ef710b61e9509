//! TOML configuration
//!
//! ```toml
//! [grid]
//! rows = 4
//! cols = 4
//!
//! [display]
//! lower_percentile = 2.0
//! upper_percentile = 98.0
//!
//! [export]
//! create_subfolders = true
//! export_shp = false
//! export_as_image = false
//!
//! [logging]
//! file = "fishnet.log"
//! ```
//!
//! Every key is optional.

use std::fs;
use std::path::Path;

use log::debug;

use crate::errors::{FishnetError, FishnetResult};

/// Options controlling tile export
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportOptions {
    /// Put tiles under `{base}_分割结果/网格图像/`
    pub create_subfolders: bool,
    /// Also write the grid as a polygon shapefile
    pub export_shp: bool,
    /// Always save tiles as PNG, even for geo-referenced sources
    pub export_as_image: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        ExportOptions {
            create_subfolders: true,
            export_shp: false,
            export_as_image: false,
        }
    }
}

/// Percentile window used by display normalization
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayOptions {
    pub lower_percentile: f64,
    pub upper_percentile: f64,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        DisplayOptions {
            lower_percentile: 2.0,
            upper_percentile: 98.0,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, PartialEq)]
pub struct FishnetConfig {
    pub rows: usize,
    pub cols: usize,
    pub display: DisplayOptions,
    pub export: ExportOptions,
    pub log_file: Option<String>,
}

impl Default for FishnetConfig {
    fn default() -> Self {
        FishnetConfig {
            rows: 4,
            cols: 4,
            display: DisplayOptions::default(),
            export: ExportOptions::default(),
            log_file: None,
        }
    }
}

impl FishnetConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> FishnetResult<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        debug!("Read configuration from {}", path.as_ref().display());
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_str(content: &str) -> FishnetResult<Self> {
        let value: toml::Value = content.parse()
            .map_err(|e| FishnetError::Config(format!("Failed to parse TOML: {}", e)))?;

        let mut config = FishnetConfig::default();

        if let Some(rows) = Self::get_integer(&value, "grid", "rows")? {
            config.rows = Self::positive(rows, "grid.rows")?;
        }
        if let Some(cols) = Self::get_integer(&value, "grid", "cols")? {
            config.cols = Self::positive(cols, "grid.cols")?;
        }

        if let Some(lower) = Self::get_float(&value, "display", "lower_percentile")? {
            config.display.lower_percentile = lower;
        }
        if let Some(upper) = Self::get_float(&value, "display", "upper_percentile")? {
            config.display.upper_percentile = upper;
        }
        let display = config.display;
        if !(0.0..=100.0).contains(&display.lower_percentile)
            || !(0.0..=100.0).contains(&display.upper_percentile)
            || display.lower_percentile >= display.upper_percentile
        {
            return Err(FishnetError::Config(format!(
                "Invalid percentile window {}..{}", display.lower_percentile, display.upper_percentile
            )));
        }

        if let Some(flag) = Self::get_bool(&value, "export", "create_subfolders")? {
            config.export.create_subfolders = flag;
        }
        if let Some(flag) = Self::get_bool(&value, "export", "export_shp")? {
            config.export.export_shp = flag;
        }
        if let Some(flag) = Self::get_bool(&value, "export", "export_as_image")? {
            config.export.export_as_image = flag;
        }

        if let Some(file) = Self::get(&value, "logging", "file") {
            let file = file.as_str()
                .ok_or_else(|| FishnetError::Config("logging.file must be a string".to_string()))?;
            config.log_file = Some(file.to_string());
        }

        Ok(config)
    }

    fn get<'v>(value: &'v toml::Value, section: &str, key: &str) -> Option<&'v toml::Value> {
        value.get(section).and_then(|s| s.get(key))
    }

    fn get_integer(value: &toml::Value, section: &str, key: &str) -> FishnetResult<Option<i64>> {
        Self::get(value, section, key)
            .map(|v| v.as_integer()
                .ok_or_else(|| FishnetError::Config(format!("{}.{} must be an integer", section, key))))
            .transpose()
    }

    fn get_float(value: &toml::Value, section: &str, key: &str) -> FishnetResult<Option<f64>> {
        Self::get(value, section, key)
            .map(|v| v.as_float()
                .or_else(|| v.as_integer().map(|i| i as f64))
                .ok_or_else(|| FishnetError::Config(format!("{}.{} must be a number", section, key))))
            .transpose()
    }

    fn get_bool(value: &toml::Value, section: &str, key: &str) -> FishnetResult<Option<bool>> {
        Self::get(value, section, key)
            .map(|v| v.as_bool()
                .ok_or_else(|| FishnetError::Config(format!("{}.{} must be a boolean", section, key))))
            .transpose()
    }

    fn positive(value: i64, name: &str) -> FishnetResult<usize> {
        if value <= 0 {
            return Err(FishnetError::Config(format!("{} must be positive, got {}", name, value)));
        }
        Ok(value as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_config_matches_defaults() {
        let config = FishnetConfig::from_str(include_str!("../fishnet.toml")).unwrap();
        std::assert_eq!(config, FishnetConfig::default());
    }

    #[test]
    fn test_empty_document_gives_defaults() {
        std::assert_eq!(FishnetConfig::from_str("").unwrap(), FishnetConfig::default());
    }

    #[test]
    fn test_sections_override_defaults() {
        let config = FishnetConfig::from_str(r#"
            [grid]
            rows = 3
            cols = 5

            [display]
            lower_percentile = 1
            upper_percentile = 99.5

            [export]
            create_subfolders = false
            export_shp = true

            [logging]
            file = "run.log"
        "#).unwrap();

        std::assert_eq!((config.rows, config.cols), (3, 5));
        std::assert_eq!(config.display.lower_percentile, 1.0);
        std::assert_eq!(config.display.upper_percentile, 99.5);
        std::assert!(!config.export.create_subfolders);
        std::assert!(config.export.export_shp);
        std::assert!(!config.export.export_as_image);
        std::assert_eq!(config.log_file.as_deref(), Some("run.log"));
    }

    #[test]
    fn test_invalid_values_are_errors() {
        std::assert!(FishnetConfig::from_str("[grid]\nrows = 0").is_err());
        std::assert!(FishnetConfig::from_str("[grid]\ncols = \"four\"").is_err());
        std::assert!(FishnetConfig::from_str("[display]\nlower_percentile = 90\nupper_percentile = 10").is_err());
        std::assert!(FishnetConfig::from_str("[export]\nexport_shp = 1").is_err());
        std::assert!(FishnetConfig::from_str("not toml =").is_err());
    }
}
