// Dataset settings
// Loaded from ~/.config/datadeck/settings.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use datadeck_engine::column::DEFAULT_COLUMN_WIDTH;
use datadeck_engine::{
    Column, ColumnType, DatasetStore, DateFormat, Locale, NumberFormat, UniqueValue,
};

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Number formatting
    #[serde(rename = "number.thousandsSeparator")]
    pub thousands_separator: char,

    #[serde(rename = "number.decimalSeparator")]
    pub decimal_separator: char,

    // Dates
    #[serde(rename = "date.format")]
    pub date_format: String,

    // Grid
    #[serde(rename = "grid.defaultColumnWidth")]
    pub default_column_width: f32,

    // Filter value picker
    #[serde(rename = "filter.uniqueValuesLimit")]
    pub unique_values_limit: usize,
}

impl Default for Settings {
    fn default() -> Self {
        let number = NumberFormat::default();
        Self {
            thousands_separator: number.thousands_separator,
            decimal_separator: number.decimal_separator,
            date_format: DateFormat::default().pattern().to_string(),
            default_column_width: DEFAULT_COLUMN_WIDTH,
            unique_values_limit: 1000,
        }
    }
}

const DEFAULT_FILE: &str = r#"{
    // Number formatting
    "number.thousandsSeparator": ",",
    "number.decimalSeparator": ".",

    // Date display pattern (YYYY, YY, MMMM, MMM, MM, M, DD, D, HH, H, mm, ss)
    "date.format": "YYYY-MM-DD",

    // Grid
    "grid.defaultColumnWidth": 120,

    // Maximum distinct values listed in a filter picker
    "filter.uniqueValuesLimit": 1000
}
"#;

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("datadeck")
            .join("settings.json")
    }

    /// Load settings from disk, falling back to defaults
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load from `path`. A missing file is created with defaults; an
    /// unreadable or invalid one is logged and replaced by defaults.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            if let Err(e) = Self::create_default_file(path) {
                log::warn!("could not write default settings to {}: {e}", path.display());
            }
            return Self::default();
        }

        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                log::warn!("error reading {}: {e}", path.display());
                return Self::default();
            }
        };
        match Self::from_json(&contents) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("{}: {e}; using default settings", path.display());
                Self::default()
            }
        }
    }

    /// Parse settings JSON. Lines starting with `//` are comments.
    pub fn from_json(contents: &str) -> Result<Self, ConfigError> {
        let cleaned: String = contents
            .lines()
            .filter(|line| !line.trim().starts_with("//"))
            .collect::<Vec<_>>()
            .join("\n");

        let settings: Self =
            serde_json::from_str(&cleaned).map_err(|e| ConfigError::Parse(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.number_format()
            .validate()
            .map_err(|e| ConfigError::Validation(e.to_string()))?;
        if self.date_format.trim().is_empty() {
            return Err(ConfigError::Validation("date.format is empty".into()));
        }
        if !(self.default_column_width.is_finite() && self.default_column_width > 0.0) {
            return Err(ConfigError::Validation(format!(
                "grid.defaultColumnWidth must be positive, got {}",
                self.default_column_width
            )));
        }
        if self.unique_values_limit == 0 {
            return Err(ConfigError::Validation(
                "filter.uniqueValuesLimit must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Save current settings to disk
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json =
            serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))?;
        fs::write(path, json)?;
        Ok(())
    }

    fn create_default_file(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, DEFAULT_FILE)?;
        Ok(())
    }

    pub fn number_format(&self) -> NumberFormat {
        NumberFormat::new(self.thousands_separator, self.decimal_separator)
    }

    /// Formats to hand to a `DatasetStore`.
    pub fn locale(&self) -> Locale {
        Locale::new(self.number_format(), DateFormat::new(self.date_format.as_str()))
    }

    /// A new column sized by `grid.defaultColumnWidth`.
    pub fn new_column(
        &self,
        id: impl Into<String>,
        name: impl Into<String>,
        column_type: ColumnType,
    ) -> Column {
        Column::new(id, name, column_type).with_width(self.default_column_width)
    }

    /// Filter picker entries for column `col`, capped at
    /// `filter.uniqueValuesLimit`.
    pub fn unique_values(&self, store: &DatasetStore, col: usize) -> Vec<UniqueValue> {
        store.unique_values(col, self.unique_values_limit)
    }
}
