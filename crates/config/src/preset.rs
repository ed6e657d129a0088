// Saved view presets (filters + sort + aggregation) stored as TOML

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use datadeck_engine::filter::validate_condition;
use datadeck_engine::{
    AggregationSpec, Column, ColumnFilter, DatasetStore, Locale, SortLevel, Update,
};

use crate::error::ConfigError;

/// A named view over a dataset, e.g.
///
/// ```toml
/// name = "Large orders"
///
/// [[filters]]
/// columnId = "qty"
/// conditions = [{ operator = "greater_than", value = 100 }]
///
/// [[sort]]
/// columnId = "qty"
/// direction = "desc"
///
/// [aggregation]
/// groupBy = ["region"]
/// metrics = [{ columnId = "qty", reducer = "sum" }]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewPreset {
    pub name: String,
    #[serde(default)]
    pub filters: Vec<ColumnFilter>,
    #[serde(default)]
    pub sort: Vec<SortLevel>,
    #[serde(default)]
    pub aggregation: Option<AggregationSpec>,
}

impl ViewPreset {
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Check the preset against a dataset's columns before applying it.
    pub fn validate(&self, columns: &[Column], locale: &Locale) -> Result<(), ConfigError> {
        let find = |id: &str| {
            columns
                .iter()
                .find(|c| c.id == id)
                .ok_or_else(|| ConfigError::UnknownColumn(id.to_string()))
        };

        for filter in &self.filters {
            let column = find(&filter.column_id)?;
            for condition in &filter.conditions {
                validate_condition(condition, column, locale).map_err(|e| {
                    ConfigError::Validation(format!("filter on \"{}\": {e}", column.name))
                })?;
            }
        }

        let mut seen = HashSet::new();
        for level in &self.sort {
            find(&level.column_id)?;
            if !seen.insert(level.column_id.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "sort lists column \"{}\" more than once",
                    level.column_id
                )));
            }
        }

        if let Some(spec) = &self.aggregation {
            for id in spec.column_ids() {
                find(id)?;
            }
        }
        Ok(())
    }

    /// Validate, then replace the store's filters, sort and aggregation.
    pub fn apply_to(&self, store: &mut DatasetStore) -> Result<(), ConfigError> {
        self.validate(store.columns(), store.locale())?;
        store.apply(Update::SetFilters {
            filters: self.filters.clone(),
        });
        store.apply(Update::SetSort {
            levels: self.sort.clone(),
        });
        store.apply(Update::SetAggregation {
            spec: self.aggregation.clone(),
        });
        log::debug!("applied view preset \"{}\"", self.name);
        Ok(())
    }
}
