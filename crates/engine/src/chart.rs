//! Chart configuration and projection of a display table into series.
//!
//! Columns are addressed by header name, matching what the chart picker
//! shows. Values are re-parsed from display strings with the active
//! number format.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::export::DisplayTable;
use crate::locale::{parse_number, NumberFormat};

fn default_inner_radius() -> f64 {
    0.5
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartesianChart {
    pub x_column: String,
    pub y_columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RadialChart {
    pub label_column: String,
    pub value_column: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonutChart {
    pub label_column: String,
    pub value_column: String,
    /// Fraction of the outer radius left hollow.
    #[serde(default = "default_inner_radius")]
    pub inner_radius: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChartConfig {
    Line(CartesianChart),
    Bar(CartesianChart),
    Area(CartesianChart),
    Pie(RadialChart),
    Donut(DonutChart),
}

impl ChartConfig {
    pub fn is_radial(&self) -> bool {
        match self {
            ChartConfig::Line(_) | ChartConfig::Bar(_) | ChartConfig::Area(_) => false,
            ChartConfig::Pie(_) | ChartConfig::Donut(_) => true,
        }
    }

    /// Project `table` into labels and series for this chart.
    pub fn project(
        &self,
        table: &DisplayTable,
        format: &NumberFormat,
    ) -> Result<ChartData, EngineError> {
        match self {
            ChartConfig::Line(c) | ChartConfig::Bar(c) | ChartConfig::Area(c) => {
                project_cartesian(c, table, format)
            }
            ChartConfig::Pie(c) => project_radial(&c.label_column, &c.value_column, table, format),
            ChartConfig::Donut(c) => {
                project_radial(&c.label_column, &c.value_column, table, format)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub name: String,
    /// One entry per label; `None` where the cell is not a number.
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub series: Vec<ChartSeries>,
}

fn header_index(table: &DisplayTable, name: &str) -> Result<usize, EngineError> {
    table
        .column_index(name)
        .ok_or_else(|| EngineError::UnknownColumn(name.to_string()))
}

fn column_values(table: &DisplayTable, col: usize, format: &NumberFormat) -> Vec<Option<f64>> {
    (0..table.rows.len())
        .map(|row| table.cell(row, col).and_then(|s| parse_number(s, format)))
        .collect()
}

fn column_labels(table: &DisplayTable, col: usize) -> Vec<String> {
    (0..table.rows.len())
        .map(|row| table.cell(row, col).unwrap_or_default().to_string())
        .collect()
}

fn project_cartesian(
    chart: &CartesianChart,
    table: &DisplayTable,
    format: &NumberFormat,
) -> Result<ChartData, EngineError> {
    let x = header_index(table, &chart.x_column)?;
    let series = chart
        .y_columns
        .iter()
        .map(|name| {
            let col = header_index(table, name)?;
            Ok(ChartSeries {
                name: name.clone(),
                values: column_values(table, col, format),
            })
        })
        .collect::<Result<Vec<_>, EngineError>>()?;
    Ok(ChartData {
        labels: column_labels(table, x),
        series,
    })
}

/// Slices need a non-negative size; other rows are dropped.
fn project_radial(
    label_column: &str,
    value_column: &str,
    table: &DisplayTable,
    format: &NumberFormat,
) -> Result<ChartData, EngineError> {
    let label = header_index(table, label_column)?;
    let value = header_index(table, value_column)?;

    let (labels, values): (Vec<String>, Vec<Option<f64>>) = column_labels(table, label)
        .into_iter()
        .zip(column_values(table, value, format))
        .filter(|(_, v)| v.is_some_and(|v| v >= 0.0))
        .unzip();

    Ok(ChartData {
        labels,
        series: vec![ChartSeries {
            name: value_column.to_string(),
            values,
        }],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> DisplayTable {
        DisplayTable {
            headers: vec!["Region".into(), "Sales".into(), "Units".into()],
            rows: vec![
                vec!["North".into(), "1,200.5".into(), "3".into()],
                vec!["South".into(), "n/a".into(), "4".into()],
                vec!["East".into(), "-10".into(), "".into()],
            ],
        }
    }

    #[test]
    fn test_config_tagged_by_type() {
        let config: ChartConfig = serde_json::from_str(
            r#"{"type":"donut","labelColumn":"Region","valueColumn":"Sales"}"#,
        )
        .unwrap();
        assert!(config.is_radial());
        match config {
            ChartConfig::Donut(d) => assert_eq!(d.inner_radius, 0.5),
            other => panic!("unexpected config: {other:?}"),
        }

        let config: ChartConfig = serde_json::from_str(
            r#"{"type":"bar","xColumn":"Region","yColumns":["Sales"]}"#,
        )
        .unwrap();
        assert!(!config.is_radial());
    }

    #[test]
    fn test_cartesian_projection() {
        let config = ChartConfig::Line(CartesianChart {
            x_column: "Region".into(),
            y_columns: vec!["Sales".into(), "Units".into()],
        });
        let data = config.project(&table(), &NumberFormat::default()).unwrap();
        assert_eq!(data.labels, vec!["North", "South", "East"]);
        assert_eq!(data.series[0].values, vec![Some(1200.5), None, Some(-10.0)]);
        assert_eq!(data.series[1].values, vec![Some(3.0), Some(4.0), None]);
    }

    #[test]
    fn test_pie_drops_unusable_slices() {
        let config = ChartConfig::Pie(RadialChart {
            label_column: "Region".into(),
            value_column: "Sales".into(),
        });
        let data = config.project(&table(), &NumberFormat::default()).unwrap();
        assert_eq!(data.labels, vec!["North"]);
        assert_eq!(data.series[0].values, vec![Some(1200.5)]);
    }

    #[test]
    fn test_unknown_header() {
        let config = ChartConfig::Area(CartesianChart {
            x_column: "Region".into(),
            y_columns: vec!["Profit".into()],
        });
        assert_eq!(
            config.project(&table(), &NumberFormat::default()),
            Err(EngineError::UnknownColumn("Profit".into()))
        );
    }
}
