//! Cell scalars as delivered by upstream parsers.
//!
//! A cell is `string | number | null`. Typed interpretation (number, date)
//! happens later against the owning column; the scalar itself never changes
//! shape because of its column type.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Empty,
    Number(f64),
    Text(String),
}

impl CellValue {
    /// Empty cells and whitespace-only text.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Number(_) => false,
            CellValue::Text(s) => s.trim().is_empty(),
        }
    }

    /// Canonical text: numbers without grouping, integral values without a
    /// fractional part.
    pub fn raw_text(&self) -> Cow<'_, str> {
        match self {
            CellValue::Empty => Cow::Borrowed(""),
            CellValue::Number(n) => Cow::Owned(canonical_number(*n)),
            CellValue::Text(s) => Cow::Borrowed(s.as_str()),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) if n.is_finite() => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Render an `f64` the way it is stored canonically (`1234.5`, `-50`).
pub fn canonical_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(CellValue::Empty, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_detection() {
        assert!(CellValue::Empty.is_blank());
        assert!(CellValue::from("   ").is_blank());
        assert!(!CellValue::from("x").is_blank());
        assert!(!CellValue::Number(0.0).is_blank());
    }

    #[test]
    fn test_raw_text_is_canonical() {
        assert_eq!(CellValue::Number(1234.0).raw_text(), "1234");
        assert_eq!(CellValue::Number(-0.5).raw_text(), "-0.5");
        assert_eq!(CellValue::from("1,234").raw_text(), "1,234");
        assert_eq!(CellValue::Empty.raw_text(), "");
    }

    #[test]
    fn test_deserializes_from_json_scalars() {
        let row: Vec<CellValue> = serde_json::from_str(r#"["a", 2.5, null, 7]"#).unwrap();
        assert_eq!(
            row,
            vec![
                CellValue::from("a"),
                CellValue::Number(2.5),
                CellValue::Empty,
                CellValue::Number(7.0),
            ]
        );
    }
}
