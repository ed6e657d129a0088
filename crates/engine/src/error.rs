use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Thousands/decimal separators that cannot be told apart.
    InvalidNumberFormat(String),
    /// A column id or header that does not exist in the dataset.
    UnknownColumn(String),
    /// CSV serialization failed.
    Export(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidNumberFormat(msg) => write!(f, "invalid number format: {msg}"),
            Self::UnknownColumn(column) => write!(f, "unknown column: {column}"),
            Self::Export(msg) => write!(f, "export error: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}
