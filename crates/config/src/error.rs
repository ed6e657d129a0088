use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Malformed JSON or TOML.
    Parse(String),
    /// Well-formed but unusable (bad separators, invalid filter, ...).
    Validation(String),
    /// A preset references a column id the dataset does not have.
    UnknownColumn(String),
    Io(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(msg) => write!(f, "parse error: {msg}"),
            Self::Validation(msg) => write!(f, "invalid configuration: {msg}"),
            Self::UnknownColumn(id) => write!(f, "unknown column: {id}"),
            Self::Io(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
