use std::fmt;

use crate::model::SourceSide;

#[derive(Debug)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (threshold range, synonym table, etc.).
    ConfigValidation(String),
    /// Missing required column in input data.
    MissingColumn { side: SourceSide, column: String },
    /// Row without a usable name, raised only in strict mode.
    MalformedRecord { side: SourceSide, row: usize, reason: String },
    /// CSV read/write error.
    Csv(String),
    /// IO error (file read, etc.).
    Io(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::MissingColumn { side, column } => {
                write!(f, "source '{side}': missing column '{column}'")
            }
            Self::MalformedRecord { side, row, reason } => {
                write!(f, "source '{side}', row {row}: malformed record: {reason}")
            }
            Self::Csv(msg) => write!(f, "CSV error: {msg}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}

impl From<csv::Error> for ReconError {
    fn from(e: csv::Error) -> Self {
        Self::Csv(e.to_string())
    }
}
