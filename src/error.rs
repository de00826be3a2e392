//! Error types for the SEPA converter.

use crate::mapping::LogicalField;
use thiserror::Error;

/// Result type alias for conversion operations
pub type Result<T> = std::result::Result<T, ConvertError>;

/// Errors that can occur while converting a payment table.
#[derive(Error, Debug)]
pub enum ConvertError {
    /// Failed to read the input or write the output
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing error (bad bytes, ragged rows)
    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    /// XML rendering or reading error
    #[error("XML error: {0}")]
    Xml(String),

    /// Configuration file could not be parsed
    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration is structurally valid but unusable
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A required logical field has no resolvable column
    #[error("Missing column for required field '{field}'")]
    MissingColumn { field: LogicalField },

    /// An explicitly selected column does not exist in the table
    #[error("Column '{locator}' selected for field '{field}' does not exist")]
    UnknownColumn { field: LogicalField, locator: String },

    /// Header matching found more than one plausible column
    #[error("Ambiguous columns for field '{field}': {}", .candidates.join(", "))]
    AmbiguousColumn {
        field: LogicalField,
        candidates: Vec<String>,
    },

    /// An amount cell is present but is not a usable decimal
    #[error("Invalid amount at row {row}: '{value}'")]
    InvalidAmount { row: usize, value: String },

    /// A row carries a currency other than the batch currency
    #[error("Currency mismatch at row {row}: found '{found}', batch currency is '{expected}'")]
    CurrencyMismatch {
        row: usize,
        found: String,
        expected: String,
    },

    /// The control sum does not fit the decimal range
    #[error("Control sum overflow")]
    AmountOverflow,

    /// No payments remain after dropping incomplete rows
    #[error("No payable rows found in input")]
    EmptyBatch,
}

pub(crate) fn xml<E: std::fmt::Display>(e: E) -> ConvertError {
    ConvertError::Xml(e.to_string())
}
