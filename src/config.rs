//! Conversion configuration.
//!
//! Loaded from a TOML file and/or assembled from command-line flags. Every
//! field has a default so a partial file is enough.

use crate::error::{ConvertError, Result};
use crate::mapping::MappingSpec;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use std::fs;
use std::path::Path;

/// Default settlement currency.
pub const DEFAULT_CURRENCY: &str = "EUR";

/// Top-level converter configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConverterConfig {
    /// Identity of the paying account holder.
    pub debtor: DebtorConfig,

    /// ISO 4217 code of the batch (single currency per file).
    pub currency: String,

    /// Requests a single debit for the whole batch on the debtor statement.
    pub batch_booking: bool,

    /// Emits `xsi:schemaLocation` on the document root.
    pub schema_location: bool,

    /// Adds a structured SCOR creditor reference carrying the payment
    /// reference when no dedicated creditor-reference column is mapped.
    pub structured_remittance: bool,

    /// Requested execution date. Defaults to the conversion date.
    pub execution_date: Option<NaiveDate>,

    /// How the input table is laid out.
    pub input: InputConfig,

    /// How logical fields are located in the table.
    pub columns: MappingSpec,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            debtor: DebtorConfig::default(),
            currency: DEFAULT_CURRENCY.to_string(),
            batch_booking: false,
            schema_location: false,
            structured_remittance: false,
            execution_date: None,
            input: InputConfig::default(),
            columns: MappingSpec::default(),
        }
    }
}

impl ConverterConfig {
    /// Parses a configuration from TOML text.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Loads a configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Checks that the configuration can produce a bank-submittable file.
    pub fn validate(&self) -> Result<()> {
        if self.debtor.name.trim().is_empty() {
            return Err(ConvertError::InvalidConfig("debtor name is required".into()));
        }
        if self.debtor.iban.trim().is_empty() {
            return Err(ConvertError::InvalidConfig("debtor IBAN is required".into()));
        }
        if self.debtor.bic.trim().is_empty() {
            return Err(ConvertError::InvalidConfig("debtor BIC is required".into()));
        }

        let currency = self.currency.trim();
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ConvertError::InvalidConfig(format!(
                "currency must be a 3-letter code, got '{}'",
                self.currency
            )));
        }

        Ok(())
    }

    /// Upper-cased currency code.
    pub fn currency_code(&self) -> String {
        self.currency.trim().to_ascii_uppercase()
    }
}

/// Debtor (ordering party) identity.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DebtorConfig {
    pub name: String,
    pub iban: String,
    pub bic: String,
}

/// Layout of the delimited input.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InputConfig {
    /// Field delimiter, a single ASCII character.
    #[serde(deserialize_with = "deserialize_delimiter")]
    pub delimiter: u8,

    /// Whether the first row holds column headings.
    pub has_header: bool,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            delimiter: b',',
            has_header: true,
        }
    }
}

/// Parses a delimiter given as a one-character string (`"\t"` and `"tab"` allowed).
pub fn parse_delimiter(s: &str) -> std::result::Result<u8, String> {
    match s {
        "tab" | "\\t" | "\t" => Ok(b'\t'),
        _ => {
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii() => Ok(c as u8),
                _ => Err(format!("delimiter must be a single ASCII character, got '{}'", s)),
            }
        }
    }
}

fn deserialize_delimiter<'de, D>(deserializer: D) -> std::result::Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_delimiter(&s).map_err(serde::de::Error::custom)
}
