//! Payment rows: from raw table cells to normalized credit transfers.

use crate::amount::Amount;
use crate::error::{ConvertError, Result};
use crate::mapping::{FieldMapping, LogicalField};
use crate::table::SourceTable;
use log::{debug, warn};
use serde::Serialize;
use std::str::FromStr;

/// ISO 20022 `Max70Text` limit for names and address lines.
pub const MAX_NAME_LEN: usize = 70;

/// ISO 20022 `Max35Text` limit for end-to-end and creditor references.
pub const MAX_REFERENCE_LEN: usize = 35;

/// Creditor name used when no name is available.
pub const NAME_NOT_PROVIDED: &str = "NOTPROVIDED";

/// A single credit transfer, cleaned and ready for message building.
///
/// # Invariants
///
/// - `end_to_end_id` is non-empty and at most 35 characters
/// - `creditor_name` is non-empty and at most 70 characters
/// - `creditor_iban` and `creditor_bic` contain no whitespace
/// - `amount` is non-negative with exactly 2 decimal places
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedPayment {
    /// Reference travelling with the payment; also the unstructured remittance line.
    pub end_to_end_id: String,

    /// Beneficiary name.
    pub creditor_name: String,

    /// Beneficiary account, passed through without checksum validation.
    pub creditor_iban: String,

    /// Beneficiary bank, when known.
    pub creditor_bic: Option<String>,

    /// Instructed amount.
    pub amount: Amount,

    /// ISO 4217 currency code (always the batch currency).
    pub currency: String,

    /// Single combined postal address line.
    pub postal_address: Option<String>,

    /// Structured (SCOR) creditor reference.
    pub creditor_reference: Option<String>,
}

/// Turns raw rows into `NormalizedPayment`s using a resolved `FieldMapping`.
#[derive(Debug, Clone)]
pub struct RowNormalizer<'a> {
    mapping: &'a FieldMapping,
    currency: &'a str,
    structured_remittance: bool,
}

impl<'a> RowNormalizer<'a> {
    pub fn new(mapping: &'a FieldMapping, currency: &'a str, structured_remittance: bool) -> Self {
        RowNormalizer {
            mapping,
            currency,
            structured_remittance,
        }
    }

    /// Normalizes every data row of `table`.
    ///
    /// Rows missing an IBAN or an amount are dropped. All remaining rows are
    /// fully validated here, so any invalid amount aborts the conversion
    /// before an aggregate is ever computed.
    pub fn normalize_table(&self, table: &SourceTable) -> Result<Vec<NormalizedPayment>> {
        // 1-indexed file line, accounting for the header row
        let first_line = if table.header().is_some() { 2 } else { 1 };
        let mut payments = Vec::with_capacity(table.rows().len());

        for (idx, row) in table.rows().iter().enumerate() {
            let line = idx + first_line;
            if let Some(payment) = self.normalize(row, line, payments.len() + 1)? {
                payments.push(payment);
            }
        }

        debug!(
            "Normalized {} of {} rows",
            payments.len(),
            table.rows().len()
        );
        Ok(payments)
    }

    /// Normalizes one row.
    ///
    /// `line` is used for error messages; `ordinal` is the 1-based position
    /// this payment takes among retained rows and feeds the fallback
    /// reference. Returns `Ok(None)` when the row is skipped.
    pub fn normalize(
        &self,
        row: &[String],
        line: usize,
        ordinal: usize,
    ) -> Result<Option<NormalizedPayment>> {
        let iban = match self.text(LogicalField::CreditorIban, row) {
            Some(iban) => clean_identifier(iban),
            None => {
                debug!("Row {}: No creditor IBAN, skipping", line);
                return Ok(None);
            }
        };

        let raw_amount = match self.text(LogicalField::Amount, row) {
            Some(amount) => amount,
            None => {
                debug!("Row {}: No amount, skipping", line);
                return Ok(None);
            }
        };
        let amount = parse_amount(raw_amount, line)?;

        if let Some(found) = self.text(LogicalField::Currency, row) {
            if !found.eq_ignore_ascii_case(self.currency) {
                return Err(ConvertError::CurrencyMismatch {
                    row: line,
                    found: found.to_string(),
                    expected: self.currency.to_string(),
                });
            }
        }

        let end_to_end_id = match self.text(LogicalField::Reference, row) {
            Some(reference) => {
                if reference.chars().count() > MAX_REFERENCE_LEN {
                    warn!("Row {}: Reference truncated to {} chars", line, MAX_REFERENCE_LEN);
                }
                truncate_chars(reference, MAX_REFERENCE_LEN)
            }
            None => fallback_reference(ordinal),
        };

        let creditor_name = match self.text(LogicalField::CreditorName, row) {
            Some(name) => {
                if name.chars().count() > MAX_NAME_LEN {
                    warn!("Row {}: Creditor name truncated to {} chars", line, MAX_NAME_LEN);
                }
                truncate_chars(name, MAX_NAME_LEN)
            }
            None => NAME_NOT_PROVIDED.to_string(),
        };

        let creditor_bic = self
            .text(LogicalField::CreditorBic, row)
            .map(clean_identifier)
            .filter(|bic| !bic.is_empty());

        let postal_address = join_address(
            self.text(LogicalField::AddressLine1, row),
            self.text(LogicalField::AddressLine2, row),
        )
        .map(|address| {
            if address.chars().count() > MAX_NAME_LEN {
                warn!("Row {}: Postal address truncated to {} chars", line, MAX_NAME_LEN);
            }
            truncate_chars(&address, MAX_NAME_LEN)
        });

        let creditor_reference = match self.text(LogicalField::CreditorReference, row) {
            Some(reference) => Some(truncate_chars(reference, MAX_REFERENCE_LEN)),
            None if self.structured_remittance => Some(end_to_end_id.clone()),
            None => None,
        };

        Ok(Some(NormalizedPayment {
            end_to_end_id,
            creditor_name,
            creditor_iban: iban,
            creditor_bic,
            amount,
            currency: self.currency.to_string(),
            postal_address,
            creditor_reference,
        }))
    }

    /// Trimmed, non-empty cell text for a mapped field.
    fn text<'r>(&self, field: LogicalField, row: &'r [String]) -> Option<&'r str> {
        self.mapping
            .cell(field, row)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Parses an amount cell.
///
/// Unparseable and negative values are rejected, as are values too large to
/// carry two decimal places or exceeding `Amount::max()`.
pub fn parse_amount(raw: &str, line: usize) -> Result<Amount> {
    let invalid = || ConvertError::InvalidAmount {
        row: line,
        value: raw.to_string(),
    };
    let amount = Amount::from_str(raw).map_err(|_| invalid())?;
    if amount.is_negative() || !amount.is_within_limits() {
        return Err(invalid());
    }
    Ok(amount)
}

/// Placeholder end-to-end reference, `TRX-00001` style.
pub fn fallback_reference(ordinal: usize) -> String {
    format!("TRX-{:05}", ordinal)
}

/// Removes all whitespace (IBANs are often exported in groups of four).
pub fn clean_identifier(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Keeps at most `max` characters, dropping whitespace left at the cut.
pub fn truncate_chars(s: &str, max: usize) -> String {
    let truncated: String = s.chars().take(max).collect();
    truncated.trim_end().to_string()
}

fn join_address(first: Option<&str>, second: Option<&str>) -> Option<String> {
    match (first, second) {
        (Some(a), Some(b)) => Some(format!("{}, {}", a, b)),
        (Some(a), None) | (None, Some(a)) => Some(a.to_string()),
        (None, None) => None,
    }
}
