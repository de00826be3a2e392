//! Column resolution: which physical column feeds which logical field.
//!
//! Three strategies are consulted, in priority order:
//!
//! 1. explicit, user-confirmed selections (by index or heading text)
//! 2. heading aliases, matched case-insensitively on word boundaries
//! 3. fixed zero-based positions
//!
//! A column claimed by a higher-priority strategy is never handed to another
//! field by a lower-priority one.

use crate::error::{ConvertError, Result};
use crate::table::SourceTable;
use log::debug;
use serde::{Deserialize, Deserializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// A value the converter needs from each payment row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogicalField {
    CreditorName,
    CreditorIban,
    CreditorBic,
    Amount,
    Currency,
    Reference,
    CreditorReference,
    AddressLine1,
    AddressLine2,
}

/// How a heading alias is compared against a normalized heading.
#[derive(Debug, Clone, Copy)]
enum Alias {
    /// Heading must equal the alias.
    Exact(&'static str),
    /// Heading must equal the alias or contain it as a whole-word run.
    Words(&'static str),
}

const DEBTOR_MARKERS: [&str; 5] = ["debtor", "payer", "originator", "ordering", "sender"];

impl LogicalField {
    /// All fields, in the order they claim columns during heading matching.
    /// More specific fields come before the ones whose aliases overlap them.
    pub const ALL: [LogicalField; 9] = [
        LogicalField::CreditorIban,
        LogicalField::Amount,
        LogicalField::CreditorName,
        LogicalField::CreditorBic,
        LogicalField::Currency,
        LogicalField::CreditorReference,
        LogicalField::Reference,
        LogicalField::AddressLine1,
        LogicalField::AddressLine2,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalField::CreditorName => "creditor_name",
            LogicalField::CreditorIban => "creditor_iban",
            LogicalField::CreditorBic => "creditor_bic",
            LogicalField::Amount => "amount",
            LogicalField::Currency => "currency",
            LogicalField::Reference => "reference",
            LogicalField::CreditorReference => "creditor_reference",
            LogicalField::AddressLine1 => "address_line1",
            LogicalField::AddressLine2 => "address_line2",
        }
    }

    /// Fields without which no payment can be built.
    pub fn is_required(&self) -> bool {
        matches!(self, LogicalField::CreditorIban | LogicalField::Amount)
    }

    /// Fields describing the beneficiary; never matched to debtor-side headings.
    fn is_creditor_side(&self) -> bool {
        matches!(
            self,
            LogicalField::CreditorName
                | LogicalField::CreditorIban
                | LogicalField::CreditorBic
                | LogicalField::CreditorReference
                | LogicalField::AddressLine1
                | LogicalField::AddressLine2
        )
    }

    /// Heading aliases in order of preference.
    fn aliases(&self) -> &'static [Alias] {
        use Alias::{Exact, Words};
        match self {
            LogicalField::CreditorIban => &[
                Words("iban"),
                Words("beneficiary account"),
                Words("creditor account"),
            ],
            LogicalField::CreditorName => &[
                Words("beneficiary name"),
                Words("creditor name"),
                Exact("creditorname"),
                Words("payee name"),
                Words("recipient name"),
                Exact("name"),
            ],
            LogicalField::CreditorBic => &[Words("bic"), Words("swift"), Words("beneficiary bank")],
            LogicalField::Amount => &[Exact("amount"), Exact("instructed amount")],
            LogicalField::Currency => &[Words("currency"), Exact("ccy")],
            LogicalField::CreditorReference => {
                &[Words("creditor reference"), Words("structured reference")]
            }
            LogicalField::Reference => &[
                Words("reference"),
                Words("description"),
                Words("remittance"),
                Words("end to end id"),
            ],
            LogicalField::AddressLine1 => {
                &[Words("address line 1"), Words("address 1"), Words("street")]
            }
            LogicalField::AddressLine2 => &[
                Words("address line 2"),
                Words("address 2"),
                Words("city"),
                Words("town"),
            ],
        }
    }
}

impl fmt::Display for LogicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogicalField {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        LogicalField::ALL
            .into_iter()
            .find(|field| field.as_str() == wanted)
            .ok_or_else(|| format!("unknown field '{}'", s))
    }
}

impl<'de> Deserialize<'de> for LogicalField {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        LogicalField::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// Where a field lives in the table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ColumnLocator {
    /// Zero-based column index.
    Index(usize),
    /// Heading text, compared case- and whitespace-insensitively.
    Header(String),
}

impl ColumnLocator {
    /// Interprets a bare number as an index and anything else as a heading.
    pub fn parse(s: &str) -> Self {
        let trimmed = s.trim();
        match trimmed.parse::<usize>() {
            Ok(index) => ColumnLocator::Index(index),
            Err(_) => ColumnLocator::Header(trimmed.to_string()),
        }
    }
}

impl fmt::Display for ColumnLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnLocator::Index(index) => write!(f, "#{}", index),
            ColumnLocator::Header(header) => f.write_str(header),
        }
    }
}

/// Resolution strategies for one conversion.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MappingSpec {
    /// User-confirmed selections; always win.
    pub explicit: BTreeMap<LogicalField, ColumnLocator>,

    /// Whether heading aliases are consulted.
    pub match_headers: bool,

    /// Last-resort fixed positions.
    pub positions: BTreeMap<LogicalField, usize>,
}

impl Default for MappingSpec {
    /// Heading matching with the payout-ledger export layout as fallback.
    fn default() -> Self {
        Self {
            explicit: BTreeMap::new(),
            match_headers: true,
            positions: BTreeMap::from([
                (LogicalField::CreditorName, 4),
                (LogicalField::Amount, 13),
                (LogicalField::CreditorIban, 35),
            ]),
        }
    }
}

impl MappingSpec {
    /// Resolves every logical field against the table.
    ///
    /// Fails with `MissingColumn` when a required field is left unresolved.
    pub fn resolve(&self, table: &SourceTable) -> Result<FieldMapping> {
        let width = table.width();
        let headings: Option<Vec<String>> = table
            .header()
            .map(|cells| cells.iter().map(|c| normalize_heading(c)).collect());

        let mut columns: BTreeMap<LogicalField, usize> = BTreeMap::new();
        let mut claimed: BTreeSet<usize> = BTreeSet::new();

        for (field, locator) in &self.explicit {
            let index = match locator {
                ColumnLocator::Index(index) if *index < width => Some(*index),
                ColumnLocator::Index(_) => None,
                ColumnLocator::Header(text) => {
                    let wanted = normalize_heading(text);
                    headings
                        .as_ref()
                        .and_then(|h| h.iter().position(|heading| *heading == wanted))
                }
            };
            let index = index.ok_or_else(|| ConvertError::UnknownColumn {
                field: *field,
                locator: locator.to_string(),
            })?;
            debug!("Field {} -> column {} (explicit)", field, index);
            columns.insert(*field, index);
            claimed.insert(index);
        }

        if let (true, Some(headings), Some(original)) =
            (self.match_headers, headings.as_ref(), table.header())
        {
            for field in LogicalField::ALL {
                if columns.contains_key(&field) {
                    continue;
                }
                if let Some(index) = match_heading(field, headings, original, &claimed)? {
                    debug!(
                        "Field {} -> column {} ('{}', heading match)",
                        field, index, original[index]
                    );
                    columns.insert(field, index);
                    claimed.insert(index);
                }
            }
        }

        for (field, index) in &self.positions {
            if columns.contains_key(field) {
                continue;
            }
            if *index >= width {
                debug!("Field {}: fixed column {} out of range", field, index);
                continue;
            }
            if claimed.contains(index) {
                debug!("Field {}: fixed column {} already claimed", field, index);
                continue;
            }
            debug!("Field {} -> column {} (fixed position)", field, index);
            columns.insert(*field, *index);
            claimed.insert(*index);
        }

        if let Some(field) = LogicalField::ALL
            .into_iter()
            .find(|f| f.is_required() && !columns.contains_key(f))
        {
            return Err(ConvertError::MissingColumn { field });
        }

        Ok(FieldMapping { columns })
    }
}

/// Lowercases and collapses every run of non-alphanumerics into one space.
fn normalize_heading(s: &str) -> String {
    s.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn contains_words(heading: &str, alias: &str) -> bool {
    format!(" {} ", heading).contains(&format!(" {} ", alias))
}

fn mentions_debtor(heading: &str) -> bool {
    heading
        .split(' ')
        .any(|word| DEBTOR_MARKERS.contains(&word))
}

/// Finds the column for `field` among unclaimed headings.
///
/// Exact matches are tried for every alias before any partial match, and
/// aliases are tried in preference order. Several candidates for the same
/// alias is an error rather than a guess.
fn match_heading(
    field: LogicalField,
    headings: &[String],
    original: &[String],
    claimed: &BTreeSet<usize>,
) -> Result<Option<usize>> {
    let eligible: Vec<usize> = (0..headings.len())
        .filter(|i| !claimed.contains(i) && !headings[*i].is_empty())
        .filter(|i| !(field.is_creditor_side() && mentions_debtor(&headings[*i])))
        .collect();

    let exact_passes = field.aliases().iter().map(|alias| match alias {
        Alias::Exact(a) | Alias::Words(a) => (*a, false),
    });
    let partial_passes = field.aliases().iter().filter_map(|alias| match alias {
        Alias::Words(a) => Some((*a, true)),
        Alias::Exact(_) => None,
    });

    for (alias, partial) in exact_passes.chain(partial_passes) {
        let hits: Vec<usize> = eligible
            .iter()
            .copied()
            .filter(|i| {
                let heading = &headings[*i];
                if partial {
                    contains_words(heading, alias)
                } else {
                    heading == alias
                }
            })
            .collect();

        match hits.as_slice() {
            [] => continue,
            [index] => return Ok(Some(*index)),
            _ => {
                return Err(ConvertError::AmbiguousColumn {
                    field,
                    candidates: hits.iter().map(|i| original[*i].clone()).collect(),
                })
            }
        }
    }

    Ok(None)
}

/// Resolved logical field → zero-based column index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMapping {
    columns: BTreeMap<LogicalField, usize>,
}

impl FieldMapping {
    /// Column index for a field, if it was resolved.
    pub fn column(&self, field: LogicalField) -> Option<usize> {
        self.columns.get(&field).copied()
    }

    /// The raw cell for a field in `row`, if the field is mapped.
    pub fn cell<'a>(&self, field: LogicalField, row: &'a [String]) -> Option<&'a str> {
        self.column(field)
            .and_then(|index| row.get(index))
            .map(String::as_str)
    }

    /// Iterates over resolved fields in field order.
    pub fn iter(&self) -> impl Iterator<Item = (LogicalField, usize)> + '_ {
        self.columns.iter().map(|(field, index)| (*field, *index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(header: &[&str]) -> SourceTable {
        SourceTable::new(
            Some(header.iter().map(|s| s.to_string()).collect()),
            vec![header.iter().map(|_| String::new()).collect()],
        )
    }

    fn headers_only() -> MappingSpec {
        MappingSpec {
            positions: BTreeMap::new(),
            ..MappingSpec::default()
        }
    }

    #[test]
    fn test_heading_aliases() {
        let t = table(&["Beneficiary Name", " IBAN ", "Amount", "BIC", "Description"]);
        let mapping = headers_only().resolve(&t).unwrap();
        assert_eq!(mapping.column(LogicalField::CreditorName), Some(0));
        assert_eq!(mapping.column(LogicalField::CreditorIban), Some(1));
        assert_eq!(mapping.column(LogicalField::Amount), Some(2));
        assert_eq!(mapping.column(LogicalField::CreditorBic), Some(3));
        assert_eq!(mapping.column(LogicalField::Reference), Some(4));
        assert_eq!(mapping.column(LogicalField::Currency), None);
    }

    #[test]
    fn test_heading_case_and_whitespace_tolerance() {
        let t = table(&["BENEFICIARY   ACCOUNT", "amount ", "creditorName"]);
        let mapping = headers_only().resolve(&t).unwrap();
        assert_eq!(mapping.column(LogicalField::CreditorIban), Some(0));
        assert_eq!(mapping.column(LogicalField::Amount), Some(1));
        assert_eq!(mapping.column(LogicalField::CreditorName), Some(2));
    }

    #[test]
    fn test_amount_requires_exact_heading() {
        let t = table(&["IBAN", "Amount Before Fees"]);
        let result = headers_only().resolve(&t);
        assert!(matches!(
            result,
            Err(ConvertError::MissingColumn {
                field: LogicalField::Amount
            })
        ));
    }

    #[test]
    fn test_no_match_inside_unrelated_words() {
        // "public" contains "bic" but not as a word
        let t = table(&["IBAN", "Amount", "Public Note"]);
        let mapping = headers_only().resolve(&t).unwrap();
        assert_eq!(mapping.column(LogicalField::CreditorBic), None);
    }

    #[test]
    fn test_debtor_headings_not_used_for_creditor() {
        let t = table(&["Debtor IBAN", "Beneficiary IBAN", "Amount"]);
        let mapping = headers_only().resolve(&t).unwrap();
        assert_eq!(mapping.column(LogicalField::CreditorIban), Some(1));
    }

    #[test]
    fn test_ambiguous_partial_match_fails() {
        let t = table(&["IBAN", "Amount", "Payment reference", "Internal reference"]);
        let result = headers_only().resolve(&t);
        match result {
            Err(ConvertError::AmbiguousColumn { field, candidates }) => {
                assert_eq!(field, LogicalField::Reference);
                assert_eq!(candidates, vec!["Payment reference", "Internal reference"]);
            }
            other => panic!("Expected AmbiguousColumn, got {:?}", other),
        }
    }

    #[test]
    fn test_beneficiary_headings_keep_their_own_field() {
        let t = table(&["IBAN", "Amount", "Beneficiary Reference"]);
        let mapping = headers_only().resolve(&t).unwrap();
        assert_eq!(mapping.column(LogicalField::CreditorName), None);
        assert_eq!(mapping.column(LogicalField::Reference), Some(2));

        let t = table(&["Beneficiary Bank", "IBAN", "Amount"]);
        let mapping = headers_only().resolve(&t).unwrap();
        assert_eq!(mapping.column(LogicalField::CreditorName), None);
        assert_eq!(mapping.column(LogicalField::CreditorBic), Some(0));
    }

    #[test]
    fn test_exact_match_beats_partial() {
        let t = table(&["IBAN", "Amount", "Payment reference", "Reference"]);
        let mapping = headers_only().resolve(&t).unwrap();
        assert_eq!(mapping.column(LogicalField::Reference), Some(3));
    }

    #[test]
    fn test_creditor_reference_claimed_before_reference() {
        let t = table(&["IBAN", "Amount", "Creditor Reference", "Reference"]);
        let mapping = headers_only().resolve(&t).unwrap();
        assert_eq!(mapping.column(LogicalField::CreditorReference), Some(2));
        assert_eq!(mapping.column(LogicalField::Reference), Some(3));
    }

    #[test]
    fn test_explicit_selection_wins() {
        let t = table(&["IBAN", "Amount", "Memo", "Reference"]);
        let mut spec = headers_only();
        spec.explicit
            .insert(LogicalField::Reference, ColumnLocator::Header("memo".into()));
        let mapping = spec.resolve(&t).unwrap();
        assert_eq!(mapping.column(LogicalField::Reference), Some(2));
    }

    #[test]
    fn test_explicit_unknown_column_fails() {
        let t = table(&["IBAN", "Amount"]);
        let mut spec = headers_only();
        spec.explicit
            .insert(LogicalField::Reference, ColumnLocator::Index(7));
        assert!(matches!(
            spec.resolve(&t),
            Err(ConvertError::UnknownColumn { .. })
        ));
    }

    #[test]
    fn test_fixed_positions_without_header() {
        let t = SourceTable::new(None, vec![vec!["x".to_string(); 36]]);
        let mapping = MappingSpec::default().resolve(&t).unwrap();
        assert_eq!(mapping.column(LogicalField::CreditorName), Some(4));
        assert_eq!(mapping.column(LogicalField::Amount), Some(13));
        assert_eq!(mapping.column(LogicalField::CreditorIban), Some(35));
    }

    #[test]
    fn test_fixed_position_out_of_range_is_missing() {
        let t = SourceTable::new(None, vec![vec!["x".to_string(); 14]]);
        let result = MappingSpec::default().resolve(&t);
        assert!(matches!(
            result,
            Err(ConvertError::MissingColumn {
                field: LogicalField::CreditorIban
            })
        ));
    }

    #[test]
    fn test_fixed_position_skips_claimed_column() {
        let t = table(&["IBAN", "Amount", "Payee Name"]);
        let mut spec = headers_only();
        spec.positions.insert(LogicalField::CreditorBic, 0);
        let mapping = spec.resolve(&t).unwrap();
        assert_eq!(mapping.column(LogicalField::CreditorBic), None);
        assert_eq!(mapping.column(LogicalField::CreditorName), Some(2));
    }

    #[test]
    fn test_header_matching_disabled() {
        let t = table(&["IBAN", "Amount"]);
        let spec = MappingSpec {
            match_headers: false,
            positions: BTreeMap::from([(LogicalField::CreditorIban, 0), (LogicalField::Amount, 1)]),
            ..MappingSpec::default()
        };
        let mapping = spec.resolve(&t).unwrap();
        assert_eq!(mapping.column(LogicalField::CreditorIban), Some(0));
        assert_eq!(mapping.column(LogicalField::Reference), None);
    }

    #[test]
    fn test_field_and_locator_parsing() {
        assert_eq!("amount".parse::<LogicalField>(), Ok(LogicalField::Amount));
        assert_eq!(
            "Creditor-IBAN".parse::<LogicalField>(),
            Ok(LogicalField::CreditorIban)
        );
        assert!("debtor".parse::<LogicalField>().is_err());
        assert_eq!(ColumnLocator::parse("13"), ColumnLocator::Index(13));
        assert_eq!(
            ColumnLocator::parse(" Payment Ref "),
            ColumnLocator::Header("Payment Ref".into())
        );
    }

    #[test]
    fn test_cell_lookup() {
        let t = table(&["IBAN", "Amount"]);
        let mapping = headers_only().resolve(&t).unwrap();
        let row = vec!["DE01".to_string(), "5".to_string()];
        assert_eq!(mapping.cell(LogicalField::CreditorIban, &row), Some("DE01"));
        assert_eq!(mapping.cell(LogicalField::Reference, &row), None);
        assert_eq!(mapping.iter().count(), 2);
    }
}
