//! Raw tabular input as read from a delimited export.

use crate::config::InputConfig;
use crate::error::Result;
use csv::ReaderBuilder;
use log::debug;
use std::io::Read;

/// An immutable table of text cells with an optional header row.
///
/// Rows keep their original order. The table is read once per conversion and
/// never mutated afterwards; everything downstream derives new values from it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceTable {
    header: Option<Vec<String>>,
    rows: Vec<Vec<String>>,
}

impl SourceTable {
    /// Builds a table from already split cells.
    pub fn new(header: Option<Vec<String>>, rows: Vec<Vec<String>>) -> Self {
        SourceTable { header, rows }
    }

    /// Reads a delimited table.
    ///
    /// Every record must have the same number of fields as the first one;
    /// a ragged file is reported as a CSV error rather than patched up.
    pub fn from_reader<R: Read>(reader: R, input: &InputConfig) -> Result<Self> {
        let mut csv_reader = ReaderBuilder::new()
            .delimiter(input.delimiter)
            .has_headers(false)
            .flexible(false)
            .from_reader(reader);

        let mut records = Vec::new();
        for result in csv_reader.records() {
            let record = result?;
            records.push(record.iter().map(str::to_string).collect::<Vec<_>>());
        }

        let header = if input.has_header && !records.is_empty() {
            Some(records.remove(0))
        } else {
            None
        };

        debug!(
            "Read table with {} data rows (header: {})",
            records.len(),
            header.is_some()
        );

        Ok(SourceTable {
            header,
            rows: records,
        })
    }

    /// Header cells, if the table has a header row.
    pub fn header(&self) -> Option<&[String]> {
        self.header.as_deref()
    }

    /// Data rows, excluding the header.
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Number of columns, taken from the header or the first data row.
    pub fn width(&self) -> usize {
        self.header
            .as_ref()
            .or_else(|| self.rows.first())
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Returns `true` if there are no data rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
