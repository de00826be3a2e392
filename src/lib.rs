//! # SEPA Converter
//!
//! Turns tabular payment exports (CSV or any delimited text) into ISO 20022
//! pain.001.001.09 Customer Credit Transfer Initiation documents ready for
//! upload to a bank.
//!
//! ## Design Principles
//!
//! - **Exact money**: Amounts are `rust_decimal` values held at cent precision
//! - **Flexible columns**: Explicit selections, heading aliases, then fixed
//!   positions
//! - **All or nothing**: A document is written only after every row validated
//! - **Deterministic output**: Same input and clock, byte-identical XML
//!
//! ## Example
//!
//! ```no_run
//! use sepa_converter::{Converter, ConverterConfig};
//! use std::io::Cursor;
//!
//! let mut config = ConverterConfig::default();
//! config.debtor.name = "Acme Ltd".into();
//! config.debtor.iban = "GB29NWBK60161331926819".into();
//! config.debtor.bic = "NWBKGB2L".into();
//!
//! let csv = "Name,IBAN,Amount,Reference\nAlice,DE89370400440532013000,100.00,inv-1\n";
//! let converter = Converter::new(config).unwrap();
//! converter.convert(Cursor::new(csv), std::io::stdout()).unwrap();
//! ```

pub mod amount;
pub mod batch;
pub mod clock;
pub mod config;
pub mod converter;
pub mod error;
pub mod mapping;
pub mod message;
pub mod payment;
pub mod reader;
pub mod table;
pub mod xml;

pub use amount::Amount;
pub use batch::{Debtor, PaymentBatch};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ConverterConfig, DebtorConfig, InputConfig};
pub use converter::{ConversionSummary, Converter};
pub use error::{ConvertError, Result};
pub use mapping::{ColumnLocator, FieldMapping, LogicalField, MappingSpec};
pub use message::{MessageOptions, SepaMessage};
pub use payment::{NormalizedPayment, RowNormalizer};
pub use reader::{read_message, ParsedMessage};
pub use table::SourceTable;
pub use xml::{Element, Serializer};
