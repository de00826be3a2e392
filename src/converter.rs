//! Conversion pipeline: delimited table in, pain.001.001.09 document out.
//!
//! Each call reads its input fully, resolves columns, normalizes rows,
//! builds the batch and message, and serializes into memory. The writer is
//! only touched once the whole document exists, so a failed conversion never
//! leaves a partial file behind.

use crate::amount::Amount;
use crate::batch::{Debtor, PaymentBatch};
use crate::clock::{Clock, SystemClock};
use crate::config::ConverterConfig;
use crate::error::Result;
use crate::message::{MessageOptions, SepaMessage};
use crate::payment::RowNormalizer;
use crate::table::SourceTable;
use crate::xml::Serializer;
use log::info;
use std::io::{Read, Write};

/// Outcome of a successful conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionSummary {
    pub message_id: String,
    pub transaction_count: usize,
    pub control_sum: Amount,
}

/// Converts payment tables into credit transfer initiation messages.
///
/// Holds only the validated configuration and a clock; it can be reused for
/// any number of conversions.
pub struct Converter {
    config: ConverterConfig,
    clock: Box<dyn Clock>,
}

impl Converter {
    /// Creates a converter using the system clock.
    ///
    /// Fails with `InvalidConfig` when the debtor or currency is unusable.
    pub fn new(config: ConverterConfig) -> Result<Self> {
        Self::with_clock(config, SystemClock)
    }

    /// Creates a converter with an explicit time source.
    pub fn with_clock<C: Clock + 'static>(config: ConverterConfig, clock: C) -> Result<Self> {
        config.validate()?;
        Ok(Converter {
            config,
            clock: Box::new(clock),
        })
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Reads the delimited input using the configured layout.
    pub fn read_table<R: Read>(&self, reader: R) -> Result<SourceTable> {
        SourceTable::from_reader(reader, &self.config.input)
    }

    /// Resolves columns and normalizes every row into a batch.
    pub fn build_batch(&self, table: &SourceTable) -> Result<PaymentBatch> {
        let mapping = self.config.columns.resolve(table)?;
        let currency = self.config.currency_code();
        let payments =
            RowNormalizer::new(&mapping, &currency, self.config.structured_remittance)
                .normalize_table(table)?;

        PaymentBatch::new(Debtor::from(&self.config.debtor), &currency, payments)
    }

    /// Builds the message for `batch`, reading the clock once.
    pub fn build_message(&self, batch: &PaymentBatch) -> Result<SepaMessage> {
        let options = MessageOptions {
            batch_booking: self.config.batch_booking,
            execution_date: self.config.execution_date,
        };
        SepaMessage::build(batch, &options, self.clock.now())
    }

    /// Renders `batch` as a complete XML document.
    pub fn render(&self, batch: &PaymentBatch) -> Result<Vec<u8>> {
        self.serialize(&self.build_message(batch)?)
    }

    /// Runs the whole pipeline and writes the document to `writer`.
    pub fn convert<R: Read, W: Write>(&self, reader: R, mut writer: W) -> Result<ConversionSummary> {
        let table = self.read_table(reader)?;
        let batch = self.build_batch(&table)?;
        let message = self.build_message(&batch)?;
        let bytes = self.serialize(&message)?;

        writer.write_all(&bytes)?;
        writer.flush()?;

        let summary = ConversionSummary {
            message_id: message.group_header.message_id,
            transaction_count: message.group_header.number_of_transactions,
            control_sum: message.group_header.control_sum,
        };
        info!(
            "Message {}: {} transactions, control sum {} {}",
            summary.message_id,
            summary.transaction_count,
            summary.control_sum,
            batch.currency()
        );
        Ok(summary)
    }

    /// Writes the normalized payments as CSV, one row per transfer.
    ///
    /// Returns the number of payments written.
    pub fn preview<R: Read, W: Write>(&self, reader: R, writer: W) -> Result<usize> {
        let table = self.read_table(reader)?;
        let batch = self.build_batch(&table)?;

        let mut csv_writer = csv::Writer::from_writer(writer);
        for payment in batch.payments() {
            csv_writer.serialize(payment)?;
        }
        csv_writer.flush()?;

        Ok(batch.transaction_count())
    }

    fn serialize(&self, message: &SepaMessage) -> Result<Vec<u8>> {
        Serializer::new(self.config.schema_location).to_bytes(&message.to_element())
    }
}
