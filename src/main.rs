//! SEPA Converter CLI
//!
//! Reads a delimited payment export and writes a pain.001.001.09 credit
//! transfer initiation, or previews how rows will be interpreted.
//!
//! # Usage
//!
//! ```bash
//! sepa-converter convert payments.csv --config debtor.toml -o payments.xml
//! sepa-converter preview payments.csv --config debtor.toml
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Set to `info` or `debug` to control logging verbosity

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use sepa_converter::config::parse_delimiter;
use sepa_converter::{ColumnLocator, Converter, ConverterConfig, LogicalField, Result};
use std::fs::{self, File};
use std::io::{self, BufReader, Write};
use std::path::PathBuf;
use std::process;

/// Convert payment spreadsheets into SEPA credit transfer files.
#[derive(Parser, Debug)]
#[command(name = "sepa-converter", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a pain.001.001.09 document for the input table.
    Convert {
        /// Delimited input file.
        input: PathBuf,

        /// Output file. Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        options: Options,
    },

    /// Print the normalized payments as CSV without producing XML.
    Preview {
        /// Delimited input file.
        input: PathBuf,

        #[command(flatten)]
        options: Options,
    },
}

/// Settings shared by every subcommand. Flags override the config file.
#[derive(Args, Debug)]
struct Options {
    /// TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    debtor_name: Option<String>,

    #[arg(long)]
    debtor_iban: Option<String>,

    #[arg(long)]
    debtor_bic: Option<String>,

    /// ISO 4217 currency code of the batch.
    #[arg(long)]
    currency: Option<String>,

    /// Request a single debit entry for the whole batch.
    #[arg(long, overrides_with = "no_batch_booking")]
    batch_booking: bool,

    /// Request one debit entry per transfer.
    #[arg(long, overrides_with = "batch_booking")]
    no_batch_booking: bool,

    /// Emit xsi:schemaLocation on the document root.
    #[arg(long, overrides_with = "no_schema_location")]
    schema_location: bool,

    #[arg(long, overrides_with = "schema_location")]
    no_schema_location: bool,

    /// Add a structured SCOR creditor reference to every transfer.
    #[arg(long, overrides_with = "no_structured_remittance")]
    structured_remittance: bool,

    #[arg(long, overrides_with = "structured_remittance")]
    no_structured_remittance: bool,

    /// Requested execution date (YYYY-MM-DD).
    #[arg(long)]
    execution_date: Option<NaiveDate>,

    /// Field delimiter; `tab` for tab-separated input.
    #[arg(long, value_parser = parse_delimiter)]
    delimiter: Option<u8>,

    /// The first row is data, not headings.
    #[arg(long)]
    no_header: bool,

    /// Do not guess columns from headings.
    #[arg(long)]
    no_header_matching: bool,

    /// Select a column for a field, by heading or zero-based index.
    #[arg(long = "column", value_name = "FIELD=LOCATOR", value_parser = parse_column)]
    columns: Vec<(LogicalField, ColumnLocator)>,
}

impl Options {
    fn into_config(self) -> Result<ConverterConfig> {
        let mut config = match &self.config {
            Some(path) => ConverterConfig::load(path)?,
            None => ConverterConfig::default(),
        };

        if let Some(name) = self.debtor_name {
            config.debtor.name = name;
        }
        if let Some(iban) = self.debtor_iban {
            config.debtor.iban = iban;
        }
        if let Some(bic) = self.debtor_bic {
            config.debtor.bic = bic;
        }
        if let Some(currency) = self.currency {
            config.currency = currency;
        }
        if let Some(date) = self.execution_date {
            config.execution_date = Some(date);
        }
        if let Some(delimiter) = self.delimiter {
            config.input.delimiter = delimiter;
        }

        if let Some(on) = toggle(self.batch_booking, self.no_batch_booking) {
            config.batch_booking = on;
        }
        if let Some(on) = toggle(self.schema_location, self.no_schema_location) {
            config.schema_location = on;
        }
        if let Some(on) = toggle(self.structured_remittance, self.no_structured_remittance) {
            config.structured_remittance = on;
        }
        if self.no_header {
            config.input.has_header = false;
        }
        if self.no_header_matching {
            config.columns.match_headers = false;
        }
        config.columns.explicit.extend(self.columns);

        Ok(config)
    }
}

/// Resolves a `--x` / `--no-x` pair; `None` keeps the configured value.
fn toggle(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

fn parse_column(s: &str) -> std::result::Result<(LogicalField, ColumnLocator), String> {
    let (field, locator) = s
        .split_once('=')
        .ok_or_else(|| format!("expected FIELD=LOCATOR, got '{}'", s))?;
    if locator.trim().is_empty() {
        return Err(format!("missing column for '{}'", field));
    }
    Ok((field.parse()?, ColumnLocator::parse(locator)))
}

fn main() {
    env_logger::init();

    if let Err(e) = run(Cli::parse()) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Convert {
            input,
            output,
            options,
        } => {
            let converter = Converter::new(options.into_config()?)?;
            let reader = BufReader::new(File::open(&input)?);

            // Buffer the document so a failed run leaves no output file
            let mut document = Vec::new();
            converter.convert(reader, &mut document)?;

            match output {
                Some(path) => fs::write(path, &document)?,
                None => {
                    let mut stdout = io::stdout().lock();
                    stdout.write_all(&document)?;
                    stdout.flush()?;
                }
            }
        }
        Command::Preview { input, options } => {
            let converter = Converter::new(options.into_config()?)?;
            let reader = BufReader::new(File::open(&input)?);

            let stdout = io::stdout();
            converter.preview(reader, stdout.lock())?;
        }
    }

    Ok(())
}
