//! Library-level conversion scenarios.
//!
//! Each test drives the public `Converter` API end to end and checks the
//! rendered document, usually by reading it back.

use chrono::{NaiveDate, NaiveDateTime};
use sepa_converter::{
    read_message, Amount, ColumnLocator, ConvertError, Converter, ConverterConfig, FixedClock,
    LogicalField, ParsedMessage,
};
use std::io::Cursor;

fn fixed_now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 5, 16)
        .unwrap()
        .and_hms_opt(14, 3, 9)
        .unwrap()
}

fn base_config() -> ConverterConfig {
    let mut config = ConverterConfig::default();
    config.debtor.name = "Acme Ltd".into();
    config.debtor.iban = "GB29 NWBK 6016 1331 9268 19".into();
    config.debtor.bic = "NWBKGB2L".into();
    config
}

fn convert_with(config: ConverterConfig, csv: &str) -> Result<String, ConvertError> {
    let converter = Converter::with_clock(config, FixedClock(fixed_now()))?;
    let mut out = Vec::new();
    converter.convert(Cursor::new(csv), &mut out)?;
    Ok(String::from_utf8(out).unwrap())
}

fn convert(csv: &str) -> String {
    convert_with(base_config(), csv).unwrap()
}

fn parse(xml: &str) -> ParsedMessage {
    read_message(xml.as_bytes()).unwrap()
}

const ALICE_BOB_CARA: &str = "Name,IBAN,Amount,Reference
Alice,DE89370400440532013000,\"100,00\",inv-1
Bob,,50.00,inv-2
Cara,FR1420041010050500013M02606,25.5,
";

// ==================== END TO END ====================

#[test]
fn test_alice_bob_cara() {
    let xml = convert(ALICE_BOB_CARA);
    let msg = parse(&xml);

    assert_eq!(msg.message_id, "MSG20250516140309");
    assert_eq!(msg.transaction_count, 2);
    assert_eq!(msg.control_sum.to_string(), "125.50");

    let ids: Vec<_> = msg.payments.iter().map(|p| p.end_to_end_id.as_str()).collect();
    assert_eq!(ids, ["inv-1", "TRX-00002"]);

    let amounts: Vec<_> = msg.payments.iter().map(|p| p.amount.to_string()).collect();
    assert_eq!(amounts, ["100.00", "25.50"]);

    assert!(xml.contains("<CtrlSum>125.50</CtrlSum>"));
    assert!(xml.contains("<InstdAmt Ccy=\"EUR\">100.00</InstdAmt>"));
    assert!(!xml.contains("Bob"));
}

#[test]
fn test_document_shape() {
    let xml = convert(ALICE_BOB_CARA);

    assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
    assert!(xml.contains("<Document xmlns=\"urn:iso:std:iso:20022:tech:xsd:pain.001.001.09\">"));
    assert!(xml.contains("<PmtInfId>MSG20250516140309</PmtInfId>"));
    assert!(xml.contains("<CreDtTm>2025-05-16T14:03:09</CreDtTm>"));
    assert!(xml.contains("<BtchBookg>false</BtchBookg>"));
    assert!(xml.contains("<ReqdExctnDt>"));
    assert!(xml.contains("<Dt>2025-05-16</Dt>"));
    assert!(xml.contains("<BICFI>NWBKGB2L</BICFI>"));
    assert!(xml.contains("<ChrgBr>SLEV</ChrgBr>"));

    // header before payment information, charge bearer before the first transfer
    let pos = |needle: &str| xml.find(needle).unwrap();
    assert!(pos("<GrpHdr>") < pos("<PmtInf>"));
    assert!(pos("<ChrgBr>") < pos("<CdtTrfTxInf>"));
    assert!(pos("<PmtId>") < pos("<Amt>"));
    assert!(pos("<Cdtr>") < pos("<CdtrAcct>"));
    assert!(pos("<CdtrAcct>") < pos("<RmtInf>"));
}

// ==================== AGGREGATES ====================

#[test]
fn test_count_matches_transfers() {
    let xml = convert(ALICE_BOB_CARA);
    let transfers = xml.matches("<CdtTrfTxInf>").count();
    assert_eq!(transfers, 2);
    assert_eq!(xml.matches("<NbOfTxs>2</NbOfTxs>").count(), 2);
}

#[test]
fn test_control_sum_equals_sum_of_amounts() {
    let csv = "Name,IBAN,Amount\n\
               A,DE01,0.10\n\
               B,DE02,0.20\n\
               C,DE03,0.30\n\
               D,DE04,1.005\n";
    let msg = parse(&convert(csv));

    let sum = Amount::checked_sum(msg.payments.iter().map(|p| p.amount));
    assert_eq!(sum, Some(msg.control_sum));
    assert_eq!(msg.control_sum.to_string(), "1.61");
}

#[test]
fn test_rows_without_iban_do_not_count() {
    let csv = "Name,IBAN,Amount\nA,DE01,10\nB,,99\nC,  ,99\nD,DE04,5\n";
    let msg = parse(&convert(csv));
    assert_eq!(msg.transaction_count, 2);
    assert_eq!(msg.control_sum.to_string(), "15.00");
}

// ==================== AMOUNTS ====================

#[test]
fn test_amount_formats() {
    let csv = "Name,IBAN,Amount\n\
               A,DE01,\"1234,56\"\n\
               B,DE02,1 234.56\n\
               C,DE03,1234.56\n";
    let msg = parse(&convert(csv));
    for p in &msg.payments {
        assert_eq!(p.amount.to_string(), "1234.56");
    }
    assert_eq!(msg.control_sum.to_string(), "3703.68");
}

#[test]
fn test_invalid_amount_names_row() {
    let csv = "Name,IBAN,Amount\nA,DE01,10\nB,DE02,abc\n";
    match convert_with(base_config(), csv) {
        Err(ConvertError::InvalidAmount { row, value }) => {
            assert_eq!(row, 3);
            assert_eq!(value, "abc");
        }
        other => panic!("Expected InvalidAmount, got {:?}", other),
    }
}

#[test]
fn test_oversized_amounts_are_rejected() {
    let csv = "Name,IBAN,Amount\n\
               A,DE01,50000000000000000000000000000\n\
               B,DE02,50000000000000000000000000000\n";
    assert!(matches!(
        convert_with(base_config(), csv),
        Err(ConvertError::InvalidAmount { row: 2, .. })
    ));

    let csv = "Name,IBAN,Amount\nA,DE01,79228162514264337593543950335\n";
    assert!(matches!(
        convert_with(base_config(), csv),
        Err(ConvertError::InvalidAmount { row: 2, .. })
    ));
}

#[test]
fn test_empty_batch() {
    let csv = "Name,IBAN,Amount\nA,,10\nB,DE02,\n";
    assert!(matches!(
        convert_with(base_config(), csv),
        Err(ConvertError::EmptyBatch)
    ));
}

// ==================== DETERMINISM & ROUND TRIP ====================

#[test]
fn test_same_input_same_bytes() {
    assert_eq!(convert(ALICE_BOB_CARA), convert(ALICE_BOB_CARA));
}

#[test]
fn test_round_trip_recovers_batch() {
    let converter = Converter::with_clock(base_config(), FixedClock(fixed_now())).unwrap();
    let table = converter.read_table(Cursor::new(ALICE_BOB_CARA)).unwrap();
    let batch = converter.build_batch(&table).unwrap();
    let bytes = converter.render(&batch).unwrap();

    let msg = read_message(&bytes).unwrap();
    assert_eq!(&msg.debtor, batch.debtor());
    assert_eq!(msg.payments.as_slice(), batch.payments());
    assert_eq!(msg.control_sum, batch.control_sum().unwrap());
    assert_eq!(msg.transaction_count, batch.transaction_count());
}

#[test]
fn test_round_trip_with_optional_elements() {
    let csv = "Beneficiary Name;Beneficiary Account;Beneficiary Bank;Amount;Currency;Payment Reference;Street;City\n\
               Smith & Sons;NL91ABNA0417164300;ABNANL2A;1 234,56;EUR;INV-2025-001;Main St 1;Amsterdam\n";
    let mut config = base_config();
    config.input.delimiter = b';';
    config.structured_remittance = true;

    let converter = Converter::with_clock(config, FixedClock(fixed_now())).unwrap();
    let table = converter.read_table(Cursor::new(csv)).unwrap();
    let batch = converter.build_batch(&table).unwrap();
    let msg = read_message(&converter.render(&batch).unwrap()).unwrap();

    assert_eq!(msg.payments.as_slice(), batch.payments());
    let p = &msg.payments[0];
    assert_eq!(p.creditor_name, "Smith & Sons");
    assert_eq!(p.creditor_bic.as_deref(), Some("ABNANL2A"));
    assert_eq!(p.postal_address.as_deref(), Some("Main St 1, Amsterdam"));
    assert_eq!(p.creditor_reference.as_deref(), Some("INV-2025-001"));
}

#[test]
fn test_round_trip_after_truncation() {
    let reference = format!("{} tail", "X".repeat(34));
    let name = format!("{} Smith", "A".repeat(69));
    let csv = format!("Name,IBAN,Amount,Reference\n{},DE01,10,{}\n", name, reference);

    let converter = Converter::with_clock(base_config(), FixedClock(fixed_now())).unwrap();
    let table = converter.read_table(Cursor::new(csv)).unwrap();
    let batch = converter.build_batch(&table).unwrap();
    let msg = read_message(&converter.render(&batch).unwrap()).unwrap();

    assert_eq!(msg.payments.as_slice(), batch.payments());
    assert_eq!(msg.payments[0].end_to_end_id, "X".repeat(34));
    assert_eq!(msg.payments[0].creditor_name, "A".repeat(69));
}

// ==================== COLUMN RESOLUTION ====================

#[test]
fn test_fixed_positions_without_headings() {
    let mut row = vec![String::new(); 36];
    row[4] = "Alice".into();
    row[13] = "12.00".into();
    row[35] = "DE89370400440532013000".into();
    let csv = format!("{}\n", row.join(","));

    let mut config = base_config();
    config.input.has_header = false;
    let msg = parse(&convert_with(config, &csv).unwrap());

    assert_eq!(msg.payments.len(), 1);
    assert_eq!(msg.payments[0].creditor_name, "Alice");
    assert_eq!(msg.payments[0].end_to_end_id, "TRX-00001");
}

#[test]
fn test_explicit_column_wins() {
    let csv = "Name,IBAN,Amount,Net\nAlice,DE01,100.00,80.00\n";
    let mut config = base_config();
    config
        .columns
        .explicit
        .insert(LogicalField::Amount, ColumnLocator::Header("Net".into()));

    let msg = parse(&convert_with(config, csv).unwrap());
    assert_eq!(msg.control_sum.to_string(), "80.00");
}

#[test]
fn test_missing_required_column() {
    let csv = "Name,Amount\nAlice,10\n";
    match convert_with(base_config(), csv) {
        Err(ConvertError::MissingColumn { field }) => {
            assert_eq!(field, LogicalField::CreditorIban)
        }
        other => panic!("Expected MissingColumn, got {:?}", other),
    }
}

#[test]
fn test_debtor_columns_are_not_taken_for_creditor() {
    let csv = "Debtor IBAN,Beneficiary IBAN,Amount\nGB00,DE01,10\n";
    let msg = parse(&convert(csv));
    assert_eq!(msg.payments[0].creditor_iban, "DE01");
}

// ==================== OPTIONS ====================

#[test]
fn test_message_options() {
    let mut config = base_config();
    config.batch_booking = true;
    config.schema_location = true;
    config.execution_date = NaiveDate::from_ymd_opt(2025, 6, 2);

    let xml = convert_with(config, ALICE_BOB_CARA).unwrap();
    assert!(xml.contains("<BtchBookg>true</BtchBookg>"));
    assert!(xml.contains("<Dt>2025-06-02</Dt>"));
    assert!(xml.contains("xsi:schemaLocation="));
}

#[test]
fn test_currency_mismatch() {
    let csv = "Name,IBAN,Amount,Currency\nA,DE01,10,EUR\nB,DE02,10,USD\n";
    assert!(matches!(
        convert_with(base_config(), csv),
        Err(ConvertError::CurrencyMismatch { row: 3, .. })
    ));
}

#[test]
fn test_config_from_toml() {
    let config = ConverterConfig::from_toml_str(
        r#"
currency = "gbp"

[debtor]
name = "Acme Ltd"
iban = "GB29NWBK60161331926819"
bic = "NWBKGB2L"
"#,
    )
    .unwrap();

    let xml = convert_with(config, ALICE_BOB_CARA).unwrap();
    assert!(xml.contains("<InstdAmt Ccy=\"GBP\">100.00</InstdAmt>"));
}
