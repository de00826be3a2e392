//! Reads a rendered pain.001.001.09 document back into typed values.

use crate::amount::Amount;
use crate::batch::Debtor;
use crate::error::{xml, ConvertError, Result};
use crate::payment::NormalizedPayment;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::str::FromStr;

/// The parts of a credit transfer initiation needed to check a conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMessage {
    pub message_id: String,
    pub transaction_count: usize,
    pub control_sum: Amount,
    pub debtor: Debtor,
    pub payments: Vec<NormalizedPayment>,
}

#[derive(Default)]
struct PendingTransfer {
    end_to_end_id: Option<String>,
    creditor_name: Option<String>,
    creditor_iban: Option<String>,
    creditor_bic: Option<String>,
    amount: Option<Amount>,
    currency: Option<String>,
    postal_address: Option<String>,
    creditor_reference: Option<String>,
}

impl PendingTransfer {
    fn finish(self) -> Result<NormalizedPayment> {
        Ok(NormalizedPayment {
            end_to_end_id: required(self.end_to_end_id, "EndToEndId")?,
            creditor_name: required(self.creditor_name, "Cdtr/Nm")?,
            creditor_iban: required(self.creditor_iban, "CdtrAcct/Id/IBAN")?,
            creditor_bic: self.creditor_bic,
            amount: required(self.amount, "InstdAmt")?,
            currency: required(self.currency, "InstdAmt/@Ccy")?,
            postal_address: self.postal_address,
            creditor_reference: self.creditor_reference,
        })
    }
}

fn required<T>(value: Option<T>, what: &str) -> Result<T> {
    value.ok_or_else(|| ConvertError::Xml(format!("Missing {}", what)))
}

fn parse_amount(text: &str) -> Result<Amount> {
    Amount::from_str(text).map_err(|_| ConvertError::InvalidAmount {
        row: 0,
        value: text.to_string(),
    })
}

/// Parses a credit transfer initiation document.
///
/// Elements are matched by their path below `CstmrCdtTrfInitn`; anything
/// this crate does not emit is ignored.
pub fn read_message(bytes: &[u8]) -> Result<ParsedMessage> {
    let mut reader = Reader::from_reader(bytes);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut path: Vec<String> = Vec::new();

    let mut message_id = None;
    let mut transaction_count = None;
    let mut control_sum = None;
    let mut debtor_name = None;
    let mut debtor_iban = None;
    let mut debtor_bic = None;
    let mut payments = Vec::new();
    let mut pending: Option<PendingTransfer> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                match name.as_str() {
                    "CdtTrfTxInf" => pending = Some(PendingTransfer::default()),
                    "InstdAmt" => {
                        if let (Some(tx), Some(ccy)) =
                            (pending.as_mut(), e.try_get_attribute("Ccy").map_err(xml)?)
                        {
                            tx.currency = Some(ccy.unescape_value().map_err(xml)?.into_owned());
                        }
                    }
                    _ => {}
                }
                path.push(name);
            }
            Ok(Event::Text(t)) => {
                let text = t.unescape().map_err(xml)?.into_owned();
                let tail: Vec<&str> = path.iter().skip(2).map(String::as_str).collect();

                match tail.as_slice() {
                    ["GrpHdr", "MsgId"] => message_id = Some(text),
                    ["GrpHdr", "NbOfTxs"] => {
                        transaction_count = Some(text.parse::<usize>().map_err(|_| {
                            ConvertError::Xml(format!("Invalid NbOfTxs: {}", text))
                        })?)
                    }
                    ["GrpHdr", "CtrlSum"] => control_sum = Some(parse_amount(&text)?),
                    ["PmtInf", "Dbtr", "Nm"] => debtor_name = Some(text),
                    ["PmtInf", "DbtrAcct", "Id", "IBAN"] => debtor_iban = Some(text),
                    ["PmtInf", "DbtrAgt", "FinInstnId", "BICFI"] => debtor_bic = Some(text),
                    ["PmtInf", "CdtTrfTxInf", rest @ ..] => {
                        if let Some(tx) = pending.as_mut() {
                            match rest {
                                ["PmtId", "EndToEndId"] => tx.end_to_end_id = Some(text),
                                ["Amt", "InstdAmt"] => tx.amount = Some(parse_amount(&text)?),
                                ["CdtrAgt", "FinInstnId", "BICFI"] => tx.creditor_bic = Some(text),
                                ["Cdtr", "Nm"] => tx.creditor_name = Some(text),
                                ["Cdtr", "PstlAdr", "AdrLine"] => tx.postal_address = Some(text),
                                ["CdtrAcct", "Id", "IBAN"] => tx.creditor_iban = Some(text),
                                ["RmtInf", "Strd", "CdtrRefInf", "Ref"] => {
                                    tx.creditor_reference = Some(text)
                                }
                                _ => {}
                            }
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::End(_)) => {
                if path.pop().as_deref() == Some("CdtTrfTxInf") {
                    if let Some(tx) = pending.take() {
                        payments.push(tx.finish()?);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml(e)),
            _ => {}
        }
        buf.clear();
    }

    if !path.is_empty() {
        return Err(ConvertError::Xml("Unexpected end of document".to_string()));
    }

    Ok(ParsedMessage {
        message_id: required(message_id, "MsgId")?,
        transaction_count: required(transaction_count, "NbOfTxs")?,
        control_sum: required(control_sum, "CtrlSum")?,
        debtor: Debtor {
            name: required(debtor_name, "Dbtr/Nm")?,
            iban: required(debtor_iban, "DbtrAcct/Id/IBAN")?,
            bic: required(debtor_bic, "DbtrAgt/FinInstnId/BICFI")?,
        },
        payments,
    })
}
