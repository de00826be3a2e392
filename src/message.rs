//! ISO 20022 pain.001.001.09 Customer Credit Transfer Initiation.
//!
//! `SepaMessage` is built from a `PaymentBatch` and turned into an element
//! tree whose child order follows the schema sequence for every block.

use crate::amount::Amount;
use crate::batch::{Debtor, PaymentBatch};
use crate::error::Result;
use crate::payment::NormalizedPayment;
use crate::xml::Element;
use chrono::{NaiveDate, NaiveDateTime};

/// Payment method: credit transfer.
pub const PAYMENT_METHOD: &str = "TRF";

/// Service level code for SEPA credit transfers.
pub const SERVICE_LEVEL: &str = "SEPA";

/// Charge bearer: following the service level (shared charges).
pub const CHARGE_BEARER: &str = "SLEV";

/// Creditor reference type: structured communication reference.
pub const CREDITOR_REFERENCE_TYPE: &str = "SCOR";

/// Message id format, `MSG` followed by the creation time.
const MESSAGE_ID_FORMAT: &str = "MSG%Y%m%d%H%M%S";

const CREATION_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Options that shape the payment information block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessageOptions {
    pub batch_booking: bool,
    /// Falls back to the creation date when unset.
    pub execution_date: Option<NaiveDate>,
}

/// Complete credit transfer initiation message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SepaMessage {
    pub group_header: GroupHeader,
    pub payment_information: PaymentInformation,
}

/// Group header (GrpHdr)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupHeader {
    /// Message ID (MsgId)
    pub message_id: String,
    /// Creation date/time (CreDtTm)
    pub creation_date_time: NaiveDateTime,
    /// Number of transactions (NbOfTxs)
    pub number_of_transactions: usize,
    /// Control sum (CtrlSum)
    pub control_sum: Amount,
    /// Initiating party name (InitgPty/Nm)
    pub initiating_party: String,
}

/// Payment information (PmtInf); one per message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentInformation {
    /// Payment information ID (PmtInfId)
    pub payment_information_id: String,
    /// Batch booking (BtchBookg)
    pub batch_booking: bool,
    /// Number of transactions (NbOfTxs)
    pub number_of_transactions: usize,
    /// Control sum (CtrlSum)
    pub control_sum: Amount,
    /// Requested execution date (ReqdExctnDt/Dt)
    pub requested_execution_date: NaiveDate,
    /// Debtor, debtor account and debtor agent
    pub debtor: Debtor,
    /// Credit transfer transaction information (CdtTrfTxInf)
    pub transfers: Vec<CreditTransfer>,
}

/// Credit transfer transaction information (CdtTrfTxInf)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreditTransfer {
    pub end_to_end_id: String,
    pub amount: Amount,
    pub currency: String,
    pub creditor_agent_bic: Option<String>,
    pub creditor_name: String,
    pub postal_address: Option<String>,
    pub creditor_iban: String,
    pub remittance: RemittanceInformation,
}

/// Remittance information (RmtInf)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemittanceInformation {
    /// Unstructured line (Ustrd)
    pub unstructured: String,
    /// Structured SCOR creditor reference (Strd/CdtrRefInf/Ref)
    pub creditor_reference: Option<String>,
}

impl From<&NormalizedPayment> for CreditTransfer {
    fn from(payment: &NormalizedPayment) -> Self {
        CreditTransfer {
            end_to_end_id: payment.end_to_end_id.clone(),
            amount: payment.amount,
            currency: payment.currency.clone(),
            creditor_agent_bic: payment.creditor_bic.clone(),
            creditor_name: payment.creditor_name.clone(),
            postal_address: payment.postal_address.clone(),
            creditor_iban: payment.creditor_iban.clone(),
            remittance: RemittanceInformation {
                unstructured: payment.end_to_end_id.clone(),
                creditor_reference: payment.creditor_reference.clone(),
            },
        }
    }
}

impl SepaMessage {
    /// Builds the message for `batch` as of `now`.
    ///
    /// The message id is always derived from `now`; the payment information
    /// id reuses it since there is exactly one payment information block.
    pub fn build(
        batch: &PaymentBatch,
        options: &MessageOptions,
        now: NaiveDateTime,
    ) -> Result<Self> {
        let message_id = now.format(MESSAGE_ID_FORMAT).to_string();
        let number_of_transactions = batch.transaction_count();
        let control_sum = batch.control_sum()?;

        Ok(SepaMessage {
            group_header: GroupHeader {
                message_id: message_id.clone(),
                creation_date_time: now,
                number_of_transactions,
                control_sum,
                initiating_party: batch.debtor().name.clone(),
            },
            payment_information: PaymentInformation {
                payment_information_id: message_id,
                batch_booking: options.batch_booking,
                number_of_transactions,
                control_sum,
                requested_execution_date: options.execution_date.unwrap_or_else(|| now.date()),
                debtor: batch.debtor().clone(),
                transfers: batch.payments().iter().map(CreditTransfer::from).collect(),
            },
        })
    }

    /// The `Document` element tree.
    pub fn to_element(&self) -> Element {
        Element::new("Document").child(
            Element::new("CstmrCdtTrfInitn")
                .child(self.group_header.to_element())
                .child(self.payment_information.to_element()),
        )
    }
}

impl GroupHeader {
    fn to_element(&self) -> Element {
        Element::new("GrpHdr")
            .child(Element::leaf("MsgId", &self.message_id))
            .child(Element::leaf(
                "CreDtTm",
                self.creation_date_time.format(CREATION_TIME_FORMAT).to_string(),
            ))
            .child(Element::leaf("NbOfTxs", self.number_of_transactions.to_string()))
            .child(Element::leaf("CtrlSum", self.control_sum.to_string()))
            .child(Element::new("InitgPty").child(Element::leaf("Nm", &self.initiating_party)))
    }
}

impl PaymentInformation {
    fn to_element(&self) -> Element {
        Element::new("PmtInf")
            .child(Element::leaf("PmtInfId", &self.payment_information_id))
            .child(Element::leaf("PmtMtd", PAYMENT_METHOD))
            .child(Element::leaf("BtchBookg", self.batch_booking.to_string()))
            .child(Element::leaf("NbOfTxs", self.number_of_transactions.to_string()))
            .child(Element::leaf("CtrlSum", self.control_sum.to_string()))
            .child(
                Element::new("PmtTpInf")
                    .child(Element::new("SvcLvl").child(Element::leaf("Cd", SERVICE_LEVEL))),
            )
            .child(Element::new("ReqdExctnDt").child(Element::leaf(
                "Dt",
                self.requested_execution_date.format(DATE_FORMAT).to_string(),
            )))
            .child(Element::new("Dbtr").child(Element::leaf("Nm", &self.debtor.name)))
            .child(account("DbtrAcct", &self.debtor.iban))
            .child(agent("DbtrAgt", &self.debtor.bic))
            .child(Element::leaf("ChrgBr", CHARGE_BEARER))
            .extend(self.transfers.iter().map(CreditTransfer::to_element))
    }
}

impl CreditTransfer {
    fn to_element(&self) -> Element {
        let creditor = Element::new("Cdtr")
            .child(Element::leaf("Nm", &self.creditor_name))
            .child_opt(
                self.postal_address
                    .as_ref()
                    .map(|line| Element::new("PstlAdr").child(Element::leaf("AdrLine", line))),
            );

        Element::new("CdtTrfTxInf")
            .child(Element::new("PmtId").child(Element::leaf("EndToEndId", &self.end_to_end_id)))
            .child(
                Element::new("Amt").child(
                    Element::leaf("InstdAmt", self.amount.to_string()).attr("Ccy", &self.currency),
                ),
            )
            .child_opt(self.creditor_agent_bic.as_ref().map(|bic| agent("CdtrAgt", bic)))
            .child(creditor)
            .child(account("CdtrAcct", &self.creditor_iban))
            .child(self.remittance.to_element())
    }
}

impl RemittanceInformation {
    fn to_element(&self) -> Element {
        let structured = self.creditor_reference.as_ref().map(|reference| {
            Element::new("Strd").child(
                Element::new("CdtrRefInf")
                    .child(Element::new("Tp").child(
                        Element::new("CdOrPrtry").child(Element::leaf("Cd", CREDITOR_REFERENCE_TYPE)),
                    ))
                    .child(Element::leaf("Ref", reference)),
            )
        });

        Element::new("RmtInf")
            .child(Element::leaf("Ustrd", &self.unstructured))
            .child_opt(structured)
    }
}

fn account(tag: &'static str, iban: &str) -> Element {
    Element::new(tag).child(Element::new("Id").child(Element::leaf("IBAN", iban)))
}

fn agent(tag: &'static str, bic: &str) -> Element {
    Element::new(tag).child(Element::new("FinInstnId").child(Element::leaf("BICFI", bic)))
}
