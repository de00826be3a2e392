//! Payment batch and its aggregates.
//!
//! Maintains the invariants `control_sum == Σ amounts` and
//! `transaction_count == payments.len()` by deriving both on demand.

use crate::amount::Amount;
use crate::config::DebtorConfig;
use crate::error::{ConvertError, Result};
use crate::payment::{clean_identifier, truncate_chars, NormalizedPayment, MAX_NAME_LEN};

/// The ordering party: whose account is debited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Debtor {
    pub name: String,
    pub iban: String,
    pub bic: String,
}

impl Debtor {
    /// Cleans raw debtor data the same way creditor data is cleaned.
    pub fn new(name: &str, iban: &str, bic: &str) -> Self {
        Debtor {
            name: truncate_chars(name.trim(), MAX_NAME_LEN),
            iban: clean_identifier(iban),
            bic: clean_identifier(bic),
        }
    }
}

impl From<&DebtorConfig> for Debtor {
    fn from(config: &DebtorConfig) -> Self {
        Debtor::new(&config.name, &config.iban, &config.bic)
    }
}

/// A non-empty, single-currency set of payments from one debtor.
///
/// # Invariants
///
/// - At least one payment
/// - Aggregates are never stored, so they cannot go stale when the batch is
///   filtered into a new one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentBatch {
    debtor: Debtor,
    currency: String,
    payments: Vec<NormalizedPayment>,
}

impl PaymentBatch {
    /// Creates a batch. Fails with `EmptyBatch` when `payments` is empty.
    pub fn new(debtor: Debtor, currency: &str, payments: Vec<NormalizedPayment>) -> Result<Self> {
        if payments.is_empty() {
            return Err(ConvertError::EmptyBatch);
        }
        Ok(PaymentBatch {
            debtor,
            currency: currency.to_string(),
            payments,
        })
    }

    pub fn debtor(&self) -> &Debtor {
        &self.debtor
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn payments(&self) -> &[NormalizedPayment] {
        &self.payments
    }

    /// Exact decimal sum of all payment amounts.
    ///
    /// Fails with `AmountOverflow` if the sum leaves the decimal range.
    pub fn control_sum(&self) -> Result<Amount> {
        Amount::checked_sum(self.payments.iter().map(|p| p.amount))
            .ok_or(ConvertError::AmountOverflow)
    }

    /// Number of payments.
    pub fn transaction_count(&self) -> usize {
        self.payments.len()
    }

    /// Returns a new batch holding only the payments matching `keep`.
    ///
    /// Fails with `EmptyBatch` if nothing is kept.
    pub fn filter<F>(&self, keep: F) -> Result<PaymentBatch>
    where
        F: Fn(&NormalizedPayment) -> bool,
    {
        let payments = self.payments.iter().filter(|p| keep(p)).cloned().collect();
        PaymentBatch::new(self.debtor.clone(), &self.currency, payments)
    }
}
