//! Monetary amount type with cent precision.
//!
//! Uses `rust_decimal` internally with scale enforcement so that summing
//! amounts never drifts the way binary floating point does, and the control
//! sum of a batch always equals the sum of the rendered per-payment amounts.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A decimal amount that always carries exactly 2 decimal places.
///
/// Parsing is lenient about the formats found in spreadsheet exports:
/// interior whitespace (thousand separators) is dropped and `,` is accepted
/// as the fractional separator.
///
/// # Examples
///
/// ```
/// use std::str::FromStr;
/// use sepa_converter::Amount;
///
/// let amount = Amount::from_str("1 234,5").unwrap();
/// assert_eq!(amount.to_string(), "1234.50");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub struct Amount(Decimal);

impl Amount {
    /// The number of decimal places to maintain.
    pub const SCALE: u32 = 2;

    /// Zero value.
    pub const ZERO: Self = Amount(Decimal::ZERO);

    /// Largest amount in cents: 18 digits in total, 2 of them fractional.
    const MAX_CENTS: i64 = 999_999_999_999_999_999;

    /// Creates a new `Amount`, rounding half away from zero to the cent.
    pub fn new(value: Decimal) -> Self {
        let mut normalized =
            value.round_dp_with_strategy(Self::SCALE, RoundingStrategy::MidpointAwayFromZero);
        normalized.rescale(Self::SCALE);
        Amount(normalized)
    }

    /// Largest amount a payment may carry.
    pub fn max() -> Self {
        Amount(Decimal::new(Self::MAX_CENTS, Self::SCALE))
    }

    /// Returns `true` if this value is below zero.
    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    /// Returns `true` if this value is zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns `true` if the value renders with exactly 2 decimal places and
    /// does not exceed `Amount::max()` in magnitude.
    pub fn is_within_limits(&self) -> bool {
        self.0.scale() == Self::SCALE && self.0.abs() <= Self::max().0
    }

    /// Adds two amounts, returning `None` on overflow.
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Amount::new)
    }

    /// Sums amounts, returning `None` on overflow.
    pub fn checked_sum<I: IntoIterator<Item = Amount>>(amounts: I) -> Option<Self> {
        amounts
            .into_iter()
            .try_fold(Amount::new(Decimal::ZERO), Amount::checked_add)
    }
}

impl FromStr for Amount {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let cleaned: String = s
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| if c == ',' { '.' } else { c })
            .collect();
        let decimal = Decimal::from_str(&cleaned)?;
        Ok(Amount::new(decimal))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
