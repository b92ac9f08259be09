//! Currency-tagged monetary amounts.

use core::fmt;
use core::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// ISO 4217 currencies supported by the product.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Usd,
    Eur,
    Gbp,
    Brl,
    Jpy,
    Cad,
    Aud,
    Chf,
    Cny,
    Inr,
    Mxn,
}

impl Currency {
    pub const ALL: [Currency; 11] = [
        Currency::Usd,
        Currency::Eur,
        Currency::Gbp,
        Currency::Brl,
        Currency::Jpy,
        Currency::Cad,
        Currency::Aud,
        Currency::Chf,
        Currency::Cny,
        Currency::Inr,
        Currency::Mxn,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
            Currency::Brl => "BRL",
            Currency::Jpy => "JPY",
            Currency::Cad => "CAD",
            Currency::Aud => "AUD",
            Currency::Chf => "CHF",
            Currency::Cny => "CNY",
            Currency::Inr => "INR",
            Currency::Mxn => "MXN",
        }
    }

    /// Number of decimal places in the currency's minor unit.
    pub fn minor_units(&self) -> u32 {
        match self {
            Currency::Jpy => 0,
            _ => 2,
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_uppercase();
        Currency::ALL
            .into_iter()
            .find(|c| c.code() == code)
            .ok_or_else(|| DomainError::validation(format!("unsupported currency: {s}")))
    }
}

/// Immutable monetary amount tagged with its currency.
///
/// Every operation returns a new value. Binary operations require both operands
/// to share a currency and fail with `DomainError::CurrencyMismatch` otherwise.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CurrencyValue {
    amount: Decimal,
    currency: Currency,
}

impl ValueObject for CurrencyValue {}

impl CurrencyValue {
    pub fn new(amount: Decimal, currency: Currency) -> Self {
        Self { amount, currency }
    }

    pub fn zero(currency: Currency) -> Self {
        Self::new(Decimal::ZERO, currency)
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.amount > Decimal::ZERO
    }

    pub fn is_negative(&self) -> bool {
        self.amount < Decimal::ZERO
    }

    /// Fails with `CurrencyMismatch` unless `other` is in this value's currency.
    pub fn ensure_same_currency(&self, other: &CurrencyValue) -> DomainResult<()> {
        if self.currency != other.currency {
            return Err(DomainError::CurrencyMismatch {
                expected: self.currency,
                found: other.currency,
            });
        }
        Ok(())
    }

    pub fn add(&self, other: &CurrencyValue) -> DomainResult<CurrencyValue> {
        self.ensure_same_currency(other)?;
        let amount = self
            .amount
            .checked_add(other.amount)
            .ok_or_else(|| DomainError::invariant("monetary amount overflow"))?;
        Ok(Self::new(amount, self.currency))
    }

    pub fn subtract(&self, other: &CurrencyValue) -> DomainResult<CurrencyValue> {
        self.ensure_same_currency(other)?;
        let amount = self
            .amount
            .checked_sub(other.amount)
            .ok_or_else(|| DomainError::invariant("monetary amount overflow"))?;
        Ok(Self::new(amount, self.currency))
    }

    /// Scale by a factor, rounded to the currency's minor unit.
    pub fn multiply(&self, factor: Decimal) -> DomainResult<CurrencyValue> {
        let amount = self
            .amount
            .checked_mul(factor)
            .ok_or_else(|| DomainError::invariant("monetary amount overflow"))?;
        Ok(Self::new(self.round(amount), self.currency))
    }

    /// Divide by a scalar, rounded to the currency's minor unit.
    pub fn divide(&self, divisor: Decimal) -> DomainResult<CurrencyValue> {
        if divisor.is_zero() {
            return Err(DomainError::validation("cannot divide a monetary amount by zero"));
        }
        let amount = self
            .amount
            .checked_div(divisor)
            .ok_or_else(|| DomainError::invariant("monetary amount overflow"))?;
        Ok(Self::new(self.round(amount), self.currency))
    }

    /// Returns zero in the same currency when the amount is negative.
    pub fn clamp_zero(&self) -> CurrencyValue {
        if self.is_negative() {
            Self::zero(self.currency)
        } else {
            *self
        }
    }

    fn round(&self, amount: Decimal) -> Decimal {
        amount.round_dp_with_strategy(
            self.currency.minor_units(),
            RoundingStrategy::MidpointAwayFromZero,
        )
    }
}

impl fmt::Display for CurrencyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}
