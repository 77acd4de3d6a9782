use crate::error::{Result, WalletError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A wallet balance. Never negative.
///
/// Wraps `rust_decimal::Decimal` so that every balance the engine hands out has already
/// been checked against the non-negativity rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize)]
#[serde(transparent)]
pub struct Balance(Decimal);

/// Fractional digits a stored amount or balance can carry (`NUMERIC(20,8)`).
pub const MAX_SCALE: u32 = 8;

/// Exclusive upper bound of any amount or balance: twelve integer digits.
pub fn upper_bound() -> Decimal {
    Decimal::new(1_000_000_000_000, 0)
}

/// A strictly positive amount of money moved by a single ledger entry.
///
/// Direction is never encoded in the sign; it comes from the entry type. The value
/// always fits `NUMERIC(20,8)`, so both storage backends accept it verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self> {
        if value <= Decimal::ZERO {
            return Err(WalletError::ValidationError(format!(
                "Amount must be positive, got {value}"
            )));
        }
        if value.normalize().scale() > MAX_SCALE {
            return Err(WalletError::ValidationError(format!(
                "Amount {value} has more than {MAX_SCALE} decimal places"
            )));
        }
        if value >= upper_bound() {
            return Err(WalletError::ValidationError(format!(
                "Amount {value} must be below {}",
                upper_bound()
            )));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = WalletError;

    fn try_from(value: Decimal) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = <Decimal as Deserialize>::deserialize(deserializer)?;
        Amount::new(value).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Balance {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(value: Decimal) -> Result<Self> {
        if value < Decimal::ZERO {
            return Err(WalletError::ValidationError(format!(
                "Balance cannot be negative, got {value}"
            )));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Whether `amount` can be taken out without going below zero.
    pub fn covers(&self, amount: Amount) -> bool {
        self.0 >= amount.0
    }

    /// Applies a signed delta. An overdraft is reported, never produced, and so is a
    /// result at or above [`upper_bound`].
    pub fn apply(self, delta: Decimal) -> Result<Self> {
        let next = self.0.checked_add(delta).filter(|next| *next < upper_bound());
        let Some(next) = next else {
            return Err(WalletError::ValidationError(format!(
                "Balance {} cannot grow by {delta}: limit is {}",
                self.0,
                upper_bound()
            )));
        };
        if next < Decimal::ZERO {
            return Err(WalletError::InsufficientBalance {
                available: self.0,
                requested: -delta,
            });
        }
        Ok(Self(next))
    }
}

impl<'de> Deserialize<'de> for Balance {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = <Decimal as Deserialize>::deserialize(deserializer)?;
        Balance::new(value).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
