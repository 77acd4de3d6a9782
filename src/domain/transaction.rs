use super::money::Amount;
use super::wallet::WalletId;
use crate::error::{Result, WalletError};
use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Deposit,
    Withdraw,
    Transfer,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "deposit",
            TransactionType::Withdraw => "withdraw",
            TransactionType::Transfer => "transfer",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "deposit" => Ok(TransactionType::Deposit),
            "withdraw" => Ok(TransactionType::Withdraw),
            "transfer" => Ok(TransactionType::Transfer),
            other => Err(WalletError::ValidationError(format!(
                "Unknown transaction type '{other}'"
            ))),
        }
    }
}

/// Human-legible ledger entry id: `TRN`, ten digits of unix seconds, seven random digits.
///
/// Not monotonic. Ordering always goes through `created_at`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(String);

impl TransactionId {
    pub fn generate() -> Self {
        let unix_time = Utc::now().timestamp();
        let random_part: u32 = rand::thread_rng().gen_range(0..10_000_000);
        Self(format!("TRN{unix_time:010}{random_part:07}"))
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Immutable record of one balance movement.
///
/// Constructors enforce the shape rules: a deposit only has `to`, a withdraw only has
/// `from`, and a transfer has both, distinct.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerEntry {
    id: TransactionId,
    from_wallet_id: Option<WalletId>,
    to_wallet_id: Option<WalletId>,
    amount: Amount,
    #[serde(rename = "type")]
    kind: TransactionType,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn deposit(to: WalletId, amount: Amount) -> Self {
        Self::fresh(None, Some(to), amount, TransactionType::Deposit)
    }

    pub fn withdraw(from: WalletId, amount: Amount) -> Self {
        Self::fresh(Some(from), None, amount, TransactionType::Withdraw)
    }

    pub fn transfer(from: WalletId, to: WalletId, amount: Amount) -> Result<Self> {
        if from == to {
            return Err(WalletError::ValidationError(format!(
                "Cannot transfer from wallet {from} to itself"
            )));
        }
        Ok(Self::fresh(
            Some(from),
            Some(to),
            amount,
            TransactionType::Transfer,
        ))
    }

    /// Rebuilds an entry read back from storage, re-checking every invariant.
    pub fn restore(
        id: TransactionId,
        from_wallet_id: Option<WalletId>,
        to_wallet_id: Option<WalletId>,
        amount: Decimal,
        kind: TransactionType,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self> {
        let amount = Amount::new(amount)?;
        let well_formed = match kind {
            TransactionType::Deposit => from_wallet_id.is_none() && to_wallet_id.is_some(),
            TransactionType::Withdraw => from_wallet_id.is_some() && to_wallet_id.is_none(),
            TransactionType::Transfer => match (&from_wallet_id, &to_wallet_id) {
                (Some(from), Some(to)) => from != to,
                _ => false,
            },
        };
        if !well_formed {
            return Err(WalletError::ValidationError(format!(
                "Malformed {kind} ledger entry {id}"
            )));
        }
        Ok(Self {
            id,
            from_wallet_id,
            to_wallet_id,
            amount,
            kind,
            created_at,
            updated_at,
        })
    }

    fn fresh(
        from_wallet_id: Option<WalletId>,
        to_wallet_id: Option<WalletId>,
        amount: Amount,
        kind: TransactionType,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: TransactionId::generate(),
            from_wallet_id,
            to_wallet_id,
            amount,
            kind,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> &TransactionId {
        &self.id
    }

    /// The same entry under a newly generated id.
    pub fn with_new_id(self) -> Self {
        Self {
            id: TransactionId::generate(),
            ..self
        }
    }

    pub fn from_wallet_id(&self) -> Option<&WalletId> {
        self.from_wallet_id.as_ref()
    }

    pub fn to_wallet_id(&self) -> Option<&WalletId> {
        self.to_wallet_id.as_ref()
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn kind(&self) -> TransactionType {
        self.kind
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// True when the wallet is on either side of the entry.
    pub fn touches(&self, wallet_id: &WalletId) -> bool {
        self.from_wallet_id.as_ref() == Some(wallet_id)
            || self.to_wallet_id.as_ref() == Some(wallet_id)
    }

    /// Signed effect of this entry on the given wallet's balance.
    pub fn effect_on(&self, wallet_id: &WalletId) -> Decimal {
        let mut effect = Decimal::ZERO;
        if self.to_wallet_id.as_ref() == Some(wallet_id) {
            effect += self.amount.value();
        }
        if self.from_wallet_id.as_ref() == Some(wallet_id) {
            effect -= self.amount.value();
        }
        effect
    }
}

/// Single-wallet balance change. The external contract takes a signed amount; this is
/// the tagged form the mutator works with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceChange {
    Deposit(Amount),
    Withdraw(Amount),
}

impl BalanceChange {
    /// Positive amounts deposit, negative amounts withdraw. Zero moves nothing and is
    /// rejected.
    pub fn from_signed(amount: Decimal) -> Result<Self> {
        if amount < Decimal::ZERO {
            Ok(BalanceChange::Withdraw(Amount::new(-amount)?))
        } else {
            Ok(BalanceChange::Deposit(Amount::new(amount)?))
        }
    }

    pub fn amount(&self) -> Amount {
        match self {
            BalanceChange::Deposit(amount) | BalanceChange::Withdraw(amount) => *amount,
        }
    }

    pub fn delta(&self) -> Decimal {
        match self {
            BalanceChange::Deposit(amount) => amount.value(),
            BalanceChange::Withdraw(amount) => -amount.value(),
        }
    }

    pub fn into_entry(self, wallet_id: WalletId) -> LedgerEntry {
        match self {
            BalanceChange::Deposit(amount) => LedgerEntry::deposit(wallet_id, amount),
            BalanceChange::Withdraw(amount) => LedgerEntry::withdraw(wallet_id, amount),
        }
    }
}
