//! Application layer containing the wallet engine components.
//!
//! Every mutating component opens exactly one atomic unit per call, locks each wallet
//! it touches before reading its balance, and then commits or rolls back the unit as a
//! whole. Read-only components never open a unit.

pub mod balance;
pub mod engine;
pub mod history;
pub mod transfer;
pub mod wallets;

use crate::domain::ports::AtomicUnit;
use crate::domain::transaction::LedgerEntry;
use crate::error::{Result, WalletError};

/// Ledger ids are random, so a collision gets a few fresh draws before giving up.
const APPEND_ATTEMPTS: usize = 5;

/// Appends `entry` to the unit and returns it as stored, reissuing its id whenever the
/// generated one is already taken.
async fn append_entry(unit: &mut dyn AtomicUnit, mut entry: LedgerEntry) -> Result<LedgerEntry> {
    for _ in 1..APPEND_ATTEMPTS {
        match unit.append(entry.clone()).await {
            Ok(()) => return Ok(entry),
            Err(WalletError::DuplicateEntry(id)) => {
                tracing::warn!(transaction = %id, "ledger id collision, reissuing");
                entry = entry.with_new_id();
            }
            Err(err) => return Err(err),
        }
    }
    unit.append(entry.clone()).await?;
    Ok(entry)
}

/// Commits the unit on success and rolls it back on failure, returning the operation's
/// outcome either way.
async fn finish<T: Send>(unit: Box<dyn AtomicUnit>, outcome: Result<T>) -> Result<T> {
    match outcome {
        Ok(value) => {
            unit.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = unit.rollback().await {
                tracing::error!(error = %rollback_err, "rollback failed");
            }
            Err(err)
        }
    }
}
