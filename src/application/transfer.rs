use super::{append_entry, finish};
use crate::domain::money::Amount;
use crate::domain::ports::{AtomicUnit, UnitOfWorkRef};
use crate::domain::transaction::LedgerEntry;
use crate::domain::wallet::{OwnerId, Wallet, WalletId};
use crate::error::{Result, WalletError};
use rust_decimal::Decimal;
use tracing::{debug, instrument, warn};

/// Moves value between two wallets in one atomic unit.
///
/// The initiating owner must own the source wallet; the destination can be anyone's.
/// Both wallets are locked in wallet-id order regardless of transfer direction, so two
/// opposite transfers between the same pair always queue on the same first lock.
#[derive(Clone)]
pub struct TransferCoordinator {
    units: UnitOfWorkRef,
}

impl TransferCoordinator {
    pub fn new(units: UnitOfWorkRef) -> Self {
        Self { units }
    }

    #[instrument(
        skip(self, owner_id, from, to, amount),
        fields(owner = %owner_id, from = %from, to = %to, amount = %amount)
    )]
    pub async fn transfer(
        &self,
        owner_id: &OwnerId,
        from: &WalletId,
        to: &WalletId,
        amount: Decimal,
    ) -> Result<LedgerEntry> {
        let amount = Amount::new(amount)?;
        if from == to {
            return Err(WalletError::ValidationError(format!(
                "Cannot transfer from wallet {from} to itself"
            )));
        }

        let mut unit = self.units.begin().await?;
        let outcome = transfer_locked(unit.as_mut(), owner_id, from, to, amount).await;
        let entry = finish(unit, outcome).await?;
        debug!(transaction = %entry.id(), "transfer committed");
        Ok(entry)
    }
}

async fn transfer_locked(
    unit: &mut dyn AtomicUnit,
    owner_id: &OwnerId,
    from: &WalletId,
    to: &WalletId,
    amount: Amount,
) -> Result<LedgerEntry> {
    let (source, destination) = lock_pair(unit, owner_id, from, to).await?;

    if !source.balance.covers(amount) {
        warn!(available = %source.balance, requested = %amount, "insufficient balance");
        return Err(WalletError::InsufficientBalance {
            available: source.balance.value(),
            requested: amount.value(),
        });
    }

    destination.balance.apply(amount.value())?;

    unit.adjust_balance(from, -amount.value()).await?;
    unit.adjust_balance(to, amount.value()).await?;
    let entry = LedgerEntry::transfer(from.clone(), to.clone(), amount)?;
    append_entry(unit, entry).await
}

/// Locks both sides, lower wallet id first, and returns them as `(source, destination)`.
async fn lock_pair(
    unit: &mut dyn AtomicUnit,
    owner_id: &OwnerId,
    from: &WalletId,
    to: &WalletId,
) -> Result<(Wallet, Wallet)> {
    if from < to {
        let source = unit.lock_for_update(from, Some(owner_id)).await?;
        let destination = unit.lock_for_update(to, None).await?;
        Ok((source, destination))
    } else {
        let destination = unit.lock_for_update(to, None).await?;
        let source = unit.lock_for_update(from, Some(owner_id)).await?;
        Ok((source, destination))
    }
}
