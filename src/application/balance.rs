use super::{append_entry, finish};
use crate::domain::ports::{AtomicUnit, UnitOfWorkRef};
use crate::domain::transaction::{BalanceChange, LedgerEntry};
use crate::domain::wallet::{OwnerId, WalletId};
use crate::error::{Result, WalletError};
use rust_decimal::Decimal;
use tracing::{debug, instrument, warn};

/// Single-wallet deposits and withdrawals.
///
/// Each call is one atomic unit: lock the owner's wallet, check sufficiency under the
/// lock, adjust the balance and append exactly one ledger entry.
#[derive(Clone)]
pub struct BalanceMutator {
    units: UnitOfWorkRef,
}

impl BalanceMutator {
    pub fn new(units: UnitOfWorkRef) -> Self {
        Self { units }
    }

    /// Signed entry point: a positive amount deposits, a negative amount withdraws.
    pub async fn adjust(
        &self,
        owner_id: &OwnerId,
        wallet_id: &WalletId,
        signed_amount: Decimal,
    ) -> Result<LedgerEntry> {
        let change = BalanceChange::from_signed(signed_amount)?;
        self.apply(owner_id, wallet_id, change).await
    }

    #[instrument(skip(self, owner_id, wallet_id), fields(owner = %owner_id, wallet = %wallet_id))]
    pub async fn apply(
        &self,
        owner_id: &OwnerId,
        wallet_id: &WalletId,
        change: BalanceChange,
    ) -> Result<LedgerEntry> {
        let mut unit = self.units.begin().await?;
        let outcome = apply_locked(unit.as_mut(), owner_id, wallet_id, change).await;
        let entry = finish(unit, outcome).await?;
        debug!(transaction = %entry.id(), kind = %entry.kind(), "balance change committed");
        Ok(entry)
    }
}

async fn apply_locked(
    unit: &mut dyn AtomicUnit,
    owner_id: &OwnerId,
    wallet_id: &WalletId,
    change: BalanceChange,
) -> Result<LedgerEntry> {
    let wallet = unit.lock_for_update(wallet_id, Some(owner_id)).await?;

    if let BalanceChange::Withdraw(amount) = change {
        if !wallet.balance.covers(amount) {
            warn!(available = %wallet.balance, requested = %amount, "insufficient balance");
            return Err(WalletError::InsufficientBalance {
                available: wallet.balance.value(),
                requested: amount.value(),
            });
        }
    }

    // Deposits stop short of the storable maximum.
    wallet.balance.apply(change.delta())?;

    unit.adjust_balance(wallet_id, change.delta()).await?;
    append_entry(unit, change.into_entry(wallet_id.clone())).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::money::Balance;
    use crate::domain::ports::{LedgerReader, UnitOfWork, WalletStore};
    use crate::domain::transaction::TransactionType;
    use crate::domain::wallet::Wallet;
    use crate::infrastructure::in_memory::InMemoryStore;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    async fn setup() -> (InMemoryStore, BalanceMutator, OwnerId, WalletId) {
        let store = InMemoryStore::new();
        let owner = OwnerId::from("alice");
        let wallet = Wallet::new(owner.clone(), "main", None);
        let wallet_id = wallet.id.clone();
        store.create(wallet).await.unwrap();
        let mutator = BalanceMutator::new(Arc::new(store.clone()) as Arc<dyn UnitOfWork>);
        (store, mutator, owner, wallet_id)
    }

    async fn balance(store: &InMemoryStore, owner: &OwnerId, wallet_id: &WalletId) -> Decimal {
        store
            .find_owned(wallet_id, owner)
            .await
            .unwrap()
            .unwrap()
            .balance
            .value()
    }

    #[tokio::test]
    async fn test_deposit_writes_one_entry() {
        let (store, mutator, owner, wallet_id) = setup().await;

        let entry = mutator.adjust(&owner, &wallet_id, dec!(100)).await.unwrap();
        assert_eq!(entry.kind(), TransactionType::Deposit);
        assert_eq!(entry.to_wallet_id(), Some(&wallet_id));
        assert_eq!(entry.from_wallet_id(), None);

        assert_eq!(balance(&store, &owner, &wallet_id).await, dec!(100));
        assert_eq!(store.count_by_wallet(&wallet_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_withdraw_entire_balance() {
        let (store, mutator, owner, wallet_id) = setup().await;
        mutator.adjust(&owner, &wallet_id, dec!(100)).await.unwrap();

        let entry = mutator.adjust(&owner, &wallet_id, dec!(-100)).await.unwrap();
        assert_eq!(entry.kind(), TransactionType::Withdraw);
        assert_eq!(entry.amount().value(), dec!(100));
        assert_eq!(entry.from_wallet_id(), Some(&wallet_id));

        let wallet = store.find_owned(&wallet_id, &owner).await.unwrap().unwrap();
        assert_eq!(wallet.balance, Balance::ZERO);
    }

    #[tokio::test]
    async fn test_withdraw_insufficient_leaves_state_untouched() {
        let (store, mutator, owner, wallet_id) = setup().await;
        mutator.adjust(&owner, &wallet_id, dec!(50)).await.unwrap();

        let result = mutator.adjust(&owner, &wallet_id, dec!(-100)).await;
        assert!(matches!(
            result,
            Err(WalletError::InsufficientBalance { available, requested })
                if available == dec!(50) && requested == dec!(100)
        ));
        assert_eq!(balance(&store, &owner, &wallet_id).await, dec!(50));
        assert_eq!(store.count_by_wallet(&wallet_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_foreign_owner_is_not_found() {
        let (store, mutator, owner, wallet_id) = setup().await;

        let result = mutator
            .adjust(&OwnerId::from("mallory"), &wallet_id, dec!(10))
            .await;
        assert!(matches!(result, Err(WalletError::NotFound)));
        assert_eq!(balance(&store, &owner, &wallet_id).await, dec!(0));
        assert_eq!(store.count_by_wallet(&wallet_id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_deposit_past_limit_rejected() {
        let (store, mutator, owner, wallet_id) = setup().await;
        mutator
            .adjust(&owner, &wallet_id, dec!(999999999999))
            .await
            .unwrap();

        let result = mutator.adjust(&owner, &wallet_id, dec!(1)).await;
        assert!(matches!(result, Err(WalletError::ValidationError(_))));
        assert_eq!(balance(&store, &owner, &wallet_id).await, dec!(999999999999));
        assert_eq!(store.count_by_wallet(&wallet_id).await.unwrap(), 1);

        // Withdrawals still work at the limit.
        mutator.adjust(&owner, &wallet_id, dec!(-1)).await.unwrap();
    }

    #[tokio::test]
    async fn test_excess_precision_rejected() {
        let (store, mutator, owner, wallet_id) = setup().await;
        let result = mutator.adjust(&owner, &wallet_id, dec!(0.000000001)).await;
        assert!(matches!(result, Err(WalletError::ValidationError(_))));
        assert_eq!(store.count_by_wallet(&wallet_id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_zero_amount_rejected() {
        let (_store, mutator, owner, wallet_id) = setup().await;
        let result = mutator.adjust(&owner, &wallet_id, dec!(0)).await;
        assert!(matches!(result, Err(WalletError::ValidationError(_))));
    }
}
