use crate::domain::ports::WalletStoreRef;
use crate::domain::wallet::{OwnerId, Wallet, WalletId};
use crate::error::{Result, WalletError};
use tracing::{info, instrument};

/// Owner-scoped wallet management. Every lookup is filtered by owner, so a wallet that
/// belongs to someone else is indistinguishable from one that does not exist.
#[derive(Clone)]
pub struct WalletService {
    store: WalletStoreRef,
}

impl WalletService {
    pub fn new(store: WalletStoreRef) -> Self {
        Self { store }
    }

    /// Creates a wallet with a fresh id and a zero balance.
    #[instrument(skip(self, owner_id, description), fields(owner = %owner_id))]
    pub async fn create(
        &self,
        owner_id: &OwnerId,
        name: &str,
        description: Option<&str>,
    ) -> Result<Wallet> {
        let wallet = Wallet::new(owner_id.clone(), name, description.map(str::to_owned));
        self.store.create(wallet.clone()).await?;
        info!(wallet = %wallet.id, "wallet created");
        Ok(wallet)
    }

    pub async fn list(&self, owner_id: &OwnerId) -> Result<Vec<Wallet>> {
        self.store.list_by_owner(owner_id).await
    }

    pub async fn get(&self, owner_id: &OwnerId, wallet_id: &WalletId) -> Result<Wallet> {
        self.store
            .find_owned(wallet_id, owner_id)
            .await?
            .ok_or(WalletError::NotFound)
    }

    /// Replaces name and description. Balance is never touched here.
    pub async fn update_info(
        &self,
        owner_id: &OwnerId,
        wallet_id: &WalletId,
        name: &str,
        description: Option<&str>,
    ) -> Result<Wallet> {
        self.get(owner_id, wallet_id).await?;
        self.store.update_metadata(wallet_id, name, description).await?;
        self.get(owner_id, wallet_id).await
    }

    /// Removes the wallet. Ledger entries that reference it are kept.
    #[instrument(skip(self, owner_id, wallet_id), fields(owner = %owner_id, wallet = %wallet_id))]
    pub async fn delete(&self, owner_id: &OwnerId, wallet_id: &WalletId) -> Result<()> {
        self.get(owner_id, wallet_id).await?;
        self.store.delete(wallet_id).await?;
        info!("wallet deleted");
        Ok(())
    }
}
