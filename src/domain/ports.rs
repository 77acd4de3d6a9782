use super::transaction::LedgerEntry;
use super::wallet::{OwnerId, Wallet, WalletId};
use crate::error::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Wallet records outside of any atomic unit.
#[async_trait]
pub trait WalletStore: Send + Sync {
    async fn create(&self, wallet: Wallet) -> Result<()>;
    /// Point read scoped to an owner. A foreign wallet reads as `None`.
    async fn find_owned(&self, wallet_id: &WalletId, owner_id: &OwnerId)
    -> Result<Option<Wallet>>;
    async fn list_by_owner(&self, owner_id: &OwnerId) -> Result<Vec<Wallet>>;
    async fn update_metadata(
        &self,
        wallet_id: &WalletId,
        name: &str,
        description: Option<&str>,
    ) -> Result<()>;
    /// Removes the wallet. Ledger entries referencing it are kept.
    async fn delete(&self, wallet_id: &WalletId) -> Result<()>;
}

/// Read side of the ledger. Takes no locks.
#[async_trait]
pub trait LedgerReader: Send + Sync {
    async fn count_by_wallet(&self, wallet_id: &WalletId) -> Result<u64>;
    /// Entries touching the wallet, newest `created_at` first.
    async fn list_by_wallet(
        &self,
        wallet_id: &WalletId,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<LedgerEntry>>;
}

/// Opens atomic units against the backing store.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn AtomicUnit>>;
}

/// One atomic unit: balance changes and ledger appends commit or roll back together.
///
/// Dropping a unit without committing it must roll it back and release its locks.
#[async_trait]
pub trait AtomicUnit: Send {
    /// Takes an exclusive row lock on the wallet for the rest of the unit.
    ///
    /// With `owner_id` the lookup is scoped to that owner; a mismatch is `NotFound`.
    async fn lock_for_update(
        &mut self,
        wallet_id: &WalletId,
        owner_id: Option<&OwnerId>,
    ) -> Result<Wallet>;
    /// Relative balance change. The wallet must already be locked by this unit.
    async fn adjust_balance(&mut self, wallet_id: &WalletId, delta: Decimal) -> Result<()>;
    /// Ledger writer: appends one immutable entry inside this unit.
    ///
    /// An id already taken by a committed or staged entry fails with `DuplicateEntry`
    /// and leaves the unit usable, so the caller can retry under a fresh id.
    async fn append(&mut self, entry: LedgerEntry) -> Result<()>;
    async fn commit(self: Box<Self>) -> Result<()>;
    async fn rollback(self: Box<Self>) -> Result<()>;
}

pub type WalletStoreRef = Arc<dyn WalletStore>;
pub type LedgerReaderRef = Arc<dyn LedgerReader>;
pub type UnitOfWorkRef = Arc<dyn UnitOfWork>;
