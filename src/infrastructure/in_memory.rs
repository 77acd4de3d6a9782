use crate::domain::ports::{AtomicUnit, LedgerReader, UnitOfWork, WalletStore};
use crate::domain::transaction::{LedgerEntry, TransactionId};
use crate::domain::wallet::{OwnerId, Wallet, WalletId};
use crate::error::{Result, WalletError};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

type RowLock = Arc<Mutex<()>>;

#[derive(Default)]
struct State {
    wallets: HashMap<WalletId, Wallet>,
    /// Committed entries in commit order.
    ledger: Vec<LedgerEntry>,
    ledger_ids: HashSet<TransactionId>,
}

/// A thread-safe in-memory wallet store with real per-wallet row locks.
///
/// Every wallet has its own `tokio::sync::Mutex`. An atomic unit holds the owned guard
/// of each wallet it locked until it commits or is dropped, so mutators touching
/// disjoint wallets never wait on each other. Committed state lives behind a single
/// `RwLock` that is only write-locked for the instant a unit publishes its changes.
///
/// `Clone` shares the underlying state.
#[derive(Default, Clone)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
    row_locks: Arc<Mutex<HashMap<WalletId, RowLock>>>,
}

impl InMemoryStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    async fn lock_row(&self, wallet_id: &WalletId) -> OwnedMutexGuard<()> {
        let row_lock = {
            let mut locks = self.row_locks.lock().await;
            locks.entry(wallet_id.clone()).or_default().clone()
        };
        row_lock.lock_owned().await
    }

    /// Releases `guard` and forgets the wallet's row lock unless another unit is
    /// holding or waiting on it.
    async fn release_row(&self, wallet_id: &WalletId, guard: OwnedMutexGuard<()>) {
        let mut locks = self.row_locks.lock().await;
        drop(guard);
        // Lockers clone the mutex under the map lock, so a lone reference is ours.
        if locks
            .get(wallet_id)
            .is_some_and(|row_lock| Arc::strong_count(row_lock) == 1)
        {
            locks.remove(wallet_id);
        }
    }
}

#[async_trait]
impl WalletStore for InMemoryStore {
    async fn create(&self, wallet: Wallet) -> Result<()> {
        let mut state = self.state.write().await;
        if state.wallets.contains_key(&wallet.id) {
            return Err(WalletError::ValidationError(format!(
                "Wallet {} already exists",
                wallet.id
            )));
        }
        state.wallets.insert(wallet.id.clone(), wallet);
        Ok(())
    }

    async fn find_owned(
        &self,
        wallet_id: &WalletId,
        owner_id: &OwnerId,
    ) -> Result<Option<Wallet>> {
        let state = self.state.read().await;
        Ok(state
            .wallets
            .get(wallet_id)
            .filter(|wallet| wallet.is_owned_by(owner_id))
            .cloned())
    }

    async fn list_by_owner(&self, owner_id: &OwnerId) -> Result<Vec<Wallet>> {
        let state = self.state.read().await;
        let mut wallets: Vec<Wallet> = state
            .wallets
            .values()
            .filter(|wallet| wallet.is_owned_by(owner_id))
            .cloned()
            .collect();
        wallets.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(wallets)
    }

    async fn update_metadata(
        &self,
        wallet_id: &WalletId,
        name: &str,
        description: Option<&str>,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        let wallet = state
            .wallets
            .get_mut(wallet_id)
            .ok_or(WalletError::NotFound)?;
        wallet.name = name.to_string();
        wallet.description = description.map(str::to_string);
        wallet.updated_at = Utc::now();
        Ok(())
    }

    async fn delete(&self, wallet_id: &WalletId) -> Result<()> {
        // Waits for any unit that currently holds the wallet.
        let guard = self.lock_row(wallet_id).await;
        let removed = self.state.write().await.wallets.remove(wallet_id);
        self.release_row(wallet_id, guard).await;
        removed.map(|_| ()).ok_or(WalletError::NotFound)
    }
}

#[async_trait]
impl LedgerReader for InMemoryStore {
    async fn count_by_wallet(&self, wallet_id: &WalletId) -> Result<u64> {
        let state = self.state.read().await;
        let count = state
            .ledger
            .iter()
            .filter(|entry| entry.touches(wallet_id))
            .count();
        Ok(count as u64)
    }

    async fn list_by_wallet(
        &self,
        wallet_id: &WalletId,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<LedgerEntry>> {
        let state = self.state.read().await;
        let mut touching: Vec<(usize, &LedgerEntry)> = state
            .ledger
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.touches(wallet_id))
            .collect();
        // Newest first; commit order breaks timestamp ties.
        touching.sort_by(|(a_seq, a), (b_seq, b)| {
            b.created_at()
                .cmp(&a.created_at())
                .then(b_seq.cmp(a_seq))
        });
        Ok(touching
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .map(|(_, entry)| entry.clone())
            .collect())
    }
}

#[async_trait]
impl UnitOfWork for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn AtomicUnit>> {
        Ok(Box::new(InMemoryUnit {
            store: self.clone(),
            guards: HashMap::new(),
            deltas: HashMap::new(),
            entries: Vec::new(),
        }))
    }
}

/// Atomic unit over [`InMemoryStore`].
///
/// Balance deltas and ledger entries are staged and only published by `commit`.
/// Dropping the unit discards them and releases every row lock it holds.
pub struct InMemoryUnit {
    store: InMemoryStore,
    guards: HashMap<WalletId, OwnedMutexGuard<()>>,
    deltas: HashMap<WalletId, Decimal>,
    entries: Vec<LedgerEntry>,
}

#[async_trait]
impl AtomicUnit for InMemoryUnit {
    async fn lock_for_update(
        &mut self,
        wallet_id: &WalletId,
        owner_id: Option<&OwnerId>,
    ) -> Result<Wallet> {
        let new_guard = if self.guards.contains_key(wallet_id) {
            None
        } else {
            Some(self.store.lock_row(wallet_id).await)
        };

        let wallet = {
            let state = self.store.state.read().await;
            state
                .wallets
                .get(wallet_id)
                .filter(|wallet| owner_id.is_none_or(|owner| wallet.is_owned_by(owner)))
                .cloned()
        };
        let Some(mut wallet) = wallet else {
            if let Some(guard) = new_guard {
                self.store.release_row(wallet_id, guard).await;
            }
            return Err(WalletError::NotFound);
        };

        if let Some(guard) = new_guard {
            self.guards.insert(wallet_id.clone(), guard);
        }
        if let Some(delta) = self.deltas.get(wallet_id) {
            wallet.balance = wallet.balance.apply(*delta)?;
        }
        Ok(wallet)
    }

    async fn adjust_balance(&mut self, wallet_id: &WalletId, delta: Decimal) -> Result<()> {
        if !self.guards.contains_key(wallet_id) {
            return Err(WalletError::internal(format!(
                "Balance of wallet {wallet_id} adjusted without holding its lock"
            )));
        }
        let staged = self.deltas.entry(wallet_id.clone()).or_default();
        *staged = staged.checked_add(delta).ok_or_else(|| {
            WalletError::ValidationError(format!(
                "Balance change of wallet {wallet_id} is out of range"
            ))
        })?;
        Ok(())
    }

    async fn append(&mut self, entry: LedgerEntry) -> Result<()> {
        let staged = self.entries.iter().any(|staged| staged.id() == entry.id());
        if staged || self.store.state.read().await.ledger_ids.contains(entry.id()) {
            return Err(WalletError::DuplicateEntry(entry.id().to_string()));
        }
        self.entries.push(entry);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let InMemoryUnit {
            store,
            guards,
            deltas,
            entries,
        } = *self;

        let mut state = store.state.write().await;
        let mut balances = Vec::with_capacity(deltas.len());
        for (wallet_id, delta) in &deltas {
            let wallet = state.wallets.get(wallet_id).ok_or_else(|| {
                WalletError::internal(format!("Locked wallet {wallet_id} vanished before commit"))
            })?;
            let balance = wallet.balance.apply(*delta).map_err(|_| {
                WalletError::internal(format!(
                    "Commit would leave wallet {wallet_id} out of range"
                ))
            })?;
            balances.push((wallet_id, balance));
        }
        // Another unit may have committed the same id since it was appended here.
        if let Some(taken) = entries.iter().find(|entry| state.ledger_ids.contains(entry.id())) {
            return Err(WalletError::DuplicateEntry(taken.id().to_string()));
        }

        let now = Utc::now();
        for (wallet_id, balance) in balances {
            if let Some(wallet) = state.wallets.get_mut(wallet_id) {
                wallet.balance = balance;
                wallet.updated_at = now;
            }
        }
        state
            .ledger_ids
            .extend(entries.iter().map(|entry| entry.id().clone()));
        state.ledger.extend(entries);
        drop(state);
        drop(guards);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}
