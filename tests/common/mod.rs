#![allow(dead_code)]

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::fs::File;
use std::io::Error;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use wallet_ledger::application::engine::WalletEngine;
use wallet_ledger::config::EngineConfig;
use wallet_ledger::domain::ports::{AtomicUnit, LedgerReader, UnitOfWork};
use wallet_ledger::domain::transaction::LedgerEntry;
use wallet_ledger::domain::wallet::{OwnerId, Wallet, WalletId};
use wallet_ledger::error::{Result, WalletError};
use wallet_ledger::infrastructure::in_memory::InMemoryStore;

pub fn in_memory_engine() -> (InMemoryStore, WalletEngine) {
    let store = InMemoryStore::new();
    let engine = WalletEngine::from_store(&EngineConfig::default(), store.clone());
    (store, engine)
}

/// Creates a wallet for `owner` and deposits `balance` into it when positive.
pub async fn seed_wallet(engine: &WalletEngine, owner: &OwnerId, balance: Decimal) -> WalletId {
    let wallet = engine.create_wallet(owner, "seeded", None).await.unwrap();
    if balance > Decimal::ZERO {
        engine.deposit(owner, &wallet.id, balance).await.unwrap();
    }
    wallet.id
}

pub async fn balance_of(engine: &WalletEngine, owner: &OwnerId, wallet_id: &WalletId) -> Decimal {
    let wallet: Wallet = engine.wallet(owner, wallet_id).await.unwrap();
    wallet.balance.value()
}

/// Unit source whose units fail on the ledger append, after any balance change has
/// already been staged.
pub struct FailingAppendUnits {
    inner: InMemoryStore,
}

impl FailingAppendUnits {
    pub fn new(inner: InMemoryStore) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl UnitOfWork for FailingAppendUnits {
    async fn begin(&self) -> Result<Box<dyn AtomicUnit>> {
        let inner = self.inner.begin().await?;
        Ok(Box::new(FailingAppendUnit { inner }))
    }
}

struct FailingAppendUnit {
    inner: Box<dyn AtomicUnit>,
}

#[async_trait]
impl AtomicUnit for FailingAppendUnit {
    async fn lock_for_update(
        &mut self,
        wallet_id: &WalletId,
        owner_id: Option<&OwnerId>,
    ) -> Result<Wallet> {
        self.inner.lock_for_update(wallet_id, owner_id).await
    }

    async fn adjust_balance(&mut self, wallet_id: &WalletId, delta: Decimal) -> Result<()> {
        self.inner.adjust_balance(wallet_id, delta).await
    }

    async fn append(&mut self, _entry: LedgerEntry) -> Result<()> {
        Err(WalletError::internal("ledger unavailable"))
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.inner.commit().await
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.inner.rollback().await
    }
}

/// Unit source whose units report the first `collisions` appends as duplicate ids.
pub struct CollidingAppendUnits {
    inner: InMemoryStore,
    collisions: usize,
}

impl CollidingAppendUnits {
    pub fn new(inner: InMemoryStore, collisions: usize) -> Self {
        Self { inner, collisions }
    }
}

#[async_trait]
impl UnitOfWork for CollidingAppendUnits {
    async fn begin(&self) -> Result<Box<dyn AtomicUnit>> {
        let inner = self.inner.begin().await?;
        Ok(Box::new(CollidingAppendUnit {
            inner,
            remaining: self.collisions,
        }))
    }
}

struct CollidingAppendUnit {
    inner: Box<dyn AtomicUnit>,
    remaining: usize,
}

#[async_trait]
impl AtomicUnit for CollidingAppendUnit {
    async fn lock_for_update(
        &mut self,
        wallet_id: &WalletId,
        owner_id: Option<&OwnerId>,
    ) -> Result<Wallet> {
        self.inner.lock_for_update(wallet_id, owner_id).await
    }

    async fn adjust_balance(&mut self, wallet_id: &WalletId, delta: Decimal) -> Result<()> {
        self.inner.adjust_balance(wallet_id, delta).await
    }

    async fn append(&mut self, entry: LedgerEntry) -> Result<()> {
        if self.remaining > 0 {
            self.remaining -= 1;
            return Err(WalletError::DuplicateEntry(entry.id().to_string()));
        }
        self.inner.append(entry).await
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.inner.commit().await
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.inner.rollback().await
    }
}

/// Ledger reader that counts how often each query reaches storage.
pub struct CountingLedger {
    inner: InMemoryStore,
    pub counts: AtomicUsize,
    pub lists: AtomicUsize,
}

impl CountingLedger {
    pub fn new(inner: InMemoryStore) -> Arc<Self> {
        Arc::new(Self {
            inner,
            counts: AtomicUsize::new(0),
            lists: AtomicUsize::new(0),
        })
    }

    pub fn list_calls(&self) -> usize {
        self.lists.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LedgerReader for CountingLedger {
    async fn count_by_wallet(&self, wallet_id: &WalletId) -> Result<u64> {
        self.counts.fetch_add(1, Ordering::SeqCst);
        self.inner.count_by_wallet(wallet_id).await
    }

    async fn list_by_wallet(
        &self,
        wallet_id: &WalletId,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<LedgerEntry>> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        self.inner.list_by_wallet(wallet_id, offset, limit).await
    }
}

/// Writes a replay file that opens one wallet and deposits `1.0` into it `rows` times.
pub fn generate_deposits_csv(path: &Path, rows: usize) -> std::result::Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);

    wtr.write_record(["type", "owner", "wallet", "counterparty", "amount"])?;
    wtr.write_record(["open", "alice", "main", "", ""])?;

    for _ in 0..rows {
        wtr.write_record(["deposit", "alice", "main", "", "1.0"])?;
    }

    wtr.flush()?;
    Ok(())
}
