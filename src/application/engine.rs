use super::balance::BalanceMutator;
use super::history::{HistoryQuery, TransactionPage};
use super::transfer::TransferCoordinator;
use super::wallets::WalletService;
use crate::config::EngineConfig;
use crate::domain::money::Amount;
use crate::domain::ports::{
    LedgerReader, LedgerReaderRef, UnitOfWork, UnitOfWorkRef, WalletStore, WalletStoreRef,
};
use crate::domain::transaction::{BalanceChange, LedgerEntry};
use crate::domain::wallet::{OwnerId, Wallet, WalletId};
use crate::error::Result;
use rust_decimal::Decimal;
use std::sync::Arc;

/// The main entry point for wallet operations.
///
/// `WalletEngine` bundles the wallet service, the balance mutator, the transfer
/// coordinator and the history query over one set of storage ports. It holds no state
/// of its own; all isolation comes from the atomic units the ports hand out, so one
/// engine can be shared across tasks.
#[derive(Clone)]
pub struct WalletEngine {
    wallets: WalletService,
    balances: BalanceMutator,
    transfers: TransferCoordinator,
    history: HistoryQuery,
}

impl WalletEngine {
    /// Creates a new `WalletEngine` instance.
    ///
    /// # Arguments
    ///
    /// * `config` - Engine settings, history pagination included.
    /// * `wallet_store` - Wallet rows.
    /// * `ledger` - Committed ledger entries.
    /// * `units` - Source of atomic units for every mutation.
    pub fn new(
        config: &EngineConfig,
        wallet_store: WalletStoreRef,
        ledger: LedgerReaderRef,
        units: UnitOfWorkRef,
    ) -> Self {
        Self {
            wallets: WalletService::new(wallet_store.clone()),
            balances: BalanceMutator::new(units.clone()),
            transfers: TransferCoordinator::new(units),
            history: HistoryQuery::new(wallet_store, ledger, config.history),
        }
    }

    /// Wires every port to the same backing store.
    pub fn from_store<S>(config: &EngineConfig, store: S) -> Self
    where
        S: WalletStore + LedgerReader + UnitOfWork + 'static,
    {
        let store = Arc::new(store);
        Self::new(config, store.clone(), store.clone(), store)
    }

    pub fn wallets(&self) -> &WalletService {
        &self.wallets
    }

    pub fn balances(&self) -> &BalanceMutator {
        &self.balances
    }

    pub fn transfers(&self) -> &TransferCoordinator {
        &self.transfers
    }

    pub fn history(&self) -> &HistoryQuery {
        &self.history
    }

    pub async fn create_wallet(
        &self,
        owner_id: &OwnerId,
        name: &str,
        description: Option<&str>,
    ) -> Result<Wallet> {
        self.wallets.create(owner_id, name, description).await
    }

    pub async fn wallet(&self, owner_id: &OwnerId, wallet_id: &WalletId) -> Result<Wallet> {
        self.wallets.get(owner_id, wallet_id).await
    }

    /// Positive amounts deposit, negative amounts withdraw.
    pub async fn adjust_balance(
        &self,
        owner_id: &OwnerId,
        wallet_id: &WalletId,
        signed_amount: Decimal,
    ) -> Result<LedgerEntry> {
        self.balances.adjust(owner_id, wallet_id, signed_amount).await
    }

    pub async fn deposit(
        &self,
        owner_id: &OwnerId,
        wallet_id: &WalletId,
        amount: Decimal,
    ) -> Result<LedgerEntry> {
        let change = BalanceChange::Deposit(Amount::new(amount)?);
        self.balances.apply(owner_id, wallet_id, change).await
    }

    pub async fn withdraw(
        &self,
        owner_id: &OwnerId,
        wallet_id: &WalletId,
        amount: Decimal,
    ) -> Result<LedgerEntry> {
        let change = BalanceChange::Withdraw(Amount::new(amount)?);
        self.balances.apply(owner_id, wallet_id, change).await
    }

    pub async fn transfer(
        &self,
        owner_id: &OwnerId,
        from: &WalletId,
        to: &WalletId,
        amount: Decimal,
    ) -> Result<LedgerEntry> {
        self.transfers.transfer(owner_id, from, to, amount).await
    }

    pub async fn transaction_page(
        &self,
        owner_id: &OwnerId,
        wallet_id: &WalletId,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Result<TransactionPage> {
        self.history.page(owner_id, wallet_id, page, limit).await
    }
}
