use crate::config::HistoryConfig;
use crate::domain::ports::{LedgerReaderRef, WalletStoreRef};
use crate::domain::transaction::LedgerEntry;
use crate::domain::wallet::{OwnerId, WalletId};
use crate::error::{Result, WalletError};
use serde::Serialize;
use tracing::instrument;

/// A resolved, 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Pagination {
    pub fn new(page: u32, limit: u32) -> Self {
        Self { page, limit }
    }

    /// Missing or zero values fall back to page 1 and the configured default limit;
    /// limits above the configured maximum are clamped.
    pub fn resolve(page: Option<u32>, limit: Option<u32>, config: &HistoryConfig) -> Self {
        let page = page.filter(|page| *page > 0).unwrap_or(1);
        let limit = limit
            .filter(|limit| *limit > 0)
            .unwrap_or(config.default_limit)
            .min(config.max_limit);
        Self { page, limit }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionPage {
    pub items: Vec<LedgerEntry>,
    pub page: u32,
    pub limit: u32,
    pub total_records: u64,
}

/// Read-only access to a wallet's ledger entries. Never opens an atomic unit, so reads
/// only ever observe committed state.
#[derive(Clone)]
pub struct HistoryQuery {
    wallets: WalletStoreRef,
    ledger: LedgerReaderRef,
    config: HistoryConfig,
}

impl HistoryQuery {
    pub fn new(wallets: WalletStoreRef, ledger: LedgerReaderRef, config: HistoryConfig) -> Self {
        Self {
            wallets,
            ledger,
            config,
        }
    }

    /// Number of entries where the wallet is the source or the destination.
    pub async fn count(&self, wallet_id: &WalletId) -> Result<u64> {
        self.ledger.count_by_wallet(wallet_id).await
    }

    /// Entries touching the wallet, newest first. `page` is 1-based; page 0 reads as
    /// page 1.
    pub async fn list(&self, wallet_id: &WalletId, page: u32, limit: u32) -> Result<Vec<LedgerEntry>> {
        let pagination = Pagination::new(page, limit);
        self.ledger
            .list_by_wallet(wallet_id, pagination.offset(), u64::from(limit))
            .await
    }

    /// Owner-scoped page of history together with the total entry count.
    #[instrument(skip(self, owner_id, wallet_id), fields(owner = %owner_id, wallet = %wallet_id))]
    pub async fn page(
        &self,
        owner_id: &OwnerId,
        wallet_id: &WalletId,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Result<TransactionPage> {
        if self.wallets.find_owned(wallet_id, owner_id).await?.is_none() {
            return Err(WalletError::NotFound);
        }

        let pagination = Pagination::resolve(page, limit, &self.config);
        let total_records = self.count(wallet_id).await?;
        let items = if total_records == 0 {
            Vec::new()
        } else {
            self.list(wallet_id, pagination.page, pagination.limit).await?
        };

        Ok(TransactionPage {
            items,
            page: pagination.page,
            limit: pagination.limit,
            total_records,
        })
    }
}
