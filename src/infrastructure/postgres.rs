use crate::config::DatabaseConfig;
use crate::domain::money::Balance;
use crate::domain::ports::{AtomicUnit, LedgerReader, UnitOfWork, WalletStore};
use crate::domain::transaction::{LedgerEntry, TransactionId};
use crate::domain::wallet::{OwnerId, Wallet, WalletId};
use crate::error::{Result, WalletError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{FromRow, Postgres, Transaction};
use std::collections::HashSet;
use std::time::Duration;

/// Wallet store backed by PostgreSQL.
///
/// Atomic units are database transactions; `lock_for_update` is `SELECT ... FOR UPDATE`,
/// so isolation comes entirely from the database's row locks. Schema lives in
/// `migrations/` and is applied on open.
///
/// `Clone` shares the connection pool.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
    lock_timeout: Option<Duration>,
}

impl PostgresStore {
    /// Connects a pool with the given settings and runs the migrations.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await?;
        tracing::info!(max_connections = config.max_connections, "PostgreSQL pool connected");
        Self::open_and_run_migrations(pool, config.lock_timeout).await
    }

    pub async fn open_and_run_migrations(
        pool: PgPool,
        lock_timeout: Option<Duration>,
    ) -> Result<Self> {
        sqlx::migrate!().run(&pool).await.map_err(|err| {
            WalletError::internal(format!(
                "Failed to run PostgreSQL database migrations; error was {err}"
            ))
        })?;
        Ok(Self { pool, lock_timeout })
    }
}

#[derive(FromRow)]
struct WalletRow {
    id: String,
    owner_id: String,
    name: String,
    description: Option<String>,
    balance: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<WalletRow> for Wallet {
    type Error = WalletError;

    fn try_from(row: WalletRow) -> Result<Self> {
        Ok(Wallet {
            id: WalletId::new(row.id),
            owner_id: OwnerId::new(row.owner_id),
            name: row.name,
            description: row.description,
            balance: Balance::new(row.balance)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct TransactionRow {
    id: String,
    from_wallet_id: Option<String>,
    to_wallet_id: Option<String>,
    amount: Decimal,
    kind: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for LedgerEntry {
    type Error = WalletError;

    fn try_from(row: TransactionRow) -> Result<Self> {
        LedgerEntry::restore(
            TransactionId::new(row.id),
            row.from_wallet_id.map(WalletId::new),
            row.to_wallet_id.map(WalletId::new),
            row.amount,
            row.kind.parse()?,
            row.created_at,
            row.updated_at,
        )
    }
}

#[async_trait]
impl WalletStore for PostgresStore {
    async fn create(&self, wallet: Wallet) -> Result<()> {
        sqlx::query(
            r#"
                insert into wallets (id, owner_id, name, description, balance, created_at, updated_at)
                values ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(wallet.id.as_str())
        .bind(wallet.owner_id.as_str())
        .bind(&wallet.name)
        .bind(wallet.description.as_deref())
        .bind(wallet.balance.value())
        .bind(wallet.created_at)
        .bind(wallet.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_owned(
        &self,
        wallet_id: &WalletId,
        owner_id: &OwnerId,
    ) -> Result<Option<Wallet>> {
        let row = sqlx::query_as::<_, WalletRow>(
            r#"
                select id, owner_id, name, description, balance, created_at, updated_at
                from wallets
                where id = $1 and owner_id = $2
            "#,
        )
        .bind(wallet_id.as_str())
        .bind(owner_id.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Wallet::try_from).transpose()
    }

    async fn list_by_owner(&self, owner_id: &OwnerId) -> Result<Vec<Wallet>> {
        let rows = sqlx::query_as::<_, WalletRow>(
            r#"
                select id, owner_id, name, description, balance, created_at, updated_at
                from wallets
                where owner_id = $1
                order by created_at, id
            "#,
        )
        .bind(owner_id.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Wallet::try_from).collect()
    }

    async fn update_metadata(
        &self,
        wallet_id: &WalletId,
        name: &str,
        description: Option<&str>,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
                update wallets
                set name = $2, description = $3, updated_at = now()
                where id = $1
            "#,
        )
        .bind(wallet_id.as_str())
        .bind(name)
        .bind(description)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(WalletError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, wallet_id: &WalletId) -> Result<()> {
        let result = sqlx::query("delete from wallets where id = $1")
            .bind(wallet_id.as_str())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(WalletError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerReader for PostgresStore {
    async fn count_by_wallet(&self, wallet_id: &WalletId) -> Result<u64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
                select count(*)
                from wallet_transactions
                where from_wallet_id = $1 or to_wallet_id = $1
            "#,
        )
        .bind(wallet_id.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(count as u64)
    }

    async fn list_by_wallet(
        &self,
        wallet_id: &WalletId,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<LedgerEntry>> {
        let rows = sqlx::query_as::<_, TransactionRow>(
            r#"
                select id, from_wallet_id, to_wallet_id, amount, type as kind, created_at, updated_at
                from wallet_transactions
                where from_wallet_id = $1 or to_wallet_id = $1
                order by created_at desc, seq desc
                offset $2
                limit $3
            "#,
        )
        .bind(wallet_id.as_str())
        .bind(offset as i64)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(LedgerEntry::try_from).collect()
    }
}

#[async_trait]
impl UnitOfWork for PostgresStore {
    async fn begin(&self) -> Result<Box<dyn AtomicUnit>> {
        let mut transaction = self.pool.begin().await?;
        if let Some(lock_timeout) = self.lock_timeout {
            let statement = format!("set local lock_timeout = '{}ms'", lock_timeout.as_millis());
            sqlx::query(&statement).execute(&mut *transaction).await?;
        }
        Ok(Box::new(PostgresUnit {
            transaction,
            locked: HashSet::new(),
        }))
    }
}

/// Atomic unit over one PostgreSQL transaction. sqlx rolls the transaction back if it
/// is dropped uncommitted.
pub struct PostgresUnit {
    transaction: Transaction<'static, Postgres>,
    locked: HashSet<WalletId>,
}

#[async_trait]
impl AtomicUnit for PostgresUnit {
    async fn lock_for_update(
        &mut self,
        wallet_id: &WalletId,
        owner_id: Option<&OwnerId>,
    ) -> Result<Wallet> {
        let row = sqlx::query_as::<_, WalletRow>(
            r#"
                select id, owner_id, name, description, balance, created_at, updated_at
                from wallets
                where id = $1 and ($2::text is null or owner_id = $2)
                for update
            "#,
        )
        .bind(wallet_id.as_str())
        .bind(owner_id.map(OwnerId::as_str))
        .fetch_optional(&mut *self.transaction)
        .await?;
        let wallet = Wallet::try_from(row.ok_or(WalletError::NotFound)?)?;
        self.locked.insert(wallet_id.clone());
        Ok(wallet)
    }

    async fn adjust_balance(&mut self, wallet_id: &WalletId, delta: Decimal) -> Result<()> {
        if !self.locked.contains(wallet_id) {
            return Err(WalletError::internal(format!(
                "Balance of wallet {wallet_id} adjusted without holding its lock"
            )));
        }
        let result = sqlx::query(
            r#"
                update wallets
                set balance = balance + $2, updated_at = now()
                where id = $1
            "#,
        )
        .bind(wallet_id.as_str())
        .bind(delta)
        .execute(&mut *self.transaction)
        .await?;
        if result.rows_affected() != 1 {
            return Err(WalletError::internal(format!(
                "Locked wallet {wallet_id} vanished before its balance was adjusted"
            )));
        }
        Ok(())
    }

    async fn append(&mut self, entry: LedgerEntry) -> Result<()> {
        // A taken id inserts nothing instead of aborting the whole transaction.
        let inserted = sqlx::query(
            r#"
                insert into wallet_transactions (id, from_wallet_id, to_wallet_id, amount, type, created_at, updated_at)
                values ($1, $2, $3, $4, $5, $6, $7)
                on conflict (id) do nothing
            "#,
        )
        .bind(entry.id().as_str())
        .bind(entry.from_wallet_id().map(WalletId::as_str))
        .bind(entry.to_wallet_id().map(WalletId::as_str))
        .bind(entry.amount().value())
        .bind(entry.kind().as_str())
        .bind(entry.created_at())
        .bind(entry.updated_at())
        .execute(&mut *self.transaction)
        .await?
        .rows_affected();
        if inserted == 0 {
            return Err(WalletError::DuplicateEntry(entry.id().to_string()));
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let PostgresUnit { transaction, .. } = *self;
        transaction.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        let PostgresUnit { transaction, .. } = *self;
        transaction.rollback().await?;
        Ok(())
    }
}
