//! Runs against a live PostgreSQL database named by `WALLET_TEST_DATABASE_URL`.
//! Every test is a no-op when the variable is unset.
#![cfg(feature = "storage-postgres")]

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::time::Duration;
use wallet_ledger::application::engine::WalletEngine;
use wallet_ledger::config::{DatabaseConfig, EngineConfig};
use wallet_ledger::domain::ports::UnitOfWork;
use wallet_ledger::domain::transaction::TransactionType;
use wallet_ledger::domain::wallet::{OwnerId, WalletId};
use wallet_ledger::error::WalletError;
use wallet_ledger::infrastructure::postgres::PostgresStore;

async fn store() -> Option<PostgresStore> {
    let Ok(url) = std::env::var("WALLET_TEST_DATABASE_URL") else {
        eprintln!("WALLET_TEST_DATABASE_URL not set; skipping");
        return None;
    };
    let mut config = DatabaseConfig::new(url);
    config.max_connections = 10;
    config.lock_timeout = Some(Duration::from_secs(5));
    Some(PostgresStore::connect(&config).await.unwrap())
}

async fn engine() -> Option<WalletEngine> {
    let store = store().await?;
    Some(WalletEngine::from_store(&EngineConfig::default(), store))
}

/// Fresh owner per test so runs against a shared database do not collide.
fn owner() -> OwnerId {
    OwnerId::new(format!("owner-{}", uuid::Uuid::new_v4()))
}

async fn funded(engine: &WalletEngine, owner: &OwnerId, amount: Decimal) -> WalletId {
    let wallet = engine.create_wallet(owner, "main", None).await.unwrap();
    if amount > Decimal::ZERO {
        engine.deposit(owner, &wallet.id, amount).await.unwrap();
    }
    wallet.id
}

async fn balance(engine: &WalletEngine, owner: &OwnerId, wallet_id: &WalletId) -> Decimal {
    engine.wallet(owner, wallet_id).await.unwrap().balance.value()
}

#[tokio::test]
async fn test_postgres_withdraw_and_overdraft() {
    let Some(engine) = engine().await else { return };
    let owner = owner();
    let wallet = funded(&engine, &owner, dec!(100)).await;

    let entry = engine.adjust_balance(&owner, &wallet, dec!(-100)).await.unwrap();
    assert_eq!(entry.kind(), TransactionType::Withdraw);
    assert_eq!(balance(&engine, &owner, &wallet).await, dec!(0));

    let result = engine.adjust_balance(&owner, &wallet, dec!(-1)).await;
    assert!(matches!(result, Err(WalletError::InsufficientBalance { .. })));
    assert_eq!(engine.history().count(&wallet).await.unwrap(), 2);
}

#[tokio::test]
async fn test_postgres_transfer_and_history() {
    let Some(engine) = engine().await else { return };
    let owner = owner();
    let w1 = funded(&engine, &owner, dec!(100)).await;
    let w2 = funded(&engine, &owner, dec!(10)).await;

    let entry = engine.transfer(&owner, &w1, &w2, dec!(30)).await.unwrap();

    assert_eq!(balance(&engine, &owner, &w1).await, dec!(70));
    assert_eq!(balance(&engine, &owner, &w2).await, dec!(40));

    let page = engine
        .transaction_page(&owner, &w2, Some(1), Some(30))
        .await
        .unwrap();
    assert_eq!(page.total_records, 2);
    assert_eq!(page.items[0].id(), entry.id());
    assert_eq!(page.items[0].from_wallet_id(), Some(&w1));
}

#[tokio::test]
async fn test_postgres_foreign_owner_not_found() {
    let Some(engine) = engine().await else { return };
    let owner = owner();
    let wallet = funded(&engine, &owner, dec!(5)).await;

    let result = engine.deposit(&OwnerId::from("intruder"), &wallet, dec!(1)).await;
    assert!(matches!(result, Err(WalletError::NotFound)));
    assert_eq!(balance(&engine, &owner, &wallet).await, dec!(5));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_postgres_opposite_transfers_do_not_deadlock() {
    let Some(engine) = engine().await else { return };
    let owner = owner();
    let w1 = funded(&engine, &owner, dec!(100)).await;
    let w2 = funded(&engine, &owner, dec!(100)).await;

    let mut handles = Vec::new();
    for i in 0..40 {
        let engine = engine.clone();
        let owner = owner.clone();
        let (from, to) = if i % 2 == 0 {
            (w1.clone(), w2.clone())
        } else {
            (w2.clone(), w1.clone())
        };
        handles.push(tokio::spawn(async move {
            engine.transfer(&owner, &from, &to, dec!(10)).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(balance(&engine, &owner, &w1).await, dec!(100));
    assert_eq!(balance(&engine, &owner, &w2).await, dec!(100));
}

#[tokio::test]
async fn test_postgres_duplicate_entry_id_keeps_unit_usable() {
    let Some(store) = store().await else { return };
    let engine = WalletEngine::from_store(&EngineConfig::default(), store.clone());
    let owner = owner();
    let wallet = engine.create_wallet(&owner, "main", None).await.unwrap();
    let first = engine.deposit(&owner, &wallet.id, dec!(10)).await.unwrap();

    let mut unit = store.begin().await.unwrap();
    unit.lock_for_update(&wallet.id, None).await.unwrap();
    unit.adjust_balance(&wallet.id, dec!(10)).await.unwrap();
    assert!(matches!(
        unit.append(first.clone()).await,
        Err(WalletError::DuplicateEntry(_))
    ));
    // The transaction was not aborted by the conflict.
    unit.append(first.with_new_id()).await.unwrap();
    unit.commit().await.unwrap();

    assert_eq!(balance(&engine, &owner, &wallet.id).await, dec!(20));
    assert_eq!(engine.history().count(&wallet.id).await.unwrap(), 2);
}

#[tokio::test]
async fn test_postgres_deposit_past_limit_rejected() {
    let Some(engine) = engine().await else { return };
    let owner = owner();
    let wallet = funded(&engine, &owner, dec!(999999999999.99999999)).await;

    let result = engine.deposit(&owner, &wallet, dec!(0.00000001)).await;
    assert!(matches!(result, Err(WalletError::ValidationError(_))));
    assert_eq!(
        balance(&engine, &owner, &wallet).await,
        dec!(999999999999.99999999)
    );
}
