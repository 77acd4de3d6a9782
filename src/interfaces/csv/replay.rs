use super::balance_writer::BalanceRow;
use super::command_reader::{CommandType, WalletCommand};
use crate::application::engine::WalletEngine;
use crate::domain::money::Amount;
use crate::domain::wallet::{OwnerId, WalletId};
use crate::error::{Result, WalletError};
use std::collections::HashMap;

struct LabeledWallet {
    owner_id: OwnerId,
    wallet_id: WalletId,
}

/// Applies replay commands to an engine in file order.
///
/// Labels are global to the file: any owner can name another owner's wallet as a
/// transfer counterparty, while ownership of the acting wallet is still enforced by the
/// engine.
pub struct Replayer {
    engine: WalletEngine,
    labels: HashMap<String, LabeledWallet>,
}

impl Replayer {
    pub fn new(engine: WalletEngine) -> Self {
        Self {
            engine,
            labels: HashMap::new(),
        }
    }

    pub async fn apply(&mut self, command: WalletCommand) -> Result<()> {
        let owner_id = OwnerId::new(command.owner.as_str());
        match command.r#type {
            CommandType::Open => {
                if self.labels.contains_key(&command.wallet) {
                    return Err(WalletError::ValidationError(format!(
                        "Wallet '{}' is already open",
                        command.wallet
                    )));
                }
                let wallet = self
                    .engine
                    .create_wallet(&owner_id, &command.wallet, None)
                    .await?;
                self.labels.insert(
                    command.wallet,
                    LabeledWallet {
                        owner_id,
                        wallet_id: wallet.id,
                    },
                );
            }
            CommandType::Deposit => {
                let amount = required_amount(&command)?;
                let wallet_id = self.resolve(&command.wallet)?;
                self.engine
                    .adjust_balance(&owner_id, wallet_id, amount.value())
                    .await?;
            }
            CommandType::Withdraw => {
                let amount = required_amount(&command)?;
                let wallet_id = self.resolve(&command.wallet)?;
                self.engine
                    .adjust_balance(&owner_id, wallet_id, -amount.value())
                    .await?;
            }
            CommandType::Transfer => {
                let amount = required_amount(&command)?;
                let counterparty = command.counterparty.as_deref().ok_or_else(|| {
                    WalletError::ValidationError("Transfer requires a counterparty".to_string())
                })?;
                let from = self.resolve(&command.wallet)?;
                let to = self.resolve(counterparty)?;
                self.engine
                    .transfer(&owner_id, from, to, amount.value())
                    .await?;
            }
            CommandType::Close => {
                let wallet_id = self.resolve(&command.wallet)?;
                self.engine.wallets().delete(&owner_id, wallet_id).await?;
                self.labels.remove(&command.wallet);
            }
        }
        Ok(())
    }

    /// Current balance of every open wallet, sorted by owner and then label.
    pub async fn balances(&self) -> Result<Vec<BalanceRow>> {
        let mut rows = Vec::with_capacity(self.labels.len());
        for (label, labeled) in &self.labels {
            let wallet = self
                .engine
                .wallet(&labeled.owner_id, &labeled.wallet_id)
                .await?;
            rows.push(BalanceRow {
                owner: labeled.owner_id.to_string(),
                wallet: label.clone(),
                balance: wallet.balance.value(),
            });
        }
        rows.sort_by(|a, b| a.owner.cmp(&b.owner).then_with(|| a.wallet.cmp(&b.wallet)));
        Ok(rows)
    }

    fn resolve(&self, label: &str) -> Result<&WalletId> {
        self.labels
            .get(label)
            .map(|labeled| &labeled.wallet_id)
            .ok_or(WalletError::NotFound)
    }
}

fn required_amount(command: &WalletCommand) -> Result<Amount> {
    command.amount.ok_or_else(|| {
        WalletError::ValidationError(format!(
            "Command '{:?}' on wallet '{}' requires an amount",
            command.r#type, command.wallet
        ))
    })
}
