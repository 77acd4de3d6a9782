use crate::error::Result;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;

/// Final balance of one live wallet, keyed by the labels used in the replay file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceRow {
    pub owner: String,
    pub wallet: String,
    pub balance: Decimal,
}

/// Writes `owner,wallet,balance` rows with a header.
pub struct BalanceWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> BalanceWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    /// Balances are written normalized, so `10.50` prints as `10.5`.
    pub fn write_balances(&mut self, rows: impl IntoIterator<Item = BalanceRow>) -> Result<()> {
        for mut row in rows {
            row.balance = row.balance.normalize();
            self.writer.serialize(row)?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
