use crate::domain::money::Amount;
use crate::error::{Result, WalletError};
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum CommandType {
    Open,
    Deposit,
    Withdraw,
    Transfer,
    Close,
}

/// One row of a replay file. `wallet` and `counterparty` are labels chosen by the file's
/// author; real wallet ids are generated when a label is opened.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct WalletCommand {
    pub r#type: CommandType,
    pub owner: String,
    pub wallet: String,
    pub counterparty: Option<String>,
    pub amount: Option<Amount>,
}

/// Reads wallet commands from a CSV source.
///
/// Wraps `csv::Reader` with whitespace trimming and flexible record lengths, so rows
/// that omit trailing optional columns are accepted.
pub struct CommandReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CommandReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily deserializes commands, one `Result` per row.
    pub fn commands(self) -> impl Iterator<Item = Result<WalletCommand>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(WalletError::from))
    }
}
