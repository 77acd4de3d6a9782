//! CSV replay: read wallet commands, apply them in order, write final balances.

pub mod balance_writer;
pub mod command_reader;
pub mod replay;
