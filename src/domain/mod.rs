//! Entities, value objects and the storage ports the engine is written against.

pub mod money;
pub mod ports;
pub mod transaction;
pub mod wallet;
