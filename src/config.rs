use crate::error::{Result, WalletError};
use std::time::Duration;

/// Engine configuration, passed explicitly into constructors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineConfig {
    pub history: HistoryConfig,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        self.history.validate()
    }
}

/// Pagination defaults for transaction history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryConfig {
    /// Page size used when the caller does not ask for one.
    pub default_limit: u32,
    /// Upper bound on any requested page size.
    pub max_limit: u32,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            default_limit: 20,
            max_limit: 100,
        }
    }
}

impl HistoryConfig {
    pub fn validate(&self) -> Result<()> {
        if self.default_limit == 0 || self.max_limit == 0 {
            return Err(WalletError::ValidationError(
                "History page limits must be positive".to_string(),
            ));
        }
        if self.default_limit > self.max_limit {
            return Err(WalletError::ValidationError(format!(
                "Default history limit {} exceeds maximum {}",
                self.default_limit, self.max_limit
            )));
        }
        Ok(())
    }
}

/// Connection settings for the relational backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    /// Applied as `lock_timeout` on every atomic unit when set.
    pub lock_timeout: Option<Duration>,
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 5,
            lock_timeout: None,
        }
    }
}
