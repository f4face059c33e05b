//! Application Ports
//!
//! Abstract interfaces the application layer depends on. Infrastructure
//! provides the implementations: the feed hub for market data, the
//! key-value adapters for persistence.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::market::TickListener;

// =============================================================================
// Market Data
// =============================================================================

/// Consumer-facing surface of the live market data hub.
///
/// Consumers register interest per symbol and receive every tick for that
/// symbol until they unregister. They never observe the connection
/// lifecycle; connect, reconnect, and upstream subscription management all
/// happen behind this interface.
pub trait MarketDataPort: Send + Sync {
    /// Register `listener` for ticks on `symbol`.
    fn add_listener(&self, symbol: &str, listener: &TickListener);

    /// Remove exactly the registration added with `listener`.
    ///
    /// Removing a listener that was never added is a silent no-op.
    fn remove_listener(&self, symbol: &str, listener: &TickListener);
}

// =============================================================================
// Key-Value Store
// =============================================================================

/// Key-value store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store failed (I/O, lock, encoding).
    #[error("key-value store error: {message}")]
    Backend {
        /// Error details.
        message: String,
    },
}

impl StoreError {
    /// Create a backend error from any displayable cause.
    pub fn backend(cause: impl std::fmt::Display) -> Self {
        Self::Backend {
            message: cause.to_string(),
        }
    }
}

/// Opaque key-value persistence surface.
///
/// Keys are namespaced strings (`users`, `trades_{user_id}`); values are
/// opaque payloads to the caller, JSON documents in practice.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetch the value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value` under `key`, replacing any prior value.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    async fn put(&self, key: &str, value: String) -> Result<(), StoreError>;

    /// Remove the value under `key`. Removing a missing key is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}
