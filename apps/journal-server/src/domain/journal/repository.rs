//! Journal Repository Port
//!
//! Persistence interface for users and trades. Trades are stored per user;
//! the id namespacing and list semantics are an adapter concern.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::journal::{Trade, User};

/// Persistence errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backing store failed (I/O, lock, transport).
    #[error("storage backend error: {message}")]
    Backend {
        /// Error details.
        message: String,
    },

    /// A stored value could not be encoded or decoded.
    #[error("storage codec error: {message}")]
    Codec {
        /// Error details.
        message: String,
    },

    /// No trade with the given id exists for the user.
    #[error("trade not found: {trade_id}")]
    TradeNotFound {
        /// Trade id that was looked up.
        trade_id: String,
    },
}

/// Repository for journal users and their trades.
#[async_trait]
pub trait JournalRepository: Send + Sync {
    /// Load all registered users.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or decoded.
    async fn users(&self) -> Result<Vec<User>, StorageError>;

    /// Append a user to the registry.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or written.
    async fn save_user(&self, user: &User) -> Result<(), StorageError>;

    /// Load all trades recorded by `user_id`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or decoded.
    async fn trades_for(&self, user_id: &str) -> Result<Vec<Trade>, StorageError>;

    /// Append a trade to the user's journal.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or written.
    async fn save_trade(&self, user_id: &str, trade: &Trade) -> Result<(), StorageError>;

    /// Replace the stored trade with the same id.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::TradeNotFound`] if no trade with the id
    /// exists, or an error if the store cannot be read or written.
    async fn update_trade(&self, user_id: &str, trade: &Trade) -> Result<(), StorageError>;

    /// Remove the trade with the given id. Removing an unknown id is a
    /// silent no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or written.
    async fn delete_trade(&self, user_id: &str, trade_id: &str) -> Result<(), StorageError>;
}
