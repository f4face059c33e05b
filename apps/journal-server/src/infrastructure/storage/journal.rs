//! Key-value journal repository.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::application::ports::{KeyValueStore, StoreError};
use crate::domain::journal::{JournalRepository, StorageError, Trade, User};

/// All registered users live under one key.
const USERS_KEY: &str = "users";

/// [`JournalRepository`] over any [`KeyValueStore`].
///
/// Users are one JSON array under `users`; each user's trades are one JSON
/// array under `trades_{user_id}`. Every mutation is a read-modify-write of
/// the whole array.
pub struct KvJournalStore {
    store: Arc<dyn KeyValueStore>,
}

impl KvJournalStore {
    /// Create the repository over a key-value store.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    fn trades_key(user_id: &str) -> String {
        format!("trades_{user_id}")
    }

    async fn read_list<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>, StorageError> {
        match self.store.get(key).await.map_err(backend)? {
            Some(json) => serde_json::from_str(&json).map_err(codec),
            None => Ok(Vec::new()),
        }
    }

    async fn write_list<T: Serialize>(&self, key: &str, list: &[T]) -> Result<(), StorageError> {
        let json = serde_json::to_string(list).map_err(codec)?;
        self.store.put(key, json).await.map_err(backend)
    }
}

#[async_trait]
impl JournalRepository for KvJournalStore {
    async fn users(&self) -> Result<Vec<User>, StorageError> {
        self.read_list(USERS_KEY).await
    }

    async fn save_user(&self, user: &User) -> Result<(), StorageError> {
        let mut users = self.users().await?;
        users.push(user.clone());
        self.write_list(USERS_KEY, &users).await
    }

    async fn trades_for(&self, user_id: &str) -> Result<Vec<Trade>, StorageError> {
        self.read_list(&Self::trades_key(user_id)).await
    }

    async fn save_trade(&self, user_id: &str, trade: &Trade) -> Result<(), StorageError> {
        let key = Self::trades_key(user_id);
        let mut trades: Vec<Trade> = self.read_list(&key).await?;
        trades.push(trade.clone());
        self.write_list(&key, &trades).await
    }

    async fn update_trade(&self, user_id: &str, trade: &Trade) -> Result<(), StorageError> {
        let key = Self::trades_key(user_id);
        let mut trades: Vec<Trade> = self.read_list(&key).await?;

        let Some(slot) = trades.iter_mut().find(|t| t.id == trade.id) else {
            return Err(StorageError::TradeNotFound {
                trade_id: trade.id.clone(),
            });
        };
        *slot = trade.clone();
        self.write_list(&key, &trades).await
    }

    async fn delete_trade(&self, user_id: &str, trade_id: &str) -> Result<(), StorageError> {
        let key = Self::trades_key(user_id);
        let mut trades: Vec<Trade> = self.read_list(&key).await?;
        trades.retain(|t| t.id != trade_id);
        self.write_list(&key, &trades).await
    }
}

fn backend(error: StoreError) -> StorageError {
    StorageError::Backend {
        message: error.to_string(),
    }
}

fn codec(error: serde_json::Error) -> StorageError {
    StorageError::Codec {
        message: error.to_string(),
    }
}
