//! Journal Service
//!
//! Trade bookkeeping over the journal repository: opening, closing, and
//! deleting trades, plus aggregate statistics joined with live quotes.

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::domain::journal::{JournalRepository, StorageError, Trade, TradeSide};

/// Journal operation errors.
#[derive(Debug, Error)]
pub enum JournalError {
    /// No trade with the given id exists for the user.
    #[error("trade not found: {trade_id}")]
    TradeNotFound {
        /// Id that was looked up.
        trade_id: String,
    },

    /// The trade was already closed.
    #[error("trade already closed: {trade_id}")]
    AlreadyClosed {
        /// Id of the closed trade.
        trade_id: String,
    },

    /// Exit price must be positive.
    #[error("invalid exit price: {price}")]
    InvalidExitPrice {
        /// Rejected price.
        price: Decimal,
    },

    /// The trade store failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Parameters for recording a new trade.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTrade {
    /// Symbol to trade; uppercased on entry.
    pub symbol: String,
    /// Buy or sell.
    pub side: TradeSide,
    /// Entry price.
    pub entry_price: Decimal,
    /// Position size.
    pub quantity: Decimal,
    /// Free-form notes.
    #[serde(default)]
    pub notes: String,
}

/// Aggregate journal statistics for one user.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalStats {
    /// All recorded trades.
    pub total_trades: usize,
    /// Trades still held.
    pub open_trades: usize,
    /// Trades exited.
    pub closed_trades: usize,
    /// Percentage of closed trades that came out ahead, one decimal place.
    /// Zero when nothing has been closed.
    pub win_rate: Decimal,
    /// Profit/loss locked in across closed trades.
    pub realized_pnl: Decimal,
    /// Profit/loss across open trades at the supplied quotes. Open trades
    /// without a quote contribute nothing.
    pub unrealized_pnl: Decimal,
    /// Realized plus unrealized.
    pub total_pnl: Decimal,
}

/// Trade bookkeeping for journal users.
pub struct JournalService {
    repository: Arc<dyn JournalRepository>,
}

impl JournalService {
    /// Create the service over a repository.
    pub fn new(repository: Arc<dyn JournalRepository>) -> Self {
        Self { repository }
    }

    /// Record a new open trade and return it.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the trade store fails.
    pub async fn open_trade(
        &self,
        user_id: &str,
        new_trade: NewTrade,
    ) -> Result<Trade, JournalError> {
        let trade = Trade::open(
            &new_trade.symbol,
            new_trade.side,
            new_trade.entry_price,
            new_trade.quantity,
            new_trade.notes,
        );
        self.repository.save_trade(user_id, &trade).await?;
        info!(
            trade_id = %trade.id,
            symbol = %trade.symbol,
            side = trade.side.as_str(),
            "opened trade"
        );
        Ok(trade)
    }

    /// Close a trade at `exit_price` and return the updated trade.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::InvalidExitPrice`] when the price is not
    /// positive, [`JournalError::TradeNotFound`] when the id is unknown,
    /// [`JournalError::AlreadyClosed`] when the trade was already exited,
    /// or a storage error if the trade store fails.
    pub async fn close_trade(
        &self,
        user_id: &str,
        trade_id: &str,
        exit_price: Decimal,
    ) -> Result<Trade, JournalError> {
        if exit_price <= Decimal::ZERO {
            return Err(JournalError::InvalidExitPrice { price: exit_price });
        }

        let mut trade = self.find_trade(user_id, trade_id).await?;
        if !trade.is_open() {
            return Err(JournalError::AlreadyClosed {
                trade_id: trade_id.to_string(),
            });
        }

        trade.close(exit_price);
        self.repository.update_trade(user_id, &trade).await?;
        info!(
            trade_id = %trade.id,
            symbol = %trade.symbol,
            pnl = ?trade.realized_pnl(),
            "closed trade"
        );
        Ok(trade)
    }

    /// Replace the notes on a trade and return the updated trade.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::TradeNotFound`] when the id is unknown, or a
    /// storage error if the trade store fails.
    pub async fn update_notes(
        &self,
        user_id: &str,
        trade_id: &str,
        notes: String,
    ) -> Result<Trade, JournalError> {
        let mut trade = self.find_trade(user_id, trade_id).await?;
        trade.notes = notes;
        self.repository.update_trade(user_id, &trade).await?;
        Ok(trade)
    }

    /// Delete a trade. Deleting an unknown id is a silent no-op.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the trade store fails.
    pub async fn delete_trade(&self, user_id: &str, trade_id: &str) -> Result<(), JournalError> {
        self.repository.delete_trade(user_id, trade_id).await?;
        info!(trade_id = %trade_id, "deleted trade");
        Ok(())
    }

    /// List every trade recorded by the user, oldest first.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the trade store fails.
    pub async fn trades(&self, user_id: &str) -> Result<Vec<Trade>, JournalError> {
        Ok(self.repository.trades_for(user_id).await?)
    }

    /// List the user's trades that are still open.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the trade store fails.
    pub async fn open_trades(&self, user_id: &str) -> Result<Vec<Trade>, JournalError> {
        let trades = self.repository.trades_for(user_id).await?;
        Ok(trades.into_iter().filter(Trade::is_open).collect())
    }

    /// Aggregate statistics for the user, marking open trades against the
    /// supplied quotes.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the trade store fails.
    pub async fn stats(
        &self,
        user_id: &str,
        quotes: &HashMap<String, Decimal>,
    ) -> Result<JournalStats, JournalError> {
        let trades = self.repository.trades_for(user_id).await?;

        let closed: Vec<&Trade> = trades.iter().filter(|t| !t.is_open()).collect();
        let open: Vec<&Trade> = trades.iter().filter(|t| t.is_open()).collect();

        let winners = closed
            .iter()
            .filter(|t| t.is_winner() == Some(true))
            .count();
        let win_rate = if closed.is_empty() {
            Decimal::ZERO
        } else {
            (Decimal::from(winners) * Decimal::ONE_HUNDRED / Decimal::from(closed.len()))
                .round_dp(1)
        };

        let realized_pnl: Decimal = closed.iter().filter_map(|t| t.realized_pnl()).sum();
        let unrealized_pnl: Decimal = open
            .iter()
            .filter_map(|t| {
                quotes
                    .get(&t.symbol)
                    .and_then(|price| t.unrealized_pnl(*price))
            })
            .sum();

        Ok(JournalStats {
            total_trades: trades.len(),
            open_trades: open.len(),
            closed_trades: closed.len(),
            win_rate,
            realized_pnl,
            unrealized_pnl,
            total_pnl: realized_pnl + unrealized_pnl,
        })
    }

    async fn find_trade(&self, user_id: &str, trade_id: &str) -> Result<Trade, JournalError> {
        let trades = self.repository.trades_for(user_id).await?;
        trades
            .into_iter()
            .find(|t| t.id == trade_id)
            .ok_or_else(|| JournalError::TradeNotFound {
                trade_id: trade_id.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use test_case::test_case;

    use super::*;
    use crate::infrastructure::storage::{InMemoryKeyValueStore, KvJournalStore};

    const USER: &str = "user-1";

    fn service() -> JournalService {
        let store = Arc::new(InMemoryKeyValueStore::new());
        JournalService::new(Arc::new(KvJournalStore::new(store)))
    }

    fn new_trade(symbol: &str, side: TradeSide, entry: i64, quantity: i64) -> NewTrade {
        NewTrade {
            symbol: symbol.to_string(),
            side,
            entry_price: Decimal::new(entry, 0),
            quantity: Decimal::new(quantity, 0),
            notes: String::new(),
        }
    }

    #[tokio::test]
    async fn open_trade_persists() {
        let journal = service();

        let opened = journal
            .open_trade(USER, new_trade("aapl", TradeSide::Buy, 150, 10))
            .await
            .unwrap();
        assert_eq!(opened.symbol, "AAPL");

        let trades = journal.trades(USER).await.unwrap();
        assert_eq!(trades, vec![opened]);
    }

    #[tokio::test]
    async fn close_trade_records_exit() {
        let journal = service();
        let opened = journal
            .open_trade(USER, new_trade("AAPL", TradeSide::Buy, 100, 10))
            .await
            .unwrap();

        let closed = journal
            .close_trade(USER, &opened.id, Decimal::new(110, 0))
            .await
            .unwrap();
        assert!(!closed.is_open());
        assert_eq!(closed.realized_pnl(), Some(Decimal::new(100, 0)));

        let trades = journal.trades(USER).await.unwrap();
        assert_eq!(trades, vec![closed]);
    }

    #[test_case(0 ; "zero exit price")]
    #[test_case(-5 ; "negative exit price")]
    #[tokio::test]
    async fn close_trade_rejects_non_positive_exit(exit: i64) {
        let journal = service();
        let opened = journal
            .open_trade(USER, new_trade("AAPL", TradeSide::Buy, 100, 10))
            .await
            .unwrap();

        let err = journal
            .close_trade(USER, &opened.id, Decimal::new(exit, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, JournalError::InvalidExitPrice { .. }));
    }

    #[tokio::test]
    async fn close_trade_rejects_unknown_id() {
        let journal = service();
        let err = journal
            .close_trade(USER, "missing", Decimal::ONE)
            .await
            .unwrap_err();
        assert!(matches!(err, JournalError::TradeNotFound { .. }));
    }

    #[tokio::test]
    async fn close_trade_rejects_closed_trade() {
        let journal = service();
        let opened = journal
            .open_trade(USER, new_trade("AAPL", TradeSide::Buy, 100, 10))
            .await
            .unwrap();
        journal
            .close_trade(USER, &opened.id, Decimal::new(110, 0))
            .await
            .unwrap();

        let err = journal
            .close_trade(USER, &opened.id, Decimal::new(120, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, JournalError::AlreadyClosed { .. }));
    }

    #[tokio::test]
    async fn update_notes_replaces_text() {
        let journal = service();
        let opened = journal
            .open_trade(USER, new_trade("AAPL", TradeSide::Buy, 100, 10))
            .await
            .unwrap();

        let updated = journal
            .update_notes(USER, &opened.id, "earnings play".to_string())
            .await
            .unwrap();
        assert_eq!(updated.notes, "earnings play");

        let trades = journal.trades(USER).await.unwrap();
        assert_eq!(trades[0].notes, "earnings play");
    }

    #[tokio::test]
    async fn delete_trade_removes_entry() {
        let journal = service();
        let opened = journal
            .open_trade(USER, new_trade("AAPL", TradeSide::Buy, 100, 10))
            .await
            .unwrap();

        journal.delete_trade(USER, &opened.id).await.unwrap();
        assert!(journal.trades(USER).await.unwrap().is_empty());

        // Unknown ids delete silently.
        journal.delete_trade(USER, "missing").await.unwrap();
    }

    #[tokio::test]
    async fn open_trades_filters_closed() {
        let journal = service();
        let first = journal
            .open_trade(USER, new_trade("AAPL", TradeSide::Buy, 100, 10))
            .await
            .unwrap();
        let second = journal
            .open_trade(USER, new_trade("MSFT", TradeSide::Sell, 300, 5))
            .await
            .unwrap();
        journal
            .close_trade(USER, &first.id, Decimal::new(110, 0))
            .await
            .unwrap();

        let open = journal.open_trades(USER).await.unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].id, second.id);
    }

    #[tokio::test]
    async fn stats_aggregate_realized_and_unrealized() {
        let journal = service();

        // Closed winner: +100. Closed loser: -50. Open: +25 at the quote.
        let winner = journal
            .open_trade(USER, new_trade("AAPL", TradeSide::Buy, 100, 10))
            .await
            .unwrap();
        journal
            .close_trade(USER, &winner.id, Decimal::new(110, 0))
            .await
            .unwrap();

        let loser = journal
            .open_trade(USER, new_trade("MSFT", TradeSide::Buy, 300, 5))
            .await
            .unwrap();
        journal
            .close_trade(USER, &loser.id, Decimal::new(290, 0))
            .await
            .unwrap();

        journal
            .open_trade(USER, new_trade("TSLA", TradeSide::Sell, 250, 1))
            .await
            .unwrap();

        let quotes = HashMap::from([("TSLA".to_string(), Decimal::new(225, 0))]);
        let stats = journal.stats(USER, &quotes).await.unwrap();

        assert_eq!(stats.total_trades, 3);
        assert_eq!(stats.open_trades, 1);
        assert_eq!(stats.closed_trades, 2);
        assert_eq!(stats.win_rate, Decimal::new(500, 1)); // 50.0
        assert_eq!(stats.realized_pnl, Decimal::new(50, 0));
        assert_eq!(stats.unrealized_pnl, Decimal::new(25, 0));
        assert_eq!(stats.total_pnl, Decimal::new(75, 0));
    }

    #[tokio::test]
    async fn stats_without_closed_trades_report_zero_win_rate() {
        let journal = service();
        journal
            .open_trade(USER, new_trade("AAPL", TradeSide::Buy, 100, 10))
            .await
            .unwrap();

        // No quote for the open symbol either: unrealized contributes nothing.
        let stats = journal.stats(USER, &HashMap::new()).await.unwrap();
        assert_eq!(stats.win_rate, Decimal::ZERO);
        assert_eq!(stats.unrealized_pnl, Decimal::ZERO);
        assert_eq!(stats.total_pnl, Decimal::ZERO);
    }

    #[tokio::test]
    async fn stats_round_win_rate_to_one_decimal() {
        let journal = service();

        // One winner out of three closed trades: 33.333..% rounds to 33.3.
        for (symbol, exit) in [("AAPL", 110), ("MSFT", 90), ("TSLA", 95)] {
            let opened = journal
                .open_trade(USER, new_trade(symbol, TradeSide::Buy, 100, 1))
                .await
                .unwrap();
            journal
                .close_trade(USER, &opened.id, Decimal::new(exit, 0))
                .await
                .unwrap();
        }

        let stats = journal.stats(USER, &HashMap::new()).await.unwrap();
        assert_eq!(stats.win_rate, Decimal::new(333, 1)); // 33.3
    }
}
