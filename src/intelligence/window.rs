//! Per-wallet sliding-window trade history.

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;

use crate::errors::WindowError;
use crate::models::{Outcome, TradeRecord};

/// Trailing trade history for one wallet.
///
/// Records stay ordered by timestamp so expiry only ever pops from the front.
/// `win_count`, `loss_count` and `total_profit` always describe exactly the
/// records currently held.
#[derive(Debug, Clone)]
pub struct WalletWindow {
    records: VecDeque<TradeRecord>,
    window_duration: Duration,
    win_count: usize,
    loss_count: usize,
    total_profit: Decimal,
}

impl WalletWindow {
    pub fn new(window_duration: Duration) -> Self {
        Self {
            records: VecDeque::new(),
            window_duration,
            win_count: 0,
            loss_count: 0,
            total_profit: Decimal::ZERO,
        }
    }

    /// Add a record. Out-of-order records are inserted at their ordered position.
    ///
    /// Fails without touching the window if the running profit total would
    /// leave the `Decimal` range.
    pub fn push(&mut self, record: TradeRecord) -> Result<(), WindowError> {
        self.total_profit = self
            .total_profit
            .checked_add(record.profit)
            .ok_or(WindowError::ProfitOverflow {
                profit: record.profit,
            })?;

        match record.outcome {
            Outcome::Won => self.win_count += 1,
            Outcome::Lost => self.loss_count += 1,
            Outcome::Undetermined => {}
        }

        match self.records.back() {
            Some(last) if record.timestamp < last.timestamp => {
                let idx = self
                    .records
                    .partition_point(|r| r.timestamp <= record.timestamp);
                self.records.insert(idx, record);
            }
            _ => self.records.push_back(record),
        }
        Ok(())
    }

    /// Remove every record older than `now - window_duration`.
    /// Returns the number of records removed.
    pub fn evict_expired(&mut self, now: DateTime<Utc>) -> usize {
        // A cutoff before the representable range means nothing can have expired.
        let Some(cutoff) = now.checked_sub_signed(self.window_duration) else {
            return 0;
        };

        let mut evicted = 0;
        while self.records.front().is_some_and(|r| r.timestamp < cutoff) {
            if let Some(expired) = self.records.pop_front() {
                self.count_out(&expired);
                evicted += 1;
            }
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn win_count(&self) -> usize {
        self.win_count
    }

    pub fn loss_count(&self) -> usize {
        self.loss_count
    }

    pub fn total_profit(&self) -> Decimal {
        self.total_profit
    }

    pub fn window_duration(&self) -> Duration {
        self.window_duration
    }

    /// Records in ascending timestamp order.
    pub fn records(&self) -> impl Iterator<Item = &TradeRecord> {
        self.records.iter()
    }

    fn count_out(&mut self, record: &TradeRecord) {
        match record.outcome {
            Outcome::Won => self.win_count -= 1,
            Outcome::Lost => self.loss_count -= 1,
            Outcome::Undetermined => {}
        }
        // Mixed-sign histories can make an intermediate difference leave the
        // range; resum what is left in that case.
        self.total_profit = match self.total_profit.checked_sub(record.profit) {
            Some(total) => total,
            None => self
                .records
                .iter()
                .fold(Decimal::ZERO, |acc, r| acc.saturating_add(r.profit)),
        };
    }
}

/// Concurrent wallet → window index.
///
/// Backed by a sharded map: calls for the same wallet are serialized by the
/// shard lock, calls for different wallets may run in parallel. Wallet entries
/// are created on first trade and never removed; only their records expire.
#[derive(Debug)]
pub struct WindowStore {
    windows: DashMap<String, WalletWindow>,
    window_duration: Duration,
}

impl WindowStore {
    pub fn new(window_duration: Duration) -> Self {
        Self {
            windows: DashMap::new(),
            window_duration,
        }
    }

    /// Append a record to `wallet`'s window, creating the window if absent.
    pub fn record_trade(&self, wallet: &str, record: TradeRecord) -> Result<(), WindowError> {
        if let Some(mut window) = self.windows.get_mut(wallet) {
            return window.push(record);
        }

        self.windows
            .entry(wallet.to_string())
            .or_insert_with(|| WalletWindow::new(self.window_duration))
            .push(record)
    }

    /// Expire old records for `wallet`. Returns the number removed.
    pub fn evict_expired(&self, wallet: &str, now: DateTime<Utc>) -> usize {
        self.windows
            .get_mut(wallet)
            .map(|mut window| window.evict_expired(now))
            .unwrap_or(0)
    }

    /// Expire old records, then run `read` on the window under the same lock.
    /// Returns `None` for a wallet that has never traded.
    pub fn read_window<R>(
        &self,
        wallet: &str,
        now: DateTime<Utc>,
        read: impl FnOnce(&WalletWindow) -> R,
    ) -> Option<R> {
        let mut window = self.windows.get_mut(wallet)?;
        let evicted = window.evict_expired(now);
        if evicted > 0 {
            tracing::trace!(wallet = %wallet, evicted, "Expired window records");
        }
        Some(read(&window))
    }

    /// Number of records currently held for `wallet`, without expiring anything.
    pub fn window_len(&self, wallet: &str) -> usize {
        self.windows.get(wallet).map(|w| w.len()).unwrap_or(0)
    }

    pub fn contains(&self, wallet: &str) -> bool {
        self.windows.contains_key(wallet)
    }

    /// Distinct wallets seen so far.
    pub fn wallet_count(&self) -> usize {
        self.windows.len()
    }

    pub fn window_duration(&self) -> Duration {
        self.window_duration
    }
}
