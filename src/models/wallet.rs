use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Statistics over a wallet's current window. Recomputed on every evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WalletStatsSnapshot {
    pub trade_count: usize,
    /// Wins / trade_count; zero for an empty window.
    pub win_rate: Decimal,
    /// Mean profit per trade; zero for an empty window.
    pub avg_profit: Decimal,
}
