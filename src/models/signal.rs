use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use super::WalletStatsSnapshot;

/// Emitted once when a wallet starts satisfying the smart-wallet predicate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SmartWalletAlert {
    /// Wallet address that qualified.
    pub wallet: String,
    /// Signature of the trade whose arrival triggered the transition.
    pub signature: String,
    /// Window statistics at the time of detection.
    pub snapshot: WalletStatsSnapshot,
    pub detected_at: DateTime<Utc>,
}

impl fmt::Display for SmartWalletAlert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Smart wallet detected: {}", self.wallet)
    }
}
