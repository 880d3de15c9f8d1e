use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Win/loss classification of a stored trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Won,
    Lost,
    #[default]
    Undetermined,
}

/// One wallet-scoped entry in a trailing window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub timestamp: DateTime<Utc>,
    pub profit: Decimal,
    pub outcome: Outcome,
}

impl TradeRecord {
    /// Record with an undetermined outcome.
    pub fn new(timestamp: DateTime<Utc>, profit: Decimal) -> Self {
        Self {
            timestamp,
            profit,
            outcome: Outcome::Undetermined,
        }
    }

    pub fn with_outcome(mut self, outcome: Outcome) -> Self {
        self.outcome = outcome;
        self
    }
}
