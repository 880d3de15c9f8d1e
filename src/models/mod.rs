pub mod signal;
pub mod trade;
pub mod wallet;

pub use signal::SmartWalletAlert;
pub use trade::{Outcome, TradeRecord};
pub use wallet::WalletStatsSnapshot;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Side
// ---------------------------------------------------------------------------

/// Which leg of a DEX trade a wallet took part in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Participants in dispatch order: buyer first, then seller.
    pub const BOTH: [Side; 2] = [Side::Buy, Side::Sell];
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

// ---------------------------------------------------------------------------
// TradeEvent
// ---------------------------------------------------------------------------

/// One decoded DEX trade. Immutable once built by the decoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeEvent {
    /// Transaction signature (opaque id).
    pub signature: String,
    pub buy_wallet: String,
    pub sell_wallet: String,
    pub buy_amount: Decimal,
    pub sell_amount: Decimal,
    pub buy_currency: String,
    pub sell_currency: String,
    pub buy_mint: Option<String>,
    pub sell_mint: Option<String>,
    pub buy_amount_usd: Option<Decimal>,
    pub sell_amount_usd: Option<Decimal>,
    pub dex_protocol: Option<String>,
    pub dex_program: Option<String>,
    /// Time the feed observed the trade; monotonic per feed.
    pub timestamp: DateTime<Utc>,
}

impl TradeEvent {
    pub fn wallet(&self, side: Side) -> &str {
        match side {
            Side::Buy => &self.buy_wallet,
            Side::Sell => &self.sell_wallet,
        }
    }

    pub fn amount(&self, side: Side) -> Decimal {
        match side {
            Side::Buy => self.buy_amount,
            Side::Sell => self.sell_amount,
        }
    }

    pub fn currency(&self, side: Side) -> &str {
        match side {
            Side::Buy => &self.buy_currency,
            Side::Sell => &self.sell_currency,
        }
    }
}

impl fmt::Display for TradeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} bought {} {}, {} sold {} {}",
            self.buy_wallet,
            self.buy_amount,
            self.buy_currency,
            self.sell_wallet,
            self.sell_amount,
            self.sell_currency,
        )?;
        if let Some(protocol) = &self.dex_protocol {
            write!(f, " on {protocol}")?;
        }
        Ok(())
    }
}
