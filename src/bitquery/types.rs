use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Numeric fields
// ---------------------------------------------------------------------------

/// Bitquery serializes amounts either as JSON numbers or as numeric strings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum WireNumber {
    Number(serde_json::Number),
    Text(String),
}

impl WireNumber {
    /// True for an empty or whitespace-only string.
    pub fn is_blank(&self) -> bool {
        matches!(self, WireNumber::Text(s) if s.trim().is_empty())
    }

    pub fn to_decimal(&self) -> Option<Decimal> {
        match self {
            WireNumber::Number(n) => parse_decimal(&n.to_string()),
            WireNumber::Text(s) => parse_decimal(s.trim()),
        }
    }
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

// ---------------------------------------------------------------------------
// Solana.DEXTrades entry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DexTrade {
    pub transaction: Option<TransactionInfo>,
    pub trade: Option<TradeLegs>,
}

impl DexTrade {
    pub fn signature(&self) -> &str {
        self.transaction
            .as_ref()
            .and_then(|t| t.signature.as_deref())
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TransactionInfo {
    pub signature: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TradeLegs {
    pub buy: Option<TradeSide>,
    pub sell: Option<TradeSide>,
    pub dex: Option<DexInfo>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TradeSide {
    pub account: Option<AccountInfo>,
    pub amount: Option<WireNumber>,
    #[serde(rename = "AmountInUSD")]
    pub amount_in_usd: Option<WireNumber>,
    #[serde(rename = "PriceInUSD")]
    pub price_in_usd: Option<WireNumber>,
    pub price: Option<WireNumber>,
    pub currency: Option<CurrencyInfo>,
}

impl TradeSide {
    pub fn address(&self) -> Option<&str> {
        self.account.as_ref().and_then(|a| a.address.as_deref())
    }

    pub fn currency_name(&self) -> Option<&str> {
        self.currency.as_ref().and_then(|c| c.name.as_deref())
    }

    pub fn mint_address(&self) -> Option<&str> {
        self.currency.as_ref().and_then(|c| c.mint_address.as_deref())
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AccountInfo {
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CurrencyInfo {
    pub name: Option<String>,
    pub mint_address: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DexInfo {
    pub program_address: Option<String>,
    pub protocol_name: Option<String>,
}

// ---------------------------------------------------------------------------
// Subscription message
// ---------------------------------------------------------------------------

/// Real-time Solana DEX trades with both participants, amounts and currencies.
pub const DEX_TRADES_SUBSCRIPTION: &str = r#"
subscription {
  Solana {
    DEXTrades {
      Transaction {
        Signature
      }
      Trade {
        Buy {
          Account {
            Address
          }
          Amount
          AmountInUSD
          PriceInUSD
          Price
          Currency {
            Name
            MintAddress
          }
        }
        Dex {
          ProgramAddress
          ProtocolName
        }
        Sell {
          Account {
            Address
          }
          Amount
          AmountInUSD
          Currency {
            MintAddress
            Name
          }
          Price
          PriceInUSD
        }
      }
    }
  }
}
"#;

#[derive(Debug, Clone, Serialize)]
pub struct SubscribeMessage {
    pub query: String,
}

impl SubscribeMessage {
    pub fn dex_trades() -> Self {
        Self {
            query: DEX_TRADES_SUBSCRIPTION.to_string(),
        }
    }
}
