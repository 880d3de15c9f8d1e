use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use serde_json::json;

use walletwatch::config::DetectionConfig;
use walletwatch::ingestion::Dispatcher;
use walletwatch::models::{Outcome, TradeEvent, TradeRecord};
use walletwatch::services::MemorySink;

/// Fixed reference time so window arithmetic is deterministic.
#[allow(dead_code)]
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

/// Dispatcher backed by an in-memory sink.
#[allow(dead_code)]
pub fn setup_dispatcher(config: DetectionConfig) -> (Dispatcher, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    let dispatcher = Dispatcher::new(config, sink.clone());
    (dispatcher, sink)
}

/// Build a trade at `t0() + offset_secs`.
#[allow(dead_code)]
pub fn make_trade_event(
    buyer: &str,
    seller: &str,
    buy_amount: Decimal,
    sell_amount: Decimal,
    offset_secs: i64,
) -> TradeEvent {
    TradeEvent {
        signature: format!("tx_{buyer}_{seller}_{offset_secs}"),
        buy_wallet: buyer.into(),
        sell_wallet: seller.into(),
        buy_amount,
        sell_amount,
        buy_currency: "Wrapped Solana".into(),
        sell_currency: "USD Coin".into(),
        buy_mint: None,
        sell_mint: None,
        buy_amount_usd: None,
        sell_amount_usd: None,
        dex_protocol: None,
        dex_program: None,
        timestamp: t0() + Duration::seconds(offset_secs),
    }
}

/// Insert `count` won trades of `profit` each, one second apart from `start`.
#[allow(dead_code)]
pub fn seed_won_trades(
    dispatcher: &Dispatcher,
    wallet: &str,
    count: i64,
    profit: Decimal,
    start: DateTime<Utc>,
) {
    for i in 0..count {
        dispatcher.store().record_trade(
            wallet,
            TradeRecord::new(start + Duration::seconds(i), profit).with_outcome(Outcome::Won),
        ).unwrap();
    }
}

/// One `DEXTrades` entry in the shape the subscription returns.
#[allow(dead_code)]
pub fn dex_trade_json(signature: &str, buyer: &str, seller: &str) -> serde_json::Value {
    json!({
        "Transaction": { "Signature": signature },
        "Trade": {
            "Buy": {
                "Account": { "Address": buyer },
                "Amount": "1.5",
                "AmountInUSD": "225.30",
                "Currency": {
                    "Name": "Wrapped Solana",
                    "MintAddress": "So11111111111111111111111111111111111111112"
                }
            },
            "Sell": {
                "Account": { "Address": seller },
                "Amount": 225.3,
                "Currency": {
                    "Name": "USD Coin",
                    "MintAddress": "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v"
                }
            },
            "Dex": {
                "ProgramAddress": "675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8",
                "ProtocolName": "raydium_amm"
            }
        }
    })
}

/// A graphql-ws data frame carrying `entries`.
#[allow(dead_code)]
pub fn data_frame(entries: Vec<serde_json::Value>) -> String {
    json!({
        "type": "data",
        "id": "1",
        "payload": { "data": { "Solana": { "DEXTrades": entries } } }
    })
    .to_string()
}
