//! Turns raw feed frames into `TradeEvent`s.
//!
//! Accepted envelopes:
//! - the bare record: `{"Solana": {"DEXTrades": [...]}}`
//! - a GraphQL result wrapper: `{"data": {"Solana": ...}}`
//! - a graphql-ws frame: `{"type": "data", "payload": {"data": {"Solana": ...}}}`
//!
//! An `errors` field at the top level or inside `payload` is an upstream error and
//! short-circuits the whole message.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;

use crate::bitquery::{DexTrade, TradeSide, WireNumber};
use crate::errors::DecodeError;
use crate::models::TradeEvent;

/// graphql-ws frame types that carry an upstream error in `payload`.
const ERROR_FRAME_TYPES: [&str; 2] = ["error", "connection_error"];

/// Result of classifying one feed frame.
#[derive(Debug)]
pub enum FeedMessage {
    /// A `Solana.DEXTrades` batch.
    Trades(DecodedBatch),
    /// Protocol frame without trade data (`connection_ack`, `ka`, `complete`, ...).
    Control(String),
    /// Valid JSON that is neither a trade batch nor a known control frame.
    Unrecognized,
}

/// Trades decoded from one message. Entries that failed to decode are kept in
/// `rejected` so the caller can log them.
#[derive(Debug, Default)]
pub struct DecodedBatch {
    pub events: Vec<TradeEvent>,
    pub rejected: Vec<DecodeError>,
}

/// Field paths for one trade leg, used in `MissingField` errors.
struct LegFields {
    leg: &'static str,
    address: &'static str,
    amount: &'static str,
    currency: &'static str,
}

const BUY_FIELDS: LegFields = LegFields {
    leg: "Trade.Buy",
    address: "Trade.Buy.Account.Address",
    amount: "Trade.Buy.Amount",
    currency: "Trade.Buy.Currency.Name",
};

const SELL_FIELDS: LegFields = LegFields {
    leg: "Trade.Sell",
    address: "Trade.Sell.Account.Address",
    amount: "Trade.Sell.Amount",
    currency: "Trade.Sell.Currency.Name",
};

struct DecodedLeg {
    wallet: String,
    amount: Decimal,
    currency: String,
    mint: Option<String>,
    amount_usd: Option<Decimal>,
}

/// Classify and decode one raw feed frame.
///
/// `observed_at` becomes the timestamp of every trade in the frame.
pub fn decode_message(raw: &str, observed_at: DateTime<Utc>) -> Result<FeedMessage, DecodeError> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| DecodeError::malformed(format!("invalid JSON: {e}"), raw))?;

    if !value.is_object() {
        return Err(DecodeError::malformed("expected a JSON object", raw));
    }

    if let Some(errors) = upstream_errors(&value) {
        return Err(DecodeError::ServerReportedError {
            detail: errors.to_string(),
        });
    }

    let body = match value.get("payload") {
        Some(payload) => {
            let frame_type = value.get("type").and_then(Value::as_str).unwrap_or("");
            if ERROR_FRAME_TYPES.contains(&frame_type) {
                return Err(DecodeError::ServerReportedError {
                    detail: payload.to_string(),
                });
            }
            if let Some(errors) = upstream_errors(payload) {
                return Err(DecodeError::ServerReportedError {
                    detail: errors.to_string(),
                });
            }
            payload.get("data").unwrap_or(payload)
        }
        None => match value.get("type").and_then(Value::as_str) {
            Some(frame_type) => return Ok(FeedMessage::Control(frame_type.to_string())),
            None => value.get("data").unwrap_or(&value),
        },
    };

    let Some(trades) = body.get("Solana").and_then(|s| s.get("DEXTrades")) else {
        return Ok(FeedMessage::Unrecognized);
    };

    let entries = trades
        .as_array()
        .ok_or_else(|| DecodeError::malformed("Solana.DEXTrades is not an array", raw))?;

    let mut batch = DecodedBatch::default();
    for entry in entries {
        let decoded = serde_json::from_value::<DexTrade>(entry.clone())
            .map_err(|e| DecodeError::malformed(format!("bad DEXTrades entry: {e}"), &entry.to_string()))
            .and_then(|trade| decode_trade(&trade, observed_at));

        match decoded {
            Ok(event) => batch.events.push(event),
            Err(e) => batch.rejected.push(e),
        }
    }

    Ok(FeedMessage::Trades(batch))
}

/// Decode a single `DEXTrades` entry.
///
/// Absent addresses, amounts or currency names are `MissingField`; an address
/// that is present but empty is passed through for the dispatcher to reject.
pub fn decode_trade(trade: &DexTrade, observed_at: DateTime<Utc>) -> Result<TradeEvent, DecodeError> {
    let signature = trade.signature();
    let legs = trade
        .trade
        .as_ref()
        .ok_or_else(|| DecodeError::missing("Trade", signature))?;

    let buy = decode_leg(trade, legs.buy.as_ref(), &BUY_FIELDS)?;
    let sell = decode_leg(trade, legs.sell.as_ref(), &SELL_FIELDS)?;
    let dex = legs.dex.as_ref();

    Ok(TradeEvent {
        signature: signature.to_string(),
        buy_wallet: buy.wallet,
        sell_wallet: sell.wallet,
        buy_amount: buy.amount,
        sell_amount: sell.amount,
        buy_currency: buy.currency,
        sell_currency: sell.currency,
        buy_mint: buy.mint,
        sell_mint: sell.mint,
        buy_amount_usd: buy.amount_usd,
        sell_amount_usd: sell.amount_usd,
        dex_protocol: dex.and_then(|d| d.protocol_name.clone()),
        dex_program: dex.and_then(|d| d.program_address.clone()),
        timestamp: observed_at,
    })
}

fn decode_leg(
    trade: &DexTrade,
    side: Option<&TradeSide>,
    fields: &LegFields,
) -> Result<DecodedLeg, DecodeError> {
    let signature = trade.signature();
    let side = side.ok_or_else(|| DecodeError::missing(fields.leg, signature))?;

    let wallet = side
        .address()
        .map(|a| a.trim().to_string())
        .ok_or_else(|| DecodeError::missing(fields.address, signature))?;

    let currency = side
        .currency_name()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| DecodeError::missing(fields.currency, signature))?
        .to_string();

    let amount = match side.amount.as_ref() {
        None => return Err(DecodeError::missing(fields.amount, signature)),
        Some(n) if n.is_blank() => return Err(DecodeError::missing(fields.amount, signature)),
        Some(n) => parse_amount(n, fields.amount, trade)?,
    };

    Ok(DecodedLeg {
        wallet,
        amount,
        currency,
        mint: side.mint_address().map(str::to_string),
        amount_usd: side.amount_in_usd.as_ref().and_then(WireNumber::to_decimal),
    })
}

fn parse_amount(n: &WireNumber, field: &str, trade: &DexTrade) -> Result<Decimal, DecodeError> {
    let raw_entry = || serde_json::to_string(trade).unwrap_or_default();

    let amount = n
        .to_decimal()
        .ok_or_else(|| DecodeError::malformed(format!("{field} is not a number"), &raw_entry()))?;

    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(DecodeError::malformed(
            format!("{field} is negative: {amount}"),
            &raw_entry(),
        ));
    }

    Ok(amount)
}

/// The `errors` field counts as soon as it is present, whatever its value.
fn upstream_errors(value: &Value) -> Option<&Value> {
    value.get("errors")
}
