use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::models::{Side, TradeEvent, TradeRecord, WalletStatsSnapshot};

use super::window::{WalletWindow, WindowStore};

/// Window statistics for `wallet` as of `now`.
///
/// Expired records are evicted first, so the snapshot never reflects a trade
/// older than the window. A wallet that has never traded yields the empty
/// snapshot.
pub fn snapshot(store: &WindowStore, wallet: &str, now: DateTime<Utc>) -> WalletStatsSnapshot {
    store
        .read_window(wallet, now, compute_snapshot)
        .unwrap_or_default()
}

/// Statistics over the records currently held by `window`. No eviction.
pub fn compute_snapshot(window: &WalletWindow) -> WalletStatsSnapshot {
    let trade_count = window.len();
    WalletStatsSnapshot {
        trade_count,
        win_rate: win_rate(window.win_count(), trade_count),
        avg_profit: avg_profit(window.total_profit(), trade_count),
    }
}

/// Build the record stored for one participant of `event`.
///
/// Profit is the amount that participant traded: the buy amount for the
/// buyer, the sell amount for the seller. There is no cost basis, so the
/// outcome is always `Undetermined` and never counts as a win.
pub fn attribute(event: &TradeEvent, side: Side) -> TradeRecord {
    TradeRecord::new(event.timestamp, event.amount(side))
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// wins / total, or zero when there are no trades.
pub fn win_rate(wins: usize, total: usize) -> Decimal {
    if total == 0 {
        return Decimal::ZERO;
    }
    Decimal::from(wins as u64) / Decimal::from(total as u64)
}

/// Mean profit per trade, or zero when there are no trades.
pub fn avg_profit(total_profit: Decimal, total: usize) -> Decimal {
    if total == 0 {
        return Decimal::ZERO;
    }
    total_profit / Decimal::from(total as u64)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Outcome;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn make_event(buy_amount: Decimal, sell_amount: Decimal) -> TradeEvent {
        TradeEvent {
            signature: "sig".into(),
            buy_wallet: "Buyer".into(),
            sell_wallet: "Seller".into(),
            buy_amount,
            sell_amount,
            buy_currency: "SOL".into(),
            sell_currency: "USDC".into(),
            buy_mint: None,
            sell_mint: None,
            buy_amount_usd: None,
            sell_amount_usd: None,
            dex_protocol: None,
            dex_program: None,
            timestamp: t0(),
        }
    }

    #[test]
    fn test_win_rate_basic() {
        assert_eq!(win_rate(9, 10), Decimal::new(9, 1));
        assert_eq!(win_rate(3, 4), Decimal::new(75, 2));
    }

    #[test]
    fn test_empty_metrics_are_zero() {
        assert_eq!(win_rate(0, 0), Decimal::ZERO);
        assert_eq!(avg_profit(Decimal::from(5), 0), Decimal::ZERO);
    }

    #[test]
    fn test_avg_profit() {
        assert_eq!(avg_profit(Decimal::from(10), 4), Decimal::new(25, 1));
        assert_eq!(avg_profit(Decimal::from(-3), 3), Decimal::from(-1));
    }

    #[test]
    fn test_attribute_uses_traded_amount_per_side() {
        let event = make_event(Decimal::new(15, 1), Decimal::from(220));

        let buyer = attribute(&event, Side::Buy);
        assert_eq!(buyer.profit, Decimal::new(15, 1));
        assert_eq!(buyer.outcome, Outcome::Undetermined);
        assert_eq!(buyer.timestamp, t0());

        let seller = attribute(&event, Side::Sell);
        assert_eq!(seller.profit, Decimal::from(220));
        assert_eq!(seller.outcome, Outcome::Undetermined);
    }

    #[test]
    fn test_snapshot_unknown_wallet_is_empty() {
        let store = WindowStore::new(Duration::days(30));
        assert_eq!(snapshot(&store, "nobody", t0()), WalletStatsSnapshot::default());
    }

    #[test]
    fn test_snapshot_ten_trades_nine_won() {
        let store = WindowStore::new(Duration::days(30));
        for i in 0..10 {
            let outcome = if i < 9 { Outcome::Won } else { Outcome::Undetermined };
            store.record_trade(
                "W1",
                TradeRecord::new(t0() + Duration::seconds(i), Decimal::ONE).with_outcome(outcome),
            ).unwrap();
        }

        let snap = snapshot(&store, "W1", t0() + Duration::seconds(9));
        assert_eq!(snap.trade_count, 10);
        assert!(snap.win_rate >= Decimal::new(9, 1));
        assert_eq!(snap.avg_profit, Decimal::ONE);
    }

    #[test]
    fn test_snapshot_evicts_before_reading() {
        let store = WindowStore::new(Duration::hours(1));
        store.record_trade(
            "W1",
            TradeRecord::new(t0(), Decimal::from(100)).with_outcome(Outcome::Won),
        ).unwrap();
        store.record_trade(
            "W1",
            TradeRecord::new(t0() + Duration::minutes(90), Decimal::from(2)),
        ).unwrap();

        let snap = snapshot(&store, "W1", t0() + Duration::minutes(90));
        assert_eq!(snap.trade_count, 1);
        assert_eq!(snap.win_rate, Decimal::ZERO);
        assert_eq!(snap.avg_profit, Decimal::from(2));
    }

    #[test]
    fn test_undetermined_outcomes_never_win() {
        let store = WindowStore::new(Duration::days(30));
        let event = make_event(Decimal::from(3), Decimal::from(4));
        for _ in 0..20 {
            store.record_trade("Buyer", attribute(&event, Side::Buy)).unwrap();
        }

        let snap = snapshot(&store, "Buyer", t0());
        assert_eq!(snap.trade_count, 20);
        assert_eq!(snap.win_rate, Decimal::ZERO);
        assert_eq!(snap.avg_profit, Decimal::from(3));
    }
}
