use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use metrics::{counter, gauge, histogram};

use crate::config::DetectionConfig;
use crate::errors::{DecodeError, ValidationError};
use crate::intelligence::{stats, DetectionResult, Detector, WindowStore};
use crate::models::{Side, SmartWalletAlert, TradeEvent};
use crate::services::{format_alert, format_trade_line, RecordSink};

use super::decoder::{self, FeedMessage};

/// Routes trades through the window store, the stats calculator and the
/// detector, and forwards log lines and alerts to the sink.
///
/// All methods take `&self`; the dispatcher can be shared behind an `Arc`.
pub struct Dispatcher {
    store: WindowStore,
    detector: Detector,
    sink: Arc<dyn RecordSink>,
}

impl Dispatcher {
    pub fn new(config: DetectionConfig, sink: Arc<dyn RecordSink>) -> Self {
        Self {
            store: WindowStore::new(config.window_duration),
            detector: Detector::new(config),
            sink,
        }
    }

    pub fn store(&self) -> &WindowStore {
        &self.store
    }

    pub fn detector(&self) -> &Detector {
        &self.detector
    }

    /// Decode one raw feed frame and dispatch every trade in it.
    ///
    /// Decode failures are logged and skipped; they never abort the stream.
    pub fn on_message(&self, raw: &str, observed_at: DateTime<Utc>) -> Vec<SmartWalletAlert> {
        tracing::trace!(raw = %raw, "Feed message received");

        let batch = match decoder::decode_message(raw, observed_at) {
            Ok(FeedMessage::Trades(batch)) => batch,
            Ok(FeedMessage::Control(kind)) => {
                tracing::debug!(kind = %kind, "Feed control frame");
                return Vec::new();
            }
            Ok(FeedMessage::Unrecognized) => {
                tracing::debug!(raw = %crate::errors::excerpt(raw), "Unknown message format");
                self.log("Unknown message format received");
                return Vec::new();
            }
            Err(e) => {
                self.report_decode_error(&e);
                return Vec::new();
            }
        };

        for rejected in &batch.rejected {
            self.report_decode_error(rejected);
        }

        let mut alerts = Vec::new();
        for event in &batch.events {
            if let Ok(emitted) = self.on_trade(event) {
                alerts.extend(emitted);
            }
        }
        alerts
    }

    /// Process a single decoded trade: buyer first, then seller.
    ///
    /// A trade with an empty participant address is dropped whole: neither
    /// window is touched and only a diagnostic is logged.
    pub fn on_trade(&self, event: &TradeEvent) -> Result<Vec<SmartWalletAlert>, ValidationError> {
        let start = Instant::now();

        if let Err(e) = validate_participants(event) {
            counter!("dropped_trades_total").increment(1);
            tracing::warn!(
                signature = %event.signature,
                buyer = %event.buy_wallet,
                seller = %event.sell_wallet,
                "Missing required data in trade"
            );
            self.log(&e.to_string());
            return Err(e);
        }

        counter!("trade_events_total").increment(1);
        tracing::debug!(signature = %event.signature, "{event}");
        self.log(&format_trade_line(event));

        let mut alerts = Vec::new();
        for side in Side::BOTH {
            let wallet = event.wallet(side);
            if let Err(e) = self.store.record_trade(wallet, stats::attribute(event, side)) {
                counter!("dropped_trades_total").increment(1);
                tracing::warn!(
                    wallet = %wallet,
                    side = %side,
                    signature = %event.signature,
                    error = %e,
                    "Dropping trade side"
                );
                self.log(&format!("{e} (wallet: {wallet}, tx: {})", event.signature));
                continue;
            }

            let result = self.evaluate(wallet, event.timestamp);
            if result.alert {
                let alert = SmartWalletAlert {
                    wallet: wallet.to_string(),
                    signature: event.signature.clone(),
                    snapshot: result.snapshot,
                    detected_at: event.timestamp,
                };
                self.emit(&alert);
                alerts.push(alert);
            }
        }

        gauge!("tracked_wallets").set(self.store.wallet_count() as f64);
        histogram!("pipeline_latency_seconds").record(start.elapsed().as_secs_f64());

        Ok(alerts)
    }

    /// Evict, snapshot and run the detector for `wallet` as of `now`.
    pub fn evaluate(&self, wallet: &str, now: DateTime<Utc>) -> DetectionResult {
        let snapshot = stats::snapshot(&self.store, wallet, now);
        self.detector.observe(wallet, snapshot)
    }

    fn emit(&self, alert: &SmartWalletAlert) {
        counter!("smart_wallet_alerts_total").increment(1);
        tracing::info!(
            wallet = %alert.wallet,
            signature = %alert.signature,
            trades = alert.snapshot.trade_count,
            win_rate = %alert.snapshot.win_rate,
            avg_profit = %alert.snapshot.avg_profit,
            "Smart wallet detected"
        );

        self.log(&alert.to_string());
        if let Err(e) = self.sink.append_alert(&format_alert(alert)) {
            counter!("sink_errors_total").increment(1);
            tracing::warn!(error = %e, wallet = %alert.wallet, "Failed to append alert");
        }
    }

    fn report_decode_error(&self, error: &DecodeError) {
        counter!("decode_errors_total", "kind" => error.kind()).increment(1);
        tracing::warn!(error = %error, kind = error.kind(), "Skipping undecodable feed data");
        self.log(&error.to_string());
    }

    fn log(&self, text: &str) {
        if let Err(e) = self.sink.append_log(text) {
            counter!("sink_errors_total").increment(1);
            tracing::warn!(error = %e, "Failed to append log line");
        }
    }
}

fn validate_participants(event: &TradeEvent) -> Result<(), ValidationError> {
    for side in Side::BOTH {
        if event.wallet(side).trim().is_empty() {
            return Err(ValidationError::empty_participant(side, &event.signature));
        }
    }
    Ok(())
}
