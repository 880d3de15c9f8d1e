use std::sync::Mutex;

use crate::errors::SinkError;
use crate::models::{SmartWalletAlert, TradeEvent};

/// Destination for log and alert lines. Each call appends one line; failures
/// are reported but never stop the caller.
pub trait RecordSink: Send + Sync {
    fn append_log(&self, text: &str) -> Result<(), SinkError>;

    fn append_alert(&self, text: &str) -> Result<(), SinkError>;
}

/// Keeps every line in memory. Used by tests and dry runs.
#[derive(Debug, Default)]
pub struct MemorySink {
    logs: Mutex<Vec<String>>,
    alerts: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn logs(&self) -> Vec<String> {
        self.logs.lock().map(|l| l.clone()).unwrap_or_default()
    }

    pub fn alerts(&self) -> Vec<String> {
        self.alerts.lock().map(|a| a.clone()).unwrap_or_default()
    }
}

impl RecordSink for MemorySink {
    fn append_log(&self, text: &str) -> Result<(), SinkError> {
        self.logs
            .lock()
            .map_err(|_| SinkError::Poisoned)?
            .push(text.to_string());
        Ok(())
    }

    fn append_alert(&self, text: &str) -> Result<(), SinkError> {
        self.alerts
            .lock()
            .map_err(|_| SinkError::Poisoned)?
            .push(text.to_string());
        Ok(())
    }
}

/// Log line for an accepted trade.
pub fn format_trade_line(event: &TradeEvent) -> String {
    format!("DEX trade: {event}")
}

/// Alert-sink line for a newly detected smart wallet.
pub fn format_alert(alert: &SmartWalletAlert) -> String {
    format!("ALERT: {alert}")
}
