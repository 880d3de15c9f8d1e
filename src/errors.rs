use rust_decimal::Decimal;

use crate::models::Side;

/// Longest raw-payload excerpt carried by a decode error.
pub const EXCERPT_LEN: usize = 256;

/// Failure to turn one feed message (or one trade entry inside it) into a `TradeEvent`.
///
/// All variants are recoverable: the caller logs the error and moves on to the
/// next message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("Malformed payload: {reason} (raw: {excerpt})")]
    MalformedPayload { reason: String, excerpt: String },

    #[error("Server error: {detail}")]
    ServerReportedError { detail: String },

    #[error("Missing required field {field} (tx: {signature})")]
    MissingField {
        field: &'static str,
        signature: String,
    },
}

impl DecodeError {
    pub fn malformed(reason: impl Into<String>, raw: &str) -> Self {
        DecodeError::MalformedPayload {
            reason: reason.into(),
            excerpt: excerpt(raw),
        }
    }

    pub fn missing(field: &'static str, signature: &str) -> Self {
        DecodeError::MissingField {
            field,
            signature: display_signature(signature),
        }
    }

    /// Short label used for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            DecodeError::MalformedPayload { .. } => "malformed_payload",
            DecodeError::ServerReportedError { .. } => "server_error",
            DecodeError::MissingField { .. } => "missing_field",
        }
    }
}

/// A decoded trade that cannot be dispatched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Missing required data in trade: empty {side} wallet (tx: {signature})")]
    EmptyParticipant { side: Side, signature: String },
}

impl ValidationError {
    pub fn empty_participant(side: Side, signature: &str) -> Self {
        ValidationError::EmptyParticipant {
            side,
            signature: display_signature(signature),
        }
    }
}

/// A window update that was refused; the window is left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WindowError {
    #[error("Window profit total overflow adding {profit}")]
    ProfitOverflow { profit: Decimal },
}

/// Failure to hand a line to a log or alert sink.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("sink writer is closed")]
    Closed,

    #[error("sink lock poisoned")]
    Poisoned,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Truncate `raw` to at most `EXCERPT_LEN` characters, on a char boundary.
pub fn excerpt(raw: &str) -> String {
    match raw.char_indices().nth(EXCERPT_LEN) {
        Some((cut, _)) => format!("{}...", &raw[..cut]),
        None => raw.to_string(),
    }
}

fn display_signature(signature: &str) -> String {
    if signature.is_empty() {
        "unknown".into()
    } else {
        signature.to_string()
    }
}
