use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{interval, sleep};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::bitquery::SubscribeMessage;
use crate::services::RecordSink;

const PING_INTERVAL: Duration = Duration::from_secs(25);
const BASE_RECONNECT_DELAY: Duration = Duration::from_secs(2);
const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(60);

/// One text frame from the feed, stamped with the time it was received.
#[derive(Debug, Clone)]
pub struct FeedFrame {
    pub text: String,
    pub observed_at: DateTime<Utc>,
}

/// Hands out receive timestamps that never go backwards, even if the wall
/// clock does.
#[derive(Debug, Default)]
pub struct FeedClock {
    last: Option<DateTime<Utc>>,
}

impl FeedClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// `max(now, last returned value)`.
    pub fn observe(&mut self, now: DateTime<Utc>) -> DateTime<Utc> {
        let stamped = match self.last {
            Some(last) if last > now => last,
            _ => now,
        };
        self.last = Some(stamped);
        stamped
    }
}

/// Build the upgrade request with the `X-API-KEY` header set.
pub fn build_request(url: &str, api_key: &str) -> anyhow::Result<Request> {
    let mut request = url.into_client_request()?;
    request
        .headers_mut()
        .insert("X-API-KEY", HeaderValue::from_str(api_key)?);
    Ok(request)
}

/// Delay before reconnect attempt `attempt` (zero-based): 2s doubling, capped at 60s.
pub fn reconnect_delay(attempt: u32) -> Duration {
    BASE_RECONNECT_DELAY
        .saturating_mul(2u32.saturating_pow(attempt))
        .min(MAX_RECONNECT_DELAY)
}

/// Run the feed listener loop. Never returns while `tx` has a receiver.
///
/// Every text frame is forwarded as a `FeedFrame`; decoding happens on the
/// consumer side. Connection lifecycle events go to the log sink.
pub async fn run_ws_listener(
    ws_url: String,
    api_key: String,
    tx: mpsc::Sender<FeedFrame>,
    sink: Arc<dyn RecordSink>,
) {
    let mut attempt: u32 = 0;
    let mut clock = FeedClock::new();

    loop {
        tracing::info!(url = %ws_url, "Connecting to Bitquery WebSocket...");

        let request = match build_request(&ws_url, &api_key) {
            Ok(request) => request,
            Err(e) => {
                tracing::error!(error = %e, "Invalid WebSocket request, listener stopping");
                log_line(sink.as_ref(), &format!("Websocket error: {e}"));
                return;
            }
        };

        match connect_async(request).await {
            Ok((ws_stream, _response)) => {
                tracing::info!("WebSocket connected successfully");
                log_line(sink.as_ref(), "Websocket connection opened");
                attempt = 0;

                let (mut write, mut read) = ws_stream.split();

                match serde_json::to_string(&SubscribeMessage::dex_trades()) {
                    Ok(msg) => {
                        if let Err(e) = write.send(Message::Text(msg.into())).await {
                            tracing::error!(error = %e, "Failed to send subscribe message");
                            log_line(sink.as_ref(), &format!("Websocket error: {e}"));
                            wait_before_reconnect(&mut attempt).await;
                            continue;
                        }
                        tracing::info!("Subscribed to Solana DEX trades");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to encode subscribe message");
                        return;
                    }
                }

                let mut ping_timer = interval(PING_INTERVAL);
                ping_timer.tick().await; // first tick is immediate
                let mut close_frame: Option<CloseFrame> = None;

                loop {
                    tokio::select! {
                        msg = read.next() => {
                            match msg {
                                Some(Ok(Message::Text(text))) => {
                                    let frame = FeedFrame {
                                        text: text.as_str().to_owned(),
                                        observed_at: clock.observe(Utc::now()),
                                    };
                                    if tx.send(frame).await.is_err() {
                                        tracing::info!("Feed consumer gone, listener stopping");
                                        return;
                                    }
                                }
                                Some(Ok(Message::Ping(data))) => {
                                    if let Err(e) = write.send(Message::Pong(data)).await {
                                        tracing::warn!(error = %e, "Failed to send pong");
                                        break;
                                    }
                                }
                                Some(Ok(Message::Close(frame))) => {
                                    tracing::warn!(frame = ?frame, "WebSocket server sent close frame");
                                    close_frame = frame;
                                    break;
                                }
                                Some(Ok(_)) => {}
                                Some(Err(e)) => {
                                    tracing::error!(error = %e, "WebSocket read error");
                                    log_line(sink.as_ref(), &format!("Websocket error: {e}"));
                                    break;
                                }
                                None => {
                                    tracing::warn!("WebSocket stream ended");
                                    break;
                                }
                            }
                        }
                        _ = ping_timer.tick() => {
                            if let Err(e) = write.send(Message::Ping(Vec::new().into())).await {
                                tracing::warn!(error = %e, "Failed to send ping");
                                break;
                            }
                        }
                    }
                }

                log_line(sink.as_ref(), &closed_line(close_frame.as_ref()));
            }
            Err(e) => {
                tracing::error!(error = %e, "WebSocket connection failed");
                log_line(sink.as_ref(), &format!("Websocket error: {e}"));
            }
        }

        wait_before_reconnect(&mut attempt).await;
    }
}

async fn wait_before_reconnect(attempt: &mut u32) {
    let delay = reconnect_delay(*attempt);
    *attempt = attempt.saturating_add(1);
    tracing::info!(delay_secs = delay.as_secs(), attempt = *attempt, "Reconnecting...");
    sleep(delay).await;
}

/// Log line for a finished connection, with the server's close code and
/// reason when it sent a close frame.
fn closed_line(frame: Option<&CloseFrame>) -> String {
    match frame {
        Some(frame) => format!(
            "Websocket connection closed. Status Code: {}, Message: {}",
            frame.code, frame.reason
        ),
        None => "Websocket connection closed".to_string(),
    }
}

fn log_line(sink: &dyn RecordSink, text: &str) {
    if let Err(e) = sink.append_log(text) {
        metrics::counter!("sink_errors_total").increment(1);
        tracing::warn!(error = %e, "Failed to append log line");
    }
}
