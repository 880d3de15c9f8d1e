use std::sync::Arc;
use std::time::Duration;

use walletwatch::config::{AppConfig, LogFormat};
use walletwatch::ingestion::{run_ws_listener, Dispatcher, FeedFrame};
use walletwatch::metrics::init_metrics;
use walletwatch::services::{FileSink, RecordSink};

const FEED_CHANNEL_CAPACITY: usize = 1000;
const SINK_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;
    init_tracing(config.log_format);

    // tokio-tungstenite with rustls needs a process-wide crypto provider.
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        tracing::debug!("Crypto provider already installed");
    }

    init_metrics(config.metrics_addr)?;

    tracing::info!(
        window_secs = config.detection.window_duration.num_seconds(),
        min_trades = config.detection.min_trades,
        min_win_rate = %config.detection.min_win_rate,
        min_avg_profit = %config.detection.min_avg_profit,
        suppress_repeat_alerts = config.detection.suppress_repeat_alerts,
        "Detection configured"
    );

    let (file_sink, writer) = FileSink::spawn(config.log_path.clone(), config.alert_path.clone());
    let sink: Arc<dyn RecordSink> = Arc::new(file_sink);
    let dispatcher = Dispatcher::new(config.detection.clone(), sink.clone());

    // --- Feed: WS listener → dispatcher ---
    let (feed_tx, mut feed_rx) = tokio::sync::mpsc::channel::<FeedFrame>(FEED_CHANNEL_CAPACITY);

    let listener = {
        let ws_url = config.bitquery_ws_url.clone();
        let api_key = config.bitquery_api_key.clone();
        let sink = sink.clone();
        tokio::spawn(async move {
            run_ws_listener(ws_url, api_key, feed_tx, sink).await;
        })
    };

    tracing::info!(
        log = %config.log_path.display(),
        alerts = %config.alert_path.display(),
        "Smart wallet detector running"
    );

    loop {
        tokio::select! {
            frame = feed_rx.recv() => {
                let Some(frame) = frame else {
                    tracing::warn!("Feed channel closed");
                    break;
                };
                let alerts = dispatcher.on_message(&frame.text, frame.observed_at);
                if !alerts.is_empty() {
                    tracing::debug!(count = alerts.len(), "Alerts emitted for frame");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received shutdown signal, shutting down...");
                break;
            }
        }
    }

    listener.abort();
    let _ = listener.await;

    // Dropping every sink handle lets the writer drain and exit.
    drop(dispatcher);
    drop(sink);
    if tokio::time::timeout(SINK_DRAIN_TIMEOUT, writer).await.is_err() {
        tracing::warn!("File sink did not drain before timeout");
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Pretty => registry.with(fmt::layer()).init(),
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
    }
}
