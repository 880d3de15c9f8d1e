use std::net::SocketAddr;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and register all application metrics.
///
/// With `listen_addr` set, the exporter also serves the scrape endpoint over
/// HTTP on that address. Must be called from within a Tokio runtime.
pub fn init_metrics(listen_addr: Option<SocketAddr>) -> anyhow::Result<()> {
    let builder = PrometheusBuilder::new();
    match listen_addr {
        Some(addr) => {
            builder.with_http_listener(addr).install()?;
            tracing::info!(addr = %addr, "Prometheus exporter listening");
        }
        None => {
            builder.install_recorder()?;
        }
    }

    // Pre-register counters so they appear even before the first increment.
    counter!("trade_events_total").absolute(0);
    counter!("decode_errors_total").absolute(0);
    counter!("dropped_trades_total").absolute(0);
    counter!("smart_wallet_alerts_total").absolute(0);
    counter!("sink_errors_total").absolute(0);

    gauge!("tracked_wallets").set(0.0);

    // Histogram is lazily created on first record; force creation.
    histogram!("pipeline_latency_seconds").record(0.0);

    Ok(())
}
