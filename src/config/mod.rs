use anyhow::Context;
use chrono::Duration;
use rust_decimal::Decimal;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

const DEFAULT_WS_URL: &str = "wss://streaming.bitquery.io/eap";

/// 30 days.
const DEFAULT_WINDOW_SECS: i64 = 30 * 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Feed
    pub bitquery_ws_url: String,
    pub bitquery_api_key: String,

    // Sinks
    pub log_path: PathBuf,
    pub alert_path: PathBuf,

    // Observability
    pub metrics_addr: Option<SocketAddr>,
    pub log_format: LogFormat,

    pub detection: DetectionConfig,
}

/// Detection parameters. Built once at startup and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionConfig {
    /// Trailing window over which wallet statistics are computed.
    pub window_duration: Duration,
    /// Minimum trades in the window before a wallet can qualify.
    pub min_trades: usize,
    /// Inclusive lower bound on the win rate.
    pub min_win_rate: Decimal,
    /// Exclusive lower bound on the average profit.
    pub min_avg_profit: Decimal,
    /// Alert only on the Quiet → Flagged transition. When false, every
    /// qualifying evaluation alerts.
    pub suppress_repeat_alerts: bool,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            window_duration: Duration::days(30),
            min_trades: 10,
            min_win_rate: Decimal::new(90, 2),  // 0.90
            min_avg_profit: Decimal::new(50, 2), // 0.50
            suppress_repeat_alerts: true,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let bitquery_api_key = lookup("BITQUERY_API_KEY")
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("BITQUERY_API_KEY must be set"))?;

        let metrics_addr = match non_empty(&lookup, "METRICS_ADDR") {
            Some(raw) => Some(
                raw.parse()
                    .with_context(|| format!("METRICS_ADDR has invalid value {raw:?}"))?,
            ),
            None => None,
        };

        let log_format = match non_empty(&lookup, "LOG_FORMAT").as_deref() {
            None | Some("pretty") | Some("text") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => anyhow::bail!("LOG_FORMAT must be \"pretty\" or \"json\", got {other:?}"),
        };

        Ok(Self {
            bitquery_ws_url: non_empty(&lookup, "BITQUERY_WS_URL")
                .unwrap_or_else(|| DEFAULT_WS_URL.into()),
            bitquery_api_key,
            log_path: non_empty(&lookup, "LOG_PATH")
                .unwrap_or_else(|| "log.txt".into())
                .into(),
            alert_path: non_empty(&lookup, "ALERT_PATH")
                .unwrap_or_else(|| "alert.txt".into())
                .into(),
            metrics_addr,
            log_format,
            detection: DetectionConfig::from_lookup(&lookup)?,
        })
    }
}

impl DetectionConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();

        let window_secs: i64 = parse_or(&lookup, "WINDOW_DURATION_SECS", DEFAULT_WINDOW_SECS)?;
        anyhow::ensure!(window_secs > 0, "WINDOW_DURATION_SECS must be positive");
        let window_duration = Duration::try_seconds(window_secs)
            .ok_or_else(|| anyhow::anyhow!("WINDOW_DURATION_SECS is out of range"))?;

        let min_trades = parse_or(&lookup, "MIN_TRADES", defaults.min_trades)?;
        anyhow::ensure!(min_trades >= 1, "MIN_TRADES must be at least 1");

        let min_win_rate: Decimal = parse_or(&lookup, "MIN_WIN_RATE", defaults.min_win_rate)?;
        anyhow::ensure!(
            min_win_rate >= Decimal::ZERO && min_win_rate <= Decimal::ONE,
            "MIN_WIN_RATE must be between 0 and 1"
        );

        Ok(Self {
            window_duration,
            min_trades,
            min_win_rate,
            min_avg_profit: parse_or(&lookup, "MIN_AVG_PROFIT", defaults.min_avg_profit)?,
            suppress_repeat_alerts: parse_or(
                &lookup,
                "SUPPRESS_REPEAT_ALERTS",
                defaults.suppress_repeat_alerts,
            )?,
        })
    }
}

fn non_empty(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match non_empty(lookup, key) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("{key} has invalid value {raw:?}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_detection_defaults() {
        let config = DetectionConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, DetectionConfig::default());
        assert_eq!(config.window_duration, Duration::seconds(2_592_000));
        assert_eq!(config.min_trades, 10);
        assert_eq!(config.min_win_rate, Decimal::new(9, 1));
        assert_eq!(config.min_avg_profit, Decimal::new(5, 1));
        assert!(config.suppress_repeat_alerts);
    }

    #[test]
    fn test_detection_overrides() {
        let config = DetectionConfig::from_lookup(lookup_from(&[
            ("WINDOW_DURATION_SECS", "3600"),
            ("MIN_TRADES", "3"),
            ("MIN_WIN_RATE", "0.75"),
            ("MIN_AVG_PROFIT", "2.5"),
            ("SUPPRESS_REPEAT_ALERTS", "false"),
        ]))
        .unwrap();

        assert_eq!(config.window_duration, Duration::hours(1));
        assert_eq!(config.min_trades, 3);
        assert_eq!(config.min_win_rate, Decimal::new(75, 2));
        assert_eq!(config.min_avg_profit, Decimal::new(25, 1));
        assert!(!config.suppress_repeat_alerts);
    }

    #[test]
    fn test_detection_rejects_invalid_values() {
        assert!(DetectionConfig::from_lookup(lookup_from(&[("MIN_TRADES", "ten")])).is_err());
        assert!(DetectionConfig::from_lookup(lookup_from(&[("MIN_TRADES", "0")])).is_err());
        assert!(DetectionConfig::from_lookup(lookup_from(&[("WINDOW_DURATION_SECS", "-5")])).is_err());
        assert!(DetectionConfig::from_lookup(lookup_from(&[("MIN_WIN_RATE", "1.5")])).is_err());
        assert!(
            DetectionConfig::from_lookup(lookup_from(&[("SUPPRESS_REPEAT_ALERTS", "maybe")]))
                .is_err()
        );
    }

    #[test]
    fn test_app_config_requires_api_key() {
        let err = AppConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(err.to_string().contains("BITQUERY_API_KEY"));
    }

    #[test]
    fn test_app_config_defaults() {
        let config = AppConfig::from_lookup(lookup_from(&[("BITQUERY_API_KEY", "key")])).unwrap();
        assert_eq!(config.bitquery_ws_url, DEFAULT_WS_URL);
        assert_eq!(config.log_path, PathBuf::from("log.txt"));
        assert_eq!(config.alert_path, PathBuf::from("alert.txt"));
        assert_eq!(config.metrics_addr, None);
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_app_config_observability_options() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("BITQUERY_API_KEY", "key"),
            ("METRICS_ADDR", "127.0.0.1:9000"),
            ("LOG_FORMAT", "json"),
        ]))
        .unwrap();
        assert_eq!(config.metrics_addr, Some("127.0.0.1:9000".parse().unwrap()));
        assert_eq!(config.log_format, LogFormat::Json);

        assert!(AppConfig::from_lookup(lookup_from(&[
            ("BITQUERY_API_KEY", "key"),
            ("LOG_FORMAT", "xml"),
        ]))
        .is_err());
    }
}
