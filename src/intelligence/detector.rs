use dashmap::DashMap;
use serde::Serialize;

use crate::config::DetectionConfig;
use crate::models::WalletStatsSnapshot;

/// Per-wallet alert flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertState {
    /// Predicate not satisfied (initial state).
    #[default]
    Quiet,
    /// Predicate satisfied; further qualifying evaluations stay silent.
    Flagged,
}

/// Outcome of one evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectionResult {
    pub is_smart_wallet: bool,
    pub snapshot: WalletStatsSnapshot,
    /// True when this evaluation must emit an alert.
    pub alert: bool,
}

/// The smart-wallet predicate:
/// `trade_count >= min_trades && win_rate >= min_win_rate && avg_profit > min_avg_profit`.
pub fn is_smart_wallet(snapshot: &WalletStatsSnapshot, config: &DetectionConfig) -> bool {
    snapshot.trade_count >= config.min_trades
        && snapshot.win_rate >= config.min_win_rate
        && snapshot.avg_profit > config.min_avg_profit
}

/// Applies the predicate and tracks which wallets are currently flagged.
///
/// Transitions per wallet:
/// - Quiet → Flagged: alert
/// - Flagged → Flagged: silent (unless `suppress_repeat_alerts` is off)
/// - Flagged → Quiet: silent, flag cleared
/// - Quiet → Quiet: no-op
#[derive(Debug)]
pub struct Detector {
    config: DetectionConfig,
    states: DashMap<String, AlertState>,
}

impl Detector {
    pub fn new(config: DetectionConfig) -> Self {
        Self {
            config,
            states: DashMap::new(),
        }
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Feed a freshly computed snapshot for `wallet` through the state machine.
    pub fn observe(&self, wallet: &str, snapshot: WalletStatsSnapshot) -> DetectionResult {
        let is_smart_wallet = is_smart_wallet(&snapshot, &self.config);

        let alert = if is_smart_wallet {
            let mut state = self.states.entry(wallet.to_string()).or_default();
            let previous = std::mem::replace(&mut *state, AlertState::Flagged);
            previous == AlertState::Quiet || !self.config.suppress_repeat_alerts
        } else {
            if let Some(mut state) = self.states.get_mut(wallet) {
                if *state == AlertState::Flagged {
                    tracing::debug!(wallet = %wallet, "Smart wallet no longer qualifies");
                }
                *state = AlertState::Quiet;
            }
            false
        };

        DetectionResult {
            is_smart_wallet,
            snapshot,
            alert,
        }
    }

    pub fn state(&self, wallet: &str) -> AlertState {
        self.states.get(wallet).map(|s| *s).unwrap_or_default()
    }

    /// Wallets currently in the `Flagged` state.
    pub fn flagged_count(&self) -> usize {
        self.states
            .iter()
            .filter(|entry| *entry.value() == AlertState::Flagged)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn snap(trade_count: usize, win_rate: Decimal, avg_profit: Decimal) -> WalletStatsSnapshot {
        WalletStatsSnapshot {
            trade_count,
            win_rate,
            avg_profit,
        }
    }

    fn qualifying() -> WalletStatsSnapshot {
        snap(10, Decimal::new(9, 1), Decimal::ONE)
    }

    fn failing() -> WalletStatsSnapshot {
        snap(10, Decimal::new(5, 1), Decimal::ONE)
    }

    #[test]
    fn test_predicate_boundaries() {
        let config = DetectionConfig::default();

        assert!(is_smart_wallet(&qualifying(), &config));
        // Too few trades.
        assert!(!is_smart_wallet(&snap(9, Decimal::ONE, Decimal::ONE), &config));
        // Win rate is inclusive at 0.90.
        assert!(is_smart_wallet(&snap(10, Decimal::new(90, 2), Decimal::ONE), &config));
        assert!(!is_smart_wallet(&snap(10, Decimal::new(89, 2), Decimal::ONE), &config));
        // Average profit is exclusive at 0.50.
        assert!(!is_smart_wallet(&snap(10, Decimal::ONE, Decimal::new(50, 2)), &config));
        assert!(is_smart_wallet(&snap(10, Decimal::ONE, Decimal::new(51, 2)), &config));
    }

    #[test]
    fn test_predicate_never_holds_without_wins() {
        let config = DetectionConfig::default();
        assert!(!is_smart_wallet(&snap(500, Decimal::ZERO, Decimal::from(1_000)), &config));
    }

    #[test]
    fn test_quiet_to_flagged_alerts_once() {
        let detector = Detector::new(DetectionConfig::default());
        assert_eq!(detector.state("W1"), AlertState::Quiet);

        let first = detector.observe("W1", qualifying());
        assert!(first.is_smart_wallet);
        assert!(first.alert);
        assert_eq!(detector.state("W1"), AlertState::Flagged);

        let second = detector.observe("W1", qualifying());
        assert!(second.is_smart_wallet);
        assert!(!second.alert);
        assert_eq!(detector.flagged_count(), 1);
    }

    #[test]
    fn test_flag_clears_silently_and_rearms() {
        let detector = Detector::new(DetectionConfig::default());
        assert!(detector.observe("W1", qualifying()).alert);

        let cleared = detector.observe("W1", failing());
        assert!(!cleared.is_smart_wallet);
        assert!(!cleared.alert);
        assert_eq!(detector.state("W1"), AlertState::Quiet);

        assert!(detector.observe("W1", qualifying()).alert);
    }

    #[test]
    fn test_quiet_stays_quiet() {
        let detector = Detector::new(DetectionConfig::default());
        let result = detector.observe("W1", failing());
        assert!(!result.alert);
        assert_eq!(result.snapshot, failing());
        assert_eq!(detector.state("W1"), AlertState::Quiet);
        assert_eq!(detector.flagged_count(), 0);
    }

    #[test]
    fn test_wallets_are_independent() {
        let detector = Detector::new(DetectionConfig::default());
        assert!(detector.observe("W1", qualifying()).alert);
        assert!(detector.observe("W2", qualifying()).alert);
        assert!(!detector.observe("W1", qualifying()).alert);
        assert_eq!(detector.flagged_count(), 2);
    }

    #[test]
    fn test_repeat_alerts_when_suppression_disabled() {
        let detector = Detector::new(DetectionConfig {
            suppress_repeat_alerts: false,
            ..DetectionConfig::default()
        });

        assert!(detector.observe("W1", qualifying()).alert);
        assert!(detector.observe("W1", qualifying()).alert);
        assert!(!detector.observe("W1", failing()).alert);
    }
}
