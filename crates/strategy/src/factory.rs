use tracing::info;

use common::{Buy, Candle, Error, Result, StrategyConfig};

use crate::indicators::SmaTracker;
use crate::Strategy;

/// Build all configured strategies, in configuration order.
///
/// Fails on the first entry with an unknown `type` tag or missing
/// variant-specific fields; a half-built strategy list never runs.
pub fn build_strategies(configs: &[StrategyConfig]) -> Result<Vec<Box<dyn Strategy>>> {
    let mut strategies: Vec<Box<dyn Strategy>> = Vec::new();

    for cfg in configs {
        let strategy = build_strategy(cfg)?;
        info!(kind = strategy.kind(), amount = cfg.amount, "Registered strategy");
        strategies.push(strategy);
    }

    Ok(strategies)
}

fn build_strategy(cfg: &StrategyConfig) -> Result<Box<dyn Strategy>> {
    if cfg.amount <= 0.0 {
        return Err(Error::Config(format!(
            "strategy '{}': amount must be positive, got {}",
            cfg.strategy_type, cfg.amount
        )));
    }

    match cfg.strategy_type.as_str() {
        SmaDipStrategy::KIND => {
            let threshold = cfg.min_dip_percentage.ok_or_else(|| {
                Error::Config(format!(
                    "strategy '{}': minDipPercentage is required",
                    SmaDipStrategy::KIND
                ))
            })?;
            Ok(Box::new(SmaDipStrategy::new(cfg.amount, threshold)))
        }
        SimpleDcaStrategy::KIND => {
            let (day, hour) = cfg.day.zip(cfg.hour).ok_or_else(|| {
                Error::Config(format!(
                    "strategy '{}': day and hour are required",
                    SimpleDcaStrategy::KIND
                ))
            })?;
            Ok(Box::new(SimpleDcaStrategy::new(cfg.amount, day, hour)))
        }
        other => Err(Error::UnknownStrategy(other.to_string())),
    }
}

// ─── Concrete strategy types ──────────────────────────────────────────────────

/// Buys a fixed amount when the 20-period average dips and turns back up.
///
/// The tracker is fed the full candle history every tick; a buy fires only
/// when the dip exceeds the configured threshold (strictly), so a dip that
/// lands exactly on the threshold is ignored.
pub struct SmaDipStrategy {
    amount: f64,
    min_dip_percentage: f64,
    tracker: SmaTracker,
}

impl SmaDipStrategy {
    pub const KIND: &'static str = "sma_20";

    const SMA_LENGTH: usize = 20;

    pub fn new(amount: f64, min_dip_percentage: f64) -> Self {
        Self {
            amount,
            min_dip_percentage,
            tracker: SmaTracker::new(Self::SMA_LENGTH),
        }
    }
}

impl Strategy for SmaDipStrategy {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn update(&mut self, candles: &[Candle]) -> Option<Buy> {
        if !self.tracker.update(candles) {
            return None;
        }

        if self.tracker.down_then_up() {
            let dip = self.tracker.dip_percentage();
            info!(
                average = self.tracker.newest(),
                dip_percentage = dip,
                threshold = self.min_dip_percentage,
                "Average turned upward after dip"
            );
            if dip > self.min_dip_percentage {
                return Some(Buy {
                    amount: self.amount,
                });
            }
        } else if self.tracker.up_then_down() {
            info!(
                average = self.tracker.newest(),
                "Average turned downward after rise"
            );
        }

        None
    }
}

/// Scheduled fixed-amount buy. The day/hour fields are required in the
/// configuration but the schedule is not wired up yet, so this variant never
/// fires.
pub struct SimpleDcaStrategy {
    #[allow(dead_code)]
    amount: f64,
    #[allow(dead_code)]
    day: u8,
    #[allow(dead_code)]
    hour: u8,
}

impl SimpleDcaStrategy {
    pub const KIND: &'static str = "simple_dca";

    pub fn new(amount: f64, day: u8, hour: u8) -> Self {
        Self { amount, day, hour }
    }
}

impl Strategy for SimpleDcaStrategy {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn update(&mut self, _candles: &[Candle]) -> Option<Buy> {
        // TODO: fire on the configured day/hour once scheduling is wired up
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(strategy_type: &str) -> StrategyConfig {
        StrategyConfig {
            strategy_type: strategy_type.to_string(),
            amount: 100.0,
            day: Some(1),
            hour: Some(9),
            min_dip_percentage: Some(0.01),
        }
    }

    fn candles_from_closes(closes: &[f64]) -> Vec<Candle> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Candle {
                time: 1_600_000_000 + (i as i64) * 60,
                open: close,
                high: close,
                low: close,
                close,
                vwap: close,
                volume: 1.0,
                count: 1,
            })
            .collect()
    }

    /// History whose 20 most recent closed candles all share one close, so
    /// the update's average equals that close exactly.
    fn flat_window(close: f64) -> Vec<Candle> {
        let mut closes = vec![close; 20];
        closes.push(0.0); // forming candle, excluded from the average
        candles_from_closes(&closes)
    }

    #[test]
    fn factory_rejects_unknown_type() {
        // err() first: unwrap_err would need Debug on the boxed strategies
        let err = build_strategies(&[config("martingale")]).err().unwrap();
        assert!(matches!(err, Error::UnknownStrategy(ref t) if t == "martingale"));
    }

    #[test]
    fn factory_rejects_missing_dip_threshold() {
        let mut cfg = config("sma_20");
        cfg.min_dip_percentage = None;
        assert!(matches!(build_strategies(&[cfg]), Err(Error::Config(_))));
    }

    #[test]
    fn factory_rejects_schedule_without_day() {
        let mut cfg = config("simple_dca");
        cfg.day = None;
        assert!(matches!(build_strategies(&[cfg]), Err(Error::Config(_))));
    }

    #[test]
    fn factory_rejects_non_positive_amount() {
        let mut cfg = config("simple_dca");
        cfg.amount = 0.0;
        assert!(matches!(build_strategies(&[cfg]), Err(Error::Config(_))));
    }

    #[test]
    fn factory_builds_in_configuration_order() {
        let strategies =
            build_strategies(&[config("simple_dca"), config("sma_20")]).unwrap();
        assert_eq!(strategies.len(), 2);
        assert_eq!(strategies[0].kind(), "simple_dca");
        assert_eq!(strategies[1].kind(), "sma_20");
    }

    #[test]
    fn simple_dca_never_fires() {
        let mut strategy = SimpleDcaStrategy::new(50.0, 1, 9);
        for n in 0..40 {
            let closes: Vec<f64> = (0..n).map(|i| 100.0 + i as f64).collect();
            assert!(strategy.update(&candles_from_closes(&closes)).is_none());
        }
    }

    #[test]
    fn sma_dip_waits_for_initialization() {
        let mut strategy = SmaDipStrategy::new(100.0, 0.0001);
        // Two updates are not enough history to classify a trend
        assert!(strategy.update(&flat_window(100.0)).is_none());
        assert!(strategy.update(&flat_window(90.0)).is_none());
    }

    #[test]
    fn sma_dip_exactly_at_threshold_does_not_fire() {
        // Averages 100 -> 90 -> 99: down-then-up with dip 10/99 of newest
        let dip = 10.0 / 99.0;
        let mut strategy = SmaDipStrategy::new(100.0, dip);
        strategy.update(&flat_window(100.0));
        strategy.update(&flat_window(90.0));
        assert!(strategy.update(&flat_window(99.0)).is_none());
    }

    #[test]
    fn sma_dip_above_threshold_fires_with_configured_amount() {
        let dip = 10.0 / 99.0;
        let mut strategy = SmaDipStrategy::new(100.0, dip - 0.0001);
        strategy.update(&flat_window(100.0));
        strategy.update(&flat_window(90.0));
        let buy = strategy.update(&flat_window(99.0)).unwrap();
        assert_eq!(buy.amount, 100.0);
    }

    #[test]
    fn sma_dip_ignores_upward_reversal() {
        let mut strategy = SmaDipStrategy::new(100.0, 0.0001);
        strategy.update(&flat_window(90.0));
        strategy.update(&flat_window(100.0));
        // Rise then fall is the opposite shape; no buy however deep the drop
        assert!(strategy.update(&flat_window(50.0)).is_none());
    }

    #[test]
    fn sma_dip_fires_once_over_a_v_shaped_series() {
        let mut closes: Vec<f64> = vec![100.0; 25];
        closes.extend((1..=10).map(|i| 100.0 - i as f64)); // 99 down to 90
        closes.extend((1..=12).map(|i| 90.0 + 3.0 * i as f64)); // 93 up to 126

        let mut buys = 0;
        let mut strategy = SmaDipStrategy::new(25.0, 0.000001);
        for n in 1..=closes.len() {
            if strategy.update(&candles_from_closes(&closes[..n])).is_some() {
                buys += 1;
            }
        }
        assert_eq!(buys, 1, "one turn in the series, one buy");
    }

    #[test]
    fn strategies_are_deterministic() {
        let closes: Vec<f64> = (0..60)
            .map(|i| 100.0 + 10.0 * ((i as f64) * 0.7).sin())
            .collect();

        let run = || -> Vec<bool> {
            let mut strategy = SmaDipStrategy::new(10.0, 0.0001);
            (1..=closes.len())
                .map(|n| strategy.update(&candles_from_closes(&closes[..n])).is_some())
                .collect()
        };

        assert_eq!(run(), run());
    }
}
