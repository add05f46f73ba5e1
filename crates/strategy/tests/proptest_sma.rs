use proptest::prelude::*;

use common::Candle;
use strategy::indicators::SmaTracker;
use strategy::Strategy;

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

proptest! {
    /// Updating with arbitrary positive closes must never panic, and the
    /// window must shift right on every update.
    #[test]
    fn tracker_shifts_right_on_every_update(
        closes in prop::collection::vec(0.0001f64..1_000_000.0f64, 1..80),
        length in 1usize..30,
    ) {
        let mut tracker = SmaTracker::new(length);
        for n in 1..=closes.len() {
            let before_newest = tracker.newest();
            let before_middle = tracker.middle();
            tracker.update(&candles_from_closes(&closes[..n]));
            prop_assert_eq!(tracker.middle(), before_newest);
            prop_assert_eq!(tracker.oldest(), before_middle);
        }
    }

    /// Three updates are always enough to initialize, never fewer. The
    /// replay starts at two candles so every update has at least one closed
    /// candle to average; an update over none pushes a zero into the window
    /// and zeros never count as populated.
    #[test]
    fn tracker_initializes_on_third_update(
        closes in prop::collection::vec(1.0f64..1_000_000.0f64, 4..40),
    ) {
        let mut tracker = SmaTracker::new(1);
        let mut updates = 0;
        for n in 2..=closes.len() {
            let initialized = tracker.update(&candles_from_closes(&closes[..n]));
            updates += 1;
            prop_assert_eq!(initialized, updates >= 3);
        }
    }

    /// A strictly rising close series can never look like a dip.
    #[test]
    fn rising_series_never_reports_down_then_up(
        start in 1.0f64..1000.0f64,
        step in 0.01f64..10.0f64,
        count in 4usize..60,
        length in 1usize..25,
    ) {
        let closes: Vec<f64> = (0..count).map(|i| start + step * i as f64).collect();
        let mut tracker = SmaTracker::new(length);
        for n in 1..=closes.len() {
            tracker.update(&candles_from_closes(&closes[..n]));
            prop_assert!(!tracker.down_then_up());
        }
    }

    /// The dip strategy must never panic and never buy more often than once
    /// per update, whatever the close series looks like.
    #[test]
    fn dip_strategy_never_panics(
        closes in prop::collection::vec(0.0001f64..1_000_000.0f64, 1..60),
        threshold in 0.0f64..0.5f64,
    ) {
        let mut strategy = strategy::factory::SmaDipStrategy::new(100.0, threshold);
        for n in 1..=closes.len() {
            let buy = strategy.update(&candles_from_closes(&closes[..n]));
            if let Some(buy) = buy {
                prop_assert_eq!(buy.amount, 100.0);
            }
        }
    }
}
