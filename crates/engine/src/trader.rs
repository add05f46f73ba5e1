use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, RwLock};
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info, warn};

use common::{Buy, Candle, Error, ExchangeApi, Result, TradeSettings, TraderCommand, TraderState};
use strategy::Strategy;

/// Cloneable handle for stopping the trader and reading its state.
#[derive(Clone)]
pub struct TraderHandle {
    command_tx: mpsc::Sender<TraderCommand>,
    state: Arc<RwLock<TraderState>>,
}

impl TraderHandle {
    pub async fn stop(&self) {
        let _ = self.command_tx.send(TraderCommand::Stop).await;
    }

    pub async fn state(&self) -> TraderState {
        *self.state.read().await
    }
}

/// The trading loop: fetch candles, let every strategy look at them, execute
/// the buys they emit, sleep out the rest of the interval, repeat.
///
/// Everything runs on one task. Buys are executed one after another and the
/// private calls they make draw nonces from the client's single source, so
/// no two calls can race the same credentials.
pub struct Trader {
    exchange: Arc<dyn ExchangeApi>,
    strategies: Vec<Box<dyn Strategy>>,
    settings: TradeSettings,
    state: Arc<RwLock<TraderState>>,
    command_rx: mpsc::Receiver<TraderCommand>,
    #[allow(dead_code)] // kept to prevent channel close
    command_tx: mpsc::Sender<TraderCommand>,
}

impl Trader {
    pub fn new(
        exchange: Arc<dyn ExchangeApi>,
        strategies: Vec<Box<dyn Strategy>>,
        settings: TradeSettings,
    ) -> (Self, TraderHandle) {
        let (command_tx, command_rx) = mpsc::channel(8);
        let state = Arc::new(RwLock::new(TraderState::Idle));

        let handle = TraderHandle {
            command_tx: command_tx.clone(),
            state: state.clone(),
        };

        let trader = Trader {
            exchange,
            strategies,
            settings,
            state,
            command_rx,
            command_tx,
        };

        (trader, handle)
    }

    /// Run the trading loop until stopped. Call from `tokio::spawn`.
    ///
    /// A failed tick is logged and skipped, never fatal; only the stop
    /// command ends the loop.
    pub async fn run(mut self) {
        info!(
            pair = %self.settings.trade_symbol,
            interval_minutes = self.settings.trade_interval,
            dummy_mode = self.settings.dummy_mode,
            "Starting trading loop"
        );

        loop {
            let tick_started = Instant::now();

            self.set_state(TraderState::Fetching).await;
            let fetched = self
                .exchange
                .candles(&self.settings.trade_symbol, self.settings.trade_interval)
                .await;

            match fetched {
                Ok(candles) => {
                    if let Some(last) = candles.last() {
                        debug!(count = candles.len(), latest = %last.time_utc(), "Fetched candles");
                    }

                    self.set_state(TraderState::Evaluating).await;
                    let buys = self.evaluate(&candles);

                    if !buys.is_empty() {
                        self.set_state(TraderState::Buying).await;
                        for buy in buys {
                            if let Err(e) = self.execute_buy(&buy).await {
                                error!(amount = buy.amount, error = %e, "Buy failed");
                            }
                        }
                    }
                }
                Err(e) => {
                    error!(error = %e, "Failed to fetch candles, skipping tick");
                }
            }

            self.set_state(TraderState::Sleeping).await;
            let sleep_secs = remaining_sleep_secs(
                self.settings.trade_interval,
                tick_started.elapsed().as_secs(),
            );
            debug!(seconds = sleep_secs, "Sleeping until next tick");

            tokio::select! {
                _ = sleep(Duration::from_secs(sleep_secs)) => {}
                command = self.command_rx.recv() => match command {
                    Some(TraderCommand::Stop) => {
                        info!("Stop received");
                        break;
                    }
                    None => {
                        warn!("Command channel closed, stopping");
                        break;
                    }
                },
            }
        }

        self.set_state(TraderState::Stopped).await;
        info!("Trading loop stopped");
    }

    /// Run every strategy over the tick's candles, in configuration order.
    fn evaluate(&mut self, candles: &[Candle]) -> Vec<Buy> {
        let mut buys = Vec::new();
        for strategy in &mut self.strategies {
            if let Some(buy) = strategy.update(candles) {
                info!(
                    kind = strategy.kind(),
                    amount = buy.amount,
                    currency = %self.settings.quote_currency,
                    "Strategy wants to buy"
                );
                buys.push(buy);
            }
        }
        buys
    }

    /// Execute one buy: price it off the best bid, check funds, then place a
    /// post-only limit order. In dummy mode the intent is only logged.
    async fn execute_buy(&self, buy: &Buy) -> Result<()> {
        if self.settings.dummy_mode {
            info!(amount = buy.amount, "Dummy buy, no order sent");
            return Ok(());
        }

        let book = self.exchange.order_book(&self.settings.trade_symbol).await?;
        let best_bid = book
            .best_bid()
            .ok_or_else(|| Error::Parse("order book has no bids".to_string()))?;

        let fee_percentage = self.exchange.maker_fee(&self.settings.trade_symbol).await?;
        let volume = order_volume(buy.amount, best_bid.price, fee_percentage);

        let balance = self.exchange.balance(&self.settings.quote_currency).await?;
        if buy.amount > balance {
            return Err(Error::InsufficientFunds {
                needed: buy.amount,
                available: balance,
            });
        }

        let receipt = self
            .exchange
            .place_buy_order(&self.settings.trade_symbol, volume, best_bid.price)
            .await?;
        info!(
            txids = ?receipt.txids,
            order = %receipt.description,
            "Order placed"
        );
        Ok(())
    }

    async fn set_state(&self, state: TraderState) {
        *self.state.write().await = state;
    }
}

/// Order volume that spends `amount` at `price` with the maker fee included,
/// rounded to the exchange's 8-decimal volume precision.
fn order_volume(amount: f64, price: f64, fee_percentage: f64) -> f64 {
    round_to_8(amount / (price * (1.0 + fee_percentage / 100.0)))
}

/// Round to 8 decimals, halves away from zero (`f64::round` semantics).
fn round_to_8(value: f64) -> f64 {
    (value * 1e8).round() / 1e8
}

/// Seconds left to sleep after a tick that took `elapsed_secs`. A tick that
/// overran its interval yields zero, so the next tick starts immediately.
fn remaining_sleep_secs(interval_minutes: u32, elapsed_secs: u64) -> u64 {
    (u64::from(interval_minutes) * 60).saturating_sub(elapsed_secs)
}
