use common::Candle;

/// Rolling window of the three most recent simple-moving-average values.
///
/// Each `update` computes one SMA over the latest closed candles and shifts
/// it into the window, so the tracker sees the average move tick by tick and
/// can classify the turn: a fall that reversed upward, or a rise that
/// reversed downward.
#[derive(Debug, Clone)]
pub struct SmaTracker {
    length: usize,
    /// Last three computed averages, most recent first.
    values: [f64; 3],
}

impl SmaTracker {
    pub fn new(length: usize) -> Self {
        assert!(length >= 1, "SMA length must be >= 1");
        Self {
            length,
            values: [0.0; 3],
        }
    }

    /// Feed the latest candle history and roll the average window.
    ///
    /// Averages the closes of the `length` most recent *closed* candles; the
    /// last candle is still forming and is excluded. Returns true once three
    /// averages have been computed and trend classification is meaningful.
    ///
    /// With fewer than `length` closed candles the sum runs over what exists
    /// while the divisor stays `length`, dragging the average toward zero.
    /// Kept as observed; callers should supply at least `length + 1` candles.
    pub fn update(&mut self, candles: &[Candle]) -> bool {
        let closed = candles.len().saturating_sub(1);
        let start = closed.saturating_sub(self.length);
        let sum: f64 = candles[start..closed].iter().map(|c| c.close).sum();

        self.values[2] = self.values[1];
        self.values[1] = self.values[0];
        self.values[0] = sum / self.length as f64;

        self.is_initialized()
    }

    /// True once all three slots hold a computed average.
    pub fn is_initialized(&self) -> bool {
        self.values[2] > 0.0
    }

    pub fn newest(&self) -> f64 {
        self.values[0]
    }

    pub fn middle(&self) -> f64 {
        self.values[1]
    }

    pub fn oldest(&self) -> f64 {
        self.values[2]
    }

    /// A falling average that turned back up on the latest update.
    pub fn down_then_up(&self) -> bool {
        self.values[0] > self.values[1] && self.values[1] < self.values[2]
    }

    /// A rising average that turned back down on the latest update.
    pub fn up_then_down(&self) -> bool {
        self.values[0] < self.values[1] && self.values[1] > self.values[2]
    }

    /// Depth of the turn: middle minus oldest. Negative when the leg into
    /// the turn was downward.
    pub fn dip(&self) -> f64 {
        self.values[1] - self.values[2]
    }

    /// Magnitude of the turn relative to the newest average.
    pub fn dip_percentage(&self) -> f64 {
        self.dip().abs() / self.values[0]
    }
}
