//! Trade side inference using the tick rule.
//!
//! Tagged tapes carry no aggressor flag, so a trade's side is inferred from
//! the direction of the last price change.

use streambar_core::TradeSide;

/// Statistics about side inference.
#[derive(Debug, Clone, Default)]
pub struct ClassificationStats {
    /// Total trades classified.
    pub total_trades: u64,
    /// Trades classified as buy.
    pub buy_trades: u64,
    /// Trades classified as sell.
    pub sell_trades: u64,
    /// Trades left unclassified.
    pub unknown_trades: u64,
    /// Trades whose side came from zero-tick continuation.
    pub zero_tick_trades: u64,
}

/// Tick-rule classifier.
///
/// Uptick is a buy, downtick a sell, and a zero tick repeats the side of the
/// previous trade. The first trade has nothing to compare with and stays
/// [`TradeSide::Unknown`].
#[derive(Debug, Clone)]
pub struct TickRule {
    /// Last trade price.
    last_price: Option<f64>,
    /// Last trade side (for zero-tick continuation).
    last_side: TradeSide,
    stats: ClassificationStats,
}

impl TickRule {
    pub fn new() -> Self {
        Self {
            last_price: None,
            last_side: TradeSide::Unknown,
            stats: ClassificationStats::default(),
        }
    }

    /// Classify the next trade price on the tape.
    pub fn classify(&mut self, price: f64) -> TradeSide {
        let side = match self.last_price {
            Some(last) if price > last => TradeSide::Buy,
            Some(last) if price < last => TradeSide::Sell,
            Some(_) => {
                self.stats.zero_tick_trades += 1;
                self.last_side
            }
            None => TradeSide::Unknown,
        };

        self.stats.total_trades += 1;
        match side {
            TradeSide::Buy => self.stats.buy_trades += 1,
            TradeSide::Sell => self.stats.sell_trades += 1,
            TradeSide::Unknown => self.stats.unknown_trades += 1,
        }

        self.last_price = Some(price);
        self.last_side = side;
        side
    }

    /// Get classification statistics.
    pub fn stats(&self) -> &ClassificationStats {
        &self.stats
    }
}

impl Default for TickRule {
    fn default() -> Self {
        Self::new()
    }
}
