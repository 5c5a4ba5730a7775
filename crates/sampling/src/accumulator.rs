//! Running aggregate of the bar currently being built.

use streambar_core::{Bar, Error, Marker, Result, Trade, Volume};

/// A bar that's currently being built.
///
/// Empty iff no trade has been added since construction or the last close.
#[derive(Debug, Clone, Default)]
pub struct BarAccumulator {
    volume: Volume,
    /// Sum of price * volume.
    dollars: f64,
    trades: u64,
    buys: u64,
    /// Price of the first trade.
    open: f64,
    /// Marker of the first trade.
    window_start: Marker,
}

impl BarAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Absorb a trade.
    ///
    /// Fails, leaving the bar unchanged, if its volume would exceed
    /// `Volume::MAX`.
    pub fn add(&mut self, trade: &Trade) -> Result<()> {
        let volume = self.volume.checked_add(trade.volume).ok_or_else(|| {
            Error::internal(format!(
                "bar volume {} plus trade volume {} exceeds {}",
                self.volume,
                trade.volume,
                Volume::MAX
            ))
        })?;
        if self.is_empty() {
            self.open = trade.price;
            self.window_start = trade.marker;
        }
        self.volume = volume;
        self.dollars += trade.notional();
        self.trades += 1;
        if trade.side.is_buy() {
            self.buys += 1;
        }
        Ok(())
    }

    /// Emit the bar and reset to empty. Returns `None` when empty.
    pub fn close(&mut self) -> Option<Bar> {
        if self.is_empty() {
            return None;
        }
        let acc = std::mem::take(self);
        Some(Bar {
            volume: acc.volume,
            buys: acc.buys,
            vwap: acc.dollars / acc.volume as f64,
            trades: acc.trades,
        })
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.trades == 0
    }

    #[inline]
    pub fn volume(&self) -> Volume {
        self.volume
    }

    #[inline]
    pub fn dollars(&self) -> f64 {
        self.dollars
    }

    #[inline]
    pub fn trade_count(&self) -> u64 {
        self.trades
    }

    /// Price of the bar's first trade, if any.
    pub fn open_price(&self) -> Option<f64> {
        (!self.is_empty()).then_some(self.open)
    }

    /// Marker of the bar's first trade, if any.
    pub fn window_start(&self) -> Option<Marker> {
        (!self.is_empty()).then_some(self.window_start)
    }
}
