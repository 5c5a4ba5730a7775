//! Sampling policies deciding where one bar ends and the next begins.
//!
//! Tick, volume and dollar bars are post-close: the trade that crosses the
//! threshold belongs to the bar it completes. Change and time bars are
//! pre-close: a trade outside the current bar's bound opens the next bar.

use streambar_core::{Error, Marker, PolicyKind, Result, Trade, Volume};

use crate::accumulator::BarAccumulator;

/// When a policy tests its trigger relative to absorbing the trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseTiming {
    /// Absorb, then test. The triggering trade ends the bar.
    PostClose,
    /// Test, then absorb. The triggering trade starts the next bar.
    PreClose,
}

/// What to do with an incoming trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Add the trade; the bar stays open.
    Absorb,
    /// Add the trade, then close the bar.
    AbsorbThenClose,
    /// Close the current bar, then add the trade to a fresh one.
    CloseThenAbsorb,
}

/// A validated sampling policy with its threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SamplingPolicy {
    /// Close once the bar holds `trades` trades.
    Tick { trades: u64 },
    /// Close once the bar's volume reaches `volume`.
    Volume { volume: Volume },
    /// Close once the bar's notional reaches `dollars`.
    Dollar { dollars: f64 },
    /// Open a new bar when a price moves `distance` or more from the open.
    Change { distance: f64 },
    /// Open a new bar when a marker reaches the window start plus `span`.
    Time { span: Marker },
}

impl SamplingPolicy {
    /// Build a policy from a selector and a threshold.
    ///
    /// The threshold must be finite and positive, and integral for tick,
    /// volume and time bars.
    pub fn new(kind: PolicyKind, size: f64) -> Result<Self> {
        if !size.is_finite() || size <= 0.0 {
            return Err(Error::config(format!(
                "{kind} bar size must be a positive number, got {size}"
            )));
        }
        if kind.needs_integral_size() && (size.fract() != 0.0 || size > u64::MAX as f64) {
            return Err(Error::config(format!(
                "{kind} bar size must be a whole number, got {size}"
            )));
        }

        Ok(match kind {
            PolicyKind::Tick => SamplingPolicy::Tick { trades: size as u64 },
            PolicyKind::Volume => SamplingPolicy::Volume { volume: size as Volume },
            PolicyKind::Dollar => SamplingPolicy::Dollar { dollars: size },
            PolicyKind::Change => SamplingPolicy::Change { distance: size },
            PolicyKind::Time => SamplingPolicy::Time { span: size as Marker },
        })
    }

    /// Build a policy from a signed whole-number threshold, as handed over by
    /// callers whose integers may be negative.
    ///
    /// Tick, volume and time thresholds are taken exactly.
    pub fn from_whole(kind: PolicyKind, size: i64) -> Result<Self> {
        let Ok(whole) = u64::try_from(size) else {
            return Err(Error::config(format!(
                "{kind} bar size must be a positive number, got {size}"
            )));
        };
        match kind {
            PolicyKind::Tick if whole > 0 => Ok(SamplingPolicy::Tick { trades: whole }),
            PolicyKind::Volume if whole > 0 => Ok(SamplingPolicy::Volume { volume: whole }),
            PolicyKind::Time if whole > 0 => Ok(SamplingPolicy::Time { span: whole }),
            _ => Self::new(kind, whole as f64),
        }
    }

    pub fn kind(&self) -> PolicyKind {
        match self {
            SamplingPolicy::Tick { .. } => PolicyKind::Tick,
            SamplingPolicy::Volume { .. } => PolicyKind::Volume,
            SamplingPolicy::Dollar { .. } => PolicyKind::Dollar,
            SamplingPolicy::Change { .. } => PolicyKind::Change,
            SamplingPolicy::Time { .. } => PolicyKind::Time,
        }
    }

    /// Threshold in the policy's unit.
    pub fn size(&self) -> f64 {
        match *self {
            SamplingPolicy::Tick { trades } => trades as f64,
            SamplingPolicy::Volume { volume } => volume as f64,
            SamplingPolicy::Dollar { dollars } => dollars,
            SamplingPolicy::Change { distance } => distance,
            SamplingPolicy::Time { span } => span as f64,
        }
    }

    pub fn timing(&self) -> CloseTiming {
        match self {
            SamplingPolicy::Tick { .. }
            | SamplingPolicy::Volume { .. }
            | SamplingPolicy::Dollar { .. } => CloseTiming::PostClose,
            SamplingPolicy::Change { .. } | SamplingPolicy::Time { .. } => CloseTiming::PreClose,
        }
    }

    /// Decide how `trade` joins the bar held by `acc`.
    ///
    /// Post-close triggers are tested on the sums the accumulator would hold
    /// after adding the trade, computed the same way `add` computes them.
    /// Counts saturate, so a sum past `u64::MAX` still reaches any threshold.
    /// Pre-close triggers never fire on an empty accumulator.
    pub fn evaluate(&self, trade: &Trade, acc: &BarAccumulator) -> Decision {
        let close = match *self {
            SamplingPolicy::Tick { trades } => acc.trade_count().saturating_add(1) >= trades,
            SamplingPolicy::Volume { volume } => {
                acc.volume().saturating_add(trade.volume) >= volume
            }
            SamplingPolicy::Dollar { dollars } => acc.dollars() + trade.notional() >= dollars,
            SamplingPolicy::Change { distance } => acc
                .open_price()
                .is_some_and(|open| (trade.price - open).abs() >= distance),
            SamplingPolicy::Time { span } => acc
                .window_start()
                .is_some_and(|start| trade.marker >= start.saturating_add(span)),
        };

        match (close, self.timing()) {
            (false, _) => Decision::Absorb,
            (true, CloseTiming::PostClose) => Decision::AbsorbThenClose,
            (true, CloseTiming::PreClose) => Decision::CloseThenAbsorb,
        }
    }
}
