//! Bar building from a trade stream under one sampling policy.

use streambar_core::{Bar, Result, Trade};
use tracing::trace;

use crate::accumulator::BarAccumulator;
use crate::policy::{Decision, SamplingPolicy};

/// Builder pairing one accumulator with one policy.
///
/// Each pushed trade yields at most one completed bar.
#[derive(Debug, Clone)]
pub struct BarBuilder {
    policy: SamplingPolicy,
    acc: BarAccumulator,
    bars_closed: u64,
    trades_seen: u64,
}

impl BarBuilder {
    /// Create a new bar builder.
    pub fn new(policy: SamplingPolicy) -> Self {
        Self {
            policy,
            acc: BarAccumulator::new(),
            bars_closed: 0,
            trades_seen: 0,
        }
    }

    /// Add a trade, returning the bar it closed, if any.
    ///
    /// A trade the bar cannot absorb is rejected with an error and not
    /// counted.
    pub fn push(&mut self, trade: &Trade) -> Result<Option<Bar>> {
        let bar = match self.policy.evaluate(trade, &self.acc) {
            Decision::Absorb => {
                self.acc.add(trade)?;
                None
            }
            Decision::AbsorbThenClose => {
                self.acc.add(trade)?;
                self.close()
            }
            Decision::CloseThenAbsorb => {
                let bar = self.close();
                self.acc.add(trade)?;
                bar
            }
        };
        self.trades_seen += 1;
        Ok(bar)
    }

    /// Force-close the trailing partial bar. Returns `None` if nothing is pending.
    pub fn flush(&mut self) -> Option<Bar> {
        self.close()
    }

    fn close(&mut self) -> Option<Bar> {
        let bar = self.acc.close()?;
        self.bars_closed += 1;
        trace!(bar = self.bars_closed, volume = bar.volume, trades = bar.trades, "bar closed");
        Some(bar)
    }

    pub fn policy(&self) -> &SamplingPolicy {
        &self.policy
    }

    /// Number of bars closed so far, including a flushed partial bar.
    pub fn bars_closed(&self) -> u64 {
        self.bars_closed
    }

    pub fn trades_seen(&self) -> u64 {
        self.trades_seen
    }
}
