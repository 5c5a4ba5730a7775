//! Single-pass bar run.
//!
//! A run moves through `Open -> Streaming -> Finalizing -> Closed`, pulling
//! one trade at a time from the tape and writing each bar as soon as it
//! closes. Finalizing always runs once and emits the trailing partial bar,
//! if any.

use std::path::Path;
use streambar_core::{Bar, Config, Error, Marker, PolicyKind, Result, Trade, Volume};
use streambar_ingestion::TapeReader;
use streambar_sampling::{BarBuilder, SamplingPolicy};
use tracing::{debug, info};

use crate::sink::{BarCollector, BarSink, CsvBarSink};

/// Lifecycle of a bar run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    /// Tape and destination acquired.
    Open,
    /// Consuming trades.
    Streaming,
    /// Emitting the trailing partial bar.
    Finalizing,
    /// Destination released.
    Closed,
}

/// One pass of a trade stream through a builder into a sink.
pub struct BarRun<S, K> {
    trades: S,
    sink: K,
    builder: BarBuilder,
    phase: RunPhase,
}

impl<S, K> BarRun<S, K>
where
    S: Iterator<Item = Result<Trade>>,
    K: BarSink,
{
    pub fn new(trades: S, sink: K, policy: SamplingPolicy) -> Self {
        Self {
            trades,
            sink,
            builder: BarBuilder::new(policy),
            phase: RunPhase::Open,
        }
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Run every phase in order and return the number of bars written.
    pub fn execute(mut self) -> Result<u64> {
        self.stream()?;
        self.finalize()?;
        self.close()
    }

    /// Consume the whole trade stream, writing bars as they close.
    pub fn stream(&mut self) -> Result<()> {
        self.advance(RunPhase::Open, RunPhase::Streaming)?;
        for trade in self.trades.by_ref() {
            let trade = trade?;
            if let Some(bar) = self.builder.push(&trade)? {
                self.sink.write_bar(&bar)?;
            }
        }
        Ok(())
    }

    /// Force-close the bar in progress. An empty bar is never emitted.
    pub fn finalize(&mut self) -> Result<()> {
        self.advance(RunPhase::Streaming, RunPhase::Finalizing)?;
        if let Some(bar) = self.builder.flush() {
            self.sink.write_bar(&bar)?;
        }
        Ok(())
    }

    /// Release the destination and return the bar count.
    pub fn close(mut self) -> Result<u64> {
        self.advance(RunPhase::Finalizing, RunPhase::Closed)?;
        self.sink.finish()?;
        debug_assert_eq!(self.sink.bars_written(), self.builder.bars_closed());
        debug!(
            policy = %self.builder.policy().kind(),
            trades = self.builder.trades_seen(),
            bars = self.sink.bars_written(),
            "run closed"
        );
        Ok(self.sink.bars_written())
    }

    fn advance(&mut self, from: RunPhase, to: RunPhase) -> Result<()> {
        if self.phase != from {
            return Err(Error::internal(format!(
                "cannot enter {to:?} while {:?}",
                self.phase
            )));
        }
        self.phase = to;
        Ok(())
    }
}

/// Build bars from a tape file into a CSV bar file.
///
/// The tape is opened before the output, so a missing tape always reports
/// [`Error::Source`]. Returns the number of bars written, including a
/// trailing partial bar.
pub fn run(
    tape: impl AsRef<Path>,
    output: impl AsRef<Path>,
    kind: PolicyKind,
    size: f64,
    config: &Config,
) -> Result<u64> {
    let policy = SamplingPolicy::new(kind, size)?;
    run_with_policy(tape, output, policy, config)
}

/// Like [`run`], taking policy and size from `config.bars`.
///
/// `config.bars.size` is checked by the policy itself.
pub fn run_with_config(
    tape: impl AsRef<Path>,
    output: impl AsRef<Path>,
    config: &Config,
) -> Result<u64> {
    run(tape, output, config.bars.policy, config.bars.size, config)
}

/// Like [`run`], with an already validated policy.
///
/// Only the `tape` and `output` sections of `config` are used; `config.bars`
/// is neither read nor validated.
pub fn run_with_policy(
    tape: impl AsRef<Path>,
    output: impl AsRef<Path>,
    policy: SamplingPolicy,
    config: &Config,
) -> Result<u64> {
    let (tape, output) = (tape.as_ref(), output.as_ref());
    config.tape.validate()?;
    config.output.validate()?;
    info!(
        tape = %tape.display(),
        output = %output.display(),
        policy = %policy.kind(),
        size = policy.size(),
        "starting bar run"
    );

    let trades = TapeReader::open(tape, &config.tape)?;
    let sink = CsvBarSink::create(output, &config.output)?;
    let bars = BarRun::new(trades, sink, policy).execute()?;

    info!(output = %output.display(), bars, "bar run complete");
    Ok(bars)
}

/// Build bars from an in-memory trade stream.
pub fn collect_bars<S>(trades: S, policy: SamplingPolicy) -> Result<Vec<Bar>>
where
    S: IntoIterator<Item = Result<Trade>>,
{
    let mut collector = BarCollector::new();
    BarRun::new(trades.into_iter(), &mut collector, policy).execute()?;
    Ok(collector.into_bars())
}

/// Tick bars: `size` trades per bar.
pub fn tick(tape: impl AsRef<Path>, output: impl AsRef<Path>, size: u64) -> Result<u64> {
    run(tape, output, PolicyKind::Tick, size as f64, &Config::default())
}

/// Volume bars: close once a bar's volume reaches `size`.
pub fn volume(tape: impl AsRef<Path>, output: impl AsRef<Path>, size: Volume) -> Result<u64> {
    run(tape, output, PolicyKind::Volume, size as f64, &Config::default())
}

/// Dollar bars: close once a bar's notional reaches `size`.
pub fn dollar(tape: impl AsRef<Path>, output: impl AsRef<Path>, size: f64) -> Result<u64> {
    run(tape, output, PolicyKind::Dollar, size, &Config::default())
}

/// Change bars: a trade `size` or more away from the bar's open starts a new bar.
pub fn change(tape: impl AsRef<Path>, output: impl AsRef<Path>, size: f64) -> Result<u64> {
    run(tape, output, PolicyKind::Change, size, &Config::default())
}

/// Time bars: a trade at or past the bar's first marker plus `size` starts a new bar.
pub fn time(tape: impl AsRef<Path>, output: impl AsRef<Path>, size: Marker) -> Result<u64> {
    run(tape, output, PolicyKind::Time, size as f64, &Config::default())
}
