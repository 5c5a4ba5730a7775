//! Streaming bar engine.
//!
//! This crate provides:
//! - Bar sinks (CSV file with staged output, in-memory collector)
//! - The single-pass driver and its run phases
//! - One entry point per sampling policy

pub mod driver;
pub mod sink;

pub use driver::{
    change, collect_bars, dollar, run, run_with_config, run_with_policy, tick, time, volume,
    BarRun, RunPhase,
};
pub use sink::{BarCollector, BarSink, CsvBarSink};
pub use streambar_sampling::SamplingPolicy;
