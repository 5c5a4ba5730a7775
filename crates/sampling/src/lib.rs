//! Bar sampling for the streambar engine.
//!
//! This crate provides:
//! - The running bar accumulator
//! - The five sampling policies (tick, volume, dollar, change, time)
//! - A bar builder that turns a trade stream into completed bars

pub mod accumulator;
pub mod builder;
pub mod policy;

pub use accumulator::BarAccumulator;
pub use builder::BarBuilder;
pub use policy::{CloseTiming, Decision, SamplingPolicy};
