//! Tape ingestion for the streambar engine.
//!
//! This crate handles:
//! - Lazy, record-at-a-time tape decoding
//! - Trade validation (positive price and volume, ordered markers)
//! - Trade side inference (tick rule) for tapes without a side column

pub mod classifier;
pub mod tape;

pub use classifier::{ClassificationStats, TickRule};
pub use tape::TapeReader;
