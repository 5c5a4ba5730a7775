//! Core types and configuration for the streambar engine.
//!
//! This crate provides shared types used across all other crates:
//! - Trades and bars
//! - Policy selectors
//! - Configuration structures
//! - Common error types

pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::{Error, ErrorKind, Result};
pub use types::*;
