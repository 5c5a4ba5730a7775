//! Core data types for the streambar engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Timestamp or sequence tick attached to every trade.
///
/// Markers are non-decreasing along a tape; their unit is whatever the tape
/// uses (milliseconds for time-of-day tapes).
pub type Marker = u64;

/// Trade size in whole units.
pub type Volume = u64;

/// Side of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeSide {
    /// Buyer-initiated.
    Buy,
    /// Seller-initiated.
    Sell,
    /// Side could not be inferred (first trade of a tick-rule tape).
    Unknown,
}

impl TradeSide {
    #[inline]
    pub fn is_buy(self) -> bool {
        self == TradeSide::Buy
    }

    /// Parse a side flag as written on a tape: `buy`/`b`/`1` or `sell`/`s`/`-1`.
    pub fn from_flag(flag: &str) -> Option<Self> {
        let flag = flag.trim();
        if flag.eq_ignore_ascii_case("buy") || flag.eq_ignore_ascii_case("b") || flag == "1" {
            Some(TradeSide::Buy)
        } else if flag.eq_ignore_ascii_case("sell") || flag.eq_ignore_ascii_case("s") || flag == "-1" {
            Some(TradeSide::Sell)
        } else {
            None
        }
    }
}

/// A single trade read from a tape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Timestamp or sequence tick.
    pub marker: Marker,
    /// Trade price, always positive.
    pub price: f64,
    /// Trade size, always positive.
    pub volume: Volume,
    /// Aggressor side.
    pub side: TradeSide,
}

impl Trade {
    pub fn new(marker: Marker, price: f64, volume: Volume, side: TradeSide) -> Self {
        Self {
            marker,
            price,
            volume,
            side,
        }
    }

    /// Notional value (price * volume).
    #[inline]
    pub fn notional(&self) -> f64 {
        self.price * self.volume as f64
    }
}

/// A completed bar.
///
/// Field order is the column order of the bar file:
/// `volume,buys,vwap,trades`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Total volume of the bar's trades.
    pub volume: Volume,
    /// Number of buyer-initiated trades.
    pub buys: u64,
    /// Volume-weighted average price.
    pub vwap: f64,
    /// Number of trades.
    pub trades: u64,
}

impl Bar {
    /// Column names, in output order.
    pub const HEADER: [&'static str; 4] = ["volume", "buys", "vwap", "trades"];

    /// Sum of price * volume recovered from the vwap.
    #[inline]
    pub fn notional(&self) -> f64 {
        self.vwap * self.volume as f64
    }
}

/// Sampling policy selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    /// Fixed number of trades per bar.
    Tick,
    /// Cumulative volume per bar.
    Volume,
    /// Cumulative notional value per bar.
    Dollar,
    /// Price displacement from the bar's open.
    Change,
    /// Elapsed marker units since the bar's first trade.
    Time,
}

impl PolicyKind {
    pub const ALL: [PolicyKind; 5] = [
        PolicyKind::Tick,
        PolicyKind::Volume,
        PolicyKind::Dollar,
        PolicyKind::Change,
        PolicyKind::Time,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PolicyKind::Tick => "tick",
            PolicyKind::Volume => "volume",
            PolicyKind::Dollar => "dollar",
            PolicyKind::Change => "change",
            PolicyKind::Time => "time",
        }
    }

    /// Whether the threshold for this policy counts whole units.
    pub fn needs_integral_size(self) -> bool {
        matches!(self, PolicyKind::Tick | PolicyKind::Volume | PolicyKind::Time)
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        PolicyKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::config(format!("unrecognized bar policy {s:?}")))
    }
}
